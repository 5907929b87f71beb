//! CLI command implementations

pub mod budget;
pub mod category;
pub mod config;
pub mod logs;
pub mod report;
pub mod status;
pub mod tx;
pub mod user;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use dialoguer::Confirm;
use fintrack_core::config::{Config, ENV_DIR};
use fintrack_core::services::{EntryPoint, LogEvent, LoggingService};
use fintrack_core::{FintrackContext, User};

/// Options shared by every command
pub struct Globals {
    pub user: Option<String>,
    pub json: bool,
    pub logger: Option<Arc<LoggingService>>,
}

/// Data directory from `FINTRACK_DIR` or `~/.fintrack`
pub fn get_data_dir() -> Result<PathBuf> {
    Config::default_dir()
        .with_context(|| format!("Could not find home directory; set {}", ENV_DIR))
}

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (never blocks a command)
pub fn get_logger() -> Option<Arc<LoggingService>> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
        .ok()
        .map(Arc::new)
}

/// Log an event, ignoring any errors
pub fn log_event(logger: &Option<Arc<LoggingService>>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

pub fn log_command(logger: &Option<Arc<LoggingService>>, command: &str) {
    log_event(logger, LogEvent::new("command").with_command(command));
}

/// Record a failed command; only the error chain is stored
pub fn log_error(logger: &Option<Arc<LoggingService>>, command: &str, err: &anyhow::Error) {
    log_event(
        logger,
        LogEvent::new("command_failed")
            .with_command(command)
            .with_error(err.to_string())
            .with_error_details(format!("{:#}", err)),
    );
}

/// Open the ledger in the data directory
pub fn get_context(globals: &Globals) -> Result<FintrackContext> {
    let data_dir = get_data_dir()?;
    let ctx = FintrackContext::new(&data_dir).context("Failed to open fintrack ledger")?;
    Ok(match &globals.logger {
        Some(logger) => ctx.with_logger(Arc::clone(logger)),
        None => ctx,
    })
}

/// The acting user from `--user` / `FINTRACK_USER`
pub fn acting_user(ctx: &FintrackContext, globals: &Globals) -> Result<User> {
    let username = globals
        .user
        .as_deref()
        .context("No user selected; pass --user or set FINTRACK_USER")?;
    ctx.ledger.require_user(username)
}

/// Ask before a destructive action unless forced or in JSON mode
pub fn confirm(prompt: &str, force: bool, json: bool) -> Result<bool> {
    if force || json {
        return Ok(true);
    }
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}
