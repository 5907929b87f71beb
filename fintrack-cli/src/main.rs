//! fintrack CLI - budgets and spending in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{budget, category, config, logs, report, status, tx, user, Globals};

/// fintrack - budgets and spending in your terminal
#[derive(Parser)]
#[command(name = "ft", version, about, long_about = None)]
struct Cli {
    /// Acting user
    #[arg(long, global = true, env = "FINTRACK_USER")]
    user: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Manage categories of the acting user
    Category {
        #[command(subcommand)]
        command: category::CategoryCommands,
    },

    /// Record and list transactions
    Tx {
        #[command(subcommand)]
        command: tx::TxCommands,
    },

    /// Manage budgets
    Budget {
        #[command(subcommand)]
        command: budget::BudgetCommands,
    },

    /// Monthly reports and expense breakdowns
    Report {
        #[command(subcommand)]
        command: report::ReportCommands,
    },

    /// View and manage the event log
    Logs {
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Delete entries older than N days instead of listing
        #[arg(long)]
        clear_days: Option<u32>,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Show ledger status
    Status,

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::User { .. } => "user",
            Commands::Category { .. } => "category",
            Commands::Tx { .. } => "tx",
            Commands::Budget { .. } => "budget",
            Commands::Report { .. } => "report",
            Commands::Logs { .. } => "logs",
            Commands::Status => "status",
            Commands::Config { .. } => "config",
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fintrack_core=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let logger = commands::get_logger();
    let name = cli.command.name();
    commands::log_command(&logger, name);

    let globals = Globals {
        user: cli.user,
        json: cli.json,
        logger,
    };

    match run(cli.command, &globals) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            commands::log_error(&globals.logger, name, &e);
            if globals.json {
                output::json_failure(&e);
            } else {
                output::error(&format!("{:#}", e));
            }
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, globals: &Globals) -> Result<()> {
    match command {
        Commands::User { command } => user::run(command, globals),
        Commands::Category { command } => category::run(command, globals),
        Commands::Tx { command } => tx::run(command, globals),
        Commands::Budget { command } => budget::run(command, globals),
        Commands::Report { command } => report::run(command, globals),
        Commands::Logs {
            errors,
            limit,
            clear_days,
            force,
        } => logs::run(errors, limit, clear_days, force, globals),
        Commands::Status => status::run(globals),
        Commands::Config { command } => config::run(command, globals),
    }
}
