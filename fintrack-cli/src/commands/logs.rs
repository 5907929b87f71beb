//! Logs command - view and clear the event log

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use colored::Colorize;

use super::{confirm, Globals};
use crate::output;

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

pub fn run(errors: bool, limit: usize, clear_days: Option<u32>, force: bool, globals: &Globals) -> Result<()> {
    let service = globals
        .logger
        .as_ref()
        .context("Event log is unavailable")?;

    if let Some(days) = clear_days {
        if !confirm(&format!("Delete log entries older than {} days?", days), force, globals.json)? {
            println!("{}", "Cancelled".dimmed());
            return Ok(());
        }
        let deleted = service.delete_older_than_days(days)?;
        if globals.json {
            return output::json(&serde_json::json!({ "deleted": deleted }));
        }
        output::success(&format!("Deleted {} log entries", deleted));
        return Ok(());
    }

    let entries = if errors {
        service.get_errors(limit)?
    } else {
        service.get_recent(limit)?
    };

    if globals.json {
        return output::json(&serde_json::json!({
            "total_entries": service.count()?,
            "database_path": service.db_path().to_string_lossy(),
            "entries": entries,
        }));
    }

    if entries.is_empty() {
        println!("No log entries found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Entry", "Event", "Context", "Error"]);
    for entry in entries {
        let context = [
            entry.command.as_deref(),
            entry.report_kind.as_deref(),
            entry.warning.as_deref(),
        ]
        .iter()
        .filter_map(|&s| s)
        .collect::<Vec<_>>()
        .join(", ");

        table.add_row(vec![
            format_timestamp(entry.timestamp),
            entry.entry_point,
            entry.event,
            context,
            entry.error_message.map(|m| m.red().to_string()).unwrap_or_default(),
        ]);
    }
    println!("{}", table);
    println!();
    println!(
        "{} entries in {}",
        service.count()?,
        service.db_path().display().to_string().dimmed()
    );

    Ok(())
}
