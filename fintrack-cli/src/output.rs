//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};
use rust_decimal::Decimal;
use serde::Serialize;

use fintrack_core::{OperationResult, ReportWarning};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Print report warnings, one per line
pub fn warnings(warnings: &[ReportWarning]) {
    for w in warnings {
        warning(&format!("warning: {}", w));
    }
}

/// Print any serializable value as pretty JSON
pub fn json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a failed command as an `OperationResult` envelope
pub fn json_failure(err: &anyhow::Error) {
    let result: OperationResult<()> = OperationResult::fail(format!("{:#}", err));
    match serde_json::to_string_pretty(&result) {
        Ok(text) => println!("{}", text),
        Err(_) => error(&format!("{:#}", err)),
    }
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Right-aligned money cell
pub fn amount_cell(amount: Decimal) -> Cell {
    Cell::new(amount.to_string()).set_alignment(CellAlignment::Right)
}

/// Money cell colored red when negative
pub fn signed_amount_cell(amount: Decimal) -> Cell {
    let text = amount.to_string();
    let text = if amount.is_sign_negative() && !amount.is_zero() {
        text.red().to_string()
    } else {
        text
    };
    Cell::new(text).set_alignment(CellAlignment::Right)
}
