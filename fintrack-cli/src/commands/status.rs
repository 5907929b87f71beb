//! Status command - ledger counts and schema state

use anyhow::Result;
use colored::Colorize;

use super::{get_context, Globals};
use crate::output;

pub fn run(globals: &Globals) -> Result<()> {
    let ctx = get_context(globals)?;
    let status = ctx.status.get_status()?;

    if globals.json {
        return output::json(&status);
    }

    println!("{}", "Ledger Status".bold());
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Users", &status.counts.users.to_string()]);
    table.add_row(vec!["Categories", &status.counts.categories.to_string()]);
    table.add_row(vec!["Transactions", &status.counts.transactions.to_string()]);
    table.add_row(vec!["Budgets", &status.counts.budgets.to_string()]);
    table.add_row(vec!["Trend months", &status.trend_months.to_string()]);
    println!("{}", table);
    println!();

    println!("Database: {}", status.database);
    if !status.pending_migrations.is_empty() {
        output::warning(&format!(
            "Pending migrations: {}",
            status.pending_migrations.join(", ")
        ));
    }

    Ok(())
}
