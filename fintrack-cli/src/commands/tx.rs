//! Transaction command - record, edit, list and remove transactions

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Subcommand;
use colored::Colorize;
use uuid::Uuid;

use fintrack_core::domain::money;
use fintrack_core::domain::period::month_interval;
use fintrack_core::services::TransactionChanges;
use fintrack_core::CategoryKind;

use super::{acting_user, confirm, get_context, Globals};
use crate::output;

#[derive(Subcommand)]
pub enum TxCommands {
    /// Record a transaction
    Add {
        /// Category id or name; its kind decides income or expense
        #[arg(long, short)]
        category: String,
        /// Amount, at most two decimal places
        amount: String,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long, short)]
        date: Option<NaiveDate>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Change a recorded transaction
    Edit {
        id: Uuid,
        /// Move to another category of the same kind (id or name)
        #[arg(long, short)]
        category: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long, short)]
        date: Option<NaiveDate>,
        /// New description; an empty string clears it
        #[arg(long)]
        description: Option<String>,
    },
    /// List transactions, newest first
    List {
        /// Limit to one month (with --month)
        #[arg(long, requires = "month")]
        year: Option<i32>,
        #[arg(long, requires = "year")]
        month: Option<u32>,
        /// Only income or only expense transactions
        #[arg(long, short)]
        kind: Option<CategoryKind>,
    },
    /// Remove a transaction
    Remove {
        id: Uuid,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub fn run(command: TxCommands, globals: &Globals) -> Result<()> {
    let ctx = get_context(globals)?;
    let user = acting_user(&ctx, globals)?;

    match command {
        TxCommands::Add {
            category,
            amount,
            date,
            description,
        } => {
            let category = ctx.ledger.require_category(user.id, &category)?;
            let amount = money::parse(&amount)?;
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let tx = ctx
                .ledger
                .add_transaction(user.id, category.id, amount, date, description.as_deref())?;
            if globals.json {
                return output::json(&tx);
            }
            output::success(&format!(
                "Recorded {} {} in '{}' on {}",
                tx.kind, tx.amount, category.name, tx.occurred_on
            ));
        }
        TxCommands::Edit {
            id,
            category,
            amount,
            date,
            description,
        } => {
            let category_id = category
                .map(|c| ctx.ledger.require_category(user.id, &c).map(|c| c.id))
                .transpose()?;
            let changes = TransactionChanges {
                category_id,
                amount: amount.as_deref().map(money::parse).transpose()?,
                occurred_on: date,
                description,
            };
            let tx = ctx.ledger.edit_transaction(user.id, id, changes)?;
            if globals.json {
                return output::json(&tx);
            }
            output::success(&format!("Updated {} {} on {}", tx.kind, tx.amount, tx.occurred_on));
        }
        TxCommands::List { year, month, kind } => {
            let interval = match (year, month) {
                (Some(y), Some(m)) => Some(
                    month_interval(y, m).with_context(|| format!("{}-{:02} is not a valid month", y, m))?,
                ),
                _ => None,
            };
            let txs = ctx.ledger.list_transactions(user.id, interval.as_ref(), kind)?;
            if globals.json {
                return output::json(&txs);
            }
            if txs.is_empty() {
                println!("No transactions.");
                return Ok(());
            }

            let names: HashMap<Uuid, String> = ctx
                .ledger
                .list_categories(user.id)?
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect();
            let mut table = output::create_table();
            table.set_header(vec!["Date", "Category", "Kind", "Amount", "Description", "ID"]);
            for tx in txs {
                table.add_row(vec![
                    tx.occurred_on.to_string().into(),
                    names.get(&tx.category_id).cloned().unwrap_or_default().into(),
                    tx.kind.to_string().into(),
                    output::amount_cell(tx.amount),
                    tx.description.unwrap_or_default().into(),
                    tx.id.to_string().into(),
                ]);
            }
            println!("{}", table);
        }
        TxCommands::Remove { id, force } => {
            if !confirm(&format!("Remove transaction {}?", id), force, globals.json)? {
                println!("{}", "Cancelled".dimmed());
                return Ok(());
            }
            ctx.ledger.remove_transaction(user.id, id)?;
            if globals.json {
                return output::json(&serde_json::json!({ "removed": id }));
            }
            output::success("Transaction removed");
        }
    }

    Ok(())
}
