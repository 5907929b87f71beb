//! Budget command - set, edit, list and remove spending ceilings

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use colored::Colorize;
use uuid::Uuid;

use fintrack_core::domain::money;
use fintrack_core::services::BudgetChanges;
use fintrack_core::BudgetCategoryRef;

use super::{acting_user, confirm, get_context, Globals};
use crate::output;

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Set a budget for an expense category
    Set {
        /// Category id or name
        #[arg(long, short)]
        category: String,
        amount: String,
        /// First day the budget applies (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Day the budget stops applying (exclusive); open-ended if omitted
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Change a budget's category or amount
    Edit {
        id: Uuid,
        /// Expense category id or name
        #[arg(long, short)]
        category: Option<String>,
        #[arg(long)]
        amount: Option<String>,
    },
    /// List budgets
    List,
    /// Remove a budget
    Remove {
        id: Uuid,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub fn run(command: BudgetCommands, globals: &Globals) -> Result<()> {
    let ctx = get_context(globals)?;
    let user = acting_user(&ctx, globals)?;

    match command {
        BudgetCommands::Set {
            category,
            amount,
            start,
            end,
        } => {
            let category = ctx.ledger.require_category(user.id, &category)?;
            let amount = money::parse(&amount)?;
            let budget = ctx.ledger.set_budget(user.id, category.id, amount, start, end)?;
            if globals.json {
                return output::json(&budget);
            }
            output::success(&format!(
                "Budget of {} set for '{}' from {}",
                budget.amount, category.name, budget.start_date
            ));
        }
        BudgetCommands::Edit { id, category, amount } => {
            let category_id = category
                .map(|c| ctx.ledger.require_category(user.id, &c).map(|c| c.id))
                .transpose()?;
            let changes = BudgetChanges {
                category_id,
                amount: amount.as_deref().map(money::parse).transpose()?,
            };
            let budget = ctx.ledger.edit_budget(user.id, id, changes)?;
            if globals.json {
                return output::json(&budget);
            }
            output::success(&format!("Budget {} now {} for {}", budget.id, budget.amount, budget.category));
        }
        BudgetCommands::List => {
            let budgets = ctx.ledger.list_budgets(user.id)?;
            if globals.json {
                return output::json(&budgets);
            }
            if budgets.is_empty() {
                println!("No budgets.");
                return Ok(());
            }

            let categories = ctx.ledger.list_categories(user.id)?;
            let mut table = output::create_table();
            table.set_header(vec!["Category", "Amount", "Start", "End", "ID"]);
            for budget in budgets {
                let label = match categories.iter().find(|c| budget.category.matches(c)) {
                    Some(c) => c.name.clone(),
                    None => match &budget.category {
                        BudgetCategoryRef::LegacyName(name) => format!("{} (unmatched)", name).dimmed().to_string(),
                        BudgetCategoryRef::Id(_) => "(deleted category)".dimmed().to_string(),
                    },
                };
                table.add_row(vec![
                    label.into(),
                    output::amount_cell(budget.amount),
                    budget.start_date.to_string().into(),
                    budget.end_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()).into(),
                    budget.id.to_string().into(),
                ]);
            }
            println!("{}", table);
        }
        BudgetCommands::Remove { id, force } => {
            if !confirm(&format!("Remove budget {}?", id), force, globals.json)? {
                println!("{}", "Cancelled".dimmed());
                return Ok(());
            }
            ctx.ledger.remove_budget(user.id, id)?;
            if globals.json {
                return output::json(&serde_json::json!({ "removed": id }));
            }
            output::success("Budget removed");
        }
    }

    Ok(())
}
