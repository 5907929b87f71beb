//! Category command - manage the acting user's categories

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use fintrack_core::CategoryKind;

use super::{acting_user, confirm, get_context, Globals};
use crate::output;

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Add a category
    Add {
        name: String,
        /// income or expense
        #[arg(long, default_value = "expense")]
        kind: CategoryKind,
    },
    /// List categories
    List,
    /// Rename a category (by id or name)
    Rename { category: String, new_name: String },
    /// Remove an unused category (by id or name)
    Remove {
        category: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub fn run(command: CategoryCommands, globals: &Globals) -> Result<()> {
    let ctx = get_context(globals)?;
    let user = acting_user(&ctx, globals)?;

    match command {
        CategoryCommands::Add { name, kind } => {
            let category = ctx.ledger.add_category(user.id, &name, kind)?;
            if globals.json {
                return output::json(&category);
            }
            output::success(&format!("Added {} category '{}'", category.kind, category.name));
        }
        CategoryCommands::List => {
            let categories = ctx.ledger.list_categories(user.id)?;
            if globals.json {
                return output::json(&categories);
            }
            if categories.is_empty() {
                println!("No categories.");
                return Ok(());
            }
            let mut table = output::create_table();
            table.set_header(vec!["Name", "Kind", "ID"]);
            for c in categories {
                table.add_row(vec![c.name, c.kind.to_string(), c.id.to_string()]);
            }
            println!("{}", table);
        }
        CategoryCommands::Rename { category, new_name } => {
            let existing = ctx.ledger.require_category(user.id, &category)?;
            let renamed = ctx.ledger.rename_category(user.id, existing.id, &new_name)?;
            if globals.json {
                return output::json(&renamed);
            }
            output::success(&format!("Renamed '{}' to '{}'", existing.name, renamed.name));
        }
        CategoryCommands::Remove { category, force } => {
            let existing = ctx.ledger.require_category(user.id, &category)?;
            if !confirm(&format!("Remove category '{}'?", existing.name), force, globals.json)? {
                println!("{}", "Cancelled".dimmed());
                return Ok(());
            }
            ctx.ledger.remove_category(user.id, existing.id)?;
            if globals.json {
                return output::json(&serde_json::json!({ "removed": existing.id }));
            }
            output::success(&format!("Removed category '{}'", existing.name));
        }
    }

    Ok(())
}
