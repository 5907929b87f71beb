//! User command - add, list and remove users

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::{confirm, get_context, Globals};
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a user
    Add { username: String },
    /// List users
    List,
    /// Remove a user with all their categories, transactions and budgets
    Remove {
        username: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub fn run(command: UserCommands, globals: &Globals) -> Result<()> {
    let ctx = get_context(globals)?;

    match command {
        UserCommands::Add { username } => {
            let user = ctx.ledger.add_user(&username)?;
            if globals.json {
                return output::json(&user);
            }
            output::success(&format!("Added user '{}'", user.username));
        }
        UserCommands::List => {
            let users = ctx.ledger.list_users()?;
            if globals.json {
                return output::json(&users);
            }
            if users.is_empty() {
                println!("No users. Add one with `ft user add <name>`.");
                return Ok(());
            }
            let mut table = output::create_table();
            table.set_header(vec!["Username", "ID", "Created"]);
            for user in users {
                table.add_row(vec![
                    user.username,
                    user.id.to_string(),
                    user.created_at.format("%Y-%m-%d").to_string(),
                ]);
            }
            println!("{}", table);
        }
        UserCommands::Remove { username, force } => {
            let user = ctx.ledger.require_user(&username)?;
            if !force && !globals.json {
                println!(
                    "\n{}",
                    format!("This will delete '{}' and all of their data.", user.username).yellow()
                );
            }
            if !confirm("Are you sure?", force, globals.json)? {
                println!("{}", "Cancelled".dimmed());
                return Ok(());
            }
            ctx.ledger.remove_user(&user.username)?;
            if globals.json {
                return output::json(&serde_json::json!({ "removed": user.id }));
            }
            output::success(&format!("Removed user '{}'", user.username));
        }
    }

    Ok(())
}
