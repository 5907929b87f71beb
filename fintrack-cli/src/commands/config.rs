//! Config command - show and change settings.json

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use fintrack_core::config::Config;

use super::{get_data_dir, Globals};
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective settings
    Show,
    /// Change settings; other keys in settings.json are kept
    Set {
        /// Months in the trend of a monthly report
        #[arg(long)]
        trend_months: u32,
    },
}

pub fn run(command: ConfigCommands, globals: &Globals) -> Result<()> {
    let data_dir = get_data_dir()?;
    let mut config = Config::load(&data_dir)?;

    match command {
        ConfigCommands::Show => {
            if globals.json {
                return output::json(&serde_json::json!({
                    "trendMonths": config.trend_months,
                    "databaseFilename": config.db_filename,
                    "settingsPath": Config::settings_path(&data_dir).to_string_lossy(),
                }));
            }
            let mut table = output::create_table();
            table.add_row(vec!["Trend months".to_string(), config.trend_months.to_string()]);
            table.add_row(vec!["Database".to_string(), config.db_filename.clone()]);
            println!("{}", table);
            println!(
                "{}",
                Config::settings_path(&data_dir).display().to_string().dimmed()
            );
        }
        ConfigCommands::Set { trend_months } => {
            config.set_trend_months(trend_months)?;
            config.save(&data_dir)?;
            if globals.json {
                return output::json(&serde_json::json!({ "trendMonths": config.trend_months }));
            }
            output::success(&format!("Trend length set to {} months", config.trend_months));
        }
    }

    Ok(())
}
