//! Report command - monthly report and expense breakdown

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use fintrack_core::domain::period::month_display_label;
use fintrack_core::domain::{BreakdownPayload, ReportPayload};
use fintrack_core::BudgetStatus;

use super::{acting_user, get_context, Globals};
use crate::output;

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Income, expenses, budgets and trend for one month
    Monthly {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Expense totals per category for one month
    Breakdown {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
        /// Narrow to one expense category (id or name)
        #[arg(long, short)]
        category: Option<String>,
    },
}

pub fn run(command: ReportCommands, globals: &Globals) -> Result<()> {
    let ctx = get_context(globals)?;
    let user = acting_user(&ctx, globals)?;

    match command {
        ReportCommands::Monthly { year, month } => {
            let payload = ctx.reports.monthly_report(user.id, year, month)?;
            if globals.json {
                return output::json(&payload);
            }
            print_monthly(&payload);
        }
        ReportCommands::Breakdown {
            year,
            month,
            category,
        } => {
            let payload = ctx
                .reports
                .expense_breakdown(user.id, year, month, category.as_deref())?;
            if globals.json {
                return output::json(&payload);
            }
            print_breakdown(&payload);
        }
    }

    Ok(())
}

fn print_monthly(payload: &ReportPayload) {
    output::warnings(&payload.warnings);
    let summary = &payload.summary;

    println!(
        "{}",
        format!("Report for {}", month_display_label(payload.period.start)).bold()
    );
    println!();

    let mut totals = output::create_table();
    totals.add_row(vec!["Income".into(), output::amount_cell(summary.total_income)]);
    totals.add_row(vec!["Expenses".into(), output::amount_cell(summary.total_expense)]);
    totals.add_row(vec!["Net savings".into(), output::signed_amount_cell(summary.net_savings)]);
    println!("{}", totals);

    if !summary.category_totals.is_empty() {
        println!();
        println!("{}", "Categories".bold());
        let mut table = output::create_table();
        table.set_header(vec!["Category", "Kind", "Total"]);
        for c in &summary.category_totals {
            table.add_row(vec![
                c.name.clone().into(),
                c.kind.to_string().into(),
                output::amount_cell(c.total),
            ]);
        }
        println!("{}", table);
    }

    if !summary.budget_summaries.is_empty() {
        println!();
        println!("{}", "Budgets".bold());
        let mut table = output::create_table();
        table.set_header(vec!["Category", "Budget", "Spent", "Remaining", "Status"]);
        for b in &summary.budget_summaries {
            let status = match b.status {
                BudgetStatus::Under => b.status.as_str().green().to_string(),
                BudgetStatus::Over => b.status.as_str().red().to_string(),
            };
            table.add_row(vec![
                b.category_label.clone().into(),
                output::amount_cell(b.amount),
                output::amount_cell(b.spent),
                output::signed_amount_cell(b.remaining),
                status.into(),
            ]);
        }
        println!("{}", table);
    }

    if !payload.trend.is_empty() {
        println!();
        println!("{}", "Trend".bold());
        let mut table = output::create_table();
        table.set_header(vec!["Month", "Income", "Expenses", "Net"]);
        for m in &payload.trend {
            table.add_row(vec![
                m.display_label.clone().into(),
                output::amount_cell(m.income),
                output::amount_cell(m.expense),
                output::signed_amount_cell(m.net),
            ]);
        }
        println!("{}", table);
    }
}

fn print_breakdown(payload: &BreakdownPayload) {
    output::warnings(&payload.warnings);

    println!(
        "{}",
        format!("Expenses for {}", month_display_label(payload.period.start)).bold()
    );
    println!();

    let mut table = output::create_table();
    table.set_header(vec!["Category", "Total"]);
    for c in &payload.category_totals {
        table.add_row(vec![c.name.clone().into(), output::amount_cell(c.total)]);
    }
    table.add_row(vec!["Total".bold().to_string().into(), output::amount_cell(payload.grand_total)]);
    println!("{}", table);

    if payload.filter.is_none() && payload.available_categories.len() > 1 {
        output::info("Narrow with --category <name>");
    }
}
