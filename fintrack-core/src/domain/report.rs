//! Report shapes produced by the aggregation engine and report assembler
//!
//! Plain data: nothing here knows how it will be rendered. Amounts serialize
//! as decimal strings ("150.00").

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::budget::BudgetCategoryRef;
use super::category::CategoryKind;
use super::period::DateInterval;

/// Recoverable conditions surfaced alongside a successful report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportWarning {
    /// The requested (year, month) was not a calendar month; the current month was used
    InvalidPeriod { year: i32, month: u32 },
    /// The category filter named no expense category of the user; the filter was ignored
    InvalidCategoryFilter { filter: String },
}

impl ReportWarning {
    /// Short machine name, used as the event log's warning field
    pub fn code(&self) -> &'static str {
        match self {
            ReportWarning::InvalidPeriod { .. } => "invalid_period",
            ReportWarning::InvalidCategoryFilter { .. } => "invalid_category_filter",
        }
    }
}

impl fmt::Display for ReportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportWarning::InvalidPeriod { year, month } => write!(
                f,
                "Invalid period {}-{:02}; showing the current month instead",
                year, month
            ),
            ReportWarning::InvalidCategoryFilter { filter } => write!(
                f,
                "Unknown category filter '{}'; showing all expense categories",
                filter
            ),
        }
    }
}

/// Total for one category over an interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category_id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Under,
    Over,
}

impl BudgetStatus {
    /// `Under` when `remaining >= 0`; exactly spent counts as under
    pub fn from_remaining(remaining: Decimal) -> Self {
        if remaining >= Decimal::ZERO {
            BudgetStatus::Under
        } else {
            BudgetStatus::Over
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::Under => "under",
            BudgetStatus::Over => "over",
        }
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spend against one budget for the report period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub budget_id: Uuid,
    pub category: BudgetCategoryRef,
    /// Current category name, or the legacy name when the reference no longer resolves
    pub category_label: String,
    /// Category the reference resolved to, if any
    pub category_id: Option<Uuid>,
    pub amount: Decimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub spent: Decimal,
    /// `amount - spent`; negative when over budget
    pub remaining: Decimal,
    pub status: BudgetStatus,
}

/// Aggregates for one user over one interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodReport {
    pub user_id: Uuid,
    pub interval: DateInterval,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    /// `total_income - total_expense`
    pub net_savings: Decimal,
    pub category_totals: Vec<CategoryTotal>,
    pub budget_summaries: Vec<BudgetSummary>,
}

impl PeriodReport {
    pub fn category_total(&self, name: &str) -> Option<&CategoryTotal> {
        self.category_totals.iter().find(|c| c.name == name)
    }

    pub fn over_budget(&self) -> impl Iterator<Item = &BudgetSummary> {
        self.budget_summaries
            .iter()
            .filter(|b| b.status == BudgetStatus::Over)
    }
}

/// One point of a trend series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub month_start: NaiveDate,
    /// "2025-03"
    pub label: String,
    /// "Mar 2025"
    pub display_label: String,
    pub income: Decimal,
    pub expense: Decimal,
    pub net: Decimal,
}

/// The period a report was computed for, after resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodInfo {
    pub year: i32,
    pub month: u32,
    pub start: NaiveDate,
    pub end_exclusive: NaiveDate,
}

impl PeriodInfo {
    pub fn new(year: i32, month: u32, interval: DateInterval) -> Self {
        Self {
            year,
            month,
            start: interval.start,
            end_exclusive: interval.end_exclusive,
        }
    }

    pub fn interval(&self) -> DateInterval {
        DateInterval::new(self.start, self.end_exclusive)
    }
}

/// Monthly report: period summary plus trailing trend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPayload {
    pub user_id: Uuid,
    pub period: PeriodInfo,
    pub summary: PeriodReport,
    /// Oldest month first, ending at the report month
    pub trend: Vec<MonthlyAggregate>,
    pub warnings: Vec<ReportWarning>,
}

/// Expense breakdown for one period, optionally narrowed to one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownPayload {
    pub user_id: Uuid,
    pub period: PeriodInfo,
    /// The filter actually applied; `None` when absent or rejected
    pub filter: Option<Uuid>,
    /// Expense categories only, largest total first
    pub category_totals: Vec<CategoryTotal>,
    pub grand_total: Decimal,
    /// Every expense category of the user, by name
    pub available_categories: Vec<CategoryOption>,
    pub warnings: Vec<ReportWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOption {
    pub id: Uuid,
    pub name: String,
}
