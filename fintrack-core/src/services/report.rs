//! Report assembler - monthly report and expense breakdown payloads
//!
//! Composes period resolution, aggregation and the trend builder. Invalid
//! selections become warnings on a successful payload; store failures are
//! returned as errors.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::period::resolve_month;
use crate::domain::{
    money, BreakdownPayload, Category, CategoryKind, CategoryOption, CategoryTotal, DateInterval,
    PeriodInfo, ReportPayload, ReportWarning,
};
use crate::ports::LedgerSource;
use crate::services::aggregation::aggregate;
use crate::services::logging::{LogEvent, LoggingService};
use crate::services::trend::{trend_from_snapshot, trend_range, DEFAULT_TREND_MONTHS};

/// Assembles report payloads for presentation layers
pub struct ReportService {
    source: Arc<dyn LedgerSource>,
    trend_months: u32,
    logger: Option<Arc<LoggingService>>,
}

impl ReportService {
    pub fn new(source: Arc<dyn LedgerSource>) -> Self {
        Self {
            source,
            trend_months: DEFAULT_TREND_MONTHS,
            logger: None,
        }
    }

    pub fn with_trend_months(mut self, months: u32) -> Self {
        self.trend_months = months;
        self
    }

    /// Record a `report_assembled` event for every payload built
    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn trend_months(&self) -> u32 {
        self.trend_months
    }

    /// Monthly report for the selected month, defaulting to the current one
    pub fn monthly_report(&self, user_id: Uuid, year: Option<i32>, month: Option<u32>) -> Result<ReportPayload> {
        self.monthly_report_on(user_id, year, month, today())
    }

    /// Monthly report with an explicit current date
    pub fn monthly_report_on(
        &self,
        user_id: Uuid,
        year: Option<i32>,
        month: Option<u32>,
        today: NaiveDate,
    ) -> Result<ReportPayload> {
        let resolution = resolve_month(year, month, today);
        let mut warnings = Vec::new();
        if let Some(warning) = resolution.warning {
            warn!(%warning, "period selection fell back to the current month");
            warnings.push(warning);
        }
        let interval = resolution.interval;

        // One read for both the summary and the trend so they agree on the
        // selected month even under concurrent writes.
        let range = match trend_range(interval.start, self.trend_months)? {
            Some(trend) => DateInterval::new(
                interval.start.min(trend.start),
                interval.end_exclusive.max(trend.end_exclusive),
            ),
            None => interval,
        };
        let snapshot = self
            .source
            .snapshot(user_id, &range)
            .context("Failed to read ledger for monthly report")?;
        let summary = aggregate(user_id, &snapshot, &interval);
        let trend = trend_from_snapshot(user_id, &snapshot, interval.start, self.trend_months)
            .context("Failed to build trend")?;

        debug!(
            %user_id,
            start = %interval.start,
            categories = summary.category_totals.len(),
            budgets = summary.budget_summaries.len(),
            months = trend.len(),
            "assembled monthly report"
        );
        self.log_assembled("monthly", &warnings);

        Ok(ReportPayload {
            user_id,
            period: PeriodInfo::new(resolution.year, resolution.month, interval),
            summary,
            trend,
            warnings,
        })
    }

    /// Expense breakdown, optionally narrowed to one category (id or name)
    pub fn expense_breakdown(
        &self,
        user_id: Uuid,
        year: Option<i32>,
        month: Option<u32>,
        category_filter: Option<&str>,
    ) -> Result<BreakdownPayload> {
        self.expense_breakdown_on(user_id, year, month, category_filter, today())
    }

    /// Expense breakdown with an explicit current date
    pub fn expense_breakdown_on(
        &self,
        user_id: Uuid,
        year: Option<i32>,
        month: Option<u32>,
        category_filter: Option<&str>,
        today: NaiveDate,
    ) -> Result<BreakdownPayload> {
        let resolution = resolve_month(year, month, today);
        let mut warnings = Vec::new();
        if let Some(warning) = resolution.warning {
            warn!(%warning, "period selection fell back to the current month");
            warnings.push(warning);
        }
        let interval = resolution.interval;

        let snapshot = self
            .source
            .snapshot(user_id, &interval)
            .context("Failed to read ledger for expense breakdown")?;
        let report = aggregate(user_id, &snapshot, &interval);

        let mut expense_categories: Vec<&Category> = snapshot
            .categories
            .iter()
            .filter(|c| c.user_id == user_id && c.kind == CategoryKind::Expense)
            .collect();
        expense_categories.sort_by(|a, b| a.name.cmp(&b.name));

        let filter = match category_filter.map(str::trim).filter(|f| !f.is_empty()) {
            None => None,
            Some(raw) => match match_filter(raw, &expense_categories) {
                Some(id) => Some(id),
                None => {
                    let warning = ReportWarning::InvalidCategoryFilter {
                        filter: raw.to_string(),
                    };
                    warn!(%warning, "ignoring category filter");
                    warnings.push(warning);
                    None
                }
            },
        };

        let mut category_totals: Vec<CategoryTotal> = report
            .category_totals
            .into_iter()
            .filter(|t| t.kind == CategoryKind::Expense)
            .filter(|t| filter.map_or(true, |id| t.category_id == id))
            .collect();
        category_totals.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
        let grand_total = money::sum(category_totals.iter().map(|t| t.total));

        self.log_assembled("breakdown", &warnings);

        Ok(BreakdownPayload {
            user_id,
            period: PeriodInfo::new(resolution.year, resolution.month, interval),
            filter,
            category_totals,
            grand_total,
            available_categories: expense_categories
                .iter()
                .map(|c| CategoryOption {
                    id: c.id,
                    name: c.name.clone(),
                })
                .collect(),
            warnings,
        })
    }

    fn log_assembled(&self, kind: &str, warnings: &[ReportWarning]) {
        let Some(logger) = &self.logger else {
            return;
        };
        let event = LogEvent::new("report_assembled")
            .with_report_kind(kind)
            .with_warnings(warnings.iter().map(ReportWarning::code));
        if let Err(e) = logger.log(event) {
            warn!(error = %e, "failed to record report event");
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Match a raw filter against the user's expense categories by id, then by name
fn match_filter(raw: &str, categories: &[&Category]) -> Option<Uuid> {
    if let Ok(id) = Uuid::parse_str(raw) {
        return categories.iter().find(|c| c.id == id).map(|c| c.id);
    }
    let name = Category::normalize_name(raw);
    categories
        .iter()
        .find(|c| c.name == name)
        .or_else(|| categories.iter().find(|c| c.name.eq_ignore_ascii_case(&name)))
        .map(|c| c.id)
}
