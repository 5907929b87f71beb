//! Calendar periods
//!
//! Every aggregation window is a half-open interval `[start, end_exclusive)`.
//! Month arithmetic goes through `chrono::Months`, never a fixed day count.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::report::ReportWarning;

/// Half-open date range `[start, end_exclusive)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end_exclusive: NaiveDate,
}

impl DateInterval {
    pub fn new(start: NaiveDate, end_exclusive: NaiveDate) -> Self {
        Self { start, end_exclusive }
    }

    /// True when the interval contains no days (including inverted bounds)
    pub fn is_empty(&self) -> bool {
        self.start >= self.end_exclusive
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end_exclusive
    }

    /// True when `[start, end)` (open-ended if `end` is `None`) shares a day with this interval
    pub fn overlaps(&self, start: NaiveDate, end: Option<NaiveDate>) -> bool {
        if self.is_empty() {
            return false;
        }
        start < self.end_exclusive && end.map_or(true, |end| end > self.start)
    }

    /// Split at `mid` into `[start, mid)` and `[mid, end_exclusive)`
    pub fn split_at(&self, mid: NaiveDate) -> (DateInterval, DateInterval) {
        (
            DateInterval::new(self.start, mid),
            DateInterval::new(mid, self.end_exclusive),
        )
    }
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Shift `date` by `n` calendar months; `None` past chrono's range
///
/// Day-of-month is clamped to the target month's length (Jan 31 + 1 = Feb 28/29).
pub fn add_months(date: NaiveDate, n: i32) -> Option<NaiveDate> {
    let months = Months::new(n.unsigned_abs());
    if n >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    }
}

/// `[first of (year, month), first of the following month)`, or `None` for
/// a month that cannot form a valid date
pub fn month_interval(year: i32, month: u32) -> Option<DateInterval> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end_exclusive = add_months(start, 1)?;
    Some(DateInterval::new(start, end_exclusive))
}

/// Month label used by trend series ("2025-03")
pub fn month_label(month_start: NaiveDate) -> String {
    month_start.format("%Y-%m").to_string()
}

/// Human label for chart axes ("Mar 2025")
pub fn month_display_label(month_start: NaiveDate) -> String {
    month_start.format("%b %Y").to_string()
}

/// Outcome of resolving a (year, month) selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodResolution {
    pub year: i32,
    pub month: u32,
    pub interval: DateInterval,
    /// Set when the requested selection was invalid and `today`'s month was used
    pub warning: Option<ReportWarning>,
}

/// Resolve an optional (year, month) selection to a month interval
///
/// Missing components default to `today`'s. A selection that cannot form a
/// valid month falls back to the month containing `today` and carries an
/// [`ReportWarning::InvalidPeriod`] instead of failing.
pub fn resolve_month(year: Option<i32>, month: Option<u32>, today: NaiveDate) -> PeriodResolution {
    let requested_year = year.unwrap_or_else(|| today.year());
    let requested_month = month.unwrap_or_else(|| today.month());

    if let Some(interval) = month_interval(requested_year, requested_month) {
        return PeriodResolution {
            year: requested_year,
            month: requested_month,
            interval,
            warning: None,
        };
    }

    let start = month_start(today);
    // A real date always has a following month except at chrono's upper bound
    let end_exclusive = add_months(start, 1).unwrap_or(NaiveDate::MAX);
    PeriodResolution {
        year: today.year(),
        month: today.month(),
        interval: DateInterval::new(start, end_exclusive),
        warning: Some(ReportWarning::InvalidPeriod {
            year: requested_year,
            month: requested_month,
        }),
    }
}
