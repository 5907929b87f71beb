//! Trend series builder - monthly income/expense/net ending at a reference month

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::domain::money;
use crate::domain::period::{self, DateInterval};
use crate::domain::result::{Error, Result};
use crate::domain::MonthlyAggregate;
use crate::ports::{LedgerSnapshot, LedgerSource};

use super::aggregation::{countable_transactions, income_expense_totals};

/// Trailing window used when no length is configured
pub const DEFAULT_TREND_MONTHS: u32 = 12;

/// Build `n_months` consecutive monthly aggregates ending at the month of
/// `reference`, oldest first
///
/// The whole range is read as one snapshot, so every month sees the same
/// store state.
pub fn build_trend(
    source: &dyn LedgerSource,
    user_id: Uuid,
    reference: NaiveDate,
    n_months: u32,
) -> Result<Vec<MonthlyAggregate>> {
    let Some(range) = trend_range(reference, n_months)? else {
        return Ok(Vec::new());
    };
    let snapshot = source.snapshot(user_id, &range)?;
    trend_from_snapshot(user_id, &snapshot, reference, n_months)
}

/// Dates covered by a trend of `n_months` ending at the month of `reference`
///
/// `None` for a zero-length trend.
pub fn trend_range(reference: NaiveDate, n_months: u32) -> Result<Option<DateInterval>> {
    let months = checked_month_starts(reference, n_months)?;
    let (Some(&oldest), Some(&newest)) = (months.first(), months.last()) else {
        return Ok(None);
    };
    Ok(Some(DateInterval::new(oldest, next_month(newest)?)))
}

/// Trend computed from an already-read snapshot
///
/// The snapshot must cover `trend_range(reference, n_months)`; transactions
/// outside it are ignored.
pub fn trend_from_snapshot(
    user_id: Uuid,
    snapshot: &LedgerSnapshot,
    reference: NaiveDate,
    n_months: u32,
) -> Result<Vec<MonthlyAggregate>> {
    let months = checked_month_starts(reference, n_months)?;
    if let (Some(oldest), Some(newest)) = (months.first(), months.last()) {
        debug!(%user_id, %oldest, %newest, "building trend");
    }

    months
        .into_iter()
        .map(|start| {
            let interval = DateInterval::new(start, next_month(start)?);
            Ok(monthly_aggregate(user_id, snapshot, &interval))
        })
        .collect()
}

/// Income/expense/net for one calendar month of `snapshot`
pub fn monthly_aggregate(
    user_id: Uuid,
    snapshot: &LedgerSnapshot,
    month: &DateInterval,
) -> MonthlyAggregate {
    let counted = countable_transactions(user_id, snapshot, month);
    let (income, expense) = income_expense_totals(counted, month);
    MonthlyAggregate {
        month_start: month.start,
        label: period::month_label(month.start),
        display_label: period::month_display_label(month.start),
        income,
        expense,
        net: money::normalize(income - expense),
    }
}

/// Month starts from `n - 1` months before `reference` up to `reference`'s month, ascending
///
/// Walks backward one calendar month at a time, then reverses.
fn month_starts(reference: NaiveDate, n: u32) -> Option<Vec<NaiveDate>> {
    let reference = period::month_start(reference);
    let mut months = Vec::with_capacity(n as usize);
    for i in 0..n {
        let back = i32::try_from(i).ok()?;
        months.push(period::add_months(reference, -back)?);
    }
    months.reverse();
    Some(months)
}

fn checked_month_starts(reference: NaiveDate, n: u32) -> Result<Vec<NaiveDate>> {
    month_starts(reference, n).ok_or_else(|| {
        Error::validation(format!(
            "trend of {} months ending {} is outside the supported date range",
            n, reference
        ))
    })
}

fn next_month(start: NaiveDate) -> Result<NaiveDate> {
    period::add_months(start, 1)
        .ok_or_else(|| Error::validation(format!("no month follows {}", start)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryLedger, UnavailableLedger};
    use crate::domain::{Category, CategoryKind, Transaction, User};
    use crate::ports::LedgerStore;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_twelve_months_ending_march() {
        let store = InMemoryLedger::new();
        let trend = build_trend(&store, Uuid::new_v4(), date(2025, 3, 1), 12).unwrap();

        let labels: Vec<_> = trend.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "2024-04", "2024-05", "2024-06", "2024-07", "2024-08", "2024-09", "2024-10",
                "2024-11", "2024-12", "2025-01", "2025-02", "2025-03"
            ]
        );
        assert_eq!(trend[0].display_label, "Apr 2024");
        assert!(trend.iter().all(|m| m.net.to_string() == "0.00"));
    }

    #[test]
    fn test_reference_is_normalized_to_month_start() {
        let store = InMemoryLedger::new();
        let trend = build_trend(&store, Uuid::new_v4(), date(2025, 3, 31), 2).unwrap();
        assert_eq!(trend[0].month_start, date(2025, 2, 1));
        assert_eq!(trend[1].month_start, date(2025, 3, 1));
    }

    #[test]
    fn test_zero_months_is_empty() {
        let store = InMemoryLedger::new();
        assert!(build_trend(&store, Uuid::new_v4(), date(2025, 3, 1), 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_long_walk_has_no_duplicate_or_skipped_months() {
        let starts = month_starts(date(2025, 3, 31), 36).unwrap();
        assert_eq!(starts.len(), 36);
        for pair in starts.windows(2) {
            assert_eq!(period::add_months(pair[0], 1), Some(pair[1]));
        }
    }

    #[test]
    fn test_trend_range_covers_all_months() {
        let range = trend_range(date(2025, 3, 20), 3).unwrap().unwrap();
        assert_eq!(range, DateInterval::new(date(2025, 1, 1), date(2025, 4, 1)));
        assert!(trend_range(date(2025, 3, 20), 0).unwrap().is_none());
    }

    #[test]
    fn test_unreadable_source_is_an_error() {
        let store = UnavailableLedger;
        let err = build_trend(&store, Uuid::new_v4(), date(2025, 3, 1), 12).unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_monthly_values() {
        let store = InMemoryLedger::new();
        let user = User::new("alice");
        store.add_user(&user).unwrap();
        let salary = Category::new(user.id, "Salary", CategoryKind::Income);
        let rent = Category::new(user.id, "Rent", CategoryKind::Expense);
        store.add_category(&salary).unwrap();
        store.add_category(&rent).unwrap();

        store
            .add_transaction(&Transaction::new(&salary, Decimal::new(300000, 2), date(2025, 2, 1)))
            .unwrap();
        store
            .add_transaction(&Transaction::new(&rent, Decimal::new(120000, 2), date(2025, 2, 28)))
            .unwrap();
        store
            .add_transaction(&Transaction::new(&rent, Decimal::new(120000, 2), date(2025, 3, 1)))
            .unwrap();
        // Older than the window
        store
            .add_transaction(&Transaction::new(&rent, Decimal::new(999, 2), date(2024, 12, 31)))
            .unwrap();

        let trend = build_trend(&store, user.id, date(2025, 3, 1), 3).unwrap();
        assert_eq!(trend.len(), 3);
        assert_eq!(trend[0].label, "2025-01");
        assert_eq!(trend[0].expense.to_string(), "0.00");
        assert_eq!(trend[1].income.to_string(), "3000.00");
        assert_eq!(trend[1].net.to_string(), "1800.00");
        assert_eq!(trend[2].net.to_string(), "-1200.00");
    }
}
