//! Aggregation engine - income, expense, per-category and per-budget totals
//!
//! `aggregate` is a pure function of a ledger snapshot and an interval;
//! `aggregate_for_user` reads that snapshot from a store first.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::domain::money;
use crate::domain::result::Result;
use crate::domain::{
    BudgetCategoryRef, BudgetStatus, BudgetSummary, Category, CategoryKind, CategoryTotal,
    DateInterval, PeriodReport, Transaction,
};
use crate::ports::{LedgerSnapshot, LedgerSource};

/// Read one consistent snapshot for `user_id` and aggregate it over `interval`
///
/// An unknown user yields an all-zero report. Store failures propagate.
pub fn aggregate_for_user(
    source: &dyn LedgerSource,
    user_id: Uuid,
    interval: &DateInterval,
) -> Result<PeriodReport> {
    let snapshot = source.snapshot(user_id, interval)?;
    Ok(aggregate(user_id, &snapshot, interval))
}

/// Compute the period report for `user_id` from `snapshot`
pub fn aggregate(user_id: Uuid, snapshot: &LedgerSnapshot, interval: &DateInterval) -> PeriodReport {
    let mut categories: Vec<&Category> = snapshot
        .categories
        .iter()
        .filter(|c| c.user_id == user_id)
        .collect();
    categories.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));

    if interval.is_empty() {
        debug!(%user_id, start = %interval.start, end = %interval.end_exclusive, "empty interval, reporting zeros");
        return PeriodReport {
            user_id,
            interval: *interval,
            total_income: money::zero(),
            total_expense: money::zero(),
            net_savings: money::zero(),
            category_totals: categories.iter().map(|c| zero_total(c)).collect(),
            budget_summaries: Vec::new(),
        };
    }

    let counted = countable_transactions(user_id, snapshot, interval);

    let mut by_category: HashMap<Uuid, Decimal> = HashMap::new();
    for tx in &counted {
        *by_category.entry(tx.category_id).or_insert(Decimal::ZERO) += tx.amount;
    }

    let (total_income, total_expense) = income_expense_totals(counted.iter().copied(), interval);

    let category_totals = categories
        .iter()
        .map(|c| CategoryTotal {
            category_id: c.id,
            name: c.name.clone(),
            kind: c.kind,
            total: money::normalize(by_category.get(&c.id).copied().unwrap_or(Decimal::ZERO)),
        })
        .collect();

    let mut budget_summaries: Vec<BudgetSummary> = snapshot
        .budgets
        .iter()
        .filter(|b| b.user_id == user_id)
        .filter(|b| interval.overlaps(b.start_date, b.end_date))
        .map(|budget| {
            let matched = categories.iter().find(|c| budget.category.matches(c)).copied();
            // Spend only counts expense activity, even if the category is income
            let spent = match matched {
                Some(c) if c.kind == CategoryKind::Expense => {
                    money::normalize(by_category.get(&c.id).copied().unwrap_or(Decimal::ZERO))
                }
                _ => money::zero(),
            };
            let remaining = money::normalize(budget.amount - spent);
            BudgetSummary {
                budget_id: budget.id,
                category: budget.category.clone(),
                category_label: budget_label(&budget.category, matched),
                category_id: matched.map(|c| c.id),
                amount: money::normalize(budget.amount),
                start_date: budget.start_date,
                end_date: budget.end_date,
                spent,
                remaining,
                status: BudgetStatus::from_remaining(remaining),
            }
        })
        .collect();
    budget_summaries.sort_by(|a, b| {
        a.category_label
            .cmp(&b.category_label)
            .then_with(|| a.start_date.cmp(&b.start_date))
    });

    debug!(
        %user_id,
        categories = categories.len(),
        transactions = counted.len(),
        budgets = budget_summaries.len(),
        "aggregated period"
    );

    PeriodReport {
        user_id,
        interval: *interval,
        total_income,
        total_expense,
        net_savings: money::normalize(total_income - total_expense),
        category_totals,
        budget_summaries,
    }
}

/// Sum income and expense amounts of the transactions dated inside `interval`
pub fn income_expense_totals<'a, I>(transactions: I, interval: &DateInterval) -> (Decimal, Decimal)
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut income = Decimal::ZERO;
    let mut expense = Decimal::ZERO;
    for tx in transactions {
        if !interval.contains(tx.occurred_on) {
            continue;
        }
        match tx.kind {
            CategoryKind::Income => income += tx.amount,
            CategoryKind::Expense => expense += tx.amount,
        }
    }
    (money::normalize(income), money::normalize(expense))
}

/// Transactions of `user_id` inside `interval` whose category belongs to the
/// same user and has the same kind
pub(crate) fn countable_transactions<'a>(
    user_id: Uuid,
    snapshot: &'a LedgerSnapshot,
    interval: &DateInterval,
) -> Vec<&'a Transaction> {
    let kinds: HashMap<Uuid, CategoryKind> = snapshot
        .categories
        .iter()
        .filter(|c| c.user_id == user_id)
        .map(|c| (c.id, c.kind))
        .collect();

    snapshot
        .transactions
        .iter()
        .filter(|tx| tx.user_id == user_id && interval.contains(tx.occurred_on))
        .filter(|tx| kinds.get(&tx.category_id) == Some(&tx.kind))
        .collect()
}

fn zero_total(category: &Category) -> CategoryTotal {
    CategoryTotal {
        category_id: category.id,
        name: category.name.clone(),
        kind: category.kind,
        total: money::zero(),
    }
}

fn budget_label(reference: &BudgetCategoryRef, matched: Option<&Category>) -> String {
    match (matched, reference) {
        (Some(category), _) => category.name.clone(),
        (None, BudgetCategoryRef::LegacyName(name)) => name.clone(),
        (None, BudgetCategoryRef::Id(_)) => "(deleted category)".to_string(),
    }
}
