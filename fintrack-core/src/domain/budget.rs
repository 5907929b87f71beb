//! Budget domain model

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::Category;
use super::money;

/// How a budget points at its category
///
/// Budgets written by the name-referencing schema revision keep their
/// `LegacyName` reference; they match by the category's *current* name and
/// stop matching when the category is renamed. Everything created since
/// references the category id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum BudgetCategoryRef {
    Id(Uuid),
    LegacyName(String),
}

impl BudgetCategoryRef {
    pub fn matches(&self, category: &Category) -> bool {
        match self {
            BudgetCategoryRef::Id(id) => *id == category.id,
            BudgetCategoryRef::LegacyName(name) => *name == category.name,
        }
    }
}

impl fmt::Display for BudgetCategoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetCategoryRef::Id(id) => write!(f, "category {}", id),
            BudgetCategoryRef::LegacyName(name) => write!(f, "category \"{}\"", name),
        }
    }
}

/// A spending ceiling for one category, optionally time-bounded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: BudgetCategoryRef,
    pub amount: Decimal,
    pub start_date: NaiveDate,
    /// Exclusive; `None` means open-ended
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Budget {
    /// Create a budget referencing `category` by id
    pub fn new(category: &Category, amount: Decimal, start_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: category.user_id,
            category: BudgetCategoryRef::Id(category.id),
            amount: money::normalize(amount),
            start_date,
            end_date: None,
            created_at: Utc::now(),
        }
    }

    /// Create a budget in the legacy by-name form
    pub fn legacy(
        user_id: Uuid,
        category_name: impl Into<String>,
        amount: Decimal,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            category: BudgetCategoryRef::LegacyName(Category::normalize_name(&category_name.into())),
            amount: money::normalize(amount),
            start_date,
            end_date: None,
            created_at: Utc::now(),
        }
    }

    pub fn ending(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.amount <= Decimal::ZERO {
            return Err("budget amount must be positive".to_string());
        }
        if let Some(end) = self.end_date {
            if end <= self.start_date {
                return Err(format!(
                    "budget end date {} must be after start date {}",
                    end, self.start_date
                ));
            }
        }
        if let BudgetCategoryRef::LegacyName(name) = &self.category {
            if name.is_empty() {
                return Err("budget category name cannot be empty".to_string());
            }
        }
        Ok(())
    }

    /// Natural key: one budget per (user, category reference, start date)
    pub fn natural_key(&self) -> (Uuid, &BudgetCategoryRef, NaiveDate) {
        (self.user_id, &self.category, self.start_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CategoryKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_id_reference_survives_rename() {
        let mut category = Category::new(Uuid::new_v4(), "Groceries", CategoryKind::Expense);
        let budget = Budget::new(&category, Decimal::new(50000, 2), date(2025, 1, 1));
        category.name = "Food".to_string();
        assert!(budget.category.matches(&category));
    }

    #[test]
    fn test_legacy_reference_orphaned_by_rename() {
        let mut category = Category::new(Uuid::new_v4(), "Groceries", CategoryKind::Expense);
        let budget = Budget::legacy(category.user_id, "Groceries", Decimal::new(50000, 2), date(2025, 1, 1));
        assert!(budget.category.matches(&category));
        category.name = "Food".to_string();
        assert!(!budget.category.matches(&category));
    }

    #[test]
    fn test_validation() {
        let category = Category::new(Uuid::new_v4(), "Rent", CategoryKind::Expense);
        assert!(Budget::new(&category, Decimal::ZERO, date(2025, 1, 1)).validate().is_err());
        let backwards = Budget::new(&category, Decimal::ONE, date(2025, 2, 1)).ending(date(2025, 1, 1));
        assert!(backwards.validate().is_err());
        assert!(Budget::new(&category, Decimal::ONE, date(2025, 2, 1)).validate().is_ok());
    }
}
