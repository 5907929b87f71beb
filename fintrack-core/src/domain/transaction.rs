//! Transaction domain model

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::{Category, CategoryKind};
use super::money;

/// A single dated movement of money under one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    /// Always equal to the category's kind
    pub kind: CategoryKind,
    /// Non-negative, two fractional digits
    pub amount: Decimal,
    pub occurred_on: NaiveDate,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a transaction filed under `category`, inheriting its owner and kind
    pub fn new(category: &Category, amount: Decimal, occurred_on: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: category.user_id,
            category_id: category.id,
            kind: category.kind,
            amount: money::normalize(amount),
            occurred_on,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        let trimmed = description.trim();
        self.description = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// Check the transaction against the category it claims to belong to
    pub fn validate(&self, category: &Category) -> Result<(), String> {
        if self.amount <= Decimal::ZERO {
            return Err("amount must be positive".to_string());
        }
        if self.amount.scale() > money::SCALE {
            return Err(format!("amount has more than {} decimal places", money::SCALE));
        }
        if category.id != self.category_id || category.user_id != self.user_id {
            return Err("category does not belong to this user".to_string());
        }
        if category.kind != self.kind {
            return Err(format!(
                "transaction kind '{}' does not match category '{}' ({})",
                self.kind, category.name, category.kind
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groceries() -> Category {
        Category::new(Uuid::new_v4(), "Groceries", CategoryKind::Expense)
    }

    #[test]
    fn test_new_inherits_category() {
        let category = groceries();
        let tx = Transaction::new(
            &category,
            Decimal::new(15000, 2),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        );
        assert_eq!(tx.user_id, category.user_id);
        assert_eq!(tx.kind, CategoryKind::Expense);
        assert_eq!(tx.amount.to_string(), "150.00");
        assert!(tx.validate(&category).is_ok());
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        let category = groceries();
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let tx = Transaction::new(&category, Decimal::ZERO, date);
        assert!(tx.validate(&category).is_err());
    }

    #[test]
    fn test_rejects_kind_mismatch() {
        let category = groceries();
        let mut tx = Transaction::new(
            &category,
            Decimal::new(100, 2),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        );
        tx.kind = CategoryKind::Income;
        let err = tx.validate(&category).unwrap_err();
        assert!(err.contains("does not match"));
    }

    #[test]
    fn test_rejects_foreign_category() {
        let category = groceries();
        let other = groceries();
        let tx = Transaction::new(
            &category,
            Decimal::new(100, 2),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        );
        assert!(tx.validate(&other).is_err());
    }

    #[test]
    fn test_blank_description_is_dropped() {
        let tx = Transaction::new(
            &groceries(),
            Decimal::new(100, 2),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        )
        .with_description("   ");
        assert!(tx.description.is_none());
    }
}
