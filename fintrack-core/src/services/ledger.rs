//! Ledger service - validated writes and lookups over a ledger store

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::money;
use crate::domain::result::Error;
use crate::domain::{
    Budget, BudgetCategoryRef, Category, CategoryKind, DateInterval, Transaction, User,
};
use crate::ports::LedgerStore;

/// Fields to change on a stored transaction; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct TransactionChanges {
    /// Must have the same kind as the transaction
    pub category_id: Option<Uuid>,
    pub amount: Option<Decimal>,
    pub occurred_on: Option<NaiveDate>,
    /// An empty or blank string clears the description
    pub description: Option<String>,
}

/// Fields to change on a stored budget; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct BudgetChanges {
    /// Re-points the budget at this expense category by id
    pub category_id: Option<Uuid>,
    pub amount: Option<Decimal>,
}

fn check_scale(amount: Decimal) -> Result<()> {
    if amount.scale() > money::SCALE {
        return Err(Error::validation(format!("amount {} has more than two decimal places", amount)).into());
    }
    Ok(())
}

/// Users, categories, transactions and budgets
///
/// Every rule from the domain model is checked here before the store sees
/// the write; the store then enforces uniqueness and references.
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    // === Users ===

    pub fn add_user(&self, username: &str) -> Result<User> {
        let user = User::new(username);
        user.validate().map_err(Error::validation)?;
        self.store.add_user(&user)?;
        Ok(user)
    }

    /// Look up a user by username, failing with `NotFound` when absent
    pub fn require_user(&self, username: &str) -> Result<User> {
        self.store
            .find_user_by_username(username)?
            .ok_or_else(|| Error::not_found(format!("user '{}'", User::normalize_username(username))).into())
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.store.list_users()?)
    }

    /// Remove a user with every category, transaction and budget they own
    pub fn remove_user(&self, username: &str) -> Result<()> {
        let user = self.require_user(username)?;
        self.store
            .delete_user(user.id)
            .with_context(|| format!("Failed to remove user '{}'", user.username))
    }

    // === Categories ===

    pub fn add_category(&self, user_id: Uuid, name: &str, kind: CategoryKind) -> Result<Category> {
        let category = Category::new(user_id, name, kind);
        category.validate().map_err(Error::validation)?;
        self.store.add_category(&category)?;
        Ok(category)
    }

    pub fn list_categories(&self, user_id: Uuid) -> Result<Vec<Category>> {
        Ok(self.store.categories_for_user(user_id)?)
    }

    /// Resolve a category by id or by (whitespace-normalized) name
    pub fn require_category(&self, user_id: Uuid, id_or_name: &str) -> Result<Category> {
        if let Ok(id) = Uuid::parse_str(id_or_name.trim()) {
            if let Some(category) = self.store.get_category(user_id, id)? {
                return Ok(category);
            }
        }
        let name = Category::normalize_name(id_or_name);
        self.store
            .categories_for_user(user_id)?
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::not_found(format!("category '{}'", name)).into())
    }

    /// Rename a category; budgets referencing it by id follow the rename
    pub fn rename_category(&self, user_id: Uuid, id: Uuid, new_name: &str) -> Result<Category> {
        let mut category = self
            .store
            .get_category(user_id, id)?
            .ok_or_else(|| Error::not_found(format!("category {}", id)))?;
        category.name = Category::normalize_name(new_name);
        category.validate().map_err(Error::validation)?;
        self.store.rename_category(user_id, id, &category.name)?;
        Ok(category)
    }

    pub fn remove_category(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        Ok(self.store.delete_category(user_id, id)?)
    }

    // === Transactions ===

    pub fn add_transaction(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        amount: Decimal,
        occurred_on: NaiveDate,
        description: Option<&str>,
    ) -> Result<Transaction> {
        let category = self.category(user_id, category_id)?;
        check_scale(amount)?;

        let mut tx = Transaction::new(&category, amount, occurred_on);
        if let Some(description) = description {
            tx = tx.with_description(description);
        }
        tx.validate(&category).map_err(Error::validation)?;
        self.store.add_transaction(&tx)?;
        Ok(tx)
    }

    /// Change any of a transaction's category, amount, date and description
    ///
    /// The category may only change to another of the same kind, so an
    /// expense stays an expense.
    pub fn edit_transaction(&self, user_id: Uuid, id: Uuid, changes: TransactionChanges) -> Result<Transaction> {
        let mut tx = self
            .store
            .get_transaction(user_id, id)?
            .ok_or_else(|| Error::not_found(format!("transaction {}", id)))?;

        let category = self.category(user_id, changes.category_id.unwrap_or(tx.category_id))?;
        if category.kind != tx.kind {
            return Err(Error::validation(format!(
                "a {} transaction cannot move to '{}' ({})",
                tx.kind, category.name, category.kind
            ))
            .into());
        }
        tx.category_id = category.id;
        if let Some(amount) = changes.amount {
            check_scale(amount)?;
            tx.amount = money::normalize(amount);
        }
        if let Some(occurred_on) = changes.occurred_on {
            tx.occurred_on = occurred_on;
        }
        if let Some(description) = changes.description {
            tx = tx.with_description(description);
        }

        tx.validate(&category).map_err(Error::validation)?;
        self.store
            .update_transaction(&tx)
            .with_context(|| format!("Failed to update transaction {}", id))?;
        Ok(tx)
    }

    /// A user's transactions, newest first, optionally limited to an interval and a kind
    pub fn list_transactions(
        &self,
        user_id: Uuid,
        interval: Option<&DateInterval>,
        kind: Option<CategoryKind>,
    ) -> Result<Vec<Transaction>> {
        let mut txs = match interval {
            Some(interval) => {
                let mut txs = self.store.transactions_in_range(user_id, interval, None)?;
                txs.reverse();
                txs
            }
            None => self.store.list_transactions(user_id)?,
        };
        if let Some(kind) = kind {
            txs.retain(|t| t.kind == kind);
        }
        Ok(txs)
    }

    pub fn remove_transaction(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        Ok(self.store.delete_transaction(user_id, id)?)
    }

    // === Budgets ===

    /// Create a budget referencing the category by id
    pub fn set_budget(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        amount: Decimal,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<Budget> {
        let category = self.expense_category(user_id, category_id)?;
        check_scale(amount)?;

        let mut budget = Budget::new(&category, amount, start_date);
        if let Some(end) = end_date {
            budget = budget.ending(end);
        }
        budget.validate().map_err(Error::validation)?;
        self.store.add_budget(&budget)?;
        Ok(budget)
    }

    pub fn list_budgets(&self, user_id: Uuid) -> Result<Vec<Budget>> {
        Ok(self.store.budgets_for_user(user_id)?)
    }

    /// Change a budget's category or amount
    ///
    /// Moving a budget to a category always references it by id, which also
    /// upgrades a legacy by-name budget.
    pub fn edit_budget(&self, user_id: Uuid, id: Uuid, changes: BudgetChanges) -> Result<Budget> {
        let mut budget = self
            .store
            .get_budget(user_id, id)?
            .ok_or_else(|| Error::not_found(format!("budget {}", id)))?;

        if let Some(category_id) = changes.category_id {
            let category = self.expense_category(user_id, category_id)?;
            budget.category = BudgetCategoryRef::Id(category.id);
        }
        if let Some(amount) = changes.amount {
            check_scale(amount)?;
            budget.amount = money::normalize(amount);
        }

        budget.validate().map_err(Error::validation)?;
        self.store.update_budget(&budget)?;
        Ok(budget)
    }

    pub fn remove_budget(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        Ok(self.store.delete_budget(user_id, id)?)
    }

    fn category(&self, user_id: Uuid, id: Uuid) -> Result<Category> {
        Ok(self
            .store
            .get_category(user_id, id)?
            .ok_or_else(|| Error::not_found(format!("category {}", id)))?)
    }

    fn expense_category(&self, user_id: Uuid, id: Uuid) -> Result<Category> {
        let category = self.category(user_id, id)?;
        if category.kind != CategoryKind::Expense {
            return Err(Error::validation(format!(
                "budgets apply to expense categories; '{}' is {}",
                category.name, category.kind
            ))
            .into());
        }
        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryLedger;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service() -> LedgerService {
        LedgerService::new(Arc::new(InMemoryLedger::new()))
    }

    fn is_validation(err: &anyhow::Error) -> bool {
        err.downcast_ref::<Error>().map_or(false, Error::is_validation)
    }

    fn is_not_found(err: &anyhow::Error) -> bool {
        err.downcast_ref::<Error>().map_or(false, Error::is_not_found)
    }

    #[test]
    fn test_user_lifecycle() {
        let ledger = service();
        let user = ledger.add_user("Alice").unwrap();
        assert_eq!(ledger.require_user("ALICE").unwrap().id, user.id);
        assert!(is_validation(&ledger.add_user("alice").unwrap_err()));
        assert!(is_validation(&ledger.add_user("  ").unwrap_err()));

        ledger.remove_user("alice").unwrap();
        assert!(is_not_found(&ledger.require_user("alice").unwrap_err()));
    }

    #[test]
    fn test_transaction_rules() {
        let ledger = service();
        let user = ledger.add_user("alice").unwrap();
        let groceries = ledger
            .add_category(user.id, "Groceries", CategoryKind::Expense)
            .unwrap();

        let tx = ledger
            .add_transaction(user.id, groceries.id, Decimal::new(150, 0), date(2025, 3, 10), Some(" shop "))
            .unwrap();
        assert_eq!(tx.amount.to_string(), "150.00");
        assert_eq!(tx.kind, CategoryKind::Expense);
        assert_eq!(tx.description.as_deref(), Some("shop"));

        for bad in [Decimal::ZERO, Decimal::new(-5, 0), Decimal::new(1001, 3)] {
            let err = ledger
                .add_transaction(user.id, groceries.id, bad, date(2025, 3, 10), None)
                .unwrap_err();
            assert!(is_validation(&err), "{} should be rejected", bad);
        }

        // Another user's category is invisible
        let bob = ledger.add_user("bob").unwrap();
        assert!(ledger
            .add_transaction(bob.id, groceries.id, Decimal::ONE, date(2025, 3, 10), None)
            .is_err());
    }

    #[test]
    fn test_budget_rules() {
        let ledger = service();
        let user = ledger.add_user("alice").unwrap();
        let groceries = ledger
            .add_category(user.id, "Groceries", CategoryKind::Expense)
            .unwrap();
        let salary = ledger
            .add_category(user.id, "Salary", CategoryKind::Income)
            .unwrap();

        ledger
            .set_budget(user.id, groceries.id, Decimal::new(500, 0), date(2025, 1, 1), None)
            .unwrap();
        assert!(is_validation(
            &ledger
                .set_budget(user.id, groceries.id, Decimal::new(600, 0), date(2025, 1, 1), None)
                .unwrap_err()
        ));
        assert!(is_validation(
            &ledger
                .set_budget(user.id, salary.id, Decimal::new(1, 0), date(2025, 1, 1), None)
                .unwrap_err()
        ));
        assert!(is_validation(
            &ledger
                .set_budget(user.id, groceries.id, Decimal::ONE, date(2025, 2, 1), Some(date(2025, 2, 1)))
                .unwrap_err()
        ));
    }

    #[test]
    fn test_category_lookup_and_rename() {
        let ledger = service();
        let user = ledger.add_user("alice").unwrap();
        let category = ledger
            .add_category(user.id, "Eating  Out", CategoryKind::Expense)
            .unwrap();

        assert_eq!(ledger.require_category(user.id, " Eating Out").unwrap().id, category.id);
        assert_eq!(
            ledger.require_category(user.id, &category.id.to_string()).unwrap().id,
            category.id
        );

        let renamed = ledger.rename_category(user.id, category.id, " Restaurants ").unwrap();
        assert_eq!(renamed.name, "Restaurants");
        assert!(is_validation(&ledger.rename_category(user.id, category.id, "   ").unwrap_err()));
    }

    #[test]
    fn test_budget_amount_with_extra_places_rejected() {
        let ledger = service();
        let user = ledger.add_user("alice").unwrap();
        let groceries = ledger
            .add_category(user.id, "Groceries", CategoryKind::Expense)
            .unwrap();

        let err = ledger
            .set_budget(user.id, groceries.id, Decimal::new(10005, 3), date(2025, 1, 1), None)
            .unwrap_err();
        assert!(is_validation(&err));
        assert!(ledger.list_budgets(user.id).unwrap().is_empty());

        let budget = ledger
            .set_budget(user.id, groceries.id, Decimal::new(1000, 2), date(2025, 1, 1), None)
            .unwrap();
        assert_eq!(budget.amount.to_string(), "10.00");
    }

    #[test]
    fn test_edit_transaction() {
        let ledger = service();
        let user = ledger.add_user("alice").unwrap();
        let groceries = ledger
            .add_category(user.id, "Groceries", CategoryKind::Expense)
            .unwrap();
        let dining = ledger
            .add_category(user.id, "Dining", CategoryKind::Expense)
            .unwrap();
        let salary = ledger
            .add_category(user.id, "Salary", CategoryKind::Income)
            .unwrap();
        let tx = ledger
            .add_transaction(user.id, groceries.id, Decimal::new(4250, 2), date(2025, 3, 10), Some("market"))
            .unwrap();

        let edited = ledger
            .edit_transaction(
                user.id,
                tx.id,
                TransactionChanges {
                    category_id: Some(dining.id),
                    amount: Some(Decimal::new(38, 0)),
                    occurred_on: Some(date(2025, 3, 11)),
                    description: Some(" ".to_string()),
                },
            )
            .unwrap();
        assert_eq!(edited.category_id, dining.id);
        assert_eq!(edited.amount.to_string(), "38.00");
        assert_eq!(edited.occurred_on, date(2025, 3, 11));
        assert!(edited.description.is_none());

        let stored = ledger.list_transactions(user.id, None, None).unwrap();
        assert_eq!(stored, vec![edited.clone()]);

        let to_income = TransactionChanges {
            category_id: Some(salary.id),
            ..Default::default()
        };
        assert!(is_validation(&ledger.edit_transaction(user.id, tx.id, to_income).unwrap_err()));

        for bad in [Decimal::ZERO, Decimal::new(1001, 3)] {
            let changes = TransactionChanges {
                amount: Some(bad),
                ..Default::default()
            };
            assert!(is_validation(&ledger.edit_transaction(user.id, tx.id, changes).unwrap_err()));
        }
        assert_eq!(ledger.list_transactions(user.id, None, None).unwrap(), vec![edited]);

        let missing = ledger
            .edit_transaction(user.id, Uuid::new_v4(), TransactionChanges::default())
            .unwrap_err();
        assert!(is_not_found(&missing));
    }

    #[test]
    fn test_list_transactions_by_kind() {
        let ledger = service();
        let user = ledger.add_user("alice").unwrap();
        let groceries = ledger
            .add_category(user.id, "Groceries", CategoryKind::Expense)
            .unwrap();
        let salary = ledger
            .add_category(user.id, "Salary", CategoryKind::Income)
            .unwrap();
        ledger
            .add_transaction(user.id, salary.id, Decimal::new(3000, 0), date(2025, 3, 1), None)
            .unwrap();
        ledger
            .add_transaction(user.id, groceries.id, Decimal::new(20, 0), date(2025, 3, 5), None)
            .unwrap();
        ledger
            .add_transaction(user.id, groceries.id, Decimal::new(30, 0), date(2025, 2, 5), None)
            .unwrap();

        let expenses = ledger
            .list_transactions(user.id, None, Some(CategoryKind::Expense))
            .unwrap();
        let days: Vec<_> = expenses.iter().map(|t| t.occurred_on).collect();
        assert_eq!(days, vec![date(2025, 3, 5), date(2025, 2, 5)]);

        let march = DateInterval::new(date(2025, 3, 1), date(2025, 4, 1));
        let income = ledger
            .list_transactions(user.id, Some(&march), Some(CategoryKind::Income))
            .unwrap();
        assert_eq!(income.len(), 1);
        assert_eq!(income[0].category_id, salary.id);
        assert_eq!(ledger.list_transactions(user.id, Some(&march), None).unwrap().len(), 2);
    }

    #[test]
    fn test_edit_budget() {
        let store = Arc::new(InMemoryLedger::new());
        let ledger = LedgerService::new(store.clone());
        let user = ledger.add_user("alice").unwrap();
        let groceries = ledger
            .add_category(user.id, "Groceries", CategoryKind::Expense)
            .unwrap();
        let dining = ledger
            .add_category(user.id, "Dining", CategoryKind::Expense)
            .unwrap();
        let salary = ledger
            .add_category(user.id, "Salary", CategoryKind::Income)
            .unwrap();

        let budget = ledger
            .set_budget(user.id, groceries.id, Decimal::new(500, 0), date(2025, 1, 1), None)
            .unwrap();
        let edited = ledger
            .edit_budget(
                user.id,
                budget.id,
                BudgetChanges {
                    amount: Some(Decimal::new(45050, 2)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(edited.amount.to_string(), "450.50");
        assert_eq!(edited.category, BudgetCategoryRef::Id(groceries.id));

        let to_income = BudgetChanges {
            category_id: Some(salary.id),
            ..Default::default()
        };
        assert!(is_validation(&ledger.edit_budget(user.id, budget.id, to_income).unwrap_err()));
        let too_precise = BudgetChanges {
            amount: Some(Decimal::new(10005, 3)),
            ..Default::default()
        };
        assert!(is_validation(&ledger.edit_budget(user.id, budget.id, too_precise).unwrap_err()));

        // Moving onto a category that already has a budget with the same start
        ledger
            .set_budget(user.id, dining.id, Decimal::new(100, 0), date(2025, 1, 1), None)
            .unwrap();
        let onto_dining = BudgetChanges {
            category_id: Some(dining.id),
            ..Default::default()
        };
        assert!(is_validation(&ledger.edit_budget(user.id, budget.id, onto_dining).unwrap_err()));

        // A legacy by-name budget becomes an id reference
        let legacy = Budget::legacy(user.id, "Groceries", Decimal::new(300, 0), date(2024, 1, 1));
        store.add_budget(&legacy).unwrap();
        let upgraded = ledger
            .edit_budget(
                user.id,
                legacy.id,
                BudgetChanges {
                    category_id: Some(groceries.id),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(upgraded.category, BudgetCategoryRef::Id(groceries.id));
        assert_eq!(upgraded.amount.to_string(), "300.00");

        let missing = ledger
            .edit_budget(user.id, Uuid::new_v4(), BudgetChanges::default())
            .unwrap_err();
        assert!(is_not_found(&missing));
    }
}
