//! Ledger ports - read interface for the aggregation engine, write interface for the ledger service

use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Budget, Category, DateInterval, Transaction, User};

/// Everything the engine needs for one user and one interval, read together
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub categories: Vec<Category>,
    /// Only transactions inside the requested interval
    pub transactions: Vec<Transaction>,
    pub budgets: Vec<Budget>,
}

/// Read interface over a user's categories, transactions and budgets
///
/// Every method is scoped by user id; implementations must never return
/// another user's records.
pub trait LedgerSource: Send + Sync {
    fn categories_for_user(&self, user_id: Uuid) -> Result<Vec<Category>>;

    /// Transactions with `interval.start <= occurred_on < interval.end_exclusive`,
    /// optionally restricted to one category
    fn transactions_in_range(
        &self,
        user_id: Uuid,
        interval: &DateInterval,
        category_id: Option<Uuid>,
    ) -> Result<Vec<Transaction>>;

    fn budgets_for_user(&self, user_id: Uuid) -> Result<Vec<Budget>>;

    /// Read categories, in-range transactions and budgets as one consistent view
    ///
    /// The default issues three independent reads. Stores with transactional
    /// isolation override it so concurrent writes are either fully visible or
    /// not at all.
    fn snapshot(&self, user_id: Uuid, interval: &DateInterval) -> Result<LedgerSnapshot> {
        Ok(LedgerSnapshot {
            categories: self.categories_for_user(user_id)?,
            transactions: self.transactions_in_range(user_id, interval, None)?,
            budgets: self.budgets_for_user(user_id)?,
        })
    }
}

/// Row counts for status output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerCounts {
    pub users: i64,
    pub categories: i64,
    pub transactions: i64,
    pub budgets: i64,
}

/// Write interface over the ledger
///
/// Stores enforce uniqueness (usernames, category names per user, the budget
/// natural key) and referential rules, reporting violations as
/// `Error::Validation` and missing rows as `Error::NotFound`.
pub trait LedgerStore: LedgerSource {
    // === Users ===

    fn add_user(&self, user: &User) -> Result<()>;

    fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    fn list_users(&self) -> Result<Vec<User>>;

    /// Delete a user and everything they own
    fn delete_user(&self, id: Uuid) -> Result<()>;

    // === Categories ===

    fn add_category(&self, category: &Category) -> Result<()>;

    fn get_category(&self, user_id: Uuid, id: Uuid) -> Result<Option<Category>>;

    fn rename_category(&self, user_id: Uuid, id: Uuid, new_name: &str) -> Result<()>;

    /// Refused while any transaction or budget still references the category
    fn delete_category(&self, user_id: Uuid, id: Uuid) -> Result<()>;

    // === Transactions ===

    fn add_transaction(&self, tx: &Transaction) -> Result<()>;

    fn get_transaction(&self, user_id: Uuid, id: Uuid) -> Result<Option<Transaction>>;

    /// Replace the stored row with the same id; its category must exist for the user
    fn update_transaction(&self, tx: &Transaction) -> Result<()>;

    /// All of a user's transactions, newest first
    fn list_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>>;

    fn delete_transaction(&self, user_id: Uuid, id: Uuid) -> Result<()>;

    // === Budgets ===

    fn add_budget(&self, budget: &Budget) -> Result<()>;

    fn get_budget(&self, user_id: Uuid, id: Uuid) -> Result<Option<Budget>>;

    /// Replace the stored row with the same id, keeping the natural key unique
    fn update_budget(&self, budget: &Budget) -> Result<()>;

    fn delete_budget(&self, user_id: Uuid, id: Uuid) -> Result<()>;

    // === Status ===

    fn counts(&self) -> Result<LedgerCounts>;
}
