//! In-memory ledger store
//!
//! Same contract as the DuckDB store, held behind one `RwLock` so a snapshot
//! is taken under a single read guard.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Budget, BudgetCategoryRef, Category, DateInterval, Transaction, User};
use crate::ports::{LedgerCounts, LedgerSnapshot, LedgerSource, LedgerStore};

#[derive(Default)]
struct State {
    users: Vec<User>,
    categories: Vec<Category>,
    transactions: Vec<Transaction>,
    budgets: Vec<Budget>,
}

impl State {
    fn categories_for(&self, user_id: Uuid) -> Vec<Category> {
        self.categories
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect()
    }

    fn transactions_for(
        &self,
        user_id: Uuid,
        interval: &DateInterval,
        category_id: Option<Uuid>,
    ) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.user_id == user_id && interval.contains(t.occurred_on))
            .filter(|t| category_id.map_or(true, |id| t.category_id == id))
            .cloned()
            .collect()
    }

    fn budgets_for(&self, user_id: Uuid) -> Vec<Budget> {
        self.budgets
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect()
    }

    fn has_category(&self, user_id: Uuid, id: Uuid) -> bool {
        self.categories
            .iter()
            .any(|c| c.id == id && c.user_id == user_id)
    }

    fn check_budget_category(&self, budget: &Budget) -> Result<()> {
        match &budget.category {
            BudgetCategoryRef::Id(id) if !self.has_category(budget.user_id, *id) => {
                Err(Error::not_found(format!("category {}", id)))
            }
            _ => Ok(()),
        }
    }

    fn check_budget_key(&self, budget: &Budget) -> Result<()> {
        if self
            .budgets
            .iter()
            .any(|b| b.id != budget.id && b.natural_key() == budget.natural_key())
        {
            return Err(Error::validation(format!(
                "a budget for {} starting {} already exists",
                budget.category, budget.start_date
            )));
        }
        Ok(())
    }

    fn category_mut(&mut self, user_id: Uuid, id: Uuid) -> Result<&mut Category> {
        self.categories
            .iter_mut()
            .find(|c| c.id == id && c.user_id == user_id)
            .ok_or_else(|| Error::not_found(format!("category {}", id)))
    }
}

/// Ledger store kept entirely in process memory
#[derive(Default)]
pub struct InMemoryLedger {
    state: RwLock<State>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| Error::database("in-memory ledger lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| Error::database("in-memory ledger lock poisoned"))
    }
}

impl LedgerSource for InMemoryLedger {
    fn categories_for_user(&self, user_id: Uuid) -> Result<Vec<Category>> {
        Ok(self.read()?.categories_for(user_id))
    }

    fn transactions_in_range(
        &self,
        user_id: Uuid,
        interval: &DateInterval,
        category_id: Option<Uuid>,
    ) -> Result<Vec<Transaction>> {
        Ok(self.read()?.transactions_for(user_id, interval, category_id))
    }

    fn budgets_for_user(&self, user_id: Uuid) -> Result<Vec<Budget>> {
        Ok(self.read()?.budgets_for(user_id))
    }

    fn snapshot(&self, user_id: Uuid, interval: &DateInterval) -> Result<LedgerSnapshot> {
        let state = self.read()?;
        Ok(LedgerSnapshot {
            categories: state.categories_for(user_id),
            transactions: state.transactions_for(user_id, interval, None),
            budgets: state.budgets_for(user_id),
        })
    }
}

/// Source whose every read fails
#[cfg(test)]
pub(crate) struct UnavailableLedger;

#[cfg(test)]
impl LedgerSource for UnavailableLedger {
    fn categories_for_user(&self, _user_id: Uuid) -> Result<Vec<Category>> {
        Err(Error::database("ledger unavailable"))
    }

    fn transactions_in_range(
        &self,
        _user_id: Uuid,
        _interval: &DateInterval,
        _category_id: Option<Uuid>,
    ) -> Result<Vec<Transaction>> {
        Err(Error::database("ledger unavailable"))
    }

    fn budgets_for_user(&self, _user_id: Uuid) -> Result<Vec<Budget>> {
        Err(Error::database("ledger unavailable"))
    }
}

impl LedgerStore for InMemoryLedger {
    fn add_user(&self, user: &User) -> Result<()> {
        let mut state = self.write()?;
        if state.users.iter().any(|u| u.username == user.username) {
            return Err(Error::validation(format!(
                "username '{}' is already taken",
                user.username
            )));
        }
        state.users.push(user.clone());
        Ok(())
    }

    fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.read()?.users.iter().find(|u| u.id == id).cloned())
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let username = User::normalize_username(username);
        Ok(self
            .read()?
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let mut users = self.read()?.users.clone();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    fn delete_user(&self, id: Uuid) -> Result<()> {
        let mut state = self.write()?;
        let before = state.users.len();
        state.users.retain(|u| u.id != id);
        if state.users.len() == before {
            return Err(Error::not_found(format!("user {}", id)));
        }
        state.budgets.retain(|b| b.user_id != id);
        state.transactions.retain(|t| t.user_id != id);
        state.categories.retain(|c| c.user_id != id);
        Ok(())
    }

    fn add_category(&self, category: &Category) -> Result<()> {
        let mut state = self.write()?;
        if !state.users.iter().any(|u| u.id == category.user_id) {
            return Err(Error::not_found(format!("user {}", category.user_id)));
        }
        if state
            .categories
            .iter()
            .any(|c| c.user_id == category.user_id && c.name == category.name)
        {
            return Err(Error::validation(format!(
                "category '{}' already exists",
                category.name
            )));
        }
        state.categories.push(category.clone());
        Ok(())
    }

    fn get_category(&self, user_id: Uuid, id: Uuid) -> Result<Option<Category>> {
        Ok(self
            .read()?
            .categories
            .iter()
            .find(|c| c.id == id && c.user_id == user_id)
            .cloned())
    }

    fn rename_category(&self, user_id: Uuid, id: Uuid, new_name: &str) -> Result<()> {
        let mut state = self.write()?;
        if state
            .categories
            .iter()
            .any(|c| c.user_id == user_id && c.id != id && c.name == new_name)
        {
            return Err(Error::validation(format!(
                "category '{}' already exists",
                new_name
            )));
        }
        state.category_mut(user_id, id)?.name = new_name.to_string();
        Ok(())
    }

    fn delete_category(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let mut state = self.write()?;
        let name = state.category_mut(user_id, id)?.name.clone();
        let in_use = state.transactions.iter().any(|t| t.category_id == id)
            || state.budgets.iter().any(|b| {
                b.user_id == user_id
                    && match &b.category {
                        BudgetCategoryRef::Id(cid) => *cid == id,
                        BudgetCategoryRef::LegacyName(n) => *n == name,
                    }
            });
        if in_use {
            return Err(Error::validation(format!(
                "category '{}' is still referenced by transactions or budgets",
                name
            )));
        }
        state.categories.retain(|c| c.id != id);
        Ok(())
    }

    fn add_transaction(&self, tx: &Transaction) -> Result<()> {
        let mut state = self.write()?;
        if !state.has_category(tx.user_id, tx.category_id) {
            return Err(Error::not_found(format!("category {}", tx.category_id)));
        }
        state.transactions.push(tx.clone());
        Ok(())
    }

    fn get_transaction(&self, user_id: Uuid, id: Uuid) -> Result<Option<Transaction>> {
        Ok(self
            .read()?
            .transactions
            .iter()
            .find(|t| t.id == id && t.user_id == user_id)
            .cloned())
    }

    fn update_transaction(&self, tx: &Transaction) -> Result<()> {
        let mut state = self.write()?;
        if !state.has_category(tx.user_id, tx.category_id) {
            return Err(Error::not_found(format!("category {}", tx.category_id)));
        }
        let stored = state
            .transactions
            .iter_mut()
            .find(|t| t.id == tx.id && t.user_id == tx.user_id)
            .ok_or_else(|| Error::not_found(format!("transaction {}", tx.id)))?;
        *stored = tx.clone();
        Ok(())
    }

    fn list_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>> {
        let mut txs: Vec<Transaction> = self
            .read()?
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        txs.sort_by(|a, b| {
            b.occurred_on
                .cmp(&a.occurred_on)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(txs)
    }

    fn delete_transaction(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let mut state = self.write()?;
        let before = state.transactions.len();
        state
            .transactions
            .retain(|t| !(t.id == id && t.user_id == user_id));
        if state.transactions.len() == before {
            return Err(Error::not_found(format!("transaction {}", id)));
        }
        Ok(())
    }

    fn add_budget(&self, budget: &Budget) -> Result<()> {
        let mut state = self.write()?;
        if !state.users.iter().any(|u| u.id == budget.user_id) {
            return Err(Error::not_found(format!("user {}", budget.user_id)));
        }
        state.check_budget_category(budget)?;
        state.check_budget_key(budget)?;
        state.budgets.push(budget.clone());
        Ok(())
    }

    fn get_budget(&self, user_id: Uuid, id: Uuid) -> Result<Option<Budget>> {
        Ok(self
            .read()?
            .budgets
            .iter()
            .find(|b| b.id == id && b.user_id == user_id)
            .cloned())
    }

    fn update_budget(&self, budget: &Budget) -> Result<()> {
        let mut state = self.write()?;
        state.check_budget_category(budget)?;
        state.check_budget_key(budget)?;
        let stored = state
            .budgets
            .iter_mut()
            .find(|b| b.id == budget.id && b.user_id == budget.user_id)
            .ok_or_else(|| Error::not_found(format!("budget {}", budget.id)))?;
        *stored = budget.clone();
        Ok(())
    }

    fn delete_budget(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let mut state = self.write()?;
        let before = state.budgets.len();
        state.budgets.retain(|b| !(b.id == id && b.user_id == user_id));
        if state.budgets.len() == before {
            return Err(Error::not_found(format!("budget {}", id)));
        }
        Ok(())
    }

    fn counts(&self) -> Result<LedgerCounts> {
        let state = self.read()?;
        Ok(LedgerCounts {
            users: state.users.len() as i64,
            categories: state.categories.len() as i64,
            transactions: state.transactions.len() as i64,
            budgets: state.budgets.len() as i64,
        })
    }
}
