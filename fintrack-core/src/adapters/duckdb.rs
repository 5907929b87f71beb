//! DuckDB ledger store

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::{params, Connection};
use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Budget, BudgetCategoryRef, Category, CategoryKind, DateInterval, Transaction, User,
};
use crate::ports::{LedgerCounts, LedgerSnapshot, LedgerSource, LedgerStore};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// True for file-locking errors worth retrying
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

const CATEGORY_COLUMNS: &str = "category_id, user_id, name, kind, created_at::VARCHAR";

const TRANSACTION_COLUMNS: &str = "transaction_id, user_id, category_id, kind, amount::VARCHAR, \
     occurred_on::VARCHAR, description, created_at::VARCHAR";

const BUDGET_COLUMNS: &str = "budget_id, user_id, category_id, category_name, amount::VARCHAR, \
     start_date::VARCHAR, end_date::VARCHAR, created_at::VARCHAR";

/// DuckDB-backed ledger store
///
/// One connection behind a mutex. Writes that touch several tables and
/// `snapshot` reads run inside a DuckDB transaction.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) the database at `db_path`
    ///
    /// Retries with exponential backoff while another process holds the file lock.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    attempt += 1;
                    if !is_retryable_error(&err_msg) || attempt >= MAX_RETRIES {
                        return Err(e);
                    }
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt - 1));
                    warn!(
                        delay_ms = delay.as_millis() as u64,
                        attempt,
                        max = MAX_RETRIES,
                        error = %err_msg,
                        "database busy, retrying"
                    );
                    thread::sleep(delay);
                }
            }
        }
    }

    /// A private in-memory database, for tests and embedders
    pub fn in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory_with_flags(config)?),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs ICU or JSON
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::database("database connection lock poisoned"))
    }

    /// Apply pending schema migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn)
            .run_pending()
            .map_err(|e| Error::database(format!("{:#}", e)))
    }

    /// Ensure the schema is current
    pub fn ensure_schema(&self) -> Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            debug!(applied = ?result.applied, "schema migrated");
        }
        Ok(())
    }

    /// Names of migrations not yet applied
    pub fn pending_migrations(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        MigrationService::new(&conn)
            .get_pending()
            .map_err(|e| Error::database(format!("{:#}", e)))
    }
}

/// Run `f` inside BEGIN/COMMIT, rolling back on error
fn in_transaction<T>(conn: &Connection, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    conn.execute_batch("BEGIN TRANSACTION")?;
    match f(conn) {
        Ok(value) => {
            conn.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                warn!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}

// === Row decoding ===

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::database(format!("invalid id '{}': {}", s, e)))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::database(format!("invalid date '{}': {}", s, e)))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::database(format!("invalid timestamp '{}': {}", s, e)))
}

fn parse_amount(s: &str) -> Result<Decimal> {
    Decimal::from_str_exact(s).map_err(|e| Error::database(format!("invalid amount '{}': {}", s, e)))
}

fn parse_kind(s: &str) -> Result<CategoryKind> {
    s.parse().map_err(Error::database)
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

type CategoryRow = (String, String, String, String, String);

fn category_row(row: &duckdb::Row) -> duckdb::Result<CategoryRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn category_from_row(row: CategoryRow) -> Result<Category> {
    let (id, user_id, name, kind, created_at) = row;
    Ok(Category {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        name,
        kind: parse_kind(&kind)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

type TransactionRow = (String, String, String, String, String, String, Option<String>, String);

fn transaction_row(row: &duckdb::Row) -> duckdb::Result<TransactionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn transaction_from_row(row: TransactionRow) -> Result<Transaction> {
    let (id, user_id, category_id, kind, amount, occurred_on, description, created_at) = row;
    Ok(Transaction {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        category_id: parse_uuid(&category_id)?,
        kind: parse_kind(&kind)?,
        amount: parse_amount(&amount)?,
        occurred_on: parse_date(&occurred_on)?,
        description,
        created_at: parse_timestamp(&created_at)?,
    })
}

type BudgetRow = (
    String,
    String,
    Option<String>,
    String,
    String,
    String,
    Option<String>,
    String,
);

fn budget_row(row: &duckdb::Row) -> duckdb::Result<BudgetRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn budget_from_row(row: BudgetRow) -> Result<Budget> {
    let (id, user_id, category_id, category_name, amount, start_date, end_date, created_at) = row;
    let category = match category_id {
        Some(cid) => BudgetCategoryRef::Id(parse_uuid(&cid)?),
        None => BudgetCategoryRef::LegacyName(category_name),
    };
    Ok(Budget {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        category,
        amount: parse_amount(&amount)?,
        start_date: parse_date(&start_date)?,
        end_date: end_date.as_deref().map(parse_date).transpose()?,
        created_at: parse_timestamp(&created_at)?,
    })
}

// === Queries shared by the single reads and the snapshot ===

fn query_categories(conn: &Connection, user_id: Uuid) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM categories WHERE user_id = ? ORDER BY name",
        CATEGORY_COLUMNS
    ))?;
    let rows = stmt.query_map([user_id.to_string()], category_row)?;

    let mut categories = Vec::new();
    for row in rows {
        categories.push(category_from_row(row?)?);
    }
    Ok(categories)
}

fn query_category(conn: &Connection, user_id: Uuid, id: Uuid) -> Result<Option<Category>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM categories WHERE user_id = ? AND category_id = ?",
        CATEGORY_COLUMNS
    ))?;
    let mut rows = stmt.query_map([user_id.to_string(), id.to_string()], category_row)?;
    rows.next().transpose()?.map(category_from_row).transpose()
}

fn read_transactions(
    conn: &Connection,
    sql: &str,
    params: &[&dyn duckdb::ToSql],
) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, transaction_row)?;

    let mut transactions = Vec::new();
    for row in rows {
        transactions.push(transaction_from_row(row?)?);
    }
    Ok(transactions)
}

fn query_transactions_in_range(
    conn: &Connection,
    user_id: Uuid,
    interval: &DateInterval,
    category_id: Option<Uuid>,
) -> Result<Vec<Transaction>> {
    let user = user_id.to_string();
    let start = format_date(interval.start);
    let end = format_date(interval.end_exclusive);
    match category_id {
        Some(category_id) => {
            let category = category_id.to_string();
            read_transactions(
                conn,
                &format!(
                    "SELECT {} FROM transactions
                     WHERE user_id = ? AND occurred_on >= CAST(? AS DATE) AND occurred_on < CAST(? AS DATE)
                       AND category_id = ?
                     ORDER BY occurred_on, created_at",
                    TRANSACTION_COLUMNS
                ),
                &[&user, &start, &end, &category],
            )
        }
        None => read_transactions(
            conn,
            &format!(
                "SELECT {} FROM transactions
                 WHERE user_id = ? AND occurred_on >= CAST(? AS DATE) AND occurred_on < CAST(? AS DATE)
                 ORDER BY occurred_on, created_at",
                TRANSACTION_COLUMNS
            ),
            &[&user, &start, &end],
        ),
    }
}

fn query_budgets(conn: &Connection, user_id: Uuid) -> Result<Vec<Budget>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM budgets WHERE user_id = ? ORDER BY start_date, budget_id",
        BUDGET_COLUMNS
    ))?;
    let rows = stmt.query_map([user_id.to_string()], budget_row)?;

    let mut budgets = Vec::new();
    for row in rows {
        budgets.push(budget_from_row(row?)?);
    }
    Ok(budgets)
}

fn count(conn: &Connection, sql: &str, params: &[&dyn duckdb::ToSql]) -> Result<i64> {
    Ok(conn.query_row(sql, params, |row| row.get(0))?)
}

fn query_users(conn: &Connection, filter: &str, params: &[&dyn duckdb::ToSql]) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT user_id, username, created_at::VARCHAR FROM users {} ORDER BY username",
        filter
    ))?;
    let rows = stmt.query_map(params, |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut users = Vec::new();
    for row in rows {
        let (id, username, created_at) = row?;
        users.push(User {
            id: parse_uuid(&id)?,
            username,
            created_at: parse_timestamp(&created_at)?,
        });
    }
    Ok(users)
}

fn user_exists(conn: &Connection, user_id: Uuid) -> Result<bool> {
    Ok(count(
        conn,
        "SELECT COUNT(*) FROM users WHERE user_id = ?",
        &[&user_id.to_string()],
    )? > 0)
}

fn category_name_taken(conn: &Connection, user_id: Uuid, name: &str, except: Option<Uuid>) -> Result<bool> {
    let except = except.map(|id| id.to_string()).unwrap_or_default();
    Ok(count(
        conn,
        "SELECT COUNT(*) FROM categories WHERE user_id = ? AND name = ? AND category_id <> ?",
        &[&user_id.to_string(), &name, &except],
    )? > 0)
}

/// Stored `(category_id, category_name)` columns for a budget's category reference
///
/// An id reference must name one of the user's categories.
fn budget_category_columns(conn: &Connection, budget: &Budget) -> Result<(Option<String>, String)> {
    match &budget.category {
        BudgetCategoryRef::Id(id) => {
            let category = query_category(conn, budget.user_id, *id)?
                .ok_or_else(|| Error::not_found(format!("category {}", id)))?;
            Ok((Some(id.to_string()), category.name))
        }
        BudgetCategoryRef::LegacyName(name) => Ok((None, name.clone())),
    }
}

/// True when another budget already holds this budget's natural key
fn budget_key_taken(
    conn: &Connection,
    budget: &Budget,
    category_id: Option<&String>,
    category_name: &str,
) -> Result<bool> {
    let user = budget.user_id.to_string();
    let start = format_date(budget.start_date);
    let id = budget.id.to_string();
    let duplicates = match category_id {
        Some(cid) => count(
            conn,
            "SELECT COUNT(*) FROM budgets
             WHERE user_id = ? AND category_id = ? AND start_date = CAST(? AS DATE)
               AND budget_id <> ?",
            &[&user, cid, &start, &id],
        )?,
        None => count(
            conn,
            "SELECT COUNT(*) FROM budgets
             WHERE user_id = ? AND category_id IS NULL AND category_name = ?
               AND start_date = CAST(? AS DATE) AND budget_id <> ?",
            &[&user, &category_name, &start, &id],
        )?,
    };
    Ok(duplicates > 0)
}

fn duplicate_budget(budget: &Budget) -> Error {
    Error::validation(format!(
        "a budget for {} starting {} already exists",
        budget.category, budget.start_date
    ))
}

impl LedgerSource for DuckDbRepository {
    fn categories_for_user(&self, user_id: Uuid) -> Result<Vec<Category>> {
        let conn = self.lock()?;
        query_categories(&conn, user_id)
    }

    fn transactions_in_range(
        &self,
        user_id: Uuid,
        interval: &DateInterval,
        category_id: Option<Uuid>,
    ) -> Result<Vec<Transaction>> {
        let conn = self.lock()?;
        query_transactions_in_range(&conn, user_id, interval, category_id)
    }

    fn budgets_for_user(&self, user_id: Uuid) -> Result<Vec<Budget>> {
        let conn = self.lock()?;
        query_budgets(&conn, user_id)
    }

    fn snapshot(&self, user_id: Uuid, interval: &DateInterval) -> Result<LedgerSnapshot> {
        let conn = self.lock()?;
        in_transaction(&conn, |conn| {
            Ok(LedgerSnapshot {
                categories: query_categories(conn, user_id)?,
                transactions: query_transactions_in_range(conn, user_id, interval, None)?,
                budgets: query_budgets(conn, user_id)?,
            })
        })
    }
}

impl LedgerStore for DuckDbRepository {
    // === Users ===

    fn add_user(&self, user: &User) -> Result<()> {
        let conn = self.lock()?;
        let taken = count(
            &conn,
            "SELECT COUNT(*) FROM users WHERE username = ?",
            &[&user.username],
        )? > 0;
        if taken {
            return Err(Error::validation(format!(
                "username '{}' is already taken",
                user.username
            )));
        }
        conn.execute(
            "INSERT INTO users (user_id, username, created_at) VALUES (?, ?, CAST(? AS TIMESTAMP))",
            params![user.id.to_string(), user.username, format_timestamp(&user.created_at)],
        )?;
        Ok(())
    }

    fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let conn = self.lock()?;
        Ok(query_users(&conn, "WHERE user_id = ?", &[&id.to_string()])?
            .into_iter()
            .next())
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        let username = User::normalize_username(username);
        Ok(query_users(&conn, "WHERE username = ?", &[&username])?
            .into_iter()
            .next())
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.lock()?;
        query_users(&conn, "", &[])
    }

    fn delete_user(&self, id: Uuid) -> Result<()> {
        let conn = self.lock()?;
        in_transaction(&conn, |conn| {
            if !user_exists(conn, id)? {
                return Err(Error::not_found(format!("user {}", id)));
            }
            let id = id.to_string();
            for table in ["budgets", "transactions", "categories", "users"] {
                conn.execute(&format!("DELETE FROM {} WHERE user_id = ?", table), [&id])?;
            }
            Ok(())
        })
    }

    // === Categories ===

    fn add_category(&self, category: &Category) -> Result<()> {
        let conn = self.lock()?;
        if !user_exists(&conn, category.user_id)? {
            return Err(Error::not_found(format!("user {}", category.user_id)));
        }
        if category_name_taken(&conn, category.user_id, &category.name, None)? {
            return Err(Error::validation(format!(
                "category '{}' already exists",
                category.name
            )));
        }
        conn.execute(
            "INSERT INTO categories (category_id, user_id, name, kind, created_at)
             VALUES (?, ?, ?, ?, CAST(? AS TIMESTAMP))",
            params![
                category.id.to_string(),
                category.user_id.to_string(),
                category.name,
                category.kind.as_str(),
                format_timestamp(&category.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_category(&self, user_id: Uuid, id: Uuid) -> Result<Option<Category>> {
        let conn = self.lock()?;
        query_category(&conn, user_id, id)
    }

    fn rename_category(&self, user_id: Uuid, id: Uuid, new_name: &str) -> Result<()> {
        let conn = self.lock()?;
        if query_category(&conn, user_id, id)?.is_none() {
            return Err(Error::not_found(format!("category {}", id)));
        }
        if category_name_taken(&conn, user_id, new_name, Some(id))? {
            return Err(Error::validation(format!(
                "category '{}' already exists",
                new_name
            )));
        }
        // Legacy budgets keep the old name and stop matching
        conn.execute(
            "UPDATE categories SET name = ? WHERE user_id = ? AND category_id = ?",
            params![new_name, user_id.to_string(), id.to_string()],
        )?;
        Ok(())
    }

    fn delete_category(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let conn = self.lock()?;
        in_transaction(&conn, |conn| {
            let category = query_category(conn, user_id, id)?
                .ok_or_else(|| Error::not_found(format!("category {}", id)))?;
            let user = user_id.to_string();
            let cid = id.to_string();
            let references = count(
                conn,
                "SELECT COUNT(*) FROM transactions WHERE user_id = ? AND category_id = ?",
                &[&user, &cid],
            )? + count(
                conn,
                "SELECT COUNT(*) FROM budgets WHERE user_id = ?
                   AND (category_id = ? OR (category_id IS NULL AND category_name = ?))",
                &[&user, &cid, &category.name],
            )?;
            if references > 0 {
                return Err(Error::validation(format!(
                    "category '{}' is still referenced by {} transaction(s) or budget(s)",
                    category.name, references
                )));
            }
            conn.execute(
                "DELETE FROM categories WHERE user_id = ? AND category_id = ?",
                [&user, &cid],
            )?;
            Ok(())
        })
    }

    // === Transactions ===

    fn add_transaction(&self, tx: &Transaction) -> Result<()> {
        let conn = self.lock()?;
        if query_category(&conn, tx.user_id, tx.category_id)?.is_none() {
            return Err(Error::not_found(format!("category {}", tx.category_id)));
        }
        conn.execute(
            "INSERT INTO transactions
                (transaction_id, user_id, category_id, kind, amount, occurred_on, description, created_at)
             VALUES (?, ?, ?, ?, CAST(? AS DECIMAL(18, 2)), CAST(? AS DATE), ?, CAST(? AS TIMESTAMP))",
            params![
                tx.id.to_string(),
                tx.user_id.to_string(),
                tx.category_id.to_string(),
                tx.kind.as_str(),
                tx.amount.to_string(),
                format_date(tx.occurred_on),
                tx.description,
                format_timestamp(&tx.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_transaction(&self, user_id: Uuid, id: Uuid) -> Result<Option<Transaction>> {
        let conn = self.lock()?;
        Ok(read_transactions(
            &conn,
            &format!(
                "SELECT {} FROM transactions WHERE user_id = ? AND transaction_id = ?",
                TRANSACTION_COLUMNS
            ),
            &[&user_id.to_string(), &id.to_string()],
        )?
        .into_iter()
        .next())
    }

    fn update_transaction(&self, tx: &Transaction) -> Result<()> {
        let conn = self.lock()?;
        in_transaction(&conn, |conn| {
            if query_category(conn, tx.user_id, tx.category_id)?.is_none() {
                return Err(Error::not_found(format!("category {}", tx.category_id)));
            }
            let updated = conn.execute(
                "UPDATE transactions
                 SET category_id = ?, kind = ?, amount = CAST(? AS DECIMAL(18, 2)),
                     occurred_on = CAST(? AS DATE), description = ?
                 WHERE user_id = ? AND transaction_id = ?",
                params![
                    tx.category_id.to_string(),
                    tx.kind.as_str(),
                    tx.amount.to_string(),
                    format_date(tx.occurred_on),
                    tx.description,
                    tx.user_id.to_string(),
                    tx.id.to_string(),
                ],
            )?;
            if updated == 0 {
                return Err(Error::not_found(format!("transaction {}", tx.id)));
            }
            Ok(())
        })
    }

    fn list_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>> {
        let conn = self.lock()?;
        read_transactions(
            &conn,
            &format!(
                "SELECT {} FROM transactions WHERE user_id = ?
                 ORDER BY occurred_on DESC, created_at DESC",
                TRANSACTION_COLUMNS
            ),
            &[&user_id.to_string()],
        )
    }

    fn delete_transaction(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM transactions WHERE user_id = ? AND transaction_id = ?",
            [user_id.to_string(), id.to_string()],
        )?;
        if deleted == 0 {
            return Err(Error::not_found(format!("transaction {}", id)));
        }
        Ok(())
    }

    // === Budgets ===

    fn add_budget(&self, budget: &Budget) -> Result<()> {
        let conn = self.lock()?;
        in_transaction(&conn, |conn| {
            if !user_exists(conn, budget.user_id)? {
                return Err(Error::not_found(format!("user {}", budget.user_id)));
            }
            let (category_id, category_name) = budget_category_columns(conn, budget)?;
            if budget_key_taken(conn, budget, category_id.as_ref(), &category_name)? {
                return Err(duplicate_budget(budget));
            }

            conn.execute(
                "INSERT INTO budgets
                    (budget_id, user_id, category_id, category_name, amount, start_date, end_date, created_at)
                 VALUES (?, ?, ?, ?, CAST(? AS DECIMAL(18, 2)), CAST(? AS DATE), CAST(? AS DATE),
                         CAST(? AS TIMESTAMP))",
                params![
                    budget.id.to_string(),
                    budget.user_id.to_string(),
                    category_id,
                    category_name,
                    budget.amount.to_string(),
                    format_date(budget.start_date),
                    budget.end_date.map(format_date),
                    format_timestamp(&budget.created_at),
                ],
            )?;
            Ok(())
        })
    }

    fn get_budget(&self, user_id: Uuid, id: Uuid) -> Result<Option<Budget>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM budgets WHERE user_id = ? AND budget_id = ?",
            BUDGET_COLUMNS
        ))?;
        let mut rows = stmt.query_map([user_id.to_string(), id.to_string()], budget_row)?;
        rows.next().transpose()?.map(budget_from_row).transpose()
    }

    fn update_budget(&self, budget: &Budget) -> Result<()> {
        let conn = self.lock()?;
        in_transaction(&conn, |conn| {
            let (category_id, category_name) = budget_category_columns(conn, budget)?;
            if budget_key_taken(conn, budget, category_id.as_ref(), &category_name)? {
                return Err(duplicate_budget(budget));
            }
            let updated = conn.execute(
                "UPDATE budgets
                 SET category_id = ?, category_name = ?, amount = CAST(? AS DECIMAL(18, 2)),
                     start_date = CAST(? AS DATE), end_date = CAST(? AS DATE)
                 WHERE user_id = ? AND budget_id = ?",
                params![
                    category_id,
                    category_name,
                    budget.amount.to_string(),
                    format_date(budget.start_date),
                    budget.end_date.map(format_date),
                    budget.user_id.to_string(),
                    budget.id.to_string(),
                ],
            )?;
            if updated == 0 {
                return Err(Error::not_found(format!("budget {}", budget.id)));
            }
            Ok(())
        })
    }

    fn delete_budget(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM budgets WHERE user_id = ? AND budget_id = ?",
            [user_id.to_string(), id.to_string()],
        )?;
        if deleted == 0 {
            return Err(Error::not_found(format!("budget {}", id)));
        }
        Ok(())
    }

    // === Status ===

    fn counts(&self) -> Result<LedgerCounts> {
        let conn = self.lock()?;
        Ok(LedgerCounts {
            users: count(&conn, "SELECT COUNT(*) FROM users", &[])?,
            categories: count(&conn, "SELECT COUNT(*) FROM categories", &[])?,
            transactions: count(&conn, "SELECT COUNT(*) FROM transactions", &[])?,
            budgets: count(&conn, "SELECT COUNT(*) FROM budgets", &[])?,
        })
    }
}
