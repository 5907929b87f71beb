//! Concurrent access tests
//!
//! Reports must never observe a half-applied write, and writers sharing one
//! repository must not lose updates.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;

use fintrack_core::adapters::duckdb::DuckDbRepository;
use fintrack_core::domain::period::month_interval;
use fintrack_core::domain::{Category, CategoryKind, Transaction, User};
use fintrack_core::ports::{LedgerSource, LedgerStore};
use fintrack_core::services::{aggregate, ReportService};

/// Number of concurrent threads for stress tests
const THREAD_COUNT: usize = 6;

/// Number of iterations per thread
const ITERATIONS_PER_THREAD: usize = 10;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn open_repo(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
    let repo = DuckDbRepository::new(&temp_dir.path().join("concurrent.duckdb"))
        .expect("Failed to create repository");
    repo.ensure_schema().expect("Failed to initialize schema");
    Arc::new(repo)
}

fn seed_user(repo: &DuckDbRepository) -> (User, Category) {
    let user = User::new("alice");
    repo.add_user(&user).unwrap();
    let groceries = Category::new(user.id, "Groceries", CategoryKind::Expense);
    repo.add_category(&groceries).unwrap();
    (user, groceries)
}

/// Writers add fixed-size transactions while readers compute reports.
/// Every report must reflect a whole number of writes.
#[test]
fn test_reports_see_whole_writes_only() {
    let temp_dir = TempDir::new().unwrap();
    let repo = open_repo(&temp_dir);
    let (user, groceries) = seed_user(&repo);
    let march = month_interval(2025, 3).unwrap();
    let unit = Decimal::new(1000, 2);

    let writers = THREAD_COUNT / 2;
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let torn_reads = Arc::new(AtomicUsize::new(0));
    let mut handles = vec![];

    for thread_id in 0..THREAD_COUNT {
        let barrier = Arc::clone(&barrier);
        let repo = Arc::clone(&repo);
        let groceries = groceries.clone();
        let torn_reads = Arc::clone(&torn_reads);
        let user_id = user.id;

        handles.push(thread::spawn(move || {
            barrier.wait();
            for i in 0..ITERATIONS_PER_THREAD {
                if thread_id < writers {
                    let day = (i % 28) as u32 + 1;
                    let tx = Transaction::new(&groceries, unit, date(2025, 3, day));
                    repo.add_transaction(&tx).unwrap();
                } else {
                    let snapshot = repo.snapshot(user_id, &march).unwrap();
                    let report = aggregate(user_id, &snapshot, &march);
                    if (report.total_expense % unit) != Decimal::ZERO
                        || report.total_expense
                            != Decimal::from(snapshot.transactions.len()) * unit
                    {
                        torn_reads.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(torn_reads.load(Ordering::SeqCst), 0);

    let expected = writers * ITERATIONS_PER_THREAD;
    let txs = repo.transactions_in_range(user.id, &march, None).unwrap();
    assert_eq!(txs.len(), expected);
}

/// Many threads create distinct categories through one shared repository
#[test]
fn test_concurrent_writers_lose_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let repo = open_repo(&temp_dir);
    let (user, _) = seed_user(&repo);

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let errors = Arc::new(AtomicUsize::new(0));
    let mut handles = vec![];

    for thread_id in 0..THREAD_COUNT {
        let barrier = Arc::clone(&barrier);
        let repo = Arc::clone(&repo);
        let errors = Arc::clone(&errors);
        let user_id = user.id;

        handles.push(thread::spawn(move || {
            barrier.wait();
            for i in 0..ITERATIONS_PER_THREAD {
                let category = Category::new(
                    user_id,
                    format!("t{}_i{}", thread_id, i),
                    CategoryKind::Expense,
                );
                if let Err(e) = repo.add_category(&category) {
                    eprintln!("Thread {}: write error at iteration {}: {}", thread_id, i, e);
                    errors.fetch_add(1, Ordering::SeqCst);
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(errors.load(Ordering::SeqCst), 0);
    let categories = repo.categories_for_user(user.id).unwrap();
    assert_eq!(categories.len(), 1 + THREAD_COUNT * ITERATIONS_PER_THREAD);
}

/// Report assembly keeps working while the ledger is written to
#[test]
fn test_report_service_under_concurrent_writes() {
    let temp_dir = TempDir::new().unwrap();
    let repo = open_repo(&temp_dir);
    let (user, groceries) = seed_user(&repo);
    let reports = Arc::new(ReportService::new(repo.clone()).with_trend_months(3));
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let repo = Arc::clone(&repo);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for i in 0..ITERATIONS_PER_THREAD {
                let tx = Transaction::new(&groceries, Decimal::new(500, 2), date(2025, 3, (i % 28) as u32 + 1));
                repo.add_transaction(&tx).unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let reader = {
        let reports = Arc::clone(&reports);
        let user_id = user.id;
        thread::spawn(move || {
            let mut assembled = 0;
            while !done.load(Ordering::SeqCst) || assembled == 0 {
                let payload = reports
                    .monthly_report_on(user_id, Some(2025), Some(3), date(2025, 3, 31))
                    .unwrap();
                assert_eq!(payload.trend.len(), 3);
                // The trend's last month is the report month, read from its own snapshot
                assert!(payload.trend[2].expense >= Decimal::ZERO);
                assembled += 1;
            }
            assembled
        })
    };

    writer.join().unwrap();
    assert!(reader.join().unwrap() > 0);

    let final_report = reports
        .monthly_report_on(user.id, Some(2025), Some(3), date(2025, 3, 31))
        .unwrap();
    assert_eq!(final_report.summary.total_expense.to_string(), "50.00");
    assert_eq!(final_report.trend[2].expense, final_report.summary.total_expense);
}
