//! Connection open and reopen tests
//!
//! Run with: cargo test --test connection_retry_test -- --nocapture

use std::time::Instant;

use tempfile::TempDir;

use fintrack_core::adapters::duckdb::DuckDbRepository;
use fintrack_core::domain::User;
use fintrack_core::ports::LedgerStore;

/// Open and close the same file repeatedly; data and schema persist
#[test]
fn test_sequential_connections() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test_sequential.duckdb");

    for i in 0..5 {
        let start = Instant::now();
        let repo = DuckDbRepository::new(&db_path).unwrap();
        repo.ensure_schema().unwrap();
        repo.add_user(&User::new(format!("user{}", i))).unwrap();
        println!("Connection {}: opened in {:?}", i, start.elapsed());
    }

    let repo = DuckDbRepository::new(&db_path).unwrap();
    assert_eq!(repo.counts().unwrap().users, 5);
    assert!(repo.pending_migrations().unwrap().is_empty());
}

/// Failures that are not lock contention surface immediately
#[test]
fn test_unopenable_path_fails_fast() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("missing").join("nested").join("ledger.duckdb");

    let start = Instant::now();
    let result = DuckDbRepository::new(&db_path);
    assert!(result.is_err());
    // No backoff: the retry schedule alone would take 750ms
    assert!(start.elapsed().as_millis() < 700, "took {:?}", start.elapsed());
}

#[test]
fn test_schema_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("idempotent.duckdb");

    let repo = DuckDbRepository::new(&db_path).unwrap();
    let first = repo.run_migrations().unwrap();
    assert!(!first.applied.is_empty());
    let second = repo.run_migrations().unwrap();
    assert!(second.applied.is_empty());
    assert_eq!(second.already_applied, first.applied.len());
}
