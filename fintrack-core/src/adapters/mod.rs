//! Adapter implementations (hexagonal architecture)
//!
//! Concrete ledger stores behind the ports.

pub mod duckdb;
pub mod memory;

pub use self::duckdb::DuckDbRepository;
pub use self::memory::InMemoryLedger;
