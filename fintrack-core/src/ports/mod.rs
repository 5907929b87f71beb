//! Port definitions (hexagonal architecture)
//!
//! The engine and services depend only on these traits; adapters provide
//! the concrete stores.

mod ledger_source;

pub use ledger_source::{LedgerCounts, LedgerSnapshot, LedgerSource, LedgerStore};
