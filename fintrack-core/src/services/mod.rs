//! Service layer - business logic orchestration
//!
//! The aggregation engine and trend builder are plain functions over a
//! ledger snapshot; the services wire them to stores, config and logging.

pub mod aggregation;
mod ledger;
pub mod logging;
pub mod migration;
mod report;
mod status;
pub mod trend;

pub use aggregation::{aggregate, aggregate_for_user, income_expense_totals};
pub use ledger::{BudgetChanges, LedgerService, TransactionChanges};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use report::ReportService;
pub use status::{StatusService, StatusSummary};
pub use trend::{build_trend, DEFAULT_TREND_MONTHS};
