//! fintrack core - budget-vs-spend aggregation for personal finance
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: Entities, money and period arithmetic, report shapes
//! - **ports**: Ledger read/write traits
//! - **services**: Aggregation engine, trend builder, report assembly
//! - **adapters**: DuckDB and in-memory ledger stores

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::{LedgerService, LoggingService, ReportService, StatusService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{
    BreakdownPayload, Budget, BudgetCategoryRef, BudgetStatus, BudgetSummary, Category,
    CategoryKind, DateInterval, PeriodReport, ReportPayload, ReportWarning, Transaction, User,
};

/// Main context for fintrack operations
///
/// Holds the ledger database, configuration and the services built on them.
pub struct FintrackContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub repository: Arc<DuckDbRepository>,
    pub ledger: LedgerService,
    pub reports: ReportService,
    pub status: StatusService,
}

impl FintrackContext {
    /// Open the ledger in `data_dir`, creating the directory and schema as needed
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let config = Config::load(data_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&config.db_path(data_dir))?);
        repository.ensure_schema()?;

        let ledger = LedgerService::new(repository.clone());
        let reports = ReportService::new(repository.clone()).with_trend_months(config.trend_months);
        let status = StatusService::new(Arc::clone(&repository), config.trend_months);

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            repository,
            ledger,
            reports,
            status,
        })
    }

    /// Record assembled reports in the event log
    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.reports = self.reports.with_logger(logger);
        self
    }
}
