//! Status service - ledger row counts and schema state

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::ports::{LedgerCounts, LedgerStore};

pub struct StatusService {
    repository: Arc<DuckDbRepository>,
    trend_months: u32,
}

impl StatusService {
    pub fn new(repository: Arc<DuckDbRepository>, trend_months: u32) -> Self {
        Self {
            repository,
            trend_months,
        }
    }

    pub fn get_status(&self) -> Result<StatusSummary> {
        let counts = self.repository.counts()?;
        let pending_migrations = self.repository.pending_migrations()?;

        Ok(StatusSummary {
            database: self
                .repository
                .db_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ":memory:".to_string()),
            counts,
            pending_migrations,
            trend_months: self.trend_months,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub database: String,
    pub counts: LedgerCounts,
    pub pending_migrations: Vec<String>,
    pub trend_months: u32,
}
