// Outage persistence
//
// Backends:
// - PgOutageStore: Postgres via sqlx
// - InMemoryOutageStore: used when no database is configured, and in tests

pub mod memory;
pub mod postgres;

pub use memory::InMemoryOutageStore;
pub use postgres::PgOutageStore;

use crate::error::StoreError;
use crate::models::OutageRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Outcome of a bulk insert that tolerates individual failures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertReport {
    pub inserted: usize,
    pub failed: usize,
}

/// Storage for the current outage set
#[async_trait]
pub trait OutageStore: Send + Sync {
    /// Remove every stored outage, returning how many were removed
    async fn delete_all(&self) -> Result<u64, StoreError>;

    /// Insert records one by one; a rejected record does not stop the rest
    async fn insert_many(&self, records: Vec<OutageRecord>) -> Result<InsertReport, StoreError>;

    /// Outages scraped at or after `since`, in insertion order
    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<OutageRecord>, StoreError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}
