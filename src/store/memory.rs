use crate::error::StoreError;
use crate::models::OutageRecord;
use crate::store::{InsertReport, OutageStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// In-memory outage store.
///
/// Mirrors the Postgres backend's rules: records without a community are
/// refused individually.
#[derive(Debug, Default, Clone)]
pub struct InMemoryOutageStore {
    outages: Arc<RwLock<Vec<OutageRecord>>>,
}

impl InMemoryOutageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl InMemoryOutageStore {
    /// Everything currently stored, regardless of age
    pub async fn snapshot(&self) -> Vec<OutageRecord> {
        self.outages.read().await.clone()
    }

    /// Pre-populate with records (useful for testing)
    pub async fn seed(&self, records: Vec<OutageRecord>) {
        *self.outages.write().await = records;
    }
}

fn check_record(record: &OutageRecord) -> Result<(), StoreError> {
    if record.community.is_empty() {
        return Err(StoreError::Rejected("community is empty".to_string()));
    }
    Ok(())
}

#[async_trait]
impl OutageStore for InMemoryOutageStore {
    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut outages = self.outages.write().await;
        let removed = outages.len() as u64;
        outages.clear();
        Ok(removed)
    }

    async fn insert_many(&self, records: Vec<OutageRecord>) -> Result<InsertReport, StoreError> {
        let mut outages = self.outages.write().await;
        let mut report = InsertReport::default();

        for record in records {
            match check_record(&record) {
                Ok(()) => {
                    outages.push(record);
                    report.inserted += 1;
                }
                Err(e) => {
                    warn!("Failed to insert outage: {}", e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<OutageRecord>, StoreError> {
        Ok(self
            .outages
            .read()
            .await
            .iter()
            .filter(|record| record.scraped_at >= since)
            .cloned()
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
