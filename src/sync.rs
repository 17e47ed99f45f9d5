use crate::models::OutageRecord;
use crate::store::OutageStore;
use tracing::{error, info, warn};

/// What happened when the stored outage set was replaced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Rows removed, `None` if the delete failed and nothing was written
    pub deleted: Option<u64>,
    pub inserted: usize,
    pub failed: usize,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.deleted.is_some() && self.failed == 0
    }
}

/// Replace the stored outages with `records`.
///
/// Never fails: a failed delete leaves the old set in place, and failed
/// inserts only affect their own record.
pub async fn replace_all(store: &dyn OutageStore, records: &[OutageRecord]) -> SyncReport {
    let mut report = SyncReport::default();

    match store.delete_all().await {
        Ok(deleted) => report.deleted = Some(deleted),
        Err(e) => {
            error!(backend = store.backend_name(), "Failed to clear old outages: {}", e);
            return report;
        }
    }

    if records.is_empty() {
        info!(deleted = ?report.deleted, "Cleared outages, nothing new to insert");
        return report;
    }

    match store.insert_many(records.to_vec()).await {
        Ok(insert) => {
            report.inserted = insert.inserted;
            report.failed = insert.failed;
        }
        Err(e) => {
            error!(backend = store.backend_name(), "Failed to insert outages: {}", e);
            report.failed = records.len();
            return report;
        }
    }

    if report.inserted == 0 {
        error!(failed = report.failed, "No outages could be saved");
    } else if report.failed > 0 {
        warn!(
            inserted = report.inserted,
            failed = report.failed,
            "Saved outages with some failures"
        );
    } else {
        info!(
            deleted = ?report.deleted,
            inserted = report.inserted,
            "Replaced stored outages"
        );
    }

    report
}
