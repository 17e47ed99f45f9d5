use crate::models::OutageRecord;
use crate::normalizer::{self, RecencyWindow};
use crate::parser;
use crate::scrapers::PageTextSource;
use crate::store::OutageStore;
use crate::sync;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// A unit of work the scheduler can trigger
#[async_trait]
pub trait ScrapeJob: Send + Sync {
    async fn run_cycle(&self) -> Vec<OutageRecord>;

    /// Like `run_cycle`, but returns `None` instead of waiting when a cycle is already underway
    async fn try_run_cycle(&self) -> Option<Vec<OutageRecord>> {
        Some(self.run_cycle().await)
    }
}

/// Fetch, parse, normalize and store one round of outages.
///
/// Cycles are serialized, so a manual trigger never interleaves its
/// delete/insert with a scheduled one.
pub struct ScrapePipeline {
    source: Arc<dyn PageTextSource>,
    store: Arc<dyn OutageStore>,
    window: RecencyWindow,
    source_zone: Tz,
    cycle_lock: Mutex<()>,
}

impl ScrapePipeline {
    pub fn new(
        source: Arc<dyn PageTextSource>,
        store: Arc<dyn OutageStore>,
        window: RecencyWindow,
        source_zone: Tz,
    ) -> Self {
        Self {
            source,
            store,
            window,
            source_zone,
            cycle_lock: Mutex::new(()),
        }
    }

    /// Run one cycle and return the outages it produced, whether or not they were saved
    pub async fn run(&self) -> Vec<OutageRecord> {
        let _cycle = self.cycle_lock.lock().await;
        self.cycle(Utc::now()).await
    }

    /// Run one cycle unless another is in progress
    pub async fn try_run(&self) -> Option<Vec<OutageRecord>> {
        let _cycle = self.cycle_lock.try_lock().ok()?;
        Some(self.cycle(Utc::now()).await)
    }

    async fn cycle(&self, scrape_time: DateTime<Utc>) -> Vec<OutageRecord> {
        let started = Instant::now();

        let text = match self.source.fetch_text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    source = self.source.source_name(),
                    "Could not retrieve outage page, treating as no outages: {:#}", e
                );
                String::new()
            }
        };

        let parsed = parser::parse_page(&text, self.source_zone);
        let records = normalizer::normalize(parsed, scrape_time, &self.window);
        let report = sync::replace_all(self.store.as_ref(), &records).await;

        info!(
            found = records.len(),
            inserted = report.inserted,
            failed = report.failed,
            complete = report.is_complete(),
            elapsed = ?started.elapsed(),
            "Scrape cycle finished"
        );

        records
    }
}

#[async_trait]
impl ScrapeJob for ScrapePipeline {
    async fn run_cycle(&self) -> Vec<OutageRecord> {
        self.run().await
    }

    async fn try_run_cycle(&self) -> Option<Vec<OutageRecord>> {
        self.try_run().await
    }
}
