use crate::models::{OutageRecord, ParsedOutage};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

/// Whether a timestamp exactly at the window cutoff counts as recent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Inclusive,
    Exclusive,
}

/// How far back an outage's published update time may lie and still be kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyWindow {
    pub length: Duration,
    pub boundary: Boundary,
}

impl RecencyWindow {
    pub fn hours(hours: i64) -> Self {
        Self {
            length: Duration::hours(hours),
            boundary: Boundary::Inclusive,
        }
    }

    /// `None` when `hours` does not fit in a `Duration`
    pub fn try_hours(hours: i64) -> Option<Self> {
        Some(Self {
            length: Duration::try_hours(hours)?,
            boundary: Boundary::Inclusive,
        })
    }

    pub fn with_boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = boundary;
        self
    }

    /// Oldest timestamp still inside the window at `now`
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.length)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn contains(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let cutoff = self.cutoff(now);
        match self.boundary {
            Boundary::Inclusive => timestamp >= cutoff,
            Boundary::Exclusive => timestamp > cutoff,
        }
    }
}

impl Default for RecencyWindow {
    fn default() -> Self {
        Self::hours(24)
    }
}

/// Decide whether a parsed outage may be persisted.
///
/// Unparsed update times are kept so that real entries with an unexpected
/// date format are not lost.
pub fn is_valid(outage: &ParsedOutage, scrape_time: DateTime<Utc>, window: &RecencyWindow) -> bool {
    if outage.community.is_empty() {
        return false;
    }

    match outage.updated_date {
        Some(updated) => window.contains(updated, scrape_time),
        None => true,
    }
}

/// Filter parsed outages and stamp the survivors with the scrape time
pub fn normalize(
    parsed: Vec<ParsedOutage>,
    scrape_time: DateTime<Utc>,
    window: &RecencyWindow,
) -> Vec<OutageRecord> {
    let total = parsed.len();

    let records: Vec<OutageRecord> = parsed
        .into_iter()
        .filter(|outage| {
            let keep = is_valid(outage, scrape_time, window);
            if !keep {
                debug!(
                    community = %outage.community,
                    updated_time = %outage.updated_time,
                    "Dropping outage block"
                );
            }
            keep
        })
        .map(|outage| OutageRecord::from_parsed(outage, scrape_time))
        .collect();

    info!(total, valid = records.len(), "Normalized outage blocks");

    records
}
