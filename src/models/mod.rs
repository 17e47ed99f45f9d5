use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One outage entry as extracted from the page, before validation.
///
/// Text fields are empty when the corresponding marker was not found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedOutage {
    pub community: String,
    pub updated_time: String,
    pub priority: String,
    pub current_status: String,
    pub repair_location: String,
    pub repair_completion: String,
    pub water_wagon_info: String,
    /// Parsed form of `updated_time`; `None` when the text could not be read as a date
    pub updated_date: Option<DateTime<Utc>>,
}

/// Outage record as persisted and served by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutageRecord {
    pub community: String,
    pub updated_time: String,
    pub priority: String,
    pub current_status: String,
    pub repair_location: String,
    pub repair_completion: String,
    #[serde(default)]
    pub water_wagon_info: String,
    pub scraped_at: DateTime<Utc>,
}

impl OutageRecord {
    /// Build the persisted form of a parsed outage, dropping the transient date
    pub fn from_parsed(parsed: ParsedOutage, scraped_at: DateTime<Utc>) -> Self {
        Self {
            community: parsed.community,
            updated_time: parsed.updated_time,
            priority: parsed.priority,
            current_status: parsed.current_status,
            repair_location: parsed.repair_location,
            repair_completion: parsed.repair_completion,
            water_wagon_info: parsed.water_wagon_info,
            scraped_at,
        }
    }
}
