//! Turns the outage page text into per-outage records.
//!
//! Each entry on the page starts with the same marker and carries free text
//! lines such as `Priority: Emergency`. Every field is matched on its own, so a
//! missing line only leaves that one field empty.

use crate::models::ParsedOutage;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Literal that opens every outage entry on the page
pub const BLOCK_DELIMITER: &str = "Information |";

static COMMUNITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([^(]+?)\s+community\s+\(updated\s+([^)]+)\)").unwrap()
});
static PRIORITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Priority:\s*([^\r\n]+)").unwrap());
static STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)The current status is:\s*([^\r\n]+)").unwrap());
static REPAIR_LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Specific repair location:\s*([^\r\n]+)").unwrap());
static REPAIR_COMPLETION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Repair to be completed by:\s*([^\r\n]+)").unwrap());
static WATER_WAGON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)Water wagon:(.*?)(?:Priority:|The current status is:|Specific repair location:|Repair to be completed by:|\z)",
    )
    .unwrap()
});

static MERIDIEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([ap])\.?\s*m\.?(?:\s|$)").unwrap());
static TRAILING_ZONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(MT|MST|MDT)\.?$").unwrap());
static AT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s+at\s+").unwrap());

const DATETIME_FORMATS: &[&str] = &[
    "%B %d, %Y %I:%M %p",
    "%B %d %Y %I:%M %p",
    "%B %d, %Y %H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%B %d, %Y", "%B %d %Y", "%Y-%m-%d"];

/// Split page text into raw outage blocks.
///
/// Text before the first delimiter is navigation chrome and is dropped, so a
/// page with `k` delimiters yields exactly `k` blocks.
pub fn split_blocks(text: &str) -> Vec<&str> {
    text.split(BLOCK_DELIMITER).skip(1).collect()
}

/// Parse every block on the page
pub fn parse_page(text: &str, source_zone: Tz) -> Vec<ParsedOutage> {
    let blocks = split_blocks(text);
    debug!("Found {} outage blocks", blocks.len());

    blocks
        .into_iter()
        .map(|block| parse_block(block, source_zone))
        .collect()
}

/// Extract all known fields from a single block
pub fn parse_block(block: &str, source_zone: Tz) -> ParsedOutage {
    let block = block.trim();

    let (community, updated_time) = community_and_updated_time(block).unwrap_or_default();
    let updated_date = parse_updated_time(&updated_time, source_zone);

    ParsedOutage {
        community,
        updated_time,
        priority: priority(block).unwrap_or_default(),
        current_status: current_status(block).unwrap_or_default(),
        repair_location: repair_location(block).unwrap_or_default(),
        repair_completion: repair_completion(block).unwrap_or_default(),
        water_wagon_info: water_wagon(block).unwrap_or_default(),
        updated_date,
    }
}

/// `"<name> community (updated <timestamp>)"` at the start of the block
pub fn community_and_updated_time(block: &str) -> Option<(String, String)> {
    let caps = COMMUNITY_RE.captures(block)?;
    let community = caps.get(1)?.as_str().trim().to_string();
    let updated = caps.get(2)?.as_str().trim().to_string();
    Some((community, updated))
}

pub fn priority(block: &str) -> Option<String> {
    first_capture(&PRIORITY_RE, block)
}

pub fn current_status(block: &str) -> Option<String> {
    first_capture(&STATUS_RE, block)
}

pub fn repair_location(block: &str) -> Option<String> {
    first_capture(&REPAIR_LOCATION_RE, block)
}

pub fn repair_completion(block: &str) -> Option<String> {
    first_capture(&REPAIR_COMPLETION_RE, block)
}

/// Free text following `Water wagon:` up to the next known marker
pub fn water_wagon(block: &str) -> Option<String> {
    first_capture(&WATER_WAGON_RE, block)
}

fn first_capture(re: &Regex, block: &str) -> Option<String> {
    let value = re.captures(block)?.get(1)?.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Best-effort reading of a published timestamp such as `April 29, 2025 11:34 AM`.
///
/// A trailing `MST` or `MDT` pins the offset. Otherwise local times are placed
/// in `source_zone`; in the repeated hour after clocks fall back the earlier
/// instant wins. Returns `None` rather than failing when nothing matches.
pub fn parse_updated_time(text: &str, source_zone: Tz) -> Option<DateTime<Utc>> {
    let (cleaned, zone) = clean_timestamp(text);
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&cleaned) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&cleaned, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    match zone.as_deref() {
        Some("MST") => fixed_hours_west(7, &naive),
        Some("MDT") => fixed_hours_west(6, &naive),
        _ => source_zone
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

fn fixed_hours_west(hours: i32, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    FixedOffset::west_opt(hours * 3600)?
        .from_local_datetime(naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Normalize spacing and meridiem markers, splitting off a trailing zone abbreviation
fn clean_timestamp(text: &str) -> (String, Option<String>) {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let zone = TRAILING_ZONE_RE
        .captures(&collapsed)
        .map(|caps| caps[1].to_uppercase());
    let without_zone = TRAILING_ZONE_RE.replace(&collapsed, "");
    let without_at = AT_RE.replace_all(&without_zone, " ");
    let meridiem = MERIDIEM_RE.replace_all(&without_at, |caps: &regex::Captures| {
        format!(" {}M ", caps[1].to_uppercase())
    });
    (meridiem.split_whitespace().collect::<Vec<_>>().join(" "), zone)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRIDGELAND: &str = "BRIDGELAND/RIVERSIDE community (updated April 29, 2025 11:34 AM)\nPriority: Emergency\nThe current status is: Repair in Progress\nSpecific repair location: Ave NE\nRepair to be completed by: May 1, 2025";

    fn mountain() -> Tz {
        chrono_tz::America::Edmonton
    }

    #[test]
    fn splits_on_each_delimiter_and_drops_preamble() {
        let text = "Skip to main content\nWater outages\nInformation | A community (updated x)\nInformation | B community (updated y)\nInformation |";
        let blocks = split_blocks(text);

        assert_eq!(blocks.len(), 3);
        assert!(blocks[0].contains("A community"));
        assert!(blocks[1].contains("B community"));
        assert_eq!(blocks[2], "");
    }

    #[test]
    fn page_without_delimiter_has_no_blocks() {
        assert!(split_blocks("").is_empty());
        assert!(split_blocks("There are currently no water outages.").is_empty());
        assert!(parse_page("", mountain()).is_empty());
    }

    #[test]
    fn parses_full_block() {
        let outage = parse_block(BRIDGELAND, mountain());

        assert_eq!(outage.community, "BRIDGELAND/RIVERSIDE");
        assert_eq!(outage.updated_time, "April 29, 2025 11:34 AM");
        assert_eq!(outage.priority, "Emergency");
        assert_eq!(outage.current_status, "Repair in Progress");
        assert_eq!(outage.repair_location, "Ave NE");
        assert_eq!(outage.repair_completion, "May 1, 2025");
        assert_eq!(outage.water_wagon_info, "");
        assert_eq!(
            outage.updated_date,
            Some(Utc.with_ymd_and_hms(2025, 4, 29, 17, 34, 0).unwrap())
        );
    }

    #[test]
    fn missing_priority_leaves_other_fields_intact() {
        let block = BRIDGELAND.replace("Priority: Emergency\n", "");
        let outage = parse_block(&block, mountain());

        assert_eq!(outage.priority, "");
        assert_eq!(outage.community, "BRIDGELAND/RIVERSIDE");
        assert_eq!(outage.current_status, "Repair in Progress");
        assert_eq!(outage.repair_location, "Ave NE");
        assert_eq!(outage.repair_completion, "May 1, 2025");
    }

    #[test]
    fn block_without_community_header_keeps_other_fields() {
        let outage = parse_block("Priority: Planned\nThe current status is: Crew assigned", mountain());

        assert_eq!(outage.community, "");
        assert_eq!(outage.updated_time, "");
        assert_eq!(outage.updated_date, None);
        assert_eq!(outage.priority, "Planned");
        assert_eq!(outage.current_status, "Crew assigned");
    }

    #[test]
    fn takes_first_status_only() {
        let block = "X community (updated April 29, 2025 1:00 PM)\nThe current status is: Investigating\nThe current status is: Repair in Progress";

        assert_eq!(current_status(block).as_deref(), Some("Investigating"));
    }

    #[test]
    fn markers_match_case_insensitively() {
        let block = "  sunnyside COMMUNITY (Updated April 30, 2025 9:05 am)\npriority: emergency\n";
        let outage = parse_block(block, mountain());

        assert_eq!(outage.community, "sunnyside");
        assert_eq!(outage.updated_time, "April 30, 2025 9:05 am");
        assert_eq!(outage.priority, "emergency");
        assert!(outage.updated_date.is_some());
    }

    #[test]
    fn water_wagon_stops_at_next_marker() {
        let block = "X community (updated April 29, 2025 1:00 PM)\nWater wagon: Available at\n123 Main St\nRepair to be completed by: May 2, 2025";

        assert_eq!(water_wagon(block).as_deref(), Some("Available at\n123 Main St"));
        assert_eq!(repair_completion(block).as_deref(), Some("May 2, 2025"));
    }

    #[test]
    fn water_wagon_runs_to_end_of_block() {
        let block = "Water wagon: 8 Ave and 4 St NE";

        assert_eq!(water_wagon(block).as_deref(), Some("8 Ave and 4 St NE"));
    }

    #[test]
    fn reads_common_timestamp_shapes() {
        let zone = mountain();
        let expected = Utc.with_ymd_and_hms(2025, 4, 29, 17, 34, 0).unwrap();

        assert_eq!(parse_updated_time("April 29, 2025 11:34 AM", zone), Some(expected));
        assert_eq!(parse_updated_time("Apr 29, 2025 11:34 a.m.", zone), Some(expected));
        assert_eq!(parse_updated_time("April 29, 2025 at 11:34 AM MDT", zone), Some(expected));
        assert_eq!(parse_updated_time("2025-04-29T17:34:00Z", zone), Some(expected));
        assert_eq!(
            parse_updated_time("May 1, 2025", zone),
            Some(Utc.with_ymd_and_hms(2025, 5, 1, 6, 0, 0).unwrap())
        );
    }

    #[test]
    fn unreadable_timestamp_is_none() {
        assert_eq!(parse_updated_time("", mountain()), None);
        assert_eq!(parse_updated_time("sometime this week", mountain()), None);
        assert_eq!(parse_updated_time("February 30, 2025 10:00 AM", mountain()), None);
    }

    #[test]
    fn winter_times_use_standard_offset() {
        assert_eq!(
            parse_updated_time("December 10, 2025 11:00 AM", mountain()),
            Some(Utc.with_ymd_and_hms(2025, 12, 10, 18, 0, 0).unwrap())
        );
    }

    #[test]
    fn summer_times_use_daylight_offset() {
        assert_eq!(
            parse_updated_time("July 15, 2025 11:00 AM", mountain()),
            Some(Utc.with_ymd_and_hms(2025, 7, 15, 17, 0, 0).unwrap())
        );
    }

    #[test]
    fn explicit_zone_suffix_overrides_calendar() {
        assert_eq!(
            parse_updated_time("December 10, 2025 11:00 AM MST", mountain()),
            Some(Utc.with_ymd_and_hms(2025, 12, 10, 18, 0, 0).unwrap())
        );
        assert_eq!(
            parse_updated_time("July 15, 2025 11:00 AM MST", mountain()),
            Some(Utc.with_ymd_and_hms(2025, 7, 15, 18, 0, 0).unwrap())
        );
        assert_eq!(
            parse_updated_time("December 10, 2025 11:00 AM mdt", mountain()),
            Some(Utc.with_ymd_and_hms(2025, 12, 10, 17, 0, 0).unwrap())
        );
    }

    #[test]
    fn repeated_hour_resolves_to_earlier_instant() {
        // Clocks fall back from 02:00 MDT to 01:00 MST on November 2, 2025
        assert_eq!(
            parse_updated_time("November 2, 2025 1:30 AM", mountain()),
            Some(Utc.with_ymd_and_hms(2025, 11, 2, 7, 30, 0).unwrap())
        );
    }
}
