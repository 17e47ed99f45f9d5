// Service configuration
//
// Loaded from environment variables (optionally via a `.env` file). Every
// setting has a default, so the service starts with an empty environment and
// an in-memory store.

use crate::error::ConfigError;
use crate::normalizer::{Boundary, RecencyWindow};
use crate::scrapers::{FetchOptions, DEFAULT_SOURCE_URL};
use chrono_tz::Tz;
use std::str::FromStr;
use std::time::Duration;

/// Largest accepted recency window, ten years
const MAX_WINDOW_HOURS: i64 = 24 * 366 * 10;

/// How the outage page is retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Render in headless Chrome, so client-side content is included
    Browser,
    /// Plain HTTP GET without running scripts
    Http,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source_url: String,
    /// Postgres connection string; `None` selects the in-memory store
    pub database_url: Option<String>,
    pub scrape_interval: Duration,
    pub recency_window: RecencyWindow,
    pub fetch_mode: FetchMode,
    pub page_timeout: Duration,
    /// Time zone of the local times published on the outage page
    pub source_zone: Tz,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `OUTAGE_SOURCE_URL`: page to scrape (default: Calgary water outages)
    /// - `DATABASE_URL`: Postgres URL (default: in-memory store)
    /// - `SCRAPE_INTERVAL_MINUTES`: minutes between scrapes (default: 30)
    /// - `RECENCY_WINDOW_HOURS`: how old an update may be (default: 24)
    /// - `RECENCY_BOUNDARY`: `inclusive` or `exclusive` (default: inclusive)
    /// - `FETCH_MODE`: `browser` or `http` (default: browser)
    /// - `PAGE_TIMEOUT_SECS`: page load timeout (default: 60)
    /// - `SOURCE_TIMEZONE`: IANA zone of published times (default: America/Edmonton)
    /// - `PORT`: HTTP port (default: 5001)
    /// - `CORS_ALLOWED_ORIGINS`: comma separated (default: http://localhost:3000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let source_url = get("OUTAGE_SOURCE_URL").unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string());
        let database_url = get("DATABASE_URL");

        let interval_minutes: u64 = parse_positive(&get, "SCRAPE_INTERVAL_MINUTES", 30)?;
        let scrape_interval = interval_minutes
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| {
                ConfigError::invalid(
                    "SCRAPE_INTERVAL_MINUTES",
                    interval_minutes.to_string(),
                    "interval too large",
                )
            })?;

        let window_hours: i64 = parse_positive(&get, "RECENCY_WINDOW_HOURS", 24)?;
        if window_hours > MAX_WINDOW_HOURS {
            return Err(ConfigError::invalid(
                "RECENCY_WINDOW_HOURS",
                window_hours.to_string(),
                "must be at most ten years",
            ));
        }
        let window = RecencyWindow::try_hours(window_hours).ok_or_else(|| {
            ConfigError::invalid(
                "RECENCY_WINDOW_HOURS",
                window_hours.to_string(),
                "window out of range",
            )
        })?;

        let timeout_secs: u64 = parse_positive(&get, "PAGE_TIMEOUT_SECS", 60)?;

        let boundary = match get("RECENCY_BOUNDARY") {
            None => Boundary::Inclusive,
            Some(v) => match v.to_lowercase().as_str() {
                "inclusive" => Boundary::Inclusive,
                "exclusive" => Boundary::Exclusive,
                _ => {
                    return Err(ConfigError::invalid(
                        "RECENCY_BOUNDARY",
                        v,
                        "expected inclusive or exclusive",
                    ))
                }
            },
        };

        let fetch_mode = match get("FETCH_MODE") {
            None => FetchMode::Browser,
            Some(v) => match v.to_lowercase().as_str() {
                "browser" => FetchMode::Browser,
                "http" => FetchMode::Http,
                _ => return Err(ConfigError::invalid("FETCH_MODE", v, "expected browser or http")),
            },
        };

        let source_zone = match get("SOURCE_TIMEZONE") {
            None => chrono_tz::America::Edmonton,
            Some(v) => v
                .parse::<Tz>()
                .map_err(|_| ConfigError::invalid("SOURCE_TIMEZONE", v, "unknown time zone"))?,
        };

        let port: u16 = parse_var(&get, "PORT", 5001)?;

        let cors_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);

        Ok(Self {
            source_url,
            database_url,
            scrape_interval,
            recency_window: window.with_boundary(boundary),
            fetch_mode,
            page_timeout: Duration::from_secs(timeout_secs),
            source_zone,
            port,
            cors_origins,
        })
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::new(self.source_url.clone()).with_timeout(self.page_timeout)
    }
}

fn parse_var<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| ConfigError::invalid(name, v, "not a valid number")),
    }
}

fn parse_positive<T: FromStr + PartialOrd + Default>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    let value = parse_var(get, name, default)?;
    if value <= T::default() {
        return Err(ConfigError::invalid(
            name,
            get(name).unwrap_or_default(),
            "must be positive",
        ));
    }
    Ok(value)
}
