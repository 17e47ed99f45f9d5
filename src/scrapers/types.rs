use std::time::Duration;

/// Public water-outage status page for the City of Calgary
pub const DEFAULT_SOURCE_URL: &str =
    "https://www.calgary.ca/water/customer-service/water-outages.html";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Parameters for retrieving the outage page
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Page to fetch
    pub url: String,
    /// Upper bound for loading the page, including waiting for the network to settle
    pub timeout: Duration,
    /// Pause between two checks of network activity
    pub settle_interval: Duration,
    pub user_agent: String,
}

impl FetchOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            timeout: Duration::from_secs(60),
            settle_interval: Duration::from_millis(500),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
