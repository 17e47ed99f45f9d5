use anyhow::Result;
use async_trait::async_trait;

/// Common trait for outage page fetchers
/// This allows swapping the headless browser for a plain HTTP fetch (or a fixture in tests)
#[async_trait]
pub trait PageTextSource: Send + Sync {
    /// Retrieve the page and return its visible text
    async fn fetch_text(&self) -> Result<String>;

    /// Get the name of the fetcher
    fn source_name(&self) -> &'static str;
}
