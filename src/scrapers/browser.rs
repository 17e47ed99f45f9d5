use crate::scrapers::traits::PageTextSource;
use crate::scrapers::types::FetchOptions;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const RESOURCE_COUNT_JS: &str = r#"
    document.readyState === 'complete'
        ? performance.getEntriesByType('resource').length
        : -1
"#;

const RESPONSE_STATUS_JS: &str = r#"
    (() => {
        const nav = performance.getEntriesByType('navigation')[0];
        return nav && typeof nav.responseStatus === 'number' ? nav.responseStatus : null;
    })()
"#;

const BODY_TEXT_JS: &str = "document.body ? document.body.innerText : ''";

/// Page fetcher that renders the outage page in headless Chrome.
///
/// A fresh browser is launched for every fetch and torn down before returning,
/// whether or not the fetch succeeded.
pub struct BrowserPageFetcher {
    options: FetchOptions,
}

impl BrowserPageFetcher {
    pub fn new(options: FetchOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl PageTextSource for BrowserPageFetcher {
    async fn fetch_text(&self) -> Result<String> {
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || render_page_text(&options))
            .await
            .context("Browser task did not complete")?
    }

    fn source_name(&self) -> &'static str {
        "headless-chrome"
    }
}

/// Closes the tab on every exit path; the browser process is killed when
/// `Browser` is dropped right after.
struct TabGuard(Arc<Tab>);

impl Drop for TabGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.close(false) {
            debug!("Failed to close tab: {:#}", e);
        }
    }
}

fn render_page_text(options: &FetchOptions) -> Result<String> {
    info!("Launching headless Chrome...");

    let launch = LaunchOptions::default_builder()
        .headless(true)
        .idle_browser_timeout(options.timeout + Duration::from_secs(30))
        .build()
        .context("Failed to build launch options")?;

    let browser = Browser::new(launch).context("Failed to launch Chrome browser")?;
    let tab = TabGuard(browser.new_tab().context("Failed to open tab")?);

    tab.0.set_default_timeout(options.timeout);
    tab.0
        .set_user_agent(&options.user_agent, None, None)
        .context("Failed to set user agent")?;

    info!(url = %options.url, "Opening outage page...");
    tab.0
        .navigate_to(&options.url)
        .with_context(|| format!("Failed to navigate to {}", options.url))?;
    tab.0
        .wait_until_navigated()
        .context("Timed out waiting for navigation")?;

    wait_for_network_idle(&tab.0, options)?;

    if let Some(status) = response_status(&tab.0)? {
        if !(200..300).contains(&status) {
            bail!("Outage page returned status {}", status);
        }
    }

    let text = tab
        .0
        .evaluate(BODY_TEXT_JS, false)
        .context("Failed to read page text")?
        .value
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    debug!("Extracted {} bytes of page text", text.len());

    Ok(text)
}

/// Wait until the set of loaded resources stops growing between two polls
fn wait_for_network_idle(tab: &Tab, options: &FetchOptions) -> Result<()> {
    let deadline = Instant::now() + options.timeout;
    let mut last = resource_count(tab)?;

    loop {
        thread::sleep(options.settle_interval);
        let current = resource_count(tab)?;

        if current >= 0 && current == last {
            debug!(resources = current, "Network settled");
            return Ok(());
        }

        if Instant::now() >= deadline {
            warn!(resources = current, "Network did not settle in time");
            bail!("Timed out waiting for the outage page to settle");
        }

        last = current;
    }
}

fn resource_count(tab: &Tab) -> Result<i64> {
    let result = tab
        .evaluate(RESOURCE_COUNT_JS, false)
        .context("Failed to query network activity")?;

    Ok(result.value.and_then(|v| v.as_i64()).unwrap_or(-1))
}

/// Status of the main document response, when the browser reports it
fn response_status(tab: &Tab) -> Result<Option<u64>> {
    let result = tab
        .evaluate(RESPONSE_STATUS_JS, false)
        .context("Failed to read response status")?;

    Ok(result
        .value
        .and_then(|v| v.as_u64())
        .filter(|status| *status != 0))
}
