use crate::scrapers::traits::PageTextSource;
use crate::scrapers::types::FetchOptions;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Node, Selector};
use tracing::{debug, info, warn};

/// Elements whose text never shows up on screen
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements that start a new line in rendered text
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre",
    "section", "table", "tr", "ul",
];

/// Page fetcher that downloads the outage page without running scripts
pub struct HttpPageFetcher {
    client: Client,
    options: FetchOptions,
}

impl HttpPageFetcher {
    pub fn new(options: FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.as_str())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, options })
    }
}

#[async_trait]
impl PageTextSource for HttpPageFetcher {
    async fn fetch_text(&self) -> Result<String> {
        let url = &self.options.url;
        info!(url = %url, "Fetching outage page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch outage page")?;

        if !response.status().is_success() {
            warn!("Outage page returned status: {}", response.status());
            anyhow::bail!("Failed to fetch outage page: {}", response.status());
        }

        let html = response.text().await.context("Failed to read response body")?;

        debug!("Downloaded {} bytes of HTML", html.len());

        Ok(visible_text(&html))
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Flatten an HTML document into the text a reader would see, one line per block
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").expect("static selector");

    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let mut raw = String::new();
    for node in body.descendants() {
        match node.value() {
            Node::Text(text) => {
                let hidden = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|el| HIDDEN_TAGS.contains(&el.name()))
                });
                if !hidden {
                    raw.push_str(text);
                }
            }
            Node::Element(el) if BLOCK_TAGS.contains(&el.name()) => raw.push('\n'),
            _ => {}
        }
    }

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
