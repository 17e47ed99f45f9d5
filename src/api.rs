// Outage API endpoints

use crate::models::OutageRecord;
use crate::normalizer::RecencyWindow;
use crate::pipeline::ScrapeJob;
use crate::store::OutageStore;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const NO_OUTAGES_MESSAGE: &str = "No recent water outage data available.";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OutageStore>,
    pub job: Arc<dyn ScrapeJob>,
    pub window: RecencyWindow,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OutageResponse {
    pub content: String,
    pub outages: Vec<OutageRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn summary(count: usize) -> String {
    match count {
        0 => NO_OUTAGES_MESSAGE.to_string(),
        1 => "1 recent water outage reported.".to_string(),
        n => format!("{} recent water outages reported.", n),
    }
}

/// Current outages from the last scrape that are still inside the recency window
pub async fn list_outages(State(state): State<AppState>) -> (StatusCode, Json<OutageResponse>) {
    let since = state.window.cutoff(Utc::now());

    match state.store.list_since(since).await {
        Ok(outages) => (
            StatusCode::OK,
            Json(OutageResponse {
                content: summary(outages.len()),
                outages,
            }),
        ),
        Err(e) => {
            tracing::error!("Failed to load outages: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(OutageResponse {
                    content: format!("Failed to load water outage data: {}", e),
                    outages: Vec::new(),
                }),
            )
        }
    }
}

/// Run one scrape cycle now and return what it found
pub async fn trigger_scrape(
    State(state): State<AppState>,
) -> Result<Json<Vec<OutageRecord>>, (StatusCode, Json<ErrorResponse>)> {
    tracing::info!("Manual scrape requested");

    let job = state.job.clone();
    let records = tokio::spawn(async move { job.run_cycle().await })
        .await
        .map_err(|e| {
            tracing::error!("Manual scrape failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Scraping failed".to_string(),
                }),
            )
        })?;

    Ok(Json(records))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/wateroutage", get(list_outages))
        .route("/api/wateroutage/scrape", get(trigger_scrape))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::pipeline::tests::StaticSource;
    use crate::pipeline::ScrapePipeline;
    use crate::store::{InMemoryOutageStore, InsertReport};
    use crate::sync::tests::record;
    use async_trait::async_trait;
    use axum::{body::Body, http::Request};
    use chrono::{DateTime, Duration};
    use http_body_util::BodyExt;
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    struct BrokenStore;

    #[async_trait]
    impl OutageStore for BrokenStore {
        async fn delete_all(&self) -> Result<u64, StoreError> {
            Err(StoreError::Rejected("offline".to_string()))
        }

        async fn insert_many(&self, _: Vec<OutageRecord>) -> Result<InsertReport, StoreError> {
            Err(StoreError::Rejected("offline".to_string()))
        }

        async fn list_since(&self, _: DateTime<Utc>) -> Result<Vec<OutageRecord>, StoreError> {
            Err(StoreError::Rejected("offline".to_string()))
        }

        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    struct PanickingJob;

    #[async_trait]
    impl ScrapeJob for PanickingJob {
        async fn run_cycle(&self) -> Vec<OutageRecord> {
            panic!("browser crashed");
        }
    }

    fn app_with(store: Arc<dyn OutageStore>, page: Option<&str>) -> Router {
        let job = Arc::new(ScrapePipeline::new(
            Arc::new(StaticSource(page.map(str::to_string))),
            store.clone(),
            RecencyWindow::default(),
            crate::pipeline::tests::mountain(),
        ));
        routes(AppState {
            store,
            job,
            window: RecencyWindow::default(),
        })
    }

    async fn get_json<T: DeserializeOwned>(app: Router, uri: &str) -> (StatusCode, T) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn lists_recent_outages() {
        let store = Arc::new(InMemoryOutageStore::new());
        let mut stale = record("OLD");
        stale.scraped_at = Utc::now() - Duration::hours(30);
        store.seed(vec![record("BOWNESS"), stale]).await;

        let (status, body): (_, OutageResponse) =
            get_json(app_with(store, Some("")), "/api/wateroutage").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.content, "1 recent water outage reported.");
        assert_eq!(body.outages.len(), 1);
        assert_eq!(body.outages[0].community, "BOWNESS");
    }

    #[tokio::test]
    async fn empty_page_clears_outages() {
        let store = Arc::new(InMemoryOutageStore::new());
        store.seed(vec![record("BOWNESS")]).await;
        let app = app_with(store, Some(""));

        let (status, scraped): (_, Vec<OutageRecord>) =
            get_json(app.clone(), "/api/wateroutage/scrape").await;
        assert_eq!(status, StatusCode::OK);
        assert!(scraped.is_empty());

        let (status, body): (_, OutageResponse) = get_json(app, "/api/wateroutage").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.content, NO_OUTAGES_MESSAGE);
        assert!(body.outages.is_empty());
    }

    #[tokio::test]
    async fn scrape_reports_records_even_when_store_fails() {
        let page = "Information | BRIDGELAND/RIVERSIDE community (updated not yet known)\nPriority: Emergency";
        let app = app_with(Arc::new(BrokenStore), Some(page));

        let (status, scraped): (_, Vec<OutageRecord>) =
            get_json(app, "/api/wateroutage/scrape").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(scraped.len(), 1);
        assert_eq!(scraped[0].community, "BRIDGELAND/RIVERSIDE");
        assert_eq!(scraped[0].priority, "Emergency");
    }

    #[tokio::test]
    async fn store_read_failure_returns_envelope() {
        let app = app_with(Arc::new(BrokenStore), Some(""));

        let (status, body): (_, OutageResponse) = get_json(app, "/api/wateroutage").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.content.contains("offline"));
        assert!(body.outages.is_empty());
    }

    #[tokio::test]
    async fn failed_scrape_returns_error_body() {
        let app = routes(AppState {
            store: Arc::new(InMemoryOutageStore::new()),
            job: Arc::new(PanickingJob),
            window: RecencyWindow::default(),
        });

        let (status, body): (_, ErrorResponse) = get_json(app, "/api/wateroutage/scrape").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Scraping failed");
    }
}
