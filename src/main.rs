mod api;
mod config;
mod error;
mod models;
mod normalizer;
mod parser;
mod pipeline;
mod scheduler;
mod scrapers;
mod store;
mod sync;

use anyhow::{Context, Result};
use api::AppState;
use axum::http::{header, HeaderValue, Method};
use axum::{extract::State, routing::get, Json, Router};
use config::{Config, FetchMode};
use pipeline::ScrapePipeline;
use scheduler::{ScrapeScheduler, SchedulerState};
use scrapers::{BrowserPageFetcher, HttpPageFetcher, PageTextSource};
use serde::Serialize;
use std::sync::Arc;
use store::{InMemoryOutageStore, OutageStore, PgOutageStore};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    scheduler: &'static str,
}

async fn health(State(scheduler): State<Arc<ScrapeScheduler>>) -> Json<HealthResponse> {
    let scheduler = match scheduler.state() {
        SchedulerState::Running => "running",
        SchedulerState::Stopped => "stopped",
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        scheduler,
    })
}

async fn root() -> &'static str {
    "Water Service Lines API is running!"
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "outage_scout=info,tower_http=info".into()),
        )
        .init();

    info!("💧 Outage Scout - Water Outage Scraper");

    let config = Config::from_env().context("Invalid configuration")?;

    let store: Arc<dyn OutageStore> = match &config.database_url {
        Some(url) => Arc::new(
            PgOutageStore::connect(url)
                .await
                .context("Failed to connect to database")?,
        ),
        None => {
            warn!("DATABASE_URL not set, outages are kept in memory only");
            Arc::new(InMemoryOutageStore::new())
        }
    };
    info!(backend = store.backend_name(), "Outage store ready");

    let source: Arc<dyn PageTextSource> = match config.fetch_mode {
        FetchMode::Browser => Arc::new(BrowserPageFetcher::new(config.fetch_options())),
        FetchMode::Http => Arc::new(HttpPageFetcher::new(config.fetch_options())?),
    };
    info!(
        fetcher = source.source_name(),
        url = %config.source_url,
        "Outage page source configured"
    );

    let pipeline = Arc::new(ScrapePipeline::new(
        source,
        store.clone(),
        config.recency_window,
        config.source_zone,
    ));

    let scheduler = Arc::new(ScrapeScheduler::new(
        config.scrape_interval,
        pipeline.clone(),
    ));
    scheduler.start();

    let state = AppState {
        store,
        job: pipeline,
        window: config.recency_window,
    };
    let app = build_router(state, scheduler.clone(), &config.cors_origins);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    scheduler.stop();
    info!("Shut down");

    Ok(())
}

fn build_router(
    state: AppState,
    scheduler: Arc<ScrapeScheduler>,
    cors_origins: &[String],
) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health).with_state(scheduler))
        .merge(api::routes(state));

    let app = if origins.is_empty() {
        app
    } else {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT]),
        )
    };

    app.layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
