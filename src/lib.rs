mod core;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::core::config::ImportConfig;
use crate::core::import::{run_import, ImportSummary};
use crate::core::storage::repository::ContentRepository;

struct AppState {
    config: ImportConfig,
    client: reqwest::Client,
    repository: ContentRepository,
}

pub async fn run() -> Result<(), std::io::Error> {
    let _ = dotenvy::from_filename(".env.local");
    let config = ImportConfig::from_env();
    let repository = ContentRepository::connect(&config.database_url)
        .await
        .map_err(std::io::Error::other)?;
    let client = build_http_client(config.request_timeout_secs).map_err(std::io::Error::other)?;
    let state = Arc::new(AppState {
        config,
        client,
        repository,
    });

    let background = state.clone();
    tokio::spawn(async move {
        loop {
            match run_import(&background.client, &background.repository, &background.config).await
            {
                Ok(summary) => tracing::info!(
                    "scheduled import finished: {} created, {} updated, {} skipped",
                    summary.created,
                    summary.updated,
                    summary.skipped
                ),
                Err(error) => tracing::warn!("scheduled import failed: {error}"),
            }
            tokio::time::sleep(Duration::from_secs(background.config.sync_interval_secs)).await;
        }
    });

    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
    tracing::info!("listening on {}", state.config.bind_addr);
    axum::serve(listener, build_router(state)).await
}

fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/import/run", get(trigger_import).post(trigger_import))
        .with_state(state)
}

async fn health() -> Json<BTreeMap<String, String>> {
    Json(BTreeMap::from([("status".to_string(), "ok".to_string())]))
}

async fn trigger_import(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ImportSummary>, (StatusCode, String)> {
    run_import(&state.client, &state.repository, &state.config)
        .await
        .map(Json)
        .map_err(|error| (StatusCode::BAD_GATEWAY, error.to_string()))
}
