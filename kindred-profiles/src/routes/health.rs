use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use kindred_shared::{HealthCheck, HealthResponse};

use crate::AppState;

/// Probes the database and the upload directory.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let store = state.store.clone();
    let database = match tokio::task::spawn_blocking(move || store.ping()).await {
        Ok(Ok(())) => HealthCheck::healthy("database"),
        Ok(Err(e)) => HealthCheck::unhealthy("database", e.to_string()),
        Err(e) => HealthCheck::unhealthy("database", e.to_string()),
    };

    let storage = if tokio::fs::metadata(state.storage.root())
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        HealthCheck::healthy("storage")
    } else {
        HealthCheck::unhealthy("storage", "upload directory is missing")
    };

    let response = HealthResponse::healthy("kindred-profiles", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![database, storage]);

    (response.http_status(), Json(response)).into_response()
}

/// Returns Prometheus metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}
