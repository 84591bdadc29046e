use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::{middleware, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use kindred_shared::clients::storage::PhotoStorage;
use kindred_shared::middleware::{metrics_middleware, ApiKeySource};

pub mod config;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod slots;
pub mod store;

use config::AppConfig;
use routes::{account, health, likes, photo, users};
use store::ProfileStore;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn ProfileStore>,
    pub storage: PhotoStorage,
    pub metrics_handle: PrometheusHandle,
}

impl ApiKeySource for AppState {
    fn api_key(&self) -> &str {
        &self.config.api_key
    }
}

/// Full HTTP surface. `/health`, `/metrics` and `/uploads` skip the API key.
pub fn build_router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;
    let uploads = ServeDir::new(state.storage.root());

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user).patch(users::update_user).delete(users::delete_user),
        )
        .route("/users/:id/password", put(account::change_password))
        .route("/users/:id/explore", get(likes::explore))
        .route("/users/:id/liked-me", get(likes::liked_me))
        .route("/users/:id/likes", get(likes::my_likes))
        .route("/users/:id/matches", get(likes::matches))
        .route("/login", post(account::login))
        .route("/likes", post(likes::send_like))
        .route(
            "/upload",
            post(photo::upload_photo).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .nest_service("/uploads", uploads)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
