use std::sync::Arc;

use kindred_profiles::config::AppConfig;
use kindred_profiles::store::PgStore;
use kindred_profiles::{build_router, AppState};
use kindred_shared::clients::db;
use kindred_shared::clients::storage::PhotoStorage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kindred_shared::middleware::init_tracing("kindred-profiles");

    let config = AppConfig::load()?;
    let port = config.port;
    if config.uses_dev_api_key() {
        tracing::warn!("running with the development API key, set KINDRED__API_KEY");
    }

    let pool = db::create_pool(&config.database_url, config.db_pool_size)?;
    let storage = PhotoStorage::new(&config.upload_dir)?;
    let metrics_handle = kindred_shared::middleware::init_metrics()?;

    let state = Arc::new(AppState {
        store: Arc::new(PgStore::new(pool)),
        storage,
        metrics_handle,
        config,
    });

    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "kindred-profiles starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
