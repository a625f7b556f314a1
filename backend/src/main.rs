mod api;
mod config;
mod db;
mod errors;
mod keys;
mod models;
mod state;

use crate::config::Config;
use crate::errors::ApiError;
use crate::state::{AppState, Registry};
use cred_registry::SystemClock;
use cred_zk::Groth16Verifier;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().map_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
        ApiError::Internal
    })?;

    // Store local state under data/ (ignored by git).
    std::fs::create_dir_all(&config.data_dir).map_err(|_| ApiError::Internal)?;

    let db_path = config.data_dir.join("events.sqlite");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.to_string_lossy());

    let db = db::connect(&db_url).await?;
    db::init_schema(&db).await?;

    let mut registry = Registry::new(SystemClock);
    let mut zk_keys = BTreeMap::new();
    for &depth in &config.depths {
        let zk = keys::load_or_setup(&config.data_dir, depth).await?;
        registry.bind_verifier(depth, Arc::new(Groth16Verifier::new(depth, zk.vk.as_ref())))?;
        zk_keys.insert(depth, zk);
    }
    let depths = registry.supported_depths();
    let registry = state::restore(&db, registry).await?;

    let state = AppState::new(db, registry, zk_keys, &config.api_key);

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .map_err(|_| ApiError::Internal)?;

    tracing::info!(addr = %config.addr, ?depths, "backend listening");

    axum::serve(listener, app).await.map_err(|_| ApiError::Internal)?;

    Ok(())
}
