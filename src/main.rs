mod config;
mod db;
mod scheduling;
mod server;
mod types;

use crate::config::AppConfig;
use crate::db::SchedulingDbManager;
use crate::types::AppState;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const CONFIG_PATH_ENV: &str = "TIMETABLER_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.json".to_string());
    let config = AppConfig::load(Path::new(&config_path))
        .map_err(|e| anyhow::anyhow!("failed to load config {config_path}: {e}"))?;

    let db = SchedulingDbManager::new(&config.db_path)?;
    info!("Database ready at {}", config.db_path);

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState { db, config });
    let router = server::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", bind_addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
