//! # doclink-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to `PORT` (default 8080).

use std::sync::Arc;

use doclink_api::state::{AppConfig, AppState};
use doclink_core::StorageBackend;
use doclink_storage::{ConfigError, StorageClient, StorageConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!(?config, "configuration loaded");

    // Absent DATABASE_URL means in-memory stores.
    let db_pool = doclink_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let storage: Option<Arc<dyn StorageBackend>> = match StorageConfig::from_env() {
        Ok(storage_config) => {
            tracing::info!(?storage_config, "object storage configured");
            match StorageClient::new(storage_config) {
                Ok(client) => Some(Arc::new(client) as Arc<dyn StorageBackend>),
                Err(e) => {
                    tracing::error!("Failed to create storage client: {e}");
                    return Err(e.into());
                }
            }
        }
        Err(e @ ConfigError::MissingVar(_)) => {
            tracing::warn!(
                "Object storage not configured: {e}. Submission and upload signature endpoints will return 503."
            );
            None
        }
        Err(e) => {
            tracing::error!("Invalid object storage configuration: {e}");
            return Err(e.into());
        }
    };

    let port = config.port;
    let state = AppState::with_config(config, storage, db_pool);
    let app = doclink_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("doclink API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
