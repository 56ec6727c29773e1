use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::errors::TaskplaneError;
use crate::storage::DbPool;

use super::routes::build_router;

/// Bind the HTTP API and serve it until a shutdown signal arrives.
pub async fn start_api_server(config: &AppConfig, pool: DbPool) -> crate::Result<()> {
    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .map_err(|e| TaskplaneError::config(format!("invalid API address: {}", e)))?;

    let router = build_router(pool, config);

    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, "Starting HTTP API server");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "API server shutdown listener failed");
            }
        })
        .await
        .map_err(|e| TaskplaneError::internal(format!("API server error: {}", e)))?;

    info!("API server shutdown completed");
    Ok(())
}
