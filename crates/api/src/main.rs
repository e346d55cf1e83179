//! Lorekeep server entry point.

use std::net::SocketAddr;

use anyhow::Context;
use lorekeep_lib::utils::logging::init_tracing;
use lorekeep_lib::{router, AppContext};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the subscriber reads RUST_LOG / LOREKEEP_LOG_FORMAT
    let dotenv = dotenvy::dotenv();
    init_tracing();
    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "Loaded .env"),
        Err(err) => tracing::debug!(error = %err, "No .env file loaded"),
    }

    let context = AppContext::new().await.context("failed to initialize application context")?;
    let bind_address = context.config.server.bind_address.clone();

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    tracing::info!(address = %bind_address, "Lorekeep listening");

    let app = router(context.state());
    let served = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    context.shutdown().await.context("shutdown failed")?;
    served.context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
