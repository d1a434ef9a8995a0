use anyhow::Context;
use filedrop::{config::AppConfig, storage::LocalFileStorage};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("filedrop=debug,info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let storage = LocalFileStorage::new(config.upload_dir.clone()).with_context(|| {
        format!(
            "failed to prepare upload directory {}",
            config.upload_dir.display()
        )
    })?;
    tracing::info!(dir = %storage.path().display(), "storing uploads");

    let app = filedrop::app(Arc::new(storage));

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
