use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clonehub::app;
use clonehub::config::AppConfig;
use clonehub::services::Service;

/// Serve one of the clone REST APIs over a document store.
#[derive(Debug, Parser)]
#[command(name = "clonehub", version, about)]
struct Cli {
    /// Which API to serve.
    #[arg(long, env = "CLONEHUB_SERVICE", value_enum)]
    service: Service,

    /// Configuration file. Defaults to `clonehub.toml` when present.
    #[arg(long, env = "CLONEHUB_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .init();

    tracing::info!(service = %cli.service, "Starting clonehub server...");

    let store = app::connect_store(&config, cli.service).await?;
    tracing::info!("Connected to document store");

    let router = app::build_router(cli.service, store, config.request_timeout());

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
