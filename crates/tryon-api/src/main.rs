use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use tryon_api::{build_router, AppState};
use tryon_core::constants::WEBHOOK_PROMPT;
use tryon_core::Config;
use tryon_webhook::WebhookClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let compose = Arc::new(WebhookClient::new(
        config.webhook_url.clone(),
        WEBHOOK_PROMPT.to_string(),
        config.webhook_timeout(),
    )?);

    let state = AppState::build(config.clone(), compose).await?;
    let router = build_router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    tracing::info!(addr = %addr, "starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Listen for Ctrl+C (SIGINT) and SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C");
        },
        _ = terminate => {
            tracing::info!("received terminate signal");
        },
    }

    tracing::info!("shutting down");
}
