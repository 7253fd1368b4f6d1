// crates/server/src/main.rs
//! halweb server binary.
//!
//! Parses configuration, binds the listener and serves until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use halweb_server::{create_app, AppState, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,halweb_server=info,halweb_core=info".into()),
        )
        .init();

    let config = Config::parse();
    let addr = config
        .addr()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;

    let state = AppState::new(&config).context("failed to build HAL client")?;
    let app = create_app(state.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        %addr,
        roster = %config.roster.display(),
        processor = ?config.processor,
        hal_url = %config.hal_url,
        "halweb v{} listening",
        env!("CARGO_PKG_VERSION")
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
            }
            tracing::info!("shutting down");
            state.jobs.cancel_all();
            state.begin_shutdown();
        })
        .await?;

    Ok(())
}
