//! Self-hosted entrypoint: binds `0.0.0.0:$PORT` (default 10000).

use anyhow::Context;
use forex_news::ServiceConfig;
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    forex_news::init_tracing();

    let cfg = ServiceConfig::from_env()?;
    tracing::info!(config = ?cfg, "starting forex news service");

    let app = forex_news::app(&cfg)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("http server")?;
    Ok(())
}
