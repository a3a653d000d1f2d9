//! Forex News Service: Binary Entrypoint (Shuttle)
//! Boots the Axum HTTP server with config from `.env` / environment.
//!
//! For self-hosting on a plain port see `src/bin/serve.rs`.

use forex_news::ServiceConfig;
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    forex_news::init_tracing();

    let cfg = ServiceConfig::from_env()?;
    tracing::info!(config = ?cfg, "starting forex news service");

    let router = forex_news::app(&cfg)?;
    Ok(router.into())
}
