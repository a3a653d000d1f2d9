// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod error;
pub mod metrics;
pub mod service;

pub use crate::api::{router, AppState};
pub use crate::config::ServiceConfig;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install compact tracing logs. Best-effort: a subscriber may already be set
/// (Shuttle installs its own).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("forex_news=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

/// Full application router: calendar endpoints plus `/metrics` when a
/// recorder could be installed.
pub fn app(cfg: &ServiceConfig) -> anyhow::Result<axum::Router> {
    let state = AppState::from_config(cfg)?;
    let mut app = router(state);
    match crate::metrics::Metrics::init() {
        Ok(m) => app = app.merge(m.router()),
        Err(e) => tracing::warn!(error = %e, "metrics disabled"),
    }
    Ok(app)
}
