use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use metrics::counter;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::calendar::types::NormalizedEvent;
use crate::config::ServiceConfig;
use crate::service::{NewsService, Origin};

const CACHE_HEADER: &str = "x-cache";

#[derive(Clone)]
pub struct AppState {
    service: Arc<NewsService>,
    refresh_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(service: NewsService, refresh_secret: Option<String>) -> Self {
        Self {
            service: Arc::new(service),
            refresh_secret: refresh_secret.filter(|s| !s.is_empty()).map(Arc::from),
        }
    }

    pub fn from_config(cfg: &ServiceConfig) -> anyhow::Result<Self> {
        if cfg.refresh_secret.is_none() {
            tracing::warn!(target: "api", "no refresh secret configured, /refresh will reject every request");
        }
        Ok(Self::new(
            NewsService::from_config(cfg)?,
            cfg.refresh_secret.clone(),
        ))
    }

    fn server_time(&self) -> String {
        self.service.normalizer().render_server_time(Utc::now())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/news", get(news))
        .route("/refresh", get(refresh))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResp {
    status: &'static str,
    server_time: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResp> {
    Json(HealthResp {
        status: "ok",
        server_time: state.server_time(),
    })
}

#[derive(Serialize)]
struct NewsResp {
    status: &'static str,
    count: usize,
    data: Vec<NormalizedEvent>,
    server_time: String,
}

impl NewsResp {
    fn success(data: Vec<NormalizedEvent>, server_time: String) -> Self {
        Self {
            status: "success",
            count: data.len(),
            data,
            server_time,
        }
    }
}

#[derive(Serialize)]
struct ErrorResp {
    status: &'static str,
    message: String,
    server_time: String,
}

fn error_response(code: StatusCode, message: impl Into<String>, server_time: String) -> Response {
    let body = ErrorResp {
        status: "error",
        message: message.into(),
        server_time,
    };
    (code, [(CACHE_HEADER, "MISS")], Json(body)).into_response()
}

async fn news(State(state): State<AppState>) -> Response {
    let read = state.service.read(Utc::now()).await;
    let hit = if read.origin == Origin::Cache { "HIT" } else { "MISS" };
    let body = NewsResp::success(read.events, state.server_time());
    (StatusCode::OK, [(CACHE_HEADER, hit)], Json(body)).into_response()
}

type QueryPairs = Vec<(String, String)>;

/// The single `key` value, or None when it is absent, repeated or the query
/// string does not decode.
fn refresh_key(query: &Result<Query<QueryPairs>, QueryRejection>) -> Option<&str> {
    let Ok(Query(pairs)) = query else {
        return None;
    };
    let mut keys = pairs.iter().filter(|(k, _)| k == "key").map(|(_, v)| v.as_str());
    match (keys.next(), keys.next()) {
        (Some(key), None) => Some(key),
        _ => None,
    }
}

async fn refresh(
    State(state): State<AppState>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> Response {
    let authorized = match (&state.refresh_secret, refresh_key(&query)) {
        (Some(secret), Some(key)) => secret_matches(secret, key),
        _ => false,
    };
    if !authorized {
        counter!("calendar_refresh_unauthorized_total").increment(1);
        tracing::warn!(target: "api", "refresh rejected: bad or missing key");
        return error_response(StatusCode::UNAUTHORIZED, "unauthorized", state.server_time());
    }

    match state.service.refresh(Utc::now()).await {
        Ok(events) => {
            let body = NewsResp::success(events, state.server_time());
            (StatusCode::OK, [(CACHE_HEADER, "MISS")], Json(body)).into_response()
        }
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("refresh failed ({}): {e}", e.cause()),
            state.server_time(),
        ),
    }
}

/// Verbatim comparison that does not stop at the first differing byte.
fn secret_matches(expected: &str, given: &str) -> bool {
    let (a, b) = (expected.as_bytes(), given.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
