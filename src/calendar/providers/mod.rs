// src/calendar/providers/mod.rs
pub mod ff_json;
pub mod ff_xml;
pub mod html_table;
pub mod http;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::calendar::types::{CalendarProvider, RawEvent};
use crate::error::FetchResult;

/// ForexFactory weekly feed, the default upstream.
pub const DEFAULT_SOURCE_URL: &str = "https://nfs.faireconomy.media/ff_calendar_thisweek.xml";

/// Upstream document format; selects the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Xml,
    Json,
    Html,
}

impl SourceKind {
    pub fn parse_body(&self, body: &str) -> FetchResult<Vec<RawEvent>> {
        match self {
            SourceKind::Xml => ff_xml::parse(body),
            SourceKind::Json => ff_json::parse(body),
            SourceKind::Html => html_table::parse(body),
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            SourceKind::Xml => "calendar-xml",
            SourceKind::Json => "calendar-json",
            SourceKind::Html => "calendar-html",
        }
    }
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" => Ok(SourceKind::Xml),
            "json" => Ok(SourceKind::Json),
            "html" | "markup" => Ok(SourceKind::Html),
            other => anyhow::bail!("unknown source kind: {other:?} (expected xml|json|html)"),
        }
    }
}

enum Mode {
    // Owned body so tests and offline runs need no 'static input.
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

/// The one upstream fetcher: a fixed URL (or fixture body) plus its format.
pub struct FeedFetcher {
    kind: SourceKind,
    mode: Mode,
}

impl FeedFetcher {
    pub fn from_fixture_str(kind: SourceKind, body: &str) -> Self {
        Self {
            kind,
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn from_url(kind: SourceKind, url: impl Into<String>, timeout: Duration) -> FetchResult<Self> {
        Ok(Self {
            kind,
            mode: Mode::Http {
                url: url.into(),
                client: http::build_client(timeout)?,
            },
        })
    }

    async fn fetch_and_parse(&self) -> FetchResult<Vec<RawEvent>> {
        match &self.mode {
            Mode::Fixture(body) => self.kind.parse_body(body),
            Mode::Http { url, client } => {
                let body = http::get_text(client, url).await?;
                self.kind.parse_body(&body)
            }
        }
    }
}

#[async_trait]
impl CalendarProvider for FeedFetcher {
    async fn fetch(&self) -> FetchResult<Vec<RawEvent>> {
        crate::calendar::ensure_metrics_described();
        counter!("calendar_fetch_total").increment(1);
        let t0 = std::time::Instant::now();

        let res = self.fetch_and_parse().await;

        histogram!("calendar_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        match &res {
            Ok(events) => {
                tracing::debug!(target: "calendar", provider = self.name(), records = events.len(), "fetched");
            }
            Err(e) => {
                tracing::warn!(target: "calendar", error = %e, cause = e.cause(), provider = self.name(), "fetch failed");
                counter!("calendar_fetch_errors_total", "cause" => e.cause()).increment(1);
            }
        }
        res
    }

    fn name(&self) -> &'static str {
        self.kind.provider_name()
    }
}
