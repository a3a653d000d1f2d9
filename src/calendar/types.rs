// src/calendar/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FetchResult;

/// One record as delivered by the provider. Every field is optional because
/// the source guarantees nothing about completeness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEvent {
    pub impact: Option<String>,   // "High", "Medium", "3", ...
    pub currency: Option<String>, // "USD", "EUR"
    pub date: Option<String>,     // date or combined datetime
    pub time: Option<String>,     // separate time of day, if any
    pub title: Option<String>,
}

/// Severity tier in the provider's three-level scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

impl Impact {
    /// Case-insensitive match on the tier word. Coded values ("3"), holidays
    /// and blanks are not recognized.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Impact::High),
            "medium" => Some(Impact::Medium),
            "low" => Some(Impact::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::High => "high",
            Impact::Medium => "medium",
            Impact::Low => "low",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Impact {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Impact::parse(s).ok_or_else(|| anyhow::anyhow!("unknown impact level: {s:?}"))
    }
}

/// Sentinel used when the provider leaves the currency blank.
pub const UNKNOWN_CURRENCY: &str = "unknown";

/// Event after filtering and timezone conversion. `time` is the only time
/// representation kept; it is zero-padded big-endian so it sorts lexically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub time: String, // "YYYY.MM.DD HH:MM" in the configured zone
    pub currency: String,
    #[serde(default)]
    pub title: String,
    pub impact: Impact,
}

#[async_trait::async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn fetch(&self) -> FetchResult<Vec<RawEvent>>;
    fn name(&self) -> &'static str;
}
