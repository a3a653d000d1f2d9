//! Timestamp normalization: any accepted source timestamp into a UTC instant
//! plus the display string rendered in the configured zone.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::RecordError;

/// Canonical display format for event times (zero-padded, big-endian).
pub const DISPLAY_FORMAT: &str = "%Y.%m.%d %H:%M";
/// Format of the `server_time` field in responses.
pub const SERVER_TIME_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// Offset-carrying formats, tried after RFC 3339 / RFC 2822.
const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M %z",
];

/// Formats without zone information; interpreted in the source hint zone.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m-%d-%Y %I:%M%p", // ForexFactory: "07-08-2025 1:30pm"
    "%m-%d-%Y %H:%M",
];

/// Zone used for timestamps that carry no offset of their own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceZone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl SourceZone {
    /// IANA name ("America/New_York") or fixed offset ("+03:00").
    /// Unknown or empty hints fall back to UTC.
    pub fn parse(hint: Option<&str>) -> Self {
        let Some(h) = hint.map(str::trim).filter(|h| !h.is_empty()) else {
            return SourceZone::Named(Tz::UTC);
        };
        if h.eq_ignore_ascii_case("utc") || h.eq_ignore_ascii_case("gmt") || h == "Z" {
            return SourceZone::Named(Tz::UTC);
        }
        if let Ok(tz) = h.parse::<Tz>() {
            return SourceZone::Named(tz);
        }
        if let Ok(off) = h.parse::<FixedOffset>() {
            return SourceZone::Fixed(off);
        }
        tracing::debug!(target: "calendar", hint = h, "unrecognized source zone hint, assuming UTC");
        SourceZone::Named(Tz::UTC)
    }

    /// Nonexistent local times (DST gap) yield None; ambiguous ones resolve
    /// to the earlier instant.
    fn resolve(&self, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            SourceZone::Named(tz) => resolve_in(tz, naive),
            SourceZone::Fixed(off) => resolve_in(off, naive),
        }
    }
}

fn resolve_in<Z: TimeZone>(zone: &Z, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    zone.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTime {
    pub instant: DateTime<Utc>,
    pub display: String,
}

/// Converts source timestamps into the configured display zone.
#[derive(Debug, Clone, Copy)]
pub struct TimeNormalizer {
    target: Tz,
}

impl TimeNormalizer {
    pub fn new(target: Tz) -> Self {
        Self { target }
    }

    pub fn normalize(&self, raw: &str, hint: Option<&str>) -> Result<NormalizedTime, RecordError> {
        let instant = parse_instant(raw, hint)?;
        Ok(NormalizedTime {
            instant,
            display: self.render(instant),
        })
    }

    pub fn render(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.target)
            .format(DISPLAY_FORMAT)
            .to_string()
    }

    pub fn render_server_time(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.target)
            .format(SERVER_TIME_FORMAT)
            .to_string()
    }

    /// Calendar date of `instant` in the configured zone.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.target).date_naive()
    }
}

/// Join a separate date and time-of-day into one parseable string.
pub fn join_date_time(date: &str, time: Option<&str>) -> String {
    match time.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => format!("{} {}", date.trim(), t),
        None => date.trim().to_string(),
    }
}

/// Parse with explicit offset when present, otherwise in the hint zone.
pub fn parse_instant(raw: &str, hint: Option<&str>) -> Result<DateTime<Utc>, RecordError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(RecordError::MalformedTimestamp(raw.to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    let zone = SourceZone::parse(hint);
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return zone
                .resolve(&naive)
                .ok_or_else(|| RecordError::MalformedTimestamp(raw.to_string()));
        }
    }

    Err(RecordError::MalformedTimestamp(raw.to_string()))
}
