// src/calendar/filter.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::calendar::time::{join_date_time, TimeNormalizer};
use crate::calendar::types::{Impact, NormalizedEvent, RawEvent, UNKNOWN_CURRENCY};
use crate::calendar::{clean_text, is_whitelisted};
use crate::error::RecordError;

/// Which instants count as "current" news.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InclusionWindow {
    /// Same local calendar day as now.
    Today,
    /// From now through now + 7 days.
    Week,
}

impl InclusionWindow {
    pub fn contains(&self, instant: DateTime<Utc>, now: DateTime<Utc>, tz: &TimeNormalizer) -> bool {
        match self {
            InclusionWindow::Today => tz.local_date(instant) == tz.local_date(now),
            InclusionWindow::Week => instant >= now && instant <= now + Duration::days(7),
        }
    }
}

impl FromStr for InclusionWindow {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" | "day" => Ok(InclusionWindow::Today),
            "week" | "7d" | "7days" => Ok(InclusionWindow::Week),
            other => anyhow::bail!("unknown inclusion window: {other:?} (expected today|week)"),
        }
    }
}

/// Outcome of one batch: kept events plus counts of what was left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub events: Vec<NormalizedEvent>,
    /// Records that failed to normalize (bad or missing date).
    pub skipped: usize,
    /// Well-formed records excluded by impact, currency, or window.
    pub dropped: usize,
}

#[derive(Debug, Clone)]
pub struct EventFilter {
    accepted: BTreeSet<Impact>,
    currencies: Vec<String>,
    window: InclusionWindow,
    normalizer: TimeNormalizer,
    source_zone: Option<String>,
}

impl EventFilter {
    pub fn new(
        accepted: impl IntoIterator<Item = Impact>,
        window: InclusionWindow,
        normalizer: TimeNormalizer,
    ) -> Self {
        Self {
            accepted: accepted.into_iter().collect(),
            currencies: Vec::new(),
            window,
            normalizer,
            source_zone: None,
        }
    }

    /// Restrict to these currency codes (case-insensitive). Empty keeps all.
    pub fn with_currencies(mut self, currencies: Vec<String>) -> Self {
        self.currencies = currencies;
        self
    }

    /// Zone hint for source timestamps that carry no offset.
    pub fn with_source_zone(mut self, zone: Option<String>) -> Self {
        self.source_zone = zone;
        self
    }

    pub fn normalizer(&self) -> &TimeNormalizer {
        &self.normalizer
    }

    /// Run the batch. Each record is handled on its own; failures are
    /// counted and discarded. Output is sorted by rendered time.
    pub fn filter(&self, raw_events: Vec<RawEvent>, now: DateTime<Utc>) -> FilterReport {
        let mut report = FilterReport::default();
        for raw in raw_events {
            match self.normalize_record(&raw, now) {
                Ok(Some(ev)) => report.events.push(ev),
                Ok(None) => report.dropped += 1,
                Err(e) => {
                    tracing::debug!(target: "calendar", error = %e, "skipping record");
                    report.skipped += 1;
                }
            }
        }
        report.events.sort_by(|a, b| a.time.cmp(&b.time));
        report
    }

    /// `Ok(None)` means the record is well-formed but excluded by policy.
    pub fn normalize_record(
        &self,
        raw: &RawEvent,
        now: DateTime<Utc>,
    ) -> Result<Option<NormalizedEvent>, RecordError> {
        let impact = match raw.impact.as_deref().and_then(Impact::parse) {
            Some(i) if self.accepted.contains(&i) => i,
            _ => return Ok(None),
        };

        let currency = raw
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_ascii_uppercase)
            .unwrap_or_else(|| UNKNOWN_CURRENCY.to_string());
        if !self.currencies.is_empty() && !is_whitelisted(&currency, &self.currencies) {
            return Ok(None);
        }

        let date = raw
            .date
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or(RecordError::MalformedRecord("date"))?;
        let stamp = join_date_time(date, raw.time.as_deref());
        let time = self
            .normalizer
            .normalize(&stamp, self.source_zone.as_deref())?;

        if !self.window.contains(time.instant, now, &self.normalizer) {
            return Ok(None);
        }

        Ok(Some(NormalizedEvent {
            time: time.display,
            currency,
            title: raw.title.as_deref().map(clean_text).unwrap_or_default(),
            impact,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-07-08T05:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn high_only(window: InclusionWindow) -> EventFilter {
        EventFilter::new(
            [Impact::High],
            window,
            TimeNormalizer::new(chrono_tz::Europe::Athens),
        )
    }

    fn raw(impact: &str, currency: &str, date: &str, title: &str) -> RawEvent {
        RawEvent {
            impact: Some(impact.to_string()),
            currency: Some(currency.to_string()),
            date: Some(date.to_string()),
            time: None,
            title: Some(title.to_string()),
        }
    }

    #[test]
    fn concrete_nfp_record_normalizes() {
        let f = high_only(InclusionWindow::Today);
        let rep = f.filter(vec![raw("high", "USD", "2025-07-08T06:30:00Z", "NFP")], now());
        assert_eq!(
            rep.events,
            vec![NormalizedEvent {
                time: "2025.07.08 09:30".into(),
                currency: "USD".into(),
                title: "NFP".into(),
                impact: Impact::High,
            }]
        );
    }

    #[test]
    fn unrecognized_or_lower_impact_is_excluded_under_high_only() {
        let f = high_only(InclusionWindow::Today);
        let mut no_impact = raw("", "USD", "2025-07-08T06:30:00Z", "x");
        no_impact.impact = None;
        let rep = f.filter(
            vec![
                raw("", "USD", "2025-07-08T06:30:00Z", "a"),
                raw("3", "USD", "2025-07-08T06:30:00Z", "b"),
                raw("low", "USD", "2025-07-08T06:30:00Z", "c"),
                no_impact,
            ],
            now(),
        );
        assert!(rep.events.is_empty());
        assert_eq!(rep.dropped, 4);
        assert_eq!(rep.skipped, 0);
    }

    #[test]
    fn malformed_records_do_not_abort_batch() {
        let f = high_only(InclusionWindow::Today);
        let mut missing_date = raw("High", "EUR", "", "no date");
        missing_date.date = None;
        let rep = f.filter(
            vec![
                raw("High", "USD", "2025-07-08T12:00:00Z", "ok 1"),
                missing_date,
                raw("High", "GBP", "not a date", "bad"),
                raw("High", "CAD", "2025-07-08 14:00:00", "ok 2"),
            ],
            now(),
        );
        assert_eq!(rep.events.len(), 2);
        assert_eq!(rep.skipped, 2);
        assert_eq!(rep.events[0].currency, "USD");
        assert_eq!(rep.events[1].currency, "CAD");
    }

    #[test]
    fn output_is_sorted_by_rendered_time() {
        let f = high_only(InclusionWindow::Today);
        let rep = f.filter(
            vec![
                raw("High", "CAD", "2025-07-08 16:30:00", "c"),
                raw("High", "USD", "2025-07-08 12:00:00", "a"),
                raw("High", "EUR", "2025-07-08 14:00:00", "b"),
            ],
            now(),
        );
        let times: Vec<_> = rep.events.iter().map(|e| e.time.as_str()).collect();
        assert_eq!(
            times,
            vec!["2025.07.08 15:00", "2025.07.08 17:00", "2025.07.08 19:30"]
        );
    }

    #[test]
    fn today_window_uses_local_calendar_day() {
        let f = high_only(InclusionWindow::Today);
        // 21:30Z on the 7th is 00:30 on the 8th in Athens.
        let rep = f.filter(
            vec![
                raw("High", "USD", "2025-07-07T21:30:00Z", "local today"),
                raw("High", "USD", "2025-07-07T20:30:00Z", "local yesterday"),
                raw("High", "USD", "2025-07-09T06:00:00Z", "tomorrow"),
            ],
            now(),
        );
        assert_eq!(rep.events.len(), 1);
        assert_eq!(rep.events[0].title, "local today");
        assert_eq!(rep.dropped, 2);
    }

    #[test]
    fn week_window_spans_seven_days_from_now() {
        let f = high_only(InclusionWindow::Week);
        let rep = f.filter(
            vec![
                raw("High", "USD", "2025-07-08T04:00:00Z", "past"),
                raw("High", "USD", "2025-07-10T12:00:00Z", "in two days"),
                raw("High", "USD", "2025-07-15T04:59:00Z", "edge"),
                raw("High", "USD", "2025-07-16T00:00:00Z", "too far"),
            ],
            now(),
        );
        let titles: Vec<_> = rep.events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["in two days", "edge"]);
    }

    #[test]
    fn extended_impacts_and_currency_allow_list() {
        let f = EventFilter::new(
            [Impact::High, Impact::Medium, Impact::Low],
            InclusionWindow::Today,
            TimeNormalizer::new(chrono_tz::Europe::Athens),
        )
        .with_currencies(vec!["usd".into(), "EUR".into()]);
        let rep = f.filter(
            vec![
                raw("Medium", "USD", "2025-07-08T06:30:00Z", "m"),
                raw("Low", "eur", "2025-07-08T07:30:00Z", "l"),
                raw("High", "JPY", "2025-07-08T08:30:00Z", "jpy"),
            ],
            now(),
        );
        assert_eq!(rep.events.len(), 2);
        assert_eq!(rep.events[0].impact, Impact::Medium);
        assert_eq!(rep.events[1].currency, "EUR");
        assert_eq!(rep.dropped, 1);
    }

    #[test]
    fn blank_currency_defaults_to_sentinel_and_title_is_cleaned() {
        let f = high_only(InclusionWindow::Today);
        let rep = f.filter(
            vec![raw("High", "  ", "2025-07-08T06:30:00Z", "  Non-Farm&nbsp;<b>Payrolls</b> ")],
            now(),
        );
        assert_eq!(rep.events[0].currency, UNKNOWN_CURRENCY);
        assert_eq!(rep.events[0].title, "Non-Farm Payrolls");
    }

    #[test]
    fn window_parses_from_config_words() {
        assert_eq!("today".parse::<InclusionWindow>().unwrap(), InclusionWindow::Today);
        assert_eq!("Week".parse::<InclusionWindow>().unwrap(), InclusionWindow::Week);
        assert!("month".parse::<InclusionWindow>().is_err());
    }
}
