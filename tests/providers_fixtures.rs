// tests/providers_fixtures.rs
//
// Fixture documents through FeedFetcher + EventFilter, the same path the
// service takes after an HTTP fetch.

use chrono::{DateTime, Utc};
use forex_news::calendar::filter::{EventFilter, FilterReport, InclusionWindow};
use forex_news::calendar::providers::{FeedFetcher, SourceKind};
use forex_news::calendar::time::TimeNormalizer;
use forex_news::calendar::types::{CalendarProvider, Impact};
use std::fs;

fn now() -> DateTime<Utc> {
    // 08:00 in Athens on Tuesday 2025-07-08.
    DateTime::parse_from_rfc3339("2025-07-08T05:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn high_only_today() -> EventFilter {
    EventFilter::new(
        [Impact::High],
        InclusionWindow::Today,
        TimeNormalizer::new(chrono_tz::Europe::Athens),
    )
}

async fn run(kind: SourceKind, fixture: &str, filter: &EventFilter) -> FilterReport {
    let body = fs::read_to_string(format!("tests/fixtures/{fixture}"))
        .unwrap_or_else(|_| panic!("missing tests/fixtures/{fixture}"));
    let provider = FeedFetcher::from_fixture_str(kind, &body);
    let raw = provider.fetch().await.expect("fixture parses");
    filter.filter(raw, now())
}

fn summary(rep: &FilterReport) -> Vec<(String, String, String)> {
    rep.events
        .iter()
        .map(|e| (e.time.clone(), e.currency.clone(), e.title.clone()))
        .collect()
}

#[tokio::test]
async fn xml_feed_keeps_todays_high_impact_events() {
    let rep = run(SourceKind::Xml, "ff_calendar_thisweek.xml", &high_only_today()).await;
    assert_eq!(
        summary(&rep),
        vec![
            ("2025.07.08 07:30".into(), "AUD".into(), "RBA Rate Statement".into()),
            ("2025.07.08 15:30".into(), "USD".into(), "Non-Farm Employment Change".into()),
            ("2025.07.08 15:30".into(), "USD".into(), "Unemployment Rate".into()),
        ]
    );
    // "Tentative" has no time of day.
    assert_eq!(rep.skipped, 1);
    // Low, Medium, Holiday, tomorrow.
    assert_eq!(rep.dropped, 4);
    assert!(rep.events.iter().all(|e| e.impact == Impact::High));
}

#[tokio::test]
async fn json_feed_uses_embedded_offsets_and_skips_broken_records() {
    let rep = run(SourceKind::Json, "ff_calendar_thisweek.json", &high_only_today()).await;
    assert_eq!(
        summary(&rep),
        vec![
            ("2025.07.08 07:30".into(), "AUD".into(), "RBA Rate Statement".into()),
            ("2025.07.08 15:30".into(), "USD".into(), "Non-Farm Employment Change".into()),
        ]
    );
    assert_eq!(rep.skipped, 2);
    assert_eq!(rep.dropped, 3);
}

#[tokio::test]
async fn html_calendar_rows_are_extracted_and_filtered() {
    let rep = run(SourceKind::Html, "economic_calendar.html", &high_only_today()).await;
    assert_eq!(
        summary(&rep),
        vec![
            ("2025.07.08 07:30".into(), "AUD".into(), "RBA Interest Rate Decision (Jul)".into()),
            ("2025.07.08 15:30".into(), "USD".into(), "Nonfarm Payrolls (Jun)".into()),
        ]
    );
    assert_eq!(rep.skipped, 1);
    assert_eq!(rep.dropped, 2);
}

#[tokio::test]
async fn damaged_xml_event_is_skipped_without_losing_the_rest() {
    let rep = run(SourceKind::Xml, "ff_calendar_damaged.xml", &high_only_today()).await;
    assert_eq!(
        summary(&rep),
        vec![
            ("2025.07.08 12:00".into(), "GBP".into(), "Monetary Policy Report Hearings".into()),
            ("2025.07.08 15:30".into(), "USD".into(), "Non-Farm Employment Change".into()),
        ]
    );
    // The undated speech.
    assert_eq!(rep.skipped, 1);
    assert_eq!(rep.dropped, 0);
}

#[tokio::test]
async fn source_zone_hint_applies_to_naive_markup_times() {
    let filter = high_only_today().with_source_zone(Some("-04:00".into()));
    let rep = run(SourceKind::Html, "economic_calendar.html", &filter).await;
    assert_eq!(rep.events[0].time, "2025.07.08 11:30");
    assert_eq!(rep.events[1].time, "2025.07.08 19:30");
}

#[tokio::test]
async fn medium_impact_and_week_window_widen_the_result() {
    let filter = EventFilter::new(
        [Impact::High, Impact::Medium],
        InclusionWindow::Week,
        TimeNormalizer::new(chrono_tz::Europe::Athens),
    );
    let rep = run(SourceKind::Xml, "ff_calendar_thisweek.xml", &filter).await;
    let titles: Vec<_> = rep.events.iter().map(|e| e.title.as_str()).collect();
    // RBA at 04:30Z is before `now` and falls outside [now, now + 7d].
    assert_eq!(
        titles,
        vec![
            "Non-Farm Employment Change",
            "Unemployment Rate",
            "ISM Services PMI",
            "CPI y/y"
        ]
    );
}

#[tokio::test]
async fn mismatched_kind_is_bad_format() {
    let body = fs::read_to_string("tests/fixtures/economic_calendar.html").unwrap();
    for kind in [SourceKind::Xml, SourceKind::Json] {
        let err = FeedFetcher::from_fixture_str(kind, &body)
            .fetch()
            .await
            .unwrap_err();
        assert_eq!(err.cause(), "bad_format", "kind: {kind:?}");
    }
}
