// src/calendar/mod.rs
pub mod filter;
pub mod providers;
pub mod time;
pub mod types;

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("calendar_fetch_total", "Upstream calendar fetches attempted.");
        describe_counter!(
            "calendar_fetch_errors_total",
            "Upstream fetch failures by cause (transport, bad_format)."
        );
        describe_counter!(
            "calendar_records_kept_total",
            "Records kept after normalization + filtering."
        );
        describe_counter!(
            "calendar_records_skipped_total",
            "Records skipped because they failed to normalize."
        );
        describe_counter!(
            "calendar_records_dropped_total",
            "Records excluded by impact, currency, or time window."
        );
        describe_counter!("calendar_cache_hits_total", "Reads served from a fresh cache.");
        describe_counter!("calendar_cache_misses_total", "Reads that required a fetch.");
        describe_counter!(
            "calendar_cache_corrupt_total",
            "Cache loads that found an unparseable record."
        );
        describe_counter!(
            "calendar_refresh_unauthorized_total",
            "Refresh requests rejected for a bad or missing key."
        );
        describe_histogram!("calendar_fetch_ms", "Upstream fetch + parse time in milliseconds.");
    });
}

/// Clean provider text: decode entities, strip tags, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    let stripped = re_tags.replace_all(&decoded, " ");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

pub fn is_whitelisted<S: AsRef<str>>(value: S, whitelist: &[String]) -> bool {
    let s = value.as_ref();
    whitelist.iter().any(|w| w.trim().eq_ignore_ascii_case(s))
}
