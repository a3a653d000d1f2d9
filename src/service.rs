//! Fetch → filter → cache pipeline behind the HTTP handlers.
//!
//! `/news` reads through the cache and degrades to an empty result when the
//! upstream fails. `/refresh` always refetches and surfaces the failure.

use chrono::{DateTime, Utc};
use metrics::counter;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::cache::{note_load_error, DailyCache, FileCache};
use crate::calendar::filter::{EventFilter, FilterReport};
use crate::calendar::providers::FeedFetcher;
use crate::calendar::time::TimeNormalizer;
use crate::calendar::types::{CalendarProvider, NormalizedEvent};
use crate::config::ServiceConfig;
use crate::error::FetchError;

/// Where a `/news` answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Fresh,
    /// Upstream failed; the result is empty.
    Degraded,
}

#[derive(Debug, Clone)]
pub struct NewsRead {
    pub events: Vec<NormalizedEvent>,
    pub origin: Origin,
}

pub struct NewsService {
    provider: Arc<dyn CalendarProvider>,
    filter: EventFilter,
    cache: DailyCache,
    // At most one upstream fetch in flight; waiters re-check the cache.
    fetch_lock: Mutex<()>,
}

impl NewsService {
    pub fn new(provider: Arc<dyn CalendarProvider>, filter: EventFilter, cache: DailyCache) -> Self {
        Self {
            provider,
            filter,
            cache,
            fetch_lock: Mutex::new(()),
        }
    }

    /// Wire the HTTP fetcher, filter and file cache described by `cfg`.
    pub fn from_config(cfg: &ServiceConfig) -> anyhow::Result<Self> {
        let normalizer = TimeNormalizer::new(cfg.timezone);
        let fetcher = FeedFetcher::from_url(cfg.source_kind, cfg.source_url.clone(), cfg.fetch_timeout)?;
        let filter = EventFilter::new(cfg.impacts.iter().copied(), cfg.window, normalizer)
            .with_currencies(cfg.currencies.clone())
            .with_source_zone(cfg.source_timezone.clone());
        let cache = DailyCache::new(FileCache::new(cfg.cache_path.clone()), normalizer);
        Ok(Self::new(Arc::new(fetcher), filter, cache))
    }

    pub fn normalizer(&self) -> &TimeNormalizer {
        self.filter.normalizer()
    }

    /// Read path: serve a fresh cache, otherwise fetch and store. A failed
    /// fetch yields an empty result instead of an error.
    pub async fn read(&self, now: DateTime<Utc>) -> NewsRead {
        crate::calendar::ensure_metrics_described();
        if let Some(events) = self.cached(now) {
            return NewsRead {
                events,
                origin: Origin::Cache,
            };
        }

        let _flight = self.fetch_lock.lock().await;
        // Another request may have filled the cache while we waited.
        if let Some(events) = self.cached(now) {
            return NewsRead {
                events,
                origin: Origin::Cache,
            };
        }
        counter!("calendar_cache_misses_total").increment(1);

        self.invalidate_quietly();
        match self.fetch_filtered(now).await {
            Ok(events) => {
                self.save_quietly(&events, now);
                NewsRead {
                    events,
                    origin: Origin::Fresh,
                }
            }
            Err(e) => {
                tracing::warn!(target: "calendar", error = %e, cause = e.cause(), "serving empty result after fetch failure");
                NewsRead {
                    events: Vec::new(),
                    origin: Origin::Degraded,
                }
            }
        }
    }

    /// Refresh path: drop the cache, fetch, store. Fetch errors propagate.
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<Vec<NormalizedEvent>, FetchError> {
        crate::calendar::ensure_metrics_described();
        let _flight = self.fetch_lock.lock().await;
        self.invalidate_quietly();
        let events = self.fetch_filtered(now).await?;
        self.save_quietly(&events, now);
        Ok(events)
    }

    /// Fresh cache contents, or None on miss, staleness or corruption.
    fn cached(&self, now: DateTime<Utc>) -> Option<Vec<NormalizedEvent>> {
        if !self.cache.is_fresh(now) {
            return None;
        }
        match self.cache.load() {
            Ok(rec) => {
                counter!("calendar_cache_hits_total").increment(1);
                Some(rec.events)
            }
            Err(e) => {
                note_load_error(&e);
                None
            }
        }
    }

    async fn fetch_filtered(&self, now: DateTime<Utc>) -> Result<Vec<NormalizedEvent>, FetchError> {
        let raw = self.provider.fetch().await?;
        let total = raw.len();
        let FilterReport {
            events,
            skipped,
            dropped,
        } = self.filter.filter(raw, now);

        counter!("calendar_records_kept_total").increment(events.len() as u64);
        counter!("calendar_records_skipped_total").increment(skipped as u64);
        counter!("calendar_records_dropped_total").increment(dropped as u64);
        tracing::info!(
            target: "calendar",
            provider = self.provider.name(),
            total,
            kept = events.len(),
            skipped,
            dropped,
            "calendar fetched"
        );
        Ok(events)
    }

    fn invalidate_quietly(&self) {
        if let Err(e) = self.cache.invalidate() {
            tracing::warn!(target: "cache", error = %e, "cache invalidate failed");
        }
    }

    // A failed write only costs a refetch on the next read.
    fn save_quietly(&self, events: &[NormalizedEvent], now: DateTime<Utc>) {
        if let Err(e) = self.cache.save(events, now) {
            tracing::warn!(target: "cache", error = %e, "cache save failed");
        }
    }
}
