//! # Cache Store
//!
//! Day-scoped cache of the latest normalized result set.
//!
//! - `CacheStore` is the storage seam (`get/put/invalidate`); `FileCache` and
//!   `MemoryCache` are the adapters.
//! - `Freshness` decides whether a stored record may still be served;
//!   `SameLocalDay` is the default predicate.
//! - `DailyCache` ties a store, a predicate and the display zone together and
//!   is what the service talks to.
//!
//! Each save fully replaces the previous record. There is no per-event expiry.

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::calendar::time::TimeNormalizer;
use crate::calendar::types::NormalizedEvent;
use crate::error::{CacheError, CacheResult};

/// Persisted shape: `{ "cache_date": "YYYY-MM-DD", "data": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub cache_date: NaiveDate,
    #[serde(rename = "data")]
    pub events: Vec<NormalizedEvent>,
}

pub trait CacheStore: Send + Sync {
    /// `Ok(None)` when nothing is stored; `Err(Corrupt)` when it cannot be parsed.
    fn get(&self) -> CacheResult<Option<CacheRecord>>;
    /// Replace the stored record. Readers never observe a partial write.
    fn put(&self, record: &CacheRecord) -> CacheResult<()>;
    /// Remove the stored record. Idempotent.
    fn invalidate(&self) -> CacheResult<()>;
}

pub trait Freshness: Send + Sync {
    fn is_fresh(&self, record: &CacheRecord, now: DateTime<Utc>) -> bool;
}

/// Valid only while the local calendar date of `now` equals `cache_date`.
#[derive(Debug, Clone, Copy)]
pub struct SameLocalDay {
    normalizer: TimeNormalizer,
}

impl SameLocalDay {
    pub fn new(normalizer: TimeNormalizer) -> Self {
        Self { normalizer }
    }
}

impl Freshness for SameLocalDay {
    fn is_fresh(&self, record: &CacheRecord, now: DateTime<Utc>) -> bool {
        record.cache_date == self.normalizer.local_date(now)
    }
}

pub struct DailyCache {
    store: Box<dyn CacheStore>,
    freshness: Box<dyn Freshness>,
    normalizer: TimeNormalizer,
}

impl DailyCache {
    pub fn new(store: impl CacheStore + 'static, normalizer: TimeNormalizer) -> Self {
        Self {
            store: Box::new(store),
            freshness: Box::new(SameLocalDay::new(normalizer)),
            normalizer,
        }
    }

    pub fn with_freshness(mut self, freshness: impl Freshness + 'static) -> Self {
        self.freshness = Box::new(freshness);
        self
    }

    /// True iff a well-formed record exists and the predicate accepts it.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.store.get() {
            Ok(Some(rec)) => self.freshness.is_fresh(&rec, now),
            Ok(None) => false,
            Err(e) => {
                note_load_error(&e);
                false
            }
        }
    }

    pub fn load(&self) -> CacheResult<CacheRecord> {
        self.store.get()?.ok_or(CacheError::Missing)
    }

    pub fn save(&self, events: &[NormalizedEvent], now: DateTime<Utc>) -> CacheResult<CacheRecord> {
        let record = CacheRecord {
            cache_date: self.normalizer.local_date(now),
            events: events.to_vec(),
        };
        self.store.put(&record)?;
        tracing::debug!(target: "cache", cache_date = %record.cache_date, events = record.events.len(), "cache saved");
        Ok(record)
    }

    pub fn invalidate(&self) -> CacheResult<()> {
        self.store.invalidate()
    }
}

pub(crate) fn note_load_error(e: &CacheError) {
    match e {
        CacheError::Corrupt(_) => {
            tracing::warn!(target: "cache", error = %e, "cache record corrupt, treating as miss");
            counter!("calendar_cache_corrupt_total").increment(1);
        }
        CacheError::Missing => {}
        CacheError::Io(_) => {
            tracing::warn!(target: "cache", error = %e, "cache read failed, treating as miss");
        }
    }
}
