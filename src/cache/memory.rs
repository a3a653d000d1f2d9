// src/cache/memory.rs
use std::sync::RwLock;

use super::{CacheRecord, CacheStore};
use crate::error::CacheResult;

/// In-process adapter. Lost on restart; useful for tests and ephemeral hosts.
#[derive(Debug, Default)]
pub struct MemoryCache {
    inner: RwLock<Option<CacheRecord>>,
}

impl CacheStore for MemoryCache {
    fn get(&self) -> CacheResult<Option<CacheRecord>> {
        let g = self.inner.read().unwrap_or_else(|p| p.into_inner());
        Ok(g.clone())
    }

    fn put(&self, record: &CacheRecord) -> CacheResult<()> {
        let mut g = self.inner.write().unwrap_or_else(|p| p.into_inner());
        *g = Some(record.clone());
        Ok(())
    }

    fn invalidate(&self) -> CacheResult<()> {
        let mut g = self.inner.write().unwrap_or_else(|p| p.into_inner());
        *g = None;
        Ok(())
    }
}
