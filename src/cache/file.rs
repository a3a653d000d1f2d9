// src/cache/file.rs
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::{CacheRecord, CacheStore};
use crate::error::{CacheError, CacheResult};

pub const DEFAULT_CACHE_PATH: &str = "cache/news_cache.json";

/// One indented JSON file, replaced atomically (temp file + fsync + rename).
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unique per process and per write, in the same directory as the target
    /// so the rename never crosses filesystems.
    fn temp_path(&self) -> PathBuf {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cache".to_string());
        self.path
            .with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
    }
}

fn write_pretty(path: &Path, record: &CacheRecord) -> io::Result<()> {
    let file = fs::File::create(path)?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, record).map_err(io::Error::from)?;
    w.write_all(b"\n")?;
    let file = w.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

impl CacheStore for FileCache {
    fn get(&self) -> CacheResult<Option<CacheRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Io(e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| CacheError::Corrupt(format!("{}: {e}", self.path.display())))
    }

    fn put(&self, record: &CacheRecord) -> CacheResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let tmp = self.temp_path();
        let res = write_pretty(&tmp, record).and_then(|_| fs::rename(&tmp, &self.path));
        if res.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        Ok(res?)
    }

    fn invalidate(&self) -> CacheResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io(e)),
        }
    }
}
