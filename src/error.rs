//! Error types for the calendar pipeline.
//!
//! Each layer has its own enum: fetch errors are caller-visible, record errors
//! are consumed by the filter's batch loop, cache errors degrade to a miss.

use thiserror::Error;

/// Whole-fetch failure. Never retried; the caller decides the fallback.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("bad upstream format: {0}")]
    BadFormat(String),
}

impl FetchError {
    /// Short machine-readable cause, used for metrics labels and logs.
    pub fn cause(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::BadFormat(_) => "bad_format",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

/// Per-record failure. Skipped by the batch loop, never surfaced to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("malformed timestamp: {0:?}")]
    MalformedTimestamp(String),

    #[error("malformed record: missing {0}")]
    MalformedRecord(&'static str),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("no cache record present")]
    Missing,

    #[error("cache record is corrupt: {0}")]
    Corrupt(String),

    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type FetchResult<T> = Result<T, FetchError>;
pub type CacheResult<T> = Result<T, CacheError>;
