//! Typed failures for the enrichment core.
//!
//! Provider and fetch failures are absorbed locally by the pipeline; format,
//! persistence and range errors end a run.
use std::path::PathBuf;
use thiserror::Error;

/// A search provider could not execute its query.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("search request failed: {0}")]
    Http(String),
    #[error("unexpected result page: {0}")]
    Layout(String),
}

/// A candidate image could not be retrieved or decoded.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("GET {url} timed out")]
    Timeout { url: String },
    #[error("GET {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("decode image from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Dataset load/persist failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("read dataset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dataset {path} is not a valid record array: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("persist dataset {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },
    #[error("dataset {path} is locked by another run ({lock})")]
    Locked { path: PathBuf, lock: PathBuf },
}

/// Fatal run outcomes. Interruption is not one of them.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid range {start}..={end} for a dataset of {len} records (expected 1 <= start <= end <= {len})")]
    Range { start: usize, end: usize, len: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}
