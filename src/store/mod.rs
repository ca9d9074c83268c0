//! Dataset persistence.
//!
//! Every write goes through [`write_atomic`]: the new content lands in a
//! temporary file next to the destination and is renamed over it, so a reader
//! sees either the previous document or the new one, never a partial file.
mod lock;

pub use lock::{lock_path_for, DatasetLock, LockInfo};
pub(crate) use lock::now_epoch_ms;

use crate::error::StoreError;
use crate::record::{CarRecord, RecordCollection};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Storage seam used by the pipeline.
pub trait RecordStore {
    fn load(&self) -> Result<RecordCollection, StoreError>;

    /// Replace the whole collection atomically.
    fn replace(&mut self, records: &[CarRecord]) -> Result<(), StoreError>;
}

/// JSON array dataset on the local filesystem.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for JsonFileStore {
    fn load(&self) -> Result<RecordCollection, StoreError> {
        load(&self.path)
    }

    fn replace(&mut self, records: &[CarRecord]) -> Result<(), StoreError> {
        atomic_replace(&self.path, records)
    }
}

/// Load the dataset, failing with `StoreError::Format` on anything that is
/// not an array of records with the required fields. Size and color are
/// only kept on records that have an image URL.
pub fn load(path: &Path) -> Result<RecordCollection, StoreError> {
    let bytes = fs::read(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut records: RecordCollection =
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Format {
            path: path.to_path_buf(),
            source,
        })?;
    for (slot, record) in records.iter_mut().enumerate() {
        if record.clear_orphaned_image_fields() {
            tracing::warn!(
                index = slot + 1,
                record = %record.label(),
                "image size or color without image URL, cleared"
            );
        }
    }
    Ok(records)
}

/// Write the full collection as pretty JSON and swap it into place.
pub fn atomic_replace(path: &Path, records: &[CarRecord]) -> Result<(), StoreError> {
    write_json_atomic(path, &records)
}

/// Serialize any value as pretty JSON and publish it atomically.
pub fn write_json_atomic<T: serde::Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), StoreError> {
    let mut bytes =
        serde_json::to_vec_pretty(value).map_err(|err| persistence_error(path, err))?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

/// Write bytes to a sibling temp file, fsync, then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".car-enrich-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|err| persistence_error(path, err))?;
    tmp.write_all(bytes)
        .map_err(|err| persistence_error(path, err))?;
    tmp.as_file()
        .sync_all()
        .map_err(|err| persistence_error(path, err))?;
    tmp.persist(path)
        .map_err(|err| persistence_error(path, err.error))?;
    Ok(())
}

fn persistence_error(path: &Path, err: impl std::fmt::Display) -> StoreError {
    StoreError::Persistence {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
