//! Exclusive run lock for a dataset.
//!
//! The dataset file is only ever mutated by one run at a time; the lock file
//! sits next to it and is created with create-new semantics.
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Contents of the lock file, kept for diagnosing stale locks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockInfo {
    pub pid: u32,
    pub started_at_epoch_ms: u128,
}

/// Held for the duration of a run; removes the lock file on drop.
#[derive(Debug)]
pub struct DatasetLock {
    path: PathBuf,
}

/// `<dataset>.lock` next to the dataset file.
pub fn lock_path_for(dataset: &Path) -> PathBuf {
    let mut name = dataset
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "dataset".into());
    name.push(".lock");
    dataset.with_file_name(name)
}

impl DatasetLock {
    /// Take the lock, or fail with `StoreError::Locked` if another run holds it.
    ///
    /// `force` removes an existing lock first (stale lock after a hard kill).
    pub fn acquire(dataset: &Path, force: bool) -> Result<Self, StoreError> {
        let path = lock_path_for(dataset);
        if force && path.exists() {
            tracing::warn!(lock = %path.display(), "removing existing dataset lock");
            fs::remove_file(&path).map_err(|err| StoreError::Persistence {
                path: path.clone(),
                reason: err.to_string(),
            })?;
        }
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::Locked {
                    path: dataset.to_path_buf(),
                    lock: path,
                });
            }
            Err(err) => {
                return Err(StoreError::Persistence {
                    path,
                    reason: err.to_string(),
                });
            }
        };
        let info = LockInfo {
            pid: std::process::id(),
            started_at_epoch_ms: now_epoch_ms(),
        };
        let text = serde_json::to_string(&info).unwrap_or_default();
        if let Err(err) = file.write_all(text.as_bytes()) {
            let _ = fs::remove_file(&path);
            return Err(StoreError::Persistence {
                path,
                reason: err.to_string(),
            });
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a lock file left on disk, if any.
    pub fn inspect(dataset: &Path) -> Option<LockInfo> {
        let bytes = fs::read(lock_path_for(dataset)).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

impl Drop for DatasetLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Current epoch time in milliseconds.
pub(crate) fn now_epoch_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0)
}
