// jpm-core/src/cache.rs
// Content store for downloaded archives, keyed by remote filename.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use jpm_aio::checksum::verify_integrity_async;
use jpm_aio::fs::{create_dir_all, remove_file_if_exists};
use jpm_common::error::{JpmError, Result};
use jpm_common::model::Integrity;
use tracing::{debug, warn};

/// How [`ArchiveCache::ensure`] satisfied a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome {
    /// A previously stored archive re-verified successfully.
    Hit(PathBuf),
    /// The archive was downloaded and verified during this call.
    Downloaded { path: PathBuf, size_bytes: u64 },
}

impl CacheOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Hit(path) => path,
            Self::Downloaded { path, .. } => path,
        }
    }
}

/// Archive store shared by every install in the process.
///
/// Entries are never evicted. At most one download per key is in flight;
/// concurrent callers for the same key wait and then reuse the stored entry.
/// An entry that fails verification is rejected for the rest of the run.
pub struct ArchiveCache {
    root: PathBuf,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    invalidated: Mutex<HashSet<String>>,
}

impl ArchiveCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            in_flight: Mutex::new(HashMap::new()),
            invalidated: Mutex::new(HashSet::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    pub fn is_invalidated(&self, key: &str) -> bool {
        self.invalidated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    fn invalidate(&self, key: &str) {
        self.invalidated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string());
    }

    fn key_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(in_flight.entry(key.to_string()).or_default())
    }

    /// Returns a verified local copy of the archive stored under `key`.
    ///
    /// A missing entry is materialized by `download`, which receives the
    /// path it must write to; the bytes only become a cache entry once they
    /// verify against `expected`. An existing entry is re-verified before use
    /// and is never silently re-downloaded.
    pub async fn ensure<F, Fut>(
        &self,
        key: &str,
        expected: &Integrity,
        download: F,
    ) -> Result<CacheOutcome>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<u64>>,
    {
        validate_key(key)?;
        if self.is_invalidated(key) {
            return Err(JpmError::Integrity(format!(
                "Cached archive {key} already failed verification in this run"
            )));
        }

        let key_lock = self.key_lock(key);
        let _guard = key_lock.lock().await;

        create_dir_all(&self.root)?;
        let entry = self.entry_path(key);

        if entry.is_file() {
            debug!("Archive exists in cache: {}", entry.display());
            return match verify_integrity_async(&entry, expected).await {
                Ok(()) => {
                    debug!("Using valid cached archive: {}", entry.display());
                    Ok(CacheOutcome::Hit(entry))
                }
                Err(e @ JpmError::Integrity(_)) => {
                    warn!("Cached archive {} failed verification: {}", entry.display(), e);
                    self.invalidate(key);
                    // Gone for the next run; this run refuses the key instead of re-downloading.
                    if let Err(remove_err) = remove_file_if_exists(&entry) {
                        debug!(
                            "Failed to remove corrupted cache entry {}: {}",
                            entry.display(),
                            remove_err
                        );
                    }
                    Err(e)
                }
                Err(e) => Err(e),
            };
        }
        debug!("Archive not found in cache: {}", key);

        let temp_path = tempfile::Builder::new()
            .prefix(&format!(".{key}."))
            .suffix(".download")
            .tempfile_in(&self.root)?
            .into_temp_path();

        // temp_path deletes itself on drop, so every early return below leaves
        // nothing behind that could pass for a finished entry.
        let size_bytes = download(temp_path.to_path_buf()).await?;

        if let Err(e) = verify_integrity_async(&temp_path, expected).await {
            if matches!(e, JpmError::Integrity(_)) {
                self.invalidate(key);
            }
            return Err(e);
        }

        temp_path.persist(&entry).map_err(|e| {
            JpmError::Io(Arc::new(std::io::Error::new(
                e.error.kind(),
                format!("Failed to move download into cache {}: {}", entry.display(), e.error),
            )))
        })?;
        debug!("Stored verified archive: {}", entry.display());

        Ok(CacheOutcome::Downloaded {
            path: entry,
            size_bytes,
        })
    }
}

fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains('/')
        || key.contains('\\');
    if bad {
        Err(JpmError::Validation(format!("Invalid cache key '{key}'")))
    } else {
        Ok(())
    }
}
