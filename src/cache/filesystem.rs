//! Filesystem Driver Module
//!
//! Stores one JSON file per key under a base directory. File names are the
//! hex SHA-256 of the logical key. Expired entries are swept lazily by `has`.
//! Writes go to a temporary sibling file that is renamed over the entry, so
//! readers see either the old or the new entry, never a partial one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheDriver, CacheEntry};
use crate::error::{CacheError, Result};

// == Filesystem Driver ==
/// Cache driver persisting entries as files.
#[derive(Debug, Clone)]
pub struct FilesystemDriver {
    /// Directory holding the entry files
    base_dir: PathBuf,
}

/// Suffix of in-flight writes. Entry files are bare hex names.
const TEMP_SUFFIX: &str = ".tmp";

/// Distinguishes concurrent writes from this process.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Outcome of reading an entry file.
enum ReadOutcome {
    Missing,
    Corrupt,
    Found(CacheEntry),
}

impl FilesystemDriver {
    // == Constructor ==
    /// Creates a driver rooted at `base_dir`. Call `init_driver` before use.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    // == Physical Key ==
    /// Maps a logical key to the file that stores it.
    pub fn physical_key(&self, key: &str) -> PathBuf {
        self.base_dir.join(hash_key(key))
    }

    /// Unique scratch path next to the entry file.
    fn temp_path(&self, key: &str) -> PathBuf {
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        self.base_dir.join(format!(
            "{}.{}.{}{}",
            hash_key(key),
            std::process::id(),
            seq,
            TEMP_SUFFIX
        ))
    }

    async fn read_entry(&self, key: &str) -> ReadOutcome {
        let path = self.physical_key(key);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return ReadOutcome::Missing,
            Err(e) => {
                warn!(key, path = %path.display(), error = %e, "Unreadable cache entry, treating as absent");
                return ReadOutcome::Corrupt;
            }
        };

        match CacheEntry::decode(&raw) {
            Some(entry) => ReadOutcome::Found(entry),
            None => {
                warn!(key, path = %path.display(), "Corrupt cache entry, treating as absent");
                ReadOutcome::Corrupt
            }
        }
    }
}

/// Hex-encoded SHA-256 of the logical key.
fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

#[async_trait]
impl CacheDriver for FilesystemDriver {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn init_driver(&self) -> Result<()> {
        fs::create_dir_all(&self.base_dir).await.map_err(|source| {
            error!(path = %self.base_dir.display(), error = %source, "Could not create cache directory");
            CacheError::Directory {
                path: self.base_dir.clone(),
                source,
            }
        })?;

        info!("Filesystem cache ready in [{}]", self.base_dir.display());
        Ok(())
    }

    async fn set(&self, key: &str, value: Value, ttl_ms: Option<u64>) -> Result<()> {
        let payload = CacheEntry::new(value, ttl_ms).encode()?;
        let temp = self.temp_path(key);

        fs::write(&temp, payload).await?;
        if let Err(e) = fs::rename(&temp, self.physical_key(key)).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        debug!(key, ttl_ms, "Cache entry written");
        Ok(())
    }

    async fn get(&self, key: &str, default: Option<Value>) -> Result<Option<Value>> {
        match self.read_entry(key).await {
            ReadOutcome::Found(entry) => Ok(Some(entry.data)),
            ReadOutcome::Missing | ReadOutcome::Corrupt => Ok(default),
        }
    }

    async fn has(&self, key: &str) -> Result<bool> {
        match self.read_entry(key).await {
            ReadOutcome::Found(entry) if !entry.is_expired() => Ok(true),
            ReadOutcome::Found(_) => {
                debug!(key, "Sweeping expired cache entry");
                self.unset(key).await?;
                Ok(false)
            }
            ReadOutcome::Missing | ReadOutcome::Corrupt => Ok(false),
        }
    }

    async fn unset(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.physical_key(key)).await {
            Ok(()) => {
                debug!(key, "Cache entry removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
