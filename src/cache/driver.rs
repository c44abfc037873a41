//! Driver Contract Module
//!
//! The storage-agnostic operations every cache backend provides, and the
//! factory that turns configuration into a concrete backend.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::{FilesystemDriver, RedisConfig, RedisDriver};
use crate::error::Result;

// == Driver Trait ==
/// A concrete backend for the cache facade.
///
/// `init_driver` must complete before any other operation. TTLs are in
/// milliseconds; `None` and `Some(0)` both mean the entry never expires.
#[async_trait]
pub trait CacheDriver: Send + Sync {
    /// Short backend label used in logs and health output.
    fn name(&self) -> &'static str;

    /// Prepares the backing resource (directory or connection).
    async fn init_driver(&self) -> Result<()>;

    /// Stores `value` under `key`, replacing any existing entry.
    async fn set(&self, key: &str, value: Value, ttl_ms: Option<u64>) -> Result<()>;

    /// Returns the stored value, or `default` when no entry exists.
    async fn get(&self, key: &str, default: Option<Value>) -> Result<Option<Value>>;

    /// Returns true if a live entry exists for `key`.
    async fn has(&self, key: &str) -> Result<bool>;

    /// Removes the entry for `key`. Absent keys are not an error.
    async fn unset(&self, key: &str) -> Result<()>;
}

// == Driver Factory ==
/// Backend selection, usually built from [`Config`](crate::Config).
#[derive(Debug, Clone)]
pub enum DriverConfig {
    /// Files under a base directory
    Filesystem { base_dir: PathBuf },
    /// A Redis server
    Redis(RedisConfig),
}

impl DriverConfig {
    /// Constructs the configured driver. The driver is not initialized yet.
    pub fn build(self) -> Box<dyn CacheDriver> {
        match self {
            DriverConfig::Filesystem { base_dir } => Box::new(FilesystemDriver::new(base_dir)),
            DriverConfig::Redis(config) => Box::new(RedisDriver::new(config)),
        }
    }
}
