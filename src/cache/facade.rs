//! Cache Facade Module
//!
//! The single entry point application code uses. Holds one active driver,
//! forwards operations to it and implements compute-or-fetch.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheDriver, CacheStats};
use crate::error::{CacheError, Result};

// == Cache Facade ==
/// Caller-owned handle to the active cache driver.
///
/// Cloning is cheap and every clone shares the same driver and counters.
/// Driver errors are logged here and then returned unchanged.
#[derive(Clone)]
pub struct Cache {
    driver: Arc<dyn CacheDriver>,
    stats: Arc<StatsRecorder>,
}

impl Cache {
    // == Constructor ==
    /// Installs `driver` and awaits its initialization.
    pub async fn new(driver: Box<dyn CacheDriver>) -> Result<Self> {
        let driver: Arc<dyn CacheDriver> = Arc::from(driver);
        init(driver.as_ref()).await?;

        Ok(Self {
            driver,
            stats: Arc::new(StatsRecorder::default()),
        })
    }

    // == Set Driver ==
    /// Replaces the active driver once the new one is initialized.
    ///
    /// On failure the previous driver stays active. Other clones of this
    /// handle keep the driver they already hold.
    pub async fn set_driver(&mut self, driver: Box<dyn CacheDriver>) -> Result<()> {
        let driver: Arc<dyn CacheDriver> = Arc::from(driver);
        init(driver.as_ref()).await?;
        self.driver = driver;
        Ok(())
    }

    /// Name of the active driver.
    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    /// Snapshot of lookup counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    // == Pass-through Operations ==
    /// Stores a raw JSON value.
    pub async fn set_value(&self, key: &str, value: Value, ttl_ms: Option<u64>) -> Result<()> {
        let result = self.driver.set(key, value, ttl_ms).await;
        self.logged("set", key, result)
    }

    /// Returns the raw JSON value for `key`, or `default` if absent.
    pub async fn get_value(&self, key: &str, default: Option<Value>) -> Result<Option<Value>> {
        let result = self.driver.get(key, default).await;
        self.logged("get", key, result)
    }

    /// Returns true if a live entry exists for `key`.
    ///
    /// Every successful lookup counts towards [`stats`](Self::stats).
    pub async fn has(&self, key: &str) -> Result<bool> {
        let result = self.driver.has(key).await;
        let found = self.logged("has", key, result)?;
        if found {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        Ok(found)
    }

    /// Removes the entry for `key` if present.
    pub async fn unset(&self, key: &str) -> Result<()> {
        let result = self.driver.unset(key).await;
        self.logged("unset", key, result)
    }

    // == Typed Operations ==
    /// Serializes `value` and stores it under `key`.
    pub async fn set<T>(&self, key: &str, value: &T, ttl_ms: Option<u64>) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let encoded = serde_json::to_value(value);
        let value = self.logged("set", key, encoded.map_err(CacheError::from))?;
        self.set_value(key, value, ttl_ms).await
    }

    /// Reads and deserializes the value stored under `key`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_value(key, None).await? {
            Some(value) => {
                let decoded = serde_json::from_value(value).map_err(CacheError::from);
                self.logged("get", key, decoded).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Like [`get`](Self::get), falling back to `default` when absent.
    pub async fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.get(key).await?.unwrap_or(default))
    }

    // == Compute-or-fetch ==
    /// Returns the cached value for `key`, computing and storing it if absent.
    ///
    /// `producer` runs only when no live entry exists. The returned value is
    /// read back from the driver after the write, so it has round-tripped
    /// through serialization. Concurrent calls for the same absent key may
    /// each run their producer and each write.
    pub async fn call<T, F, Fut>(&self, key: &str, producer: F, ttl_ms: Option<u64>) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.try_call(
            key,
            move || async move { Ok::<T, Infallible>(producer().await) },
            ttl_ms,
        )
        .await
    }

    /// [`call`](Self::call) with a fallible producer.
    ///
    /// A producer error is returned as [`CacheError::Producer`] and nothing
    /// is written.
    pub async fn try_call<T, E, F, Fut>(
        &self,
        key: &str,
        producer: F,
        ttl_ms: Option<u64>,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        E: Into<anyhow::Error>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if self.has(key).await? {
            // The entry can still disappear before the read; recompute then.
            if let Some(cached) = self.get::<T>(key).await? {
                debug!(key, "Compute-or-fetch hit");
                return Ok(cached);
            }
        }

        debug!(key, "Compute-or-fetch miss, running producer");

        let value = producer().await.map_err(|e| {
            let e: anyhow::Error = e.into();
            warn!(key, error = %e, "Compute-or-fetch producer failed");
            CacheError::Producer(e)
        })?;

        self.set(key, &value, ttl_ms).await?;
        Ok(self.get(key).await?.unwrap_or(value))
    }

    fn logged<T>(&self, op: &'static str, key: &str, result: Result<T>) -> Result<T> {
        result.inspect_err(|e| {
            error!(driver = self.driver.name(), op, key, error = %e, "Cache operation failed");
        })
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("driver", &self.driver.name())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

async fn init(driver: &dyn CacheDriver) -> Result<()> {
    driver.init_driver().await.inspect_err(|e| {
        error!(driver = driver.name(), error = %e, "Cache driver initialization failed");
    })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FilesystemDriver;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        score: u32,
    }

    async fn create_test_cache() -> (Cache, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let driver = FilesystemDriver::new(temp_dir.path().join("cache"));
        let cache = Cache::new(Box::new(driver)).await.expect("init should succeed");
        (cache, temp_dir)
    }

    #[tokio::test]
    async fn test_new_initializes_driver() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("fresh");

        let cache = Cache::new(Box::new(FilesystemDriver::new(&base))).await.unwrap();

        assert!(base.is_dir());
        assert_eq!(cache.driver_name(), "filesystem");
    }

    #[tokio::test]
    async fn test_new_propagates_init_error() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file");
        std::fs::write(&file, "x").unwrap();

        let result = Cache::new(Box::new(FilesystemDriver::new(&file))).await;
        assert!(matches!(result, Err(CacheError::Directory { .. })));
    }

    #[tokio::test]
    async fn test_set_driver_keeps_old_driver_on_failure() {
        let (mut cache, temp_dir) = create_test_cache().await;
        cache.set("k", &1, None).await.unwrap();

        let file = temp_dir.path().join("file");
        std::fs::write(&file, "x").unwrap();
        assert!(cache.set_driver(Box::new(FilesystemDriver::new(&file))).await.is_err());

        assert_eq!(cache.get::<i32>("k").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_set_driver_switches_backend() {
        let (mut cache, temp_dir) = create_test_cache().await;
        cache.set("k", &1, None).await.unwrap();

        let other = FilesystemDriver::new(temp_dir.path().join("other"));
        cache.set_driver(Box::new(other)).await.unwrap();

        assert!(!cache.has("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let (cache, _temp_dir) = create_test_cache().await;
        let profile = Profile {
            name: "ada".to_string(),
            score: 10,
        };

        cache.set("profile", &profile, None).await.unwrap();

        assert_eq!(cache.get::<Profile>("profile").await.unwrap(), Some(profile));
        assert_eq!(cache.get::<Profile>("missing").await.unwrap(), None);
        assert_eq!(cache.get_or("missing", 5u32).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_typed_get_with_wrong_type_fails() {
        let (cache, _temp_dir) = create_test_cache().await;
        cache.set("n", &"not a number", None).await.unwrap();

        let result = cache.get::<u32>("n").await;
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_raw_pass_through() {
        let (cache, _temp_dir) = create_test_cache().await;

        cache.set_value("raw", json!({"a": [1, 2]}), None).await.unwrap();
        assert!(cache.has("raw").await.unwrap());
        assert_eq!(
            cache.get_value("raw", None).await.unwrap(),
            Some(json!({"a": [1, 2]}))
        );

        cache.unset("raw").await.unwrap();
        assert!(!cache.has("raw").await.unwrap());
        assert_eq!(
            cache.get_value("raw", Some(json!("d"))).await.unwrap(),
            Some(json!("d"))
        );
    }

    #[tokio::test]
    async fn test_call_cold_path_runs_producer_once() {
        let (cache, _temp_dir) = create_test_cache().await;
        let runs = AtomicUsize::new(0);
        let counter = &runs;

        let value: Profile = cache
            .call(
                "user:1",
                move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Profile {
                        name: "grace".to_string(),
                        score: 7,
                    }
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(value.name, "grace");
        assert_eq!(cache.get::<Profile>("user:1").await.unwrap(), Some(value));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 0, misses: 1 });
    }

    #[tokio::test]
    async fn test_call_warm_path_skips_producer() {
        let (cache, _temp_dir) = create_test_cache().await;
        cache.set("answer", &42u32, None).await.unwrap();
        let runs = AtomicUsize::new(0);
        let counter = &runs;

        let value: u32 = cache
            .call(
                "answer",
                move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    0
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 0 });
    }

    #[tokio::test]
    async fn test_call_returns_round_tripped_value() {
        let (cache, _temp_dir) = create_test_cache().await;

        let value: f64 = cache.call("pi", || async { 3.5f64 }, None).await.unwrap();
        assert_eq!(value, 3.5);
        assert_eq!(cache.get_value("pi", None).await.unwrap(), Some(json!(3.5)));
    }

    #[tokio::test]
    async fn test_call_recomputes_after_expiry() {
        let (cache, _temp_dir) = create_test_cache().await;
        let runs = AtomicUsize::new(0);
        let counter = &runs;
        let produce = move || async move { counter.fetch_add(1, Ordering::SeqCst) as u32 };

        assert_eq!(cache.call("tick", produce, Some(50)).await.unwrap(), 0);
        assert_eq!(cache.call("tick", produce, Some(50)).await.unwrap(), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(cache.call("tick", produce, Some(50)).await.unwrap(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_try_call_producer_error_writes_nothing() {
        let (cache, _temp_dir) = create_test_cache().await;

        let result: Result<u32> = cache
            .try_call("flaky", || async { Err(anyhow::anyhow!("upstream down")) }, None)
            .await;

        assert!(matches!(result, Err(CacheError::Producer(_))));
        assert!(!cache.has("flaky").await.unwrap());
    }

    #[tokio::test]
    async fn test_has_records_lookup_stats() {
        let (cache, _temp_dir) = create_test_cache().await;
        cache.set("present", &true, None).await.unwrap();

        assert!(cache.has("present").await.unwrap());
        assert!(cache.has("present").await.unwrap());
        assert!(!cache.has("absent").await.unwrap());

        let stats = cache.stats();
        assert_eq!(stats, CacheStats { hits: 2, misses: 1 });

        // plain reads and writes do not count
        cache.get::<bool>("present").await.unwrap();
        cache.unset("present").await.unwrap();
        assert_eq!(cache.stats(), stats);
    }

    #[tokio::test]
    async fn test_key_isolation() {
        let (cache, _temp_dir) = create_test_cache().await;

        cache.set("a", &"alpha", None).await.unwrap();
        cache.set("b", &"beta", None).await.unwrap();
        cache.unset("a").await.unwrap();

        assert!(!cache.has("a").await.unwrap());
        assert_eq!(cache.get::<String>("b").await.unwrap(), Some("beta".to_string()));
    }
}
