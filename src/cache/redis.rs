//! Redis Driver Module
//!
//! Stores JSON-encoded values in Redis under a namespaced key. Expiry is
//! delegated to the server through `SET .. PX`, so this driver never checks
//! or sweeps expired entries itself.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::cache::entry::effective_ttl;
use crate::cache::CacheDriver;
use crate::error::{CacheError, Result};

// == Redis Config ==
/// Connection and namespacing settings for [`RedisDriver`].
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Full connection URL; when set, host/port/credentials are ignored
    pub url: Option<String>,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// ACL username
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Raw key prefix, normalized to snake_case before use
    pub prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "127.0.0.1".to_string(),
            port: 6379,
            username: None,
            password: None,
            prefix: String::new(),
        }
    }
}

impl RedisConfig {
    fn client(&self) -> redis::RedisResult<Client> {
        match &self.url {
            Some(url) => Client::open(url.as_str()),
            None => Client::open(ConnectionInfo {
                addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
                redis: RedisConnectionInfo {
                    username: self.username.clone(),
                    password: self.password.clone(),
                    ..Default::default()
                },
            }),
        }
    }
}

// == Redis Driver ==
/// Cache driver backed by a Redis server.
pub struct RedisDriver {
    config: RedisConfig,
    /// Normalized key prefix
    prefix: String,
    /// Established once by `init_driver`
    connection: OnceCell<MultiplexedConnection>,
}

impl RedisDriver {
    // == Constructor ==
    /// Creates a driver from configuration. Call `init_driver` before use.
    pub fn new(config: RedisConfig) -> Self {
        let prefix = snake_case(&config.prefix);
        Self {
            config,
            prefix,
            connection: OnceCell::new(),
        }
    }

    // == Physical Key ==
    /// Maps a logical key to its namespaced Redis key.
    pub fn physical_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Returns a handle to the shared connection.
    fn connection(&self) -> Result<MultiplexedConnection> {
        self.connection
            .get()
            .cloned()
            .ok_or(CacheError::NotInitialized("redis"))
    }

    async fn connect(&self) -> Result<MultiplexedConnection> {
        let connect_error = |host: String, port: u16, source| {
            error!("Could not connect to redis server on [{}:{}].", host, port);
            CacheError::Connect { host, port, source }
        };

        let client = self.config.client().map_err(|source| {
            connect_error(self.config.host.clone(), self.config.port, source)
        })?;

        // A URL overrides host/port, so name the server the client will dial.
        let (host, port) = match &client.get_connection_info().addr {
            ConnectionAddr::Tcp(host, port) | ConnectionAddr::TcpTls { host, port, .. } => {
                (host.clone(), *port)
            }
            _ => (self.config.host.clone(), self.config.port),
        };

        let connection = match client.get_multiplexed_async_connection().await {
            Ok(connection) => connection,
            Err(source) => return Err(connect_error(host, port, source)),
        };

        info!("Connected to redis server on [{}:{}].", host, port);
        Ok(connection)
    }
}

impl std::fmt::Debug for RedisDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisDriver")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("prefix", &self.prefix)
            .field("connected", &self.connection.initialized())
            .finish()
    }
}

#[async_trait]
impl CacheDriver for RedisDriver {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn init_driver(&self) -> Result<()> {
        self.connection.get_or_try_init(|| self.connect()).await?;
        Ok(())
    }

    async fn set(&self, key: &str, value: Value, ttl_ms: Option<u64>) -> Result<()> {
        let mut conn = self.connection()?;
        let physical = self.physical_key(key);
        let payload = serde_json::to_string(&value)?;

        match effective_ttl(ttl_ms) {
            Some(ttl) => {
                let _: () = conn.pset_ex(&physical, payload, ttl).await?;
            }
            None => {
                let _: () = conn.set(&physical, payload).await?;
            }
        }

        debug!(key = %physical, ttl_ms, "Cache entry written");
        Ok(())
    }

    async fn get(&self, key: &str, default: Option<Value>) -> Result<Option<Value>> {
        let mut conn = self.connection()?;
        let raw: Option<String> = conn.get(self.physical_key(key)).await?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(default),
        }
    }

    async fn has(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection()?;
        let exists: bool = conn.exists(self.physical_key(key)).await?;
        Ok(exists)
    }

    async fn unset(&self, key: &str) -> Result<()> {
        let mut conn = self.connection()?;
        let _: () = conn.del(self.physical_key(key)).await?;
        Ok(())
    }
}

// == Utility Functions ==
/// Converts `camelCase` / `PascalCase` / `UPPER_CASE` text to `snake_case`.
///
/// Underscores are inserted at lower-to-upper transitions and before an
/// uppercase letter that starts a new lowercase word; all other characters
/// are kept and the result is lowercased.
pub fn snake_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || (prev.is_uppercase() && next_is_lower) {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    out
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case(""), "");
        assert_eq!(snake_case("myApp"), "my_app");
        assert_eq!(snake_case("MyApp"), "my_app");
        assert_eq!(snake_case("HTTPCache"), "http_cache");
        assert_eq!(snake_case("APP_CACHE_"), "app_cache_");
        assert_eq!(snake_case("already_snake:"), "already_snake:");
    }

    #[test]
    fn test_physical_key_uses_normalized_prefix() {
        let driver = RedisDriver::new(RedisConfig {
            prefix: "MyApp:".to_string(),
            ..Default::default()
        });

        assert_eq!(driver.physical_key("user:1"), "my_app:user:1");
        assert_ne!(driver.physical_key("a"), driver.physical_key("b"));
    }

    #[test]
    fn test_physical_key_without_prefix() {
        let driver = RedisDriver::new(RedisConfig::default());
        assert_eq!(driver.physical_key("plain"), "plain");
    }

    #[tokio::test]
    async fn test_operations_before_init_fail() {
        let driver = RedisDriver::new(RedisConfig::default());

        assert!(matches!(
            driver.has("k").await,
            Err(CacheError::NotInitialized("redis"))
        ));
        assert!(matches!(
            driver.set("k", json!(1), None).await,
            Err(CacheError::NotInitialized(_))
        ));
    }

    #[tokio::test]
    async fn test_init_reports_unreachable_host() {
        let driver = RedisDriver::new(RedisConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..Default::default()
        });

        let err = driver.init_driver().await.unwrap_err();
        assert!(err.is_init());
        assert!(err.to_string().contains("[127.0.0.1:1]"), "got: {err}");
        assert!(matches!(driver.has("k").await, Err(CacheError::NotInitialized(_))));
    }

    #[tokio::test]
    async fn test_init_reports_url_target() {
        let driver = RedisDriver::new(RedisConfig {
            url: Some("redis://127.0.0.1:1/".to_string()),
            ..Default::default()
        });

        let err = driver.init_driver().await.unwrap_err();
        match &err {
            CacheError::Connect { host, port, .. } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(*port, 1);
            }
            other => panic!("expected connect error, got {other:?}"),
        }
        assert!(err.to_string().contains("[127.0.0.1:1]"), "got: {err}");
        assert!(!err.to_string().contains("6379"), "got: {err}");
    }

    // Live-server tests. Run with `REDIS_URL=redis://127.0.0.1/ cargo test -- --ignored`.
    async fn live_driver() -> RedisDriver {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".into());
        let driver = RedisDriver::new(RedisConfig {
            url: Some(url),
            prefix: "KvCacheTest:".to_string(),
            ..Default::default()
        });
        driver.init_driver().await.expect("redis should be reachable");
        driver
    }

    #[tokio::test]
    #[ignore = "requires a running redis server"]
    async fn test_live_round_trip_and_unset() {
        let driver = live_driver().await;
        let value = json!({"id": 1, "tags": ["x"]});

        driver.set("round_trip", value.clone(), None).await.unwrap();
        assert!(driver.has("round_trip").await.unwrap());
        assert_eq!(driver.get("round_trip", None).await.unwrap(), Some(value));

        driver.unset("round_trip").await.unwrap();
        driver.unset("round_trip").await.unwrap();
        assert!(!driver.has("round_trip").await.unwrap());
        assert_eq!(
            driver.get("round_trip", Some(json!("d"))).await.unwrap(),
            Some(json!("d"))
        );
    }

    #[tokio::test]
    #[ignore = "requires a running redis server"]
    async fn test_live_server_side_expiry() {
        let driver = live_driver().await;

        driver.set("expiring", json!("v"), Some(100)).await.unwrap();
        assert!(driver.has("expiring").await.unwrap());

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert!(!driver.has("expiring").await.unwrap());
    }
}
