//! Configuration Module
//!
//! Loads driver selection, driver settings and the HTTP port from
//! environment variables.

use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::cache::{DriverConfig, RedisConfig};

/// Which cache backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Filesystem,
    Redis,
}

impl DriverKind {
    /// Parses a `CACHE_DRIVER` value, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "filesystem" | "fs" | "file" => Some(DriverKind::Filesystem),
            "redis" => Some(DriverKind::Redis),
            _ => None,
        }
    }
}

/// Server and cache configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Selected backend
    pub driver: DriverKind,
    /// Base directory for the filesystem driver
    pub cache_dir: PathBuf,
    /// Redis connection and prefix settings
    pub redis: RedisConfig,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DRIVER` - `filesystem` or `redis` (default: filesystem)
    /// - `CACHE_DIR` - filesystem base directory (default: storage/cache)
    /// - `REDIS_URL` - connection URL, takes precedence over host/port
    /// - `REDIS_HOST` / `REDIS_PORT` - (default: 127.0.0.1 / 6379)
    /// - `REDIS_USERNAME` / `REDIS_PASSWORD` - optional credentials
    /// - `REDIS_CACHE_PREFIX` - key prefix, snake_cased (default: empty)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let driver = match env::var("CACHE_DRIVER") {
            Ok(raw) => DriverKind::parse(&raw).unwrap_or_else(|| {
                warn!("Unknown CACHE_DRIVER '{}', falling back to filesystem", raw);
                DriverKind::Filesystem
            }),
            Err(_) => defaults.driver,
        };

        Self {
            driver,
            cache_dir: non_empty("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            redis: RedisConfig {
                url: non_empty("REDIS_URL"),
                host: non_empty("REDIS_HOST").unwrap_or(defaults.redis.host),
                port: env::var("REDIS_PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.redis.port),
                username: non_empty("REDIS_USERNAME"),
                password: non_empty("REDIS_PASSWORD"),
                prefix: env::var("REDIS_CACHE_PREFIX").unwrap_or_default(),
            },
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
        }
    }

    /// Driver factory input for the selected backend.
    pub fn driver_config(&self) -> DriverConfig {
        match self.driver {
            DriverKind::Filesystem => DriverConfig::Filesystem {
                base_dir: self.cache_dir.clone(),
            },
            DriverKind::Redis => DriverConfig::Redis(self.redis.clone()),
        }
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            driver: DriverKind::Filesystem,
            cache_dir: PathBuf::from("storage/cache"),
            redis: RedisConfig::default(),
            server_port: 3000,
        }
    }
}
