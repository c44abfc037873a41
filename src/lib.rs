//! kv_cache - A key-value cache facade over interchangeable drivers
//!
//! Application code talks to a [`Cache`] holding one active driver: files
//! on disk ([`FilesystemDriver`]) or a Redis server ([`RedisDriver`]). Entries
//! carry millisecond TTLs, and [`Cache::call`] implements compute-or-fetch.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;

pub use api::AppState;
pub use cache::{Cache, CacheDriver, DriverConfig, FilesystemDriver, RedisConfig, RedisDriver};
pub use config::Config;
pub use error::{CacheError, Result};
