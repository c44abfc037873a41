//! Cache Module
//!
//! A cache facade over interchangeable storage drivers with TTL expiry.

mod driver;
pub mod entry;
mod facade;
mod filesystem;
mod redis;
mod stats;


// Re-export public types
pub use driver::{CacheDriver, DriverConfig};
pub use entry::CacheEntry;
pub use facade::Cache;
pub use filesystem::FilesystemDriver;
pub use self::redis::{snake_case, RedisConfig, RedisDriver};
pub use stats::CacheStats;

// == Public Constants ==
/// Maximum allowed logical key length in bytes accepted by the HTTP API
pub const MAX_KEY_LENGTH: usize = 256;
