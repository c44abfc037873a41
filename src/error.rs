//! Error types for the cache facade and its drivers
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for drivers, the facade and the HTTP surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Filesystem base directory could not be created
    #[error("Could not prepare cache directory [{}]: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Redis server could not be reached during initialization
    #[error("Could not connect to redis server on [{host}:{port}]: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: redis::RedisError,
    },

    /// Driver used before `init_driver` completed
    #[error("Cache driver '{0}' is not initialized")]
    NotInitialized(&'static str),

    /// Redis command failed after a successful connect
    #[error("Transport error: {0}")]
    Transport(#[from] redis::RedisError),

    /// Filesystem write or delete failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compute-or-fetch producer failed
    #[error("Producer failed: {0}")]
    Producer(anyhow::Error),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CacheError {
    /// Returns true for failures raised while initializing a driver.
    pub fn is_init(&self) -> bool {
        matches!(self, CacheError::Directory { .. } | CacheError::Connect { .. })
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Connect { .. }
            | CacheError::Transport(_)
            | CacheError::NotInitialized(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
