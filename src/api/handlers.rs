//! API Handlers
//!
//! HTTP request handlers forwarding to the cache facade.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::Cache;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, GetResponse, HasResponse, HealthResponse, SetRequest, SetResponse,
    StatsResponse,
};

/// Application state shared across all handlers.
///
/// The facade is cheap to clone and shares one driver across clones.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Cache facade holding the active driver
    pub cache: Cache,
}

impl AppState {
    /// Creates a new AppState around an initialized cache.
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Builds and initializes the configured driver.
    pub async fn from_config(config: &crate::config::Config) -> Result<Self> {
        let cache = Cache::new(config.driver_config().build()).await?;
        Ok(Self::new(cache))
    }
}

/// Handler for PUT /set
///
/// Stores a JSON value in the cache with optional TTL (milliseconds).
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state.cache.set_value(&req.key, req.value, req.ttl).await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Returns the stored value, or 404 when no entry exists.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    // Check liveness first so expired filesystem entries are swept, not served
    if !state.cache.has(&key).await? {
        return Err(CacheError::NotFound(key));
    }

    match state.cache.get_value(&key, None).await? {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /has/:key
pub async fn has_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<HasResponse>> {
    let exists = state.cache.has(&key).await?;
    Ok(Json(HasResponse::new(key, exists)))
}

/// Handler for DELETE /del/:key
///
/// Deleting an absent key succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.cache.unset(&key).await?;
    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.cache.driver_name(),
        state.cache.stats(),
    ))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.driver_name()))
}
