//! API Module
//!
//! HTTP handlers and routing exposing the cache facade.
//!
//! # Endpoints
//! - `PUT /set` - Store a key-value pair
//! - `GET /get/:key` - Retrieve a value by key
//! - `GET /has/:key` - Check whether a live entry exists
//! - `DELETE /del/:key` - Delete a key
//! - `GET /stats` - Lookup hit/miss statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
