//! API Module
//!
//! HTTP handlers and routing that expose the admission facade.
//!
//! # Endpoints
//! - `GET /users/:id` - Fetch a user through rate limiting, cache and dedup queue
//! - `GET /stats` - Get cache statistics and queue status
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
