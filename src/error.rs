//! Error types for the admission layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Fetch Error ==
/// Failure of a caller-supplied fetch.
///
/// Cloneable so a single failure can be handed to every coalesced waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The backing store reported a failure
    #[error("Fetch failed: {0}")]
    Failed(String),

    /// The fetch task panicked or was torn down before it settled
    #[error("Fetch aborted before completion")]
    Aborted,
}

// == Shield Error Enum ==
/// Unified error type for the HTTP surface.
#[derive(Error, Debug)]
pub enum ShieldError {
    /// Caller exhausted both rate-limit buckets
    #[error("Too many requests, retry in {reset_in_seconds}s")]
    RateLimited { reset_in_seconds: u64 },

    /// The backing store has no record for the key
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The coalesced fetch failed
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

// == IntoResponse Implementation ==
impl IntoResponse for ShieldError {
    fn into_response(self) -> Response {
        let status = match &self {
            ShieldError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ShieldError::NotFound(_) => StatusCode::NOT_FOUND,
            ShieldError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ShieldError::Fetch(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        let mut response = (status, body).into_response();
        if let ShieldError::RateLimited { reset_in_seconds } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(reset_in_seconds));
        }
        response
    }
}

// == Result Type Alias ==
/// Convenience Result type for the HTTP surface.
pub type Result<T> = std::result::Result<T, ShieldError>;
