//! API Handlers
//!
//! HTTP request handlers that run requests through the admission facade.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use crate::admission::{Admission, Admitted};
use crate::config::Config;
use crate::error::{Result, ShieldError};
use crate::models::{HealthResponse, StatsResponse, User};
use crate::rate_limit::RateLimitDecision;
use crate::store::UserStore;

const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
const RATE_LIMIT_BURST_REMAINING: &str = "x-ratelimit-burst-remaining";
const CACHE_STATUS: &str = "x-cache";
const RESPONSE_TIME: &str = "x-response-time";
const FORWARDED_FOR: &str = "x-forwarded-for";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Rate limiter, cache and dedup queue
    pub admission: Arc<Admission<User>>,
    /// Slow backing store the facade protects
    pub store: UserStore,
}

impl AppState {
    /// Creates a new AppState around an existing facade and store.
    pub fn new(admission: Admission<User>, store: UserStore) -> Self {
        Self {
            admission: Arc::new(admission),
            store,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Must run inside a tokio runtime, since the facade starts its sweeps.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Admission::from_config(config),
            UserStore::seeded(config.store_latency),
        )
    }

    /// Stops the background sweeps.
    pub fn shutdown(&self) {
        self.admission.shutdown();
    }
}

/// Handler for GET /users/:id
///
/// Rate limits the caller, then serves the user from cache or from a single
/// coalesced store lookup.
pub async fn get_user_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response> {
    let id: u64 = id
        .parse()
        .map_err(|_| ShieldError::InvalidRequest(format!("'{}' is not a user id", id)))?;
    let identity = client_identity(&headers, peer.map(|ConnectInfo(addr)| addr));

    let store = state.store.clone();
    let outcome = state
        .admission
        .admit(&identity, &User::cache_key(id), move || async move {
            store.find(id).await
        })
        .await;

    let response = match outcome {
        Admitted::Rejected(rate) => {
            let error = ShieldError::RateLimited {
                reset_in_seconds: rate.reset_in_seconds,
            };
            with_rate_headers(error.into_response(), &rate)
        }
        Admitted::Failed { error, rate } => {
            with_rate_headers(ShieldError::from(error).into_response(), &rate)
        }
        Admitted::Served {
            value: None, rate, ..
        } => with_rate_headers(
            ShieldError::NotFound(User::cache_key(id)).into_response(),
            &rate,
        ),
        Admitted::Served {
            value: Some(user),
            lookup,
            rate,
            elapsed,
        } => {
            let mut response = with_rate_headers(Json(user).into_response(), &rate);
            let headers = response.headers_mut();
            headers.insert(CACHE_STATUS, HeaderValue::from_static(lookup.as_header()));
            if let Ok(value) = HeaderValue::try_from(format!("{}ms", elapsed.as_millis())) {
                headers.insert(RESPONSE_TIME, value);
            }
            response
        }
    };

    Ok(response)
}

/// Handler for GET /stats
///
/// Returns cache statistics and the live queue status.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.admission.cache_stats(),
        state.admission.queue_status(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Rate-limit identity: first `X-Forwarded-For` hop, else the peer address.
fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn with_rate_headers(mut response: Response, rate: &RateLimitDecision) -> Response {
    let headers = response.headers_mut();
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(rate.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(rate.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(rate.reset_in_seconds));
    headers.insert(RATE_LIMIT_BURST_REMAINING, HeaderValue::from(rate.burst_remaining));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn test_state() -> AppState {
        let config = Config {
            store_latency: std::time::Duration::from_millis(5),
            ..Config::default()
        };
        AppState::from_config(&config)
    }

    async fn get_user(state: &AppState, id: &str, client: &str) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_str(client).unwrap());
        match get_user_handler(State(state.clone()), None, headers, Path(id.to_string())).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }

    #[test]
    fn test_client_identity() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "192.168.1.7:5123".parse().unwrap();

        assert_eq!(client_identity(&headers, None), "unknown");
        assert_eq!(client_identity(&headers, Some(peer)), "192.168.1.7");

        headers.insert(FORWARDED_FOR, HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        assert_eq!(client_identity(&headers, Some(peer)), "203.0.113.9");
    }

    #[tokio::test]
    async fn test_get_user_miss_then_hit() {
        let state = test_state();

        let first = get_user(&state, "1", "10.0.0.1").await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["x-cache"], "MISS");
        assert_eq!(first.headers()["x-ratelimit-limit"], "10");
        assert_eq!(first.headers()["x-ratelimit-burst-remaining"], "4");

        let second = get_user(&state, "1", "10.0.0.1").await;
        assert_eq!(second.headers()["x-cache"], "HIT");
        assert_eq!(state.store.lookups(), 1);

        state.shutdown();
    }

    #[tokio::test]
    async fn test_get_unknown_user() {
        let state = test_state();

        let response = get_user(&state, "999", "10.0.0.1").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-ratelimit-remaining"));
        state.shutdown();
    }

    #[tokio::test]
    async fn test_get_user_bad_id() {
        let state = test_state();

        let response = get_user(&state, "abc", "10.0.0.1").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        state.shutdown();
    }

    #[tokio::test]
    async fn test_store_failure_maps_to_bad_gateway() {
        let state = test_state();
        state.store.set_failing(true);

        let response = get_user(&state, "2", "10.0.0.1").await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "10");
        assert_eq!(response.headers()["x-ratelimit-burst-remaining"], "4");
        assert_eq!(state.admission.cache_stats().size, 0);
        state.shutdown();
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();

        let response = stats_handler(State(state.clone())).await;
        assert_eq!(response.cache.hits, 0);
        assert_eq!(response.queue.active_count, 0);
        state.shutdown();
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
