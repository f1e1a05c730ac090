//! Tradepost storefront library.
//!
//! The HTTP API for the catalog, purchases and reviews, exposed as a library
//! so the binary and the integration tests build the exact same router.
//!
//! Serve [`app`] with `into_make_service_with_connect_info::<SocketAddr>()`:
//! the auth rate limiter keys on the peer address.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    routing::get,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::StorefrontConfig;
use crate::state::AppState;

/// Router settings taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterOptions {
    /// Requests running longer than this get `408`.
    pub request_timeout: Duration,
    /// Key the auth rate limiter on proxy headers instead of the peer address.
    pub trust_proxy_headers: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            trust_proxy_headers: false,
        }
    }
}

impl From<&StorefrontConfig> for RouterOptions {
    fn from(config: &StorefrontConfig) -> Self {
        Self {
            request_timeout: config.request_timeout,
            trust_proxy_headers: config.trust_proxy_headers,
        }
    }
}

/// Build the full router with its middleware stack.
pub fn app(state: AppState, options: RouterOptions) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes(options.trust_proxy_headers))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            options.request_timeout,
        ))
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if storage does not answer a ping.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.repos().health.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, header};
    use secrecy::SecretString;
    use tower::ServiceExt;

    use super::*;
    use crate::db::{MemoryStore, Repositories};
    use crate::services::tokens::TokenAuthority;

    fn test_app() -> Router {
        let state = AppState::from_parts(
            Repositories::in_memory(Arc::new(MemoryStore::new())),
            TokenAuthority::new(&SecretString::from("hX9#kQ2$vL7@nP4!wR8^tY3&zM6*bC1%")),
        );
        app(state, RouterOptions::default())
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(middleware::REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_readiness_with_memory_storage() {
        let response = test_app()
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_guard_runs_before_body_parsing() {
        let request = Request::post("/review")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = test_app()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
