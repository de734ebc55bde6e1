//! NeYisek API server library.
//!
//! JSON API behind the NeYisek.com storefront, restaurant panel and admin
//! panel. Exposed as a library so the router can be exercised in tests
//! without binding a socket.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;

use axum::http::{HeaderValue, Method};
use axum::{Router, middleware as axum_middleware};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// CORS for browser clients: the public site in production, anything otherwise.
fn cors_layer(state: &AppState) -> CorsLayer {
    let config = state.config();
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any);

    match HeaderValue::from_str(&config.site_url) {
        Ok(origin) if config.environment.is_production() => base.allow_origin(origin),
        _ => base.allow_origin(Any),
    }
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state);

    routes::routes()
        .layer(axum_middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;
    use crate::db::{MemoryStore, Repositories};
    use crate::state::Integrations;

    fn app_for(env: &'static str) -> Router {
        let config = AppConfig::from_lookup(&|key| match key {
            "APP_ENV" => Some(env.to_string()),
            "SITE_URL" => Some("https://neyisek.com".to_string()),
            _ => None,
        })
        .expect("config");
        let state = AppState::with_integrations(
            config,
            Repositories::in_memory(MemoryStore::new()),
            Integrations::default(),
        )
        .expect("state");
        app(state)
    }

    fn preflight() -> Request<Body> {
        Request::options("/api/orders")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .expect("request")
    }

    #[tokio::test]
    async fn test_cors_open_outside_production() {
        let response = app_for("development").oneshot(preflight()).await.expect("response");
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("*"))
        );
    }

    #[tokio::test]
    async fn test_cors_pinned_to_site_in_production() {
        let response = app_for("production").oneshot(preflight()).await.expect("response");
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("https://neyisek.com"))
        );
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let response = app_for("test")
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(middleware::REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = app_for("test")
            .oneshot(Request::get("/api/nope").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
