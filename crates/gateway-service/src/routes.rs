//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, health, llm};
use crate::state::AppState;

/// Maximum concurrent requests against the proxy routes. Upstream calls are
/// I/O-bound and can be long-lived (streaming), so this bounds how many run
/// at once per instance rather than limiting total throughput.
const PROXY_MAX_CONCURRENT_REQUESTS: usize = 200;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Readiness probe
///
/// ## Proxy (bearer API key auth, rate-limited)
/// - `POST /v1/chat/completions` - OpenAI chat dialect
/// - `POST /v1/responses` - OpenAI responses dialect
/// - `POST /v1/messages` - Anthropic messages dialect
///
/// ## Admin (`X-Admin-Key` auth)
/// - `PUT /admin/accounts/:user_id`
/// - `PUT /admin/apikeys/:api_key`
/// - `PUT /admin/modelcosts/:model_name`
#[must_use]
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout;

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Proxy routes handle long-lived streaming calls, so they have their own
    // concurrency ceiling separate from the admin surface.
    let proxy_routes = Router::new()
        .route("/chat/completions", post(llm::chat_completions))
        .route("/responses", post(llm::responses))
        .route("/messages", post(llm::messages))
        .layer(ConcurrencyLimitLayer::new(PROXY_MAX_CONCURRENT_REQUESTS));

    let admin_routes = Router::new()
        .route("/accounts/:user_id", put(admin::put_account))
        .route("/apikeys/:api_key", put(admin::put_api_key))
        .route("/modelcosts/:model_name", put(admin::put_model_cost));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // Proxy routes (rate limited)
        .nest("/v1", proxy_routes)
        // Admin routes
        .nest("/admin", admin_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
