//! Proxy handlers for the three ingress dialects (spec.md §6).

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use bytes::Bytes;

use crate::auth::BearerApiKey;
use crate::error::ApiError;
use crate::pipeline::{self, RouteContext};
use crate::state::AppState;

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .map(str::to_string)
}

/// `POST /v1/chat/completions` — OpenAI chat dialect.
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    BearerApiKey(token): BearerApiKey,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    pipeline::handle(
        &state,
        &token,
        RouteContext {
            provider: "openai",
            request_endpoint: "/v1/chat/completions",
            ip_address: client_ip(&headers),
        },
        body,
    )
    .await
}

/// `POST /v1/responses` — OpenAI responses dialect.
pub async fn responses(
    State(state): State<Arc<AppState>>,
    BearerApiKey(token): BearerApiKey,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    pipeline::handle(
        &state,
        &token,
        RouteContext {
            provider: "openai-responses",
            request_endpoint: "/v1/responses",
            ip_address: client_ip(&headers),
        },
        body,
    )
    .await
}

/// `POST /v1/messages` — Anthropic messages dialect.
pub async fn messages(
    State(state): State<Arc<AppState>>,
    BearerApiKey(token): BearerApiKey,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    pipeline::handle(
        &state,
        &token,
        RouteContext {
            provider: "anthropic",
            request_endpoint: "/v1/messages",
            ip_address: client_ip(&headers),
        },
        body,
    )
    .await
}
