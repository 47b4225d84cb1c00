//! Orchestrates Resolver → ProviderAdapter → Ledger for one inbound call
//! (spec.md §4.8).
//!
//! State machine: `RECEIVED → AUTHENTICATED → BUDGET_OK → DISPATCHED →
//! {UNARY_DONE | STREAMING → STREAM_CLOSED} → SETTLED`. The budget precheck
//! runs inside `resolver::resolve`, since it operates on the same snapshot
//! the resolver already fetched rather than a second store read.

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use gateway_core::{GatewayError, RequestId};
use gateway_providers::{AdapterResponse, Dispatch, ProviderAdapter};
use tracing::Instrument;

use crate::error::ApiError;
use crate::ledger::{self, SettleCall};
use crate::resolver;
use crate::state::AppState;

/// Everything the pipeline needs to know about one inbound call beyond
/// authentication, fixed statically by which route it arrived on.
pub struct RouteContext<'a> {
    /// Provider key used for both adapter selection and credential lookup
    /// (`"openai"`, `"openai-responses"`, `"anthropic"`) — dialect routing
    /// is static by endpoint (spec.md §4.7).
    pub provider: &'a str,
    /// The ingress path, recorded on the usage log verbatim.
    pub request_endpoint: &'a str,
    /// Caller's IP, if known.
    pub ip_address: Option<String>,
}

/// Run one request through the full pipeline: authenticate, budget-check,
/// dispatch upstream, and settle.
///
/// # Errors
///
/// Any [`GatewayError`] raised before dispatch aborts with no settlement, per
/// spec.md §4.8 ("Any error before DISPATCHED short-circuits... no
/// settlement").
pub async fn handle(
    state: &AppState,
    token: &str,
    route: RouteContext<'_>,
    raw_request_body: Bytes,
) -> Result<Response, ApiError> {
    let request_id = RequestId::generate();
    let span = tracing::info_span!("pipeline", request_id = %request_id, endpoint = route.request_endpoint);
    handle_inner(state, token, route, raw_request_body, request_id)
        .instrument(span)
        .await
        .map_err(|e| e.with_request_id(request_id))
}

async fn handle_inner(
    state: &AppState,
    token: &str,
    route: RouteContext<'_>,
    raw_request_body: Bytes,
    request_id: RequestId,
) -> Result<Response, ApiError> {
    // RECEIVED -> AUTHENTICATED -> BUDGET_OK
    let principal = resolver::resolve(&state.cache, token).await?;

    let model_name = model_name_from_body(&raw_request_body)?;
    if !principal.api_key.permits_model(&model_name) {
        return Err(GatewayError::ModelForbidden { model_name }.into());
    }

    let adapter = state
        .providers
        .adapter_for(route.provider)
        .ok_or_else(|| GatewayError::Internal(format!("no adapter configured for provider {}", route.provider)))?;
    let (credentials, base_url) = state
        .upstream_for(route.provider)
        .ok_or_else(|| GatewayError::Internal(format!("no upstream configured for provider {}", route.provider)))?;

    // BUDGET_OK -> DISPATCHED
    let dispatch = Dispatch {
        raw_request_body: &raw_request_body,
        credentials,
        base_url,
        timeout: state.config.upstream_timeout,
    };
    let response = adapter.dispatch(dispatch).await?;

    match response {
        AdapterResponse::Unary { body, usage } => {
            // DISPATCHED -> UNARY_DONE -> SETTLED (synchronous)
            let request_payload = parse_or_null(&raw_request_body);
            let response_payload = parse_or_null(&body);
            ledger::settle(
                state.store.as_ref(),
                &state.cache,
                SettleCall {
                    request_id,
                    user_id: &principal.account.user_id,
                    api_key: &principal.api_key.api_key,
                    model_name: &model_name,
                    request_endpoint: route.request_endpoint,
                    ip_address: route.ip_address,
                    usage,
                    request_payload,
                    response_payload,
                    force_pricing_missing: false,
                },
            )
            .await;

            Ok((StatusCode::OK, body).into_response())
        }
        AdapterResponse::Stream { chunks, final_usage } => {
            // DISPATCHED -> STREAMING; settlement happens after
            // STREAM_CLOSED, in the background, so the client connection
            // closes as soon as the last upstream chunk is forwarded.
            let user_id = principal.account.user_id.clone();
            let api_key = principal.api_key.api_key.clone();
            let model_name_owned = model_name.clone();
            let request_endpoint = route.request_endpoint.to_string();
            let ip_address = route.ip_address.clone();
            let request_payload = parse_or_null(&raw_request_body);
            let store = state.store.clone();
            let cache = state.cache.clone();

            let settle_span = tracing::info_span!("settle_stream", request_id = %request_id);
            tokio::spawn(
                async move {
                    // STREAMING -> STREAM_CLOSED
                    let (usage, force_pricing_missing) = match final_usage.await {
                        Ok(Some(usage)) => (usage, false),
                        Ok(None) => {
                            tracing::warn!(
                                user_id = %user_id,
                                "stream ended without a usage trailer, settling as pricing-missing"
                            );
                            (gateway_core::Usage::default(), true)
                        }
                        Err(_) => {
                            // Sender dropped without ever sending: the forwarding
                            // task itself panicked. No usage was ever observed,
                            // so do not settle (spec.md §4.7 mid-stream error).
                            tracing::error!(user_id = %user_id, "usage promise dropped, skipping settlement");
                            return;
                        }
                    };

                    // STREAM_CLOSED -> SETTLED
                    ledger::settle(
                        store.as_ref(),
                        &cache,
                        SettleCall {
                            request_id,
                            user_id: &user_id,
                            api_key: &api_key,
                            model_name: &model_name_owned,
                            request_endpoint: &request_endpoint,
                            ip_address,
                            usage,
                            request_payload,
                            response_payload: serde_json::json!({ "streamed": true }),
                            force_pricing_missing,
                        },
                    )
                    .await;
                }
                .instrument(settle_span),
            );

            let body = Body::from_stream(chunks);
            Ok((StatusCode::OK, body).into_response())
        }
    }
}

fn model_name_from_body(raw: &[u8]) -> Result<String, ApiError> {
    let value: serde_json::Value = serde_json::from_slice(raw)
        .map_err(|e| GatewayError::Internal(format!("decoding request body: {e}")))?;
    value
        .get("model")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GatewayError::Internal("request body missing \"model\" field".into()).into())
}

fn parse_or_null(raw: &[u8]) -> serde_json::Value {
    serde_json::from_slice(raw).unwrap_or(serde_json::Value::Null)
}
