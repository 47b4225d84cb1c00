//! Anthropic-compatible dialect: `/v1/messages`.
//!
//! Unlike OpenAI's single trailing usage object, Anthropic reports usage
//! incrementally: `message_start` carries input/cache tokens, and
//! `message_delta` carries output tokens. `stream_sse_with_usage` sums
//! deltas across events, so both arrive correctly in the final total.

use async_trait::async_trait;
use gateway_core::{GatewayError, Result, Usage};

use crate::adapter::{AdapterResponse, Dispatch, ProviderAdapter};
use crate::sse::stream_sse_with_usage;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Forwards requests to an Anthropic-compatible upstream using `x-api-key`.
pub struct AnthropicAdapter {
    client: reqwest::Client,
}

impl AnthropicAdapter {
    /// Adapter for `/v1/messages`.
    #[must_use]
    pub fn messages() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

fn usage_delta_from_value(value: &serde_json::Value) -> Option<Usage> {
    // `message_start` nests usage under `message.usage`; `message_delta`
    // has it at the top level. Check both shapes.
    let usage = value
        .get("message")
        .and_then(|m| m.get("usage"))
        .or_else(|| value.get("usage"))?;
    Some(Usage {
        input: usage.get("input_tokens").and_then(serde_json::Value::as_u64).unwrap_or(0),
        output: usage.get("output_tokens").and_then(serde_json::Value::as_u64).unwrap_or(0),
        cache_read: usage
            .get("cache_read_input_tokens")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0),
        cache_write: usage
            .get("cache_creation_input_tokens")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0),
    })
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn provider_name(&self) -> &'static str {
        "anthropic"
    }

    async fn dispatch(&self, dispatch: Dispatch<'_>) -> Result<AdapterResponse> {
        let body: serde_json::Value = serde_json::from_slice(dispatch.raw_request_body)
            .map_err(|e| GatewayError::Internal(format!("decoding request body: {e}")))?;
        let is_stream = body
            .get("stream")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        let url = format!("{}/v1/messages", dispatch.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-api-key", dispatch.credentials)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .timeout(dispatch.timeout)
            .send()
            .await
            .map_err(|e| GatewayError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
            return Err(GatewayError::UpstreamError { status, body });
        }

        if is_stream {
            let (chunks, final_usage) = stream_sse_with_usage(response, usage_delta_from_value);
            Ok(AdapterResponse::Stream { chunks, final_usage })
        } else {
            let body = response
                .bytes()
                .await
                .map_err(|e| GatewayError::UpstreamUnavailable(e.to_string()))?;
            let value: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();
            let usage = usage_delta_from_value(&value).unwrap_or_default();
            Ok(AdapterResponse::Unary { body, usage })
        }
    }
}
