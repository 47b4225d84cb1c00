//! OpenAI-compatible dialect: `/v1/chat/completions` and `/v1/responses`.

use async_trait::async_trait;
use gateway_core::{GatewayError, Result, Usage};

use crate::adapter::{AdapterResponse, Dispatch, ProviderAdapter};
use crate::sse::stream_sse_with_usage;

/// Forwards requests to an OpenAI-compatible upstream using bearer auth.
pub struct OpenAiAdapter {
    client: reqwest::Client,
    /// Path appended to the configured base URL, e.g. `/v1/chat/completions`.
    path: &'static str,
}

impl OpenAiAdapter {
    /// Adapter for `/v1/chat/completions`.
    #[must_use]
    pub fn chat_completions() -> Self {
        Self {
            client: reqwest::Client::new(),
            path: "/v1/chat/completions",
        }
    }

    /// Adapter for `/v1/responses`.
    #[must_use]
    pub fn responses() -> Self {
        Self {
            client: reqwest::Client::new(),
            path: "/v1/responses",
        }
    }
}

fn usage_delta_from_value(value: &serde_json::Value) -> Option<Usage> {
    let usage = value.get("usage")?;
    let cache_read = usage
        .get("prompt_tokens_details")
        .and_then(|d| d.get("cached_tokens"))
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0);
    Some(Usage {
        input: usage.get("prompt_tokens").and_then(serde_json::Value::as_u64).unwrap_or(0),
        output: usage
            .get("completion_tokens")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0),
        cache_read,
        cache_write: 0,
    })
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    async fn dispatch(&self, dispatch: Dispatch<'_>) -> Result<AdapterResponse> {
        let mut body: serde_json::Value = serde_json::from_slice(dispatch.raw_request_body)
            .map_err(|e| GatewayError::Internal(format!("decoding request body: {e}")))?;
        let is_stream = body
            .get("stream")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        if is_stream {
            if let Some(obj) = body.as_object_mut() {
                obj.entry("stream_options")
                    .or_insert_with(|| serde_json::json!({ "include_usage": true }));
            }
        }

        let url = format!("{}{}", dispatch.base_url.trim_end_matches('/'), self.path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(dispatch.credentials)
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
