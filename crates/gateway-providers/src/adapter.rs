//! The uniform provider contract (spec.md §4.7).

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use gateway_core::{Result, Usage};
use tokio::sync::oneshot;

/// One already-formatted protocol chunk, suitable for passthrough to the
/// client unmodified.
pub type Chunk = std::result::Result<Bytes, std::io::Error>;

/// Resolves exactly once, after the stream has ended normally, with the
/// final usage — or `None` if the upstream never sent a usage trailer
/// (spec.md §4.7's "usage unavailable" sentinel).
pub type FinalUsage = oneshot::Receiver<Option<Usage>>;

/// The result of dispatching one request to a provider: either it completed
/// as a single response, or it is an in-progress stream whose usage arrives
/// only at the end (spec.md §9 "Streaming as tagged variant").
pub enum AdapterResponse {
    /// A complete response plus the usage the provider reported for it.
    Unary {
        /// Raw response body, forwarded to the client unmodified.
        body: Bytes,
        /// Token usage for this call.
        usage: Usage,
    },
    /// A chunk stream already started; `final_usage` resolves once the
    /// stream ends.
    Stream {
        /// Chunks to forward to the client as they arrive.
        chunks: BoxStream<'static, Chunk>,
        /// Resolves with the usage trailer once the stream ends.
        final_usage: FinalUsage,
    },
}

/// Credentials and routing information needed to dial one upstream call.
/// The adapter does not choose these; the pipeline supplies them from
/// configuration (spec.md §6).
pub struct Dispatch<'a> {
    /// The raw request body as received from the client, forwarded verbatim
    /// (the `model` field inside it is also the key used for Pricing).
    pub raw_request_body: &'a [u8],
    /// The provider credential to attach to the outbound call.
    pub credentials: &'a str,
    /// The provider's configured base URL.
    pub base_url: &'a str,
    /// Per-call timeout, inherited from the inbound request or a default.
    pub timeout: std::time::Duration,
}

/// A narrow, uniform contract over an upstream LLM provider.
///
/// Implementations do not translate between dialects — routing to the
/// correct dialect is static by ingress endpoint (spec.md §6); each adapter
/// speaks exactly one dialect.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Informational tag, used in logs and error messages.
    fn provider_name(&self) -> &'static str;

    /// Forward `dispatch` upstream. The adapter itself decides unary vs.
    /// streaming by inspecting the request body's `stream` flag.
    ///
    /// # Errors
    ///
    /// Returns [`gateway_core::GatewayError::UpstreamUnavailable`] on
    /// connect/TLS failure before any byte is received, and
    /// [`gateway_core::GatewayError::UpstreamError`] when the upstream
    /// responds with a non-2xx status (to be forwarded verbatim).
    async fn dispatch(&self, dispatch: Dispatch<'_>) -> Result<AdapterResponse>;
}
