//! The gateway's error taxonomy (spec §7).

use crate::ids::IdError;

/// Result type for gateway-core operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors raised anywhere in the request lifecycle.
///
/// Each variant maps to exactly one row of the error taxonomy; the HTTP
/// status mapping lives at the service boundary (`gateway-service::error`),
/// not here, since this crate has no notion of HTTP.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing, unknown, or inactive `ApiKey`.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The `ApiKey`'s `user_id` does not resolve to any `Account`.
    #[error("account not found for this credential")]
    AccountMissing,

    /// The resolved `Account` is inactive.
    #[error("account disabled")]
    AccountDisabled,

    /// Precheck failed: `spent_usd >= budget_usd` (or `budget_usd == 0`).
    #[error("budget exceeded")]
    BudgetExceeded,

    /// `model` is absent from the key's `allowed_models`.
    #[error("model not permitted for this key: {model_name}")]
    ModelForbidden {
        /// The model the caller requested.
        model_name: String,
    },

    /// The upstream provider returned an HTTP error. The caller is expected
    /// to forward `status` and `body` verbatim.
    #[error("upstream returned {status}")]
    UpstreamError {
        /// Upstream HTTP status code.
        status: u16,
        /// Upstream response body, forwarded verbatim.
        body: Vec<u8>,
    },

    /// The upstream could not be reached (connect/TLS failure before any byte).
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Store, bus, or pricing failure affecting a call.
    #[error("internal error: {0}")]
    Internal(String),

    /// A requested entity does not exist in the store.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
