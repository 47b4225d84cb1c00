//! HTTP error responses.
//!
//! Wraps [`GatewayError`] so the crate can implement `IntoResponse` for it
//! (the orphan rule forbids implementing it directly on a foreign type).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_core::{GatewayError, RequestId};
use serde::Serialize;

/// Newtype around [`GatewayError`] carrying the HTTP mapping (spec.md §7).
///
/// `request_id` is attached by the pipeline once it knows one, so a 500 can
/// be correlated with the server-side logs carrying the same id.
#[derive(Debug)]
pub struct ApiError {
    /// The underlying error.
    pub error: GatewayError,
    /// Correlation id, if the error happened after the pipeline assigned one.
    pub request_id: Option<RequestId>,
}

impl ApiError {
    /// Attach a correlation id to an already-constructed error.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self { error, request_id: None }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = self.request_id;
        match self.error {
            GatewayError::Unauthenticated => respond(StatusCode::UNAUTHORIZED, "unauthenticated", "unauthenticated"),
            GatewayError::AccountMissing => {
                respond(StatusCode::UNAUTHORIZED, "account_missing", "account not found for this credential")
            }
            GatewayError::AccountDisabled => {
                respond(StatusCode::FORBIDDEN, "account_disabled", "account disabled")
            }
            GatewayError::BudgetExceeded => {
                respond(StatusCode::TOO_MANY_REQUESTS, "budget_exceeded", "budget exceeded")
            }
            GatewayError::ModelForbidden { model_name } => respond(
                StatusCode::FORBIDDEN,
                "model_forbidden",
                &format!("model not permitted for this key: {model_name}"),
            ),
            GatewayError::UpstreamError { status, body } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                (status, body).into_response()
            }
            GatewayError::UpstreamUnavailable(msg) => {
                tracing::warn!(error = %msg, "upstream unavailable");
                respond(StatusCode::BAD_GATEWAY, "upstream_unavailable", "upstream unavailable")
            }
            GatewayError::NotFound(msg) => respond(StatusCode::NOT_FOUND, "not_found", &msg),
            GatewayError::InvalidId(err) => {
                respond(StatusCode::BAD_REQUEST, "invalid_id", &err.to_string())
            }
            GatewayError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                respond_with_id(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "an internal error occurred", request_id)
            }
        }
    }
}

fn respond(status: StatusCode, code: &str, message: &str) -> Response {
    respond_with_id(status, code, message, None)
}

fn respond_with_id(status: StatusCode, code: &str, message: &str, request_id: Option<RequestId>) -> Response {
    let body = ErrorResponse {
        error: ErrorBody {
            code: code.to_string(),
            message: message.to_string(),
            request_id: request_id.map(|id| id.to_string()),
        },
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn internal_error_body_carries_request_id_when_attached() {
        let id = RequestId::generate();
        let err = ApiError::from(GatewayError::Internal("boom".into())).with_request_id(id);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["request_id"], id.to_string());
    }

    #[tokio::test]
    async fn unauthenticated_body_has_no_request_id_field() {
        let response = ApiError::from(GatewayError::Unauthenticated).into_response();

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].get("request_id").is_none());
    }
}
