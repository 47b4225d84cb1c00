//! Request-level auth extractors.
//!
//! Two concerns are kept separate: extracting *which* credential the caller
//! presented (this module) and resolving that credential into a
//! [`gateway_core::Principal`] (`crate::resolver`). Handlers compose both.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;
use gateway_core::GatewayError;

/// The raw API key presented in the `Authorization: Bearer <key>` header.
#[derive(Debug, Clone)]
pub struct BearerApiKey(pub String);

impl FromRequestParts<Arc<AppState>> for BearerApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(GatewayError::Unauthenticated)?;

        let key = header
            .strip_prefix("Bearer ")
            .ok_or(GatewayError::Unauthenticated)?;

        if key.is_empty() {
            return Err(GatewayError::Unauthenticated.into());
        }

        Ok(Self(key.to_string()))
    }
}

/// Admin authentication via the `X-Admin-Key` header, required on
/// `/admin/*` routes (spec.md §6 admin contract).
#[derive(Debug, Clone)]
pub struct AdminAuth;

impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let admin_key = parts
            .headers
            .get("x-admin-key")
            .and_then(|v| v.to_str().ok())
            .ok_or(GatewayError::Unauthenticated)?;

        if admin_key != state.config.admin_api_key {
            return Err(GatewayError::Unauthenticated.into());
        }

        Ok(Self)
    }
}
