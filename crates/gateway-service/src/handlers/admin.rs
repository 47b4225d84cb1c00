//! Minimal admin mutation surface.
//!
//! spec.md §2 scopes the admin CRUD routes themselves out of the core and
//! specifies only their cache-invalidation side effect; these handlers exist
//! so that side effect has something to hang off of. Every write follows the
//! same shape: upsert into the store, then publish an invalidation event
//! iff the write committed (spec.md §6 admin surface contract).

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use gateway_bus::{EventSink, InvalidationEvent};
use gateway_core::{Account, ApiKey, ModelCost};
use gateway_store::Store;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// `PUT /admin/accounts/:user_id`.
#[derive(Debug, Deserialize)]
pub struct PutAccountRequest {
    /// Human label.
    pub account_name: Option<String>,
    /// Spending ceiling. `0` means no positive allowance (default-deny).
    pub budget_usd: Decimal,
    /// Boolean gate.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

pub async fn put_account(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(user_id): Path<String>,
    Json(body): Json<PutAccountRequest>,
) -> Result<(), ApiError> {
    let existing = state.store.get_account(&user_id).await.ok();
    let mut account = existing.unwrap_or_else(|| Account::new(user_id.clone(), body.budget_usd));
    account.account_name = body.account_name;
    account.budget_usd = body.budget_usd;
    account.is_active = body.is_active;
    account.updated_at = chrono::Utc::now();

    state.store.upsert_account(account).await?;
    state.bus.publish(InvalidationEvent::account(&user_id)).await.map_err(|e| {
        gateway_core::GatewayError::Internal(format!("publishing invalidation event: {e}"))
    })?;
    Ok(())
}

/// `PUT /admin/apikeys/:api_key`.
#[derive(Debug, Deserialize)]
pub struct PutApiKeyRequest {
    /// The account this key is bound to.
    pub user_id: String,
    /// Human label.
    pub key_name: Option<String>,
    /// Boolean gate.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// `None` means no restriction.
    pub allowed_models: Option<HashSet<String>>,
}

pub async fn put_api_key(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(api_key): Path<String>,
    Json(body): Json<PutApiKeyRequest>,
) -> Result<(), ApiError> {
    let existing = state.store.get_api_key(&api_key).await.ok();
    let mut key = existing.unwrap_or_else(|| ApiKey::new(api_key.clone(), body.user_id.clone()));
    key.user_id = body.user_id;
    key.key_name = body.key_name;
    key.is_active = body.is_active;
    key.allowed_models = body.allowed_models;
    key.updated_at = chrono::Utc::now();

    state.store.upsert_api_key(key).await?;
    state.bus.publish(InvalidationEvent::api_key(&api_key)).await.map_err(|e| {
        gateway_core::GatewayError::Internal(format!("publishing invalidation event: {e}"))
    })?;
    Ok(())
}

/// `PUT /admin/modelcosts/:model_name`.
#[derive(Debug, Deserialize)]
pub struct PutModelCostRequest {
    /// Informational tag.
    pub provider: String,
    /// Rate per million input tokens, USD.
    pub input_cost_per_million_tokens_usd: Decimal,
    /// Rate per million output tokens, USD.
    pub output_cost_per_million_tokens_usd: Decimal,
    /// Rate per million cache-read tokens, USD.
    pub cache_read_cost_per_million_tokens_usd: Decimal,
    /// Rate per million cache-write tokens, USD.
    pub cache_write_cost_per_million_tokens_usd: Decimal,
}

pub async fn put_model_cost(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(model_name): Path<String>,
    Json(body): Json<PutModelCostRequest>,
) -> Result<(), ApiError> {
    let model_cost = ModelCost::new(
        model_name.clone(),
        body.provider,
        body.input_cost_per_million_tokens_usd,
        body.output_cost_per_million_tokens_usd,
        body.cache_read_cost_per_million_tokens_usd,
        body.cache_write_cost_per_million_tokens_usd,
    );

    state.store.upsert_model_cost(model_cost).await?;
    state.bus.publish(InvalidationEvent::model_cost(&model_name)).await.map_err(|e| {
        gateway_core::GatewayError::Internal(format!("publishing invalidation event: {e}"))
    })?;
    Ok(())
}
