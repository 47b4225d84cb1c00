//! Postgres-backed [`Store`] implementation.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gateway_core::{Account, ApiKey, BudgetDuration, GatewayError, ModelCost, Result, UsageLog};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

use crate::Store;

/// A connection pool plus the queries needed to satisfy [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to `database_url` with a small pool, and run pending
    /// migrations. Returns `Err` if the database is unreachable, matching
    /// spec.md §6's "startup failure if store ... unreachable → non-zero
    /// exit" requirement.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| GatewayError::Internal(format!("connecting to store: {e}")))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| GatewayError::Internal(format!("running store migrations: {e}")))?;
        Ok(Self { pool })
    }

    /// Wrap an already-constructed pool (used by tests against a local
    /// Postgres instance).
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AccountRow {
    user_id: String,
    account_name: Option<String>,
    budget_usd: Decimal,
    spent_usd: Decimal,
    budget_duration: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        // Only "total" exists today; the column is read for forward
        // compatibility with future window semantics (spec.md §3).
        debug_assert_eq!(row.budget_duration, "total");
        Account {
            user_id: row.user_id,
            account_name: row.account_name,
            budget_usd: row.budget_usd,
            spent_usd: row.spent_usd,
            budget_duration: BudgetDuration::Total,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ApiKeyRow {
    api_key: String,
    user_id: String,
    key_name: Option<String>,
    is_active: bool,
    allowed_models: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ApiKeyRow> for ApiKey {
    fn from(row: ApiKeyRow) -> Self {
        let allowed_models = row.allowed_models.map(|v| {
            serde_json::from_value::<HashSet<String>>(v).unwrap_or_default()
        });
        ApiKey {
            api_key: row.api_key,
            user_id: row.user_id,
            key_name: row.key_name,
            is_active: row.is_active,
            allowed_models,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ModelCostRow {
    model_name: String,
    provider: String,
    input_cost_per_million_tokens_usd: Decimal,
    output_cost_per_million_tokens_usd: Decimal,
    cache_read_cost_per_million_tokens_usd: Decimal,
    cache_write_cost_per_million_tokens_usd: Decimal,
}

impl From<ModelCostRow> for ModelCost {
    fn from(row: ModelCostRow) -> Self {
        ModelCost {
            model_name: row.model_name,
            provider: row.provider,
            input_cost_per_million_tokens_usd: row.input_cost_per_million_tokens_usd,
            output_cost_per_million_tokens_usd: row.output_cost_per_million_tokens_usd,
            cache_read_cost_per_million_tokens_usd: row.cache_read_cost_per_million_tokens_usd,
            cache_write_cost_per_million_tokens_usd: row.cache_write_cost_per_million_tokens_usd,
        }
    }
}

fn map_sqlx_err(e: sqlx::Error) -> GatewayError {
    GatewayError::Internal(format!("store: {e}"))
}

#[async_trait]
impl Store for PgStore {
    async fn get_api_key(&self, api_key: &str) -> Result<ApiKey> {
        let row: Option<ApiKeyRow> = sqlx::query_as(
            "SELECT api_key, user_id, key_name, is_active, allowed_models, created_at, updated_at \
             FROM apikeys WHERE api_key = $1",
        )
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        row.map(Into::into)
            .ok_or_else(|| GatewayError::NotFound(format!("api key {api_key}")))
    }

    async fn get_account(&self, user_id: &str) -> Result<Account> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT user_id, account_name, budget_usd, spent_usd, budget_duration, is_active, \
             created_at, updated_at FROM accounts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        row.map(Into::into)
            .ok_or_else(|| GatewayError::NotFound(format!("account {user_id}")))
    }

    async fn get_model_cost(&self, model_name: &str) -> Result<ModelCost> {
        let row: Option<ModelCostRow> = sqlx::query_as(
            "SELECT model_name, provider, input_cost_per_million_tokens_usd, \
             output_cost_per_million_tokens_usd, cache_read_cost_per_million_tokens_usd, \
             cache_write_cost_per_million_tokens_usd FROM modelcosts WHERE model_name = $1",
        )
        .bind(model_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        row.map(Into::into)
            .ok_or_else(|| GatewayError::NotFound(format!("model cost {model_name}")))
    }

    async fn increment_spent(&self, user_id: &str, delta_usd: Decimal) -> Result<Account> {
        // Single-statement atomic increment: no intervening read of the
        // current value ever happens in application code.
        let row: Option<AccountRow> = sqlx::query_as(
            "UPDATE accounts SET spent_usd = spent_usd + $1, updated_at = now() \
             WHERE user_id = $2 \
             RETURNING user_id, account_name, budget_usd, spent_usd, budget_duration, is_active, \
             created_at, updated_at",
        )
        .bind(delta_usd)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        row.map(Into::into)
            .ok_or_else(|| GatewayError::NotFound(format!("account {user_id}")))
    }

    async fn append_usage_log(&self, log: UsageLog) -> Result<()> {
        sqlx::query(
            "INSERT INTO usagelogs (user_id, api_key, model_name, request_endpoint, ip_address, \
             input_tokens, output_tokens, cache_read_tokens, cache_write_tokens, cost_usd, \
             is_cache_hit, pricing_missing, request_payload, response_payload, timestamp) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(&log.user_id)
        .bind(&log.api_key)
        .bind(&log.model_name)
        .bind(&log.request_endpoint)
        .bind(&log.ip_address)
        .bind(i64::try_from(log.input_tokens).unwrap_or(i64::MAX))
        .bind(i64::try_from(log.output_tokens).unwrap_or(i64::MAX))
        .bind(i64::try_from(log.cache_read_tokens).unwrap_or(i64::MAX))
        .bind(i64::try_from(log.cache_write_tokens).unwrap_or(i64::MAX))
        .bind(log.cost_usd)
        .bind(log.is_cache_hit)
        .bind(log.pricing_missing)
        .bind(&log.request_payload)
        .bind(&log.response_payload)
        .bind(log.timestamp)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn upsert_account(&self, account: Account) -> Result<()> {
        let duration = match account.budget_duration {
            BudgetDuration::Total => "total",
        };
        sqlx::query(
            "INSERT INTO accounts (user_id, account_name, budget_usd, spent_usd, \
             budget_duration, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (user_id) DO UPDATE SET \
             account_name = EXCLUDED.account_name, budget_usd = EXCLUDED.budget_usd, \
             is_active = EXCLUDED.is_active, updated_at = EXCLUDED.updated_at",
        )
        .bind(&account.user_id)
        .bind(&account.account_name)
        .bind(account.budget_usd)
        .bind(account.spent_usd)
        .bind(duration)
        .bind(account.is_active)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn upsert_api_key(&self, api_key: ApiKey) -> Result<()> {
        let allowed_models = api_key
            .allowed_models
            .as_ref()
            .map(|set| serde_json::to_value(set).unwrap_or(serde_json::Value::Null));
        sqlx::query(
            "INSERT INTO apikeys (api_key, user_id, key_name, is_active, allowed_models, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (api_key) DO UPDATE SET \
             key_name = EXCLUDED.key_name, is_active = EXCLUDED.is_active, \
             allowed_models = EXCLUDED.allowed_models, updated_at = EXCLUDED.updated_at",
        )
        .bind(&api_key.api_key)
        .bind(&api_key.user_id)
        .bind(&api_key.key_name)
        .bind(api_key.is_active)
        .bind(allowed_models)
        .bind(api_key.created_at)
        .bind(api_key.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn upsert_model_cost(&self, model_cost: ModelCost) -> Result<()> {
        sqlx::query(
            "INSERT INTO modelcosts (model_name, provider, input_cost_per_million_tokens_usd, \
             output_cost_per_million_tokens_usd, cache_read_cost_per_million_tokens_usd, \
             cache_write_cost_per_million_tokens_usd) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (model_name) DO UPDATE SET \
             provider = EXCLUDED.provider, \
             input_cost_per_million_tokens_usd = EXCLUDED.input_cost_per_million_tokens_usd, \
             output_cost_per_million_tokens_usd = EXCLUDED.output_cost_per_million_tokens_usd, \
             cache_read_cost_per_million_tokens_usd = EXCLUDED.cache_read_cost_per_million_tokens_usd, \
             cache_write_cost_per_million_tokens_usd = EXCLUDED.cache_write_cost_per_million_tokens_usd",
        )
        .bind(&model_cost.model_name)
        .bind(&model_cost.provider)
        .bind(model_cost.input_cost_per_million_tokens_usd)
        .bind(model_cost.output_cost_per_million_tokens_usd)
        .bind(model_cost.cache_read_cost_per_million_tokens_usd)
        .bind(model_cost.cache_write_cost_per_million_tokens_usd)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }
}
