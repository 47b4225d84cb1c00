//! The durable system-of-record abstraction (spec §4.1).

use async_trait::async_trait;
use gateway_core::{Account, ApiKey, ModelCost, Result, UsageLog};
use rust_decimal::Decimal;

/// Typed reads and atomic writes over accounts, keys, model costs, and the
/// usage log.
///
/// `increment_spent` is the one operation permitted to mutate
/// [`Account::spent_usd`]; every implementation MUST perform it as a single
/// atomic increment. Read-then-write is forbidden by spec.md §4.1.
#[async_trait]
pub trait Store: Send + Sync {
    /// Look up a credential by its opaque token. `Err(NotFound)` if absent.
    async fn get_api_key(&self, api_key: &str) -> Result<ApiKey>;

    /// Look up an account by its stable id. `Err(NotFound)` if absent.
    async fn get_account(&self, user_id: &str) -> Result<Account>;

    /// Look up a pricing row by model name. `Err(NotFound)` if absent.
    async fn get_model_cost(&self, model_name: &str) -> Result<ModelCost>;

    /// Atomically add `delta_usd` to `spent_usd` and return the account
    /// afterwards. `delta_usd` must never be negative; resets are admin-only
    /// and go through [`Store::upsert_account`].
    async fn increment_spent(&self, user_id: &str, delta_usd: Decimal) -> Result<Account>;

    /// Durably append one audit row. Fire-and-forget is acceptable to the
    /// caller; failures must still be surfaced so the caller can log them.
    async fn append_usage_log(&self, log: UsageLog) -> Result<()>;

    /// Admin writer: insert or fully replace an account.
    async fn upsert_account(&self, account: Account) -> Result<()>;

    /// Admin writer: insert or fully replace an API key.
    async fn upsert_api_key(&self, api_key: ApiKey) -> Result<()>;

    /// Admin writer: insert or fully replace a pricing row.
    async fn upsert_model_cost(&self, model_cost: ModelCost) -> Result<()>;

    /// Used by `/health`: a cheap round-trip proving the store is reachable.
    async fn ping(&self) -> Result<()>;
}
