//! An in-memory [`Store`] used by unit and integration tests.
//!
//! `increment_spent` takes the per-account lock for the duration of the
//! read-add-write so concurrent callers still observe a correct sum — the
//! same guarantee Postgres's `UPDATE ... RETURNING` gives for free, just
//! enforced with a `Mutex` instead of a database engine.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use gateway_core::{Account, ApiKey, GatewayError, ModelCost, Result, UsageLog};
use rust_decimal::Decimal;

use crate::Store;

/// In-memory, single-process [`Store`] implementation.
#[derive(Default)]
pub struct MemStore {
    accounts: Mutex<HashMap<String, Account>>,
    api_keys: Mutex<HashMap<String, ApiKey>>,
    model_costs: Mutex<HashMap<String, ModelCost>>,
    usage_logs: Mutex<Vec<UsageLog>>,
}

impl MemStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every appended usage log, in append order. Test-only helper.
    #[must_use]
    pub fn usage_logs(&self) -> Vec<UsageLog> {
        self.usage_logs.lock().expect("usage_logs lock poisoned").clone()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn get_api_key(&self, api_key: &str) -> Result<ApiKey> {
        self.api_keys
            .lock()
            .expect("api_keys lock poisoned")
            .get(api_key)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("api key {api_key}")))
    }

    async fn get_account(&self, user_id: &str) -> Result<Account> {
        self.accounts
            .lock()
            .expect("accounts lock poisoned")
            .get(user_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("account {user_id}")))
    }

    async fn get_model_cost(&self, model_name: &str) -> Result<ModelCost> {
        self.model_costs
            .lock()
            .expect("model_costs lock poisoned")
            .get(model_name)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("model cost {model_name}")))
    }

    async fn increment_spent(&self, user_id: &str, delta_usd: Decimal) -> Result<Account> {
        let mut accounts = self.accounts.lock().expect("accounts lock poisoned");
        let account = accounts
            .get_mut(user_id)
            .ok_or_else(|| GatewayError::NotFound(format!("account {user_id}")))?;
        account.spent_usd += delta_usd;
        account.updated_at = chrono::Utc::now();
        Ok(account.clone())
    }

    async fn append_usage_log(&self, log: UsageLog) -> Result<()> {
        self.usage_logs.lock().expect("usage_logs lock poisoned").push(log);
        Ok(())
    }

    async fn upsert_account(&self, account: Account) -> Result<()> {
        self.accounts
            .lock()
            .expect("accounts lock poisoned")
            .insert(account.user_id.clone(), account);
        Ok(())
    }

    async fn upsert_api_key(&self, api_key: ApiKey) -> Result<()> {
        self.api_keys
            .lock()
            .expect("api_keys lock poisoned")
            .insert(api_key.api_key.clone(), api_key);
        Ok(())
    }

    async fn upsert_model_cost(&self, model_cost: ModelCost) -> Result<()> {
        self.model_costs
            .lock()
            .expect("model_costs lock poisoned")
            .insert(model_cost.model_name.clone(), model_cost);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
