//! The per-instance TTL/LRU cache (spec.md §4.3).

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use gateway_bus::{EventKind, EventSource, InvalidationEvent};
use gateway_core::{Account, ApiKey, GatewayError, ModelCost, Result};
use gateway_store::Store;
use moka::future::Cache;

/// Default TTL for all three namespaces (spec.md §4.3, §6).
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Default per-namespace capacity (spec.md §4.3, §6).
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Three time-bounded, capacity-bounded maps over `ApiKey`, `Account`, and
/// `ModelCost`, filled on miss from a [`Store`] with per-key single-flight
/// coalescing (moka's `try_get_with` gives this for free).
pub struct AuthCache {
    store: Arc<dyn Store>,
    api_keys: Cache<String, ApiKey>,
    accounts: Cache<String, Account>,
    model_costs: Cache<String, ModelCost>,
}

impl AuthCache {
    /// Build a cache backed by `store`, with the given TTL and per-namespace
    /// capacity (LRU eviction beyond capacity).
    #[must_use]
    pub fn new(store: Arc<dyn Store>, ttl: Duration, max_entries: u64) -> Self {
        let build = || Cache::builder().time_to_live(ttl).max_capacity(max_entries).build();
        Self {
            store,
            api_keys: build(),
            accounts: build(),
            model_costs: build(),
        }
    }

    /// Build a cache with spec.md's documented defaults.
    #[must_use]
    pub fn with_defaults(store: Arc<dyn Store>) -> Self {
        Self::new(
            store,
            Duration::from_secs(DEFAULT_TTL_SECONDS),
            DEFAULT_MAX_ENTRIES,
        )
    }

    /// `Get`, filling from the store on miss.
    pub async fn get_api_key(&self, api_key: &str) -> Result<ApiKey> {
        let store = Arc::clone(&self.store);
        let key = api_key.to_string();
        self.api_keys
            .try_get_with(key.clone(), async move { store.get_api_key(&key).await })
            .await
            .map_err(unwrap_shared_error)
    }

    /// `Get`, filling from the store on miss.
    pub async fn get_account(&self, user_id: &str) -> Result<Account> {
        let store = Arc::clone(&self.store);
        let key = user_id.to_string();
        self.accounts
            .try_get_with(key.clone(), async move { store.get_account(&key).await })
            .await
            .map_err(unwrap_shared_error)
    }

    /// `Get`, filling from the store on miss.
    pub async fn get_model_cost(&self, model_name: &str) -> Result<ModelCost> {
        let store = Arc::clone(&self.store);
        let key = model_name.to_string();
        self.model_costs
            .try_get_with(key.clone(), async move { store.get_model_cost(&key).await })
            .await
            .map_err(unwrap_shared_error)
    }

    /// `Put` a freshly-read value directly, bypassing a store round-trip.
    /// Used after `increment_spent` so the next read of this account in the
    /// same instance doesn't race a TTL-bound refill against its own write.
    pub async fn put_account(&self, account: Account) {
        self.accounts.insert(account.user_id.clone(), account).await;
    }

    /// `Invalidate(namespace, key)`.
    pub async fn invalidate(&self, event: &InvalidationEvent) {
        match event.kind {
            EventKind::Account => self.accounts.invalidate(&event.key).await,
            EventKind::Apikey => self.api_keys.invalidate(&event.key).await,
            EventKind::Modelcost => self.model_costs.invalidate(&event.key).await,
        }
    }

    /// `InvalidateAll`.
    pub async fn invalidate_all(&self) {
        self.api_keys.invalidate_all();
        self.accounts.invalidate_all();
        self.model_costs.invalidate_all();
    }
}

fn unwrap_shared_error(e: Arc<GatewayError>) -> GatewayError {
    match Arc::try_unwrap(e) {
        Ok(err) => err,
        Err(shared) => match &*shared {
            GatewayError::NotFound(msg) => GatewayError::NotFound(msg.clone()),
            GatewayError::Internal(msg) => GatewayError::Internal(msg.clone()),
            other => GatewayError::Internal(other.to_string()),
        },
    }
}

/// Drive invalidation events from `source` into `cache` until the stream
/// ends (bus disconnect). The caller is expected to retry with bounded
/// backoff — see `gateway-service`'s reconnect loop — since loss of
/// connectivity is tolerated by the TTL bound (spec.md §4.2).
pub async fn run_invalidation_listener(cache: Arc<AuthCache>, source: Arc<dyn EventSource>) {
    let mut stream = match source.subscribe().await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "failed to subscribe to invalidation bus");
            return;
        }
    };
    while let Some(event) = stream.next().await {
        tracing::debug!(kind = ?event.kind, key = %event.key, "invalidation event received");
        cache.invalidate(&event).await;
    }
    tracing::warn!("invalidation bus subscription ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_bus::{EventSink, LocalBus};
    use gateway_store::MemStore;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn miss_fills_from_store() {
        let store = Arc::new(MemStore::new());
        store
            .upsert_account(Account::new("u1", Decimal::new(1000, 2)))
            .await
            .unwrap();
        let cache = AuthCache::with_defaults(store);

        let account = cache.get_account("u1").await.unwrap();
        assert_eq!(account.user_id, "u1");
    }

    #[tokio::test]
    async fn miss_on_absent_key_is_not_found() {
        let store = Arc::new(MemStore::new());
        let cache = AuthCache::with_defaults(store);

        let err = cache.get_account("nobody").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalidate_evicts_then_refills_from_store() {
        let store = Arc::new(MemStore::new());
        store
            .upsert_account(Account::new("u1", Decimal::new(1000, 2)))
            .await
            .unwrap();
        let cache = AuthCache::with_defaults(Arc::clone(&store) as Arc<dyn Store>);

        let first = cache.get_account("u1").await.unwrap();
        assert!(first.is_active);

        let mut updated = first.clone();
        updated.is_active = false;
        store.upsert_account(updated).await.unwrap();

        cache
            .invalidate(&InvalidationEvent::account("u1"))
            .await;

        let refilled = cache.get_account("u1").await.unwrap();
        assert!(!refilled.is_active);
    }

    #[tokio::test]
    async fn unknown_event_kind_is_unreachable_in_typed_api() {
        // EventKind is a closed enum; the "unknown type is logged and
        // ignored" contract (spec.md §4.3) is enforced at the wire-parsing
        // boundary in gateway-bus (EventKind::from_wire), not here.
        let store = Arc::new(MemStore::new());
        let cache = AuthCache::with_defaults(store);
        cache.invalidate_all().await;
    }

    #[tokio::test]
    async fn subscription_listener_invalidates_cached_entry() {
        let store = Arc::new(MemStore::new());
        store
            .upsert_account(Account::new("u1", Decimal::new(1000, 2)))
            .await
            .unwrap();
        let cache = Arc::new(AuthCache::with_defaults(Arc::clone(&store) as Arc<dyn Store>));
        let bus = Arc::new(LocalBus::default());

        let _ = cache.get_account("u1").await.unwrap();

        let listener = tokio::spawn(run_invalidation_listener(
            Arc::clone(&cache),
            Arc::clone(&bus) as Arc<dyn EventSource>,
        ));

        let mut updated = store.get_account("u1").await.unwrap();
        updated.budget_usd = Decimal::new(1, 3);
        store.upsert_account(updated).await.unwrap();
        bus.publish(InvalidationEvent::account("u1")).await.unwrap();

        // Give the listener task a chance to run.
        tokio::time::sleep(Duration::from_millis(20)).await;
        listener.abort();

        let refreshed = cache.get_account("u1").await.unwrap();
        assert_eq!(refreshed.budget_usd, Decimal::new(1, 3));
    }
}
