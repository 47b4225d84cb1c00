//! S4 — invalidation propagation: two instances sharing a store and bus
//! converge on a budget change within the bus propagation delay.

use std::sync::Arc;
use std::time::Duration;

use gateway_bus::{EventSink, InvalidationEvent, LocalBus};
use gateway_cache::{run_invalidation_listener, AuthCache};
use gateway_core::{Account, ApiKey, GatewayError};
use gateway_service::resolver;
use gateway_store::{MemStore, Store};
use rust_decimal::Decimal;

#[tokio::test]
async fn s4_invalidation_propagates_to_both_instances() {
    let store = Arc::new(MemStore::new());
    store
        .upsert_account(Account::new("u1", Decimal::from(10)))
        .await
        .unwrap();
    store.upsert_api_key(ApiKey::new("sk-a", "u1")).await.unwrap();

    let bus = Arc::new(LocalBus::default());

    // Two per-instance caches, each with its own subscription, sharing the
    // same store and bus.
    let cache_1 = Arc::new(AuthCache::with_defaults(Arc::clone(&store) as Arc<dyn Store>));
    let cache_2 = Arc::new(AuthCache::with_defaults(Arc::clone(&store) as Arc<dyn Store>));

    let listener_1 = tokio::spawn(run_invalidation_listener(
        Arc::clone(&cache_1),
        Arc::clone(&bus) as Arc<dyn gateway_bus::EventSource>,
    ));
    let listener_2 = tokio::spawn(run_invalidation_listener(
        Arc::clone(&cache_2),
        Arc::clone(&bus) as Arc<dyn gateway_bus::EventSource>,
    ));

    // Warm both caches with the pre-update account.
    resolver::resolve(&cache_1, "sk-a").await.unwrap();
    resolver::resolve(&cache_2, "sk-a").await.unwrap();

    // Admin update: budget drops to effectively zero headroom, then the
    // invalidation event is published.
    let mut account = store.get_account("u1").await.unwrap();
    account.budget_usd = Decimal::new(1, 3); // 0.001
    account.spent_usd = Decimal::from(1); // already over budget
    store.upsert_account(account).await.unwrap();
    bus.publish(InvalidationEvent::account("u1")).await.unwrap();

    // Propagation delay bound.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err_1 = resolver::resolve(&cache_1, "sk-a").await.unwrap_err();
    let err_2 = resolver::resolve(&cache_2, "sk-a").await.unwrap_err();
    assert!(matches!(err_1, GatewayError::BudgetExceeded));
    assert!(matches!(err_2, GatewayError::BudgetExceeded));

    listener_1.abort();
    listener_2.abort();
}
