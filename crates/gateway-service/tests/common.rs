//! Common test utilities for gateway integration tests.

#![allow(dead_code)] // Not every test file uses every helper.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_test::TestServer;
use gateway_bus::LocalBus;
use gateway_cache::AuthCache;
use gateway_core::{Account, ApiKey, ModelCost};
use gateway_store::{MemStore, Store};
use rust_decimal::Decimal;
use wiremock::MockServer;

use gateway_service::{create_router, AppState, ServiceConfig};

pub const ADMIN_KEY: &str = "test-admin-key";

/// Everything an integration test needs: a running router, the backing
/// store (for direct assertions), and mock upstreams for both dialects.
pub struct TestHarness {
    pub server: TestServer,
    pub store: Arc<MemStore>,
    pub bus: Arc<LocalBus>,
    pub cache: Arc<AuthCache>,
    pub openai: MockServer,
    pub anthropic: MockServer,
}

/// A `ServiceConfig` with test-sized defaults, pointed at the given mock
/// upstreams. Shared by `TestHarness` and tests that need to assemble their
/// own `AppState` with a non-default bus.
pub fn test_config(openai_base_url: String, anthropic_base_url: String) -> Arc<ServiceConfig> {
    Arc::new(ServiceConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_url: String::new(),
        redis_url: String::new(),
        invalidation_channel: "test-invalidations".into(),
        admin_api_key: ADMIN_KEY.into(),
        openai_api_key: "sk-openai-test".into(),
        openai_base_url,
        anthropic_api_key: "sk-anthropic-test".into(),
        anthropic_base_url,
        cache_ttl: Duration::from_secs(3600),
        cache_max_entries: 10_000,
        upstream_timeout: Duration::from_secs(5),
        max_body_bytes: 1024 * 1024,
        request_timeout: Duration::from_secs(30),
        cors_origins: vec!["*".into()],
    })
}

impl TestHarness {
    pub async fn new() -> Self {
        let store = Arc::new(MemStore::new());
        let bus = Arc::new(LocalBus::default());
        let openai = MockServer::start().await;
        let anthropic = MockServer::start().await;

        let config = test_config(openai.uri(), anthropic.uri());

        let cache = Arc::new(AuthCache::new(
            Arc::clone(&store) as Arc<dyn Store>,
            config.cache_ttl,
            config.cache_max_entries,
        ));

        let state = AppState::new(
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::clone(&cache),
            Arc::clone(&bus) as Arc<dyn gateway_bus::EventSink>,
            config,
        );

        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("failed to create test server");

        Self {
            server,
            store,
            bus,
            cache,
            openai,
            anthropic,
        }
    }

    /// Seed an active account, a key bound to it, and a pricing row.
    pub async fn seed_account(&self, user_id: &str, budget_usd: Decimal) {
        self.store
            .upsert_account(Account::new(user_id, budget_usd))
            .await
            .unwrap();
    }

    pub async fn seed_api_key(&self, api_key: &str, user_id: &str) {
        self.store
            .upsert_api_key(ApiKey::new(api_key, user_id))
            .await
            .unwrap();
    }

    pub async fn seed_model_cost(
        &self,
        model_name: &str,
        input_per_million: Decimal,
        output_per_million: Decimal,
    ) {
        self.store
            .upsert_model_cost(ModelCost::new(
                model_name,
                "openai",
                input_per_million,
                output_per_million,
                Decimal::ZERO,
                Decimal::ZERO,
            ))
            .await
            .unwrap();
    }

    pub fn bearer(api_key: &str) -> String {
        format!("Bearer {api_key}")
    }

    /// Poll `store.usage_logs()` until it has at least `n` rows, or give up.
    /// Needed because streaming settlement runs in a detached task after
    /// the response body has already been returned to the client.
    pub async fn wait_for_logs(&self, n: usize) -> Vec<gateway_core::UsageLog> {
        for _ in 0..50 {
            let logs = self.store.usage_logs();
            if logs.len() >= n {
                return logs;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.store.usage_logs()
    }
}
