//! Gateway service entry point.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use gateway_bus::{EventSource, RedisBus};
use gateway_cache::AuthCache;
use gateway_store::PgStore;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use gateway_service::{create_router, AppState, ServiceConfig};

/// Floor and ceiling of the invalidation listener's reconnect backoff.
const RECONNECT_BACKOFF_MIN_SECS: u64 = 1;
const RECONNECT_BACKOFF_MAX_SECS: u64 = 30;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gateway=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting gateway service");

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        bind_addr = %config.bind_addr,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        cache_max_entries = config.cache_max_entries,
        "configuration loaded"
    );

    let store = match PgStore::connect(&config.database_url).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, "store unreachable at startup");
            return ExitCode::FAILURE;
        }
    };

    let bus = match RedisBus::connect(&config.redis_url, config.invalidation_channel.clone()).await
    {
        Ok(bus) => Arc::new(bus),
        Err(e) => {
            tracing::error!(error = %e, "bus unreachable at startup");
            return ExitCode::FAILURE;
        }
    };

    let cache = Arc::new(AuthCache::new(
        store.clone() as Arc<dyn gateway_store::Store>,
        config.cache_ttl,
        config.cache_max_entries,
    ));

    // Own listener task: the subscription itself never retries, so a
    // runtime bus disconnect is reconnected here with bounded backoff
    // rather than crashing the process.
    tokio::spawn(run_listener_with_backoff(
        cache.clone(),
        bus.clone() as Arc<dyn EventSource>,
    ));

    let config = Arc::new(config);
    let state = AppState::new(
        store as Arc<dyn gateway_store::Store>,
        cache,
        bus as Arc<dyn gateway_bus::EventSink>,
        config.clone(),
    );

    let app = create_router(state);
    tracing::info!("router configured");

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, bind_addr = %config.bind_addr, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(bind_addr = %config.bind_addr, "listening");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server exited with error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Keep the invalidation listener alive across bus disconnects. Each
/// subscription attempt either runs until the connection drops or fails
/// immediately; either way we back off and retry rather than let a stale
/// cache run unbounded.
async fn run_listener_with_backoff(cache: Arc<AuthCache>, source: Arc<dyn EventSource>) {
    let mut backoff = Duration::from_secs(RECONNECT_BACKOFF_MIN_SECS);
    loop {
        gateway_cache::run_invalidation_listener(cache.clone(), source.clone()).await;
        tracing::warn!(backoff_secs = backoff.as_secs(), "reconnecting to invalidation bus");
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(Duration::from_secs(RECONNECT_BACKOFF_MAX_SECS));
    }
}
