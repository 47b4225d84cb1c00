//! Application state.

use std::sync::Arc;

use gateway_bus::EventSink;
use gateway_cache::AuthCache;
use gateway_providers::{AnthropicAdapter, OpenAiAdapter, ProviderAdapter};
use gateway_store::Store;

use crate::config::ServiceConfig;

/// The set of adapters the pipeline can dispatch to, keyed by ingress route.
pub struct Providers {
    /// `/v1/chat/completions`.
    pub openai_chat: OpenAiAdapter,
    /// `/v1/responses`.
    pub openai_responses: OpenAiAdapter,
    /// `/v1/messages`.
    pub anthropic_messages: AnthropicAdapter,
}

impl Providers {
    /// Resolve the adapter and upstream credentials/base URL for a given
    /// provider name (spec.md §3 `ModelCost.provider`).
    #[must_use]
    pub fn adapter_for(&self, provider: &str) -> Option<&dyn ProviderAdapter> {
        match provider {
            "openai" => Some(&self.openai_chat),
            "openai-responses" => Some(&self.openai_responses),
            "anthropic" => Some(&self.anthropic_messages),
            _ => None,
        }
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Durable account/key/pricing storage.
    pub store: Arc<dyn Store>,
    /// Read-through cache fronting `store` for the auth hot path.
    pub cache: Arc<AuthCache>,
    /// Invalidation publisher used by admin mutation handlers.
    pub bus: Arc<dyn EventSink>,
    /// Upstream provider adapters.
    pub providers: Arc<Providers>,
    /// Service configuration.
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    /// Assemble application state from its already-constructed components.
    /// Wiring (which concrete `Store`/bus/cache to use) happens in `main`,
    /// not here, keeping this constructor free of environment concerns
    /// (spec.md §9 "no global mutable state").
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<AuthCache>,
        bus: Arc<dyn EventSink>,
        config: Arc<ServiceConfig>,
    ) -> Self {
        let providers = Arc::new(Providers {
            openai_chat: OpenAiAdapter::chat_completions(),
            openai_responses: OpenAiAdapter::responses(),
            anthropic_messages: AnthropicAdapter::messages(),
        });

        Self {
            store,
            cache,
            bus,
            providers,
            config,
        }
    }

    /// Credentials and base URL to dial for a given provider name.
    #[must_use]
    pub fn upstream_for(&self, provider: &str) -> Option<(&str, &str)> {
        match provider {
            "openai" | "openai-responses" => {
                Some((self.config.openai_api_key.as_str(), self.config.openai_base_url.as_str()))
            }
            "anthropic" => Some((
                self.config.anthropic_api_key.as_str(),
                self.config.anthropic_base_url.as_str(),
            )),
            _ => None,
        }
    }
}
