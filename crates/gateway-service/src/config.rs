//! Service configuration, read from the environment.

use std::time::Duration;

/// Runtime configuration for the gateway service.
///
/// Every field is read once at startup via [`ServiceConfig::from_env`]; the
/// service does not poll the environment again afterward (spec.md §9 "no
/// global mutable state").
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to bind the HTTP listener to, e.g. `0.0.0.0:8080`.
    pub bind_addr: String,

    /// Postgres connection string for the account/key/pricing store.
    pub database_url: String,

    /// Redis connection string for cache invalidation events.
    pub redis_url: String,
    /// Pub/sub channel name used for invalidation events.
    pub invalidation_channel: String,

    /// Shared secret required on the `X-Admin-Key` header for `/admin/*`.
    pub admin_api_key: String,

    /// Credential attached to outbound OpenAI-compatible requests.
    pub openai_api_key: String,
    /// Base URL of the OpenAI-compatible upstream.
    pub openai_base_url: String,

    /// Credential attached to outbound Anthropic-compatible requests.
    pub anthropic_api_key: String,
    /// Base URL of the Anthropic-compatible upstream.
    pub anthropic_base_url: String,

    /// How long a cached auth entry lives before being treated as stale.
    pub cache_ttl: Duration,
    /// Maximum number of entries held per cache segment.
    pub cache_max_entries: u64,

    /// Per-call timeout applied to upstream provider dispatch.
    pub upstream_timeout: Duration,

    /// Maximum accepted request body size, in bytes.
    pub max_body_bytes: usize,
    /// Per-request timeout applied by the HTTP server itself.
    pub request_timeout: Duration,
    /// Allowed CORS origins; `["*"]` allows any origin.
    pub cors_origins: Vec<String>,
}

/// Default HTTP bind address when `BIND_ADDR` is unset.
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
/// Default cache TTL, in seconds, when `CACHE_TTL_SECONDS` is unset.
const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;
/// Default per-segment cache capacity when `CACHE_MAX_ENTRIES` is unset.
const DEFAULT_CACHE_MAX_ENTRIES: u64 = 10_000;
/// Default upstream dispatch timeout, in seconds, when unset.
const DEFAULT_UPSTREAM_TIMEOUT_SECONDS: u64 = 60;
/// Default request body cap, in bytes (2 MiB), when unset.
const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
/// Default per-request server timeout, in seconds, when unset.
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 120;
/// Default pub/sub channel name when `INVALIDATION_CHANNEL` is unset.
const DEFAULT_INVALIDATION_CHANNEL: &str = "gateway-invalidations";

impl ServiceConfig {
    /// Load configuration from environment variables, applying defaults for
    /// anything optional. Returns `Err` listing the missing required
    /// variable names (spec.md §6 egress config keys).
    ///
    /// # Errors
    ///
    /// Returns `Err` if a required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self, String> {
        let database_url = require_env("DATABASE_URL")?;
        let redis_url = require_env("REDIS_URL")?;
        let admin_api_key = require_env("ADMIN_API_KEY")?;
        let openai_api_key = require_env("OPENAI_API_KEY")?;
        let anthropic_api_key = require_env("ANTHROPIC_API_KEY")?;

        let bind_addr = env_or("BIND_ADDR", DEFAULT_BIND_ADDR);
        let openai_base_url = env_or("OPENAI_BASE_URL", "https://api.openai.com");
        let anthropic_base_url = env_or("ANTHROPIC_BASE_URL", "https://api.anthropic.com");
        let invalidation_channel = env_or("INVALIDATION_CHANNEL", DEFAULT_INVALIDATION_CHANNEL);

        let cache_ttl_seconds = parse_env_or("CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS)?;
        let cache_max_entries = parse_env_or("CACHE_MAX_ENTRIES", DEFAULT_CACHE_MAX_ENTRIES)?;
        let upstream_timeout_seconds =
            parse_env_or("UPSTREAM_TIMEOUT_SECONDS", DEFAULT_UPSTREAM_TIMEOUT_SECONDS)?;
        let max_body_bytes = parse_env_or("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?;
        let request_timeout_seconds =
            parse_env_or("REQUEST_TIMEOUT_SECONDS", DEFAULT_REQUEST_TIMEOUT_SECONDS)?;

        let cors_origins = std::env::var("CORS_ORIGINS")
            .ok()
            .map(|v| v.split(',').map(str::trim).map(String::from).collect())
            .unwrap_or_else(|| vec!["*".to_string()]);

        Ok(Self {
            bind_addr,
            database_url,
            redis_url,
            invalidation_channel,
            admin_api_key,
            openai_api_key,
            openai_base_url,
            anthropic_api_key,
            anthropic_base_url,
            cache_ttl: Duration::from_secs(cache_ttl_seconds),
            cache_max_entries,
            upstream_timeout: Duration::from_secs(upstream_timeout_seconds),
            max_body_bytes,
            request_timeout: Duration::from_secs(request_timeout_seconds),
            cors_origins,
        })
    }
}

fn require_env(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| format!("invalid value for {key}: {raw}")),
        Err(_) => Ok(default),
    }
}
