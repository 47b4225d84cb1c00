//! Token usage, the append-only audit log, and the resolved request principal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Account, ApiKey};

/// Token counts reported by an adapter at the end of one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Input (prompt) tokens.
    pub input: u64,
    /// Output (completion) tokens.
    pub output: u64,
    /// Cache-read tokens.
    pub cache_read: u64,
    /// Cache-write tokens.
    pub cache_write: u64,
}

impl Usage {
    /// Sum of all four counters.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input + self.output + self.cache_read + self.cache_write
    }
}

/// A resolved `(ApiKey, Account)` pair, attached to a request after the
/// resolver succeeds.
#[derive(Debug, Clone)]
pub struct Principal {
    /// The credential that authenticated the request.
    pub api_key: ApiKey,
    /// The account that owns the budget being charged.
    pub account: Account,
}

/// Append-only audit row for one completed upstream call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLog {
    /// The account charged.
    pub user_id: String,
    /// The credential used.
    pub api_key: String,
    /// The model dispatched to.
    pub model_name: String,
    /// The ingress route, e.g. `"/v1/chat/completions"`.
    pub request_endpoint: String,
    /// Client IP, if known.
    pub ip_address: Option<String>,

    /// Input tokens.
    pub input_tokens: u64,
    /// Output tokens.
    pub output_tokens: u64,
    /// Cache-read tokens.
    pub cache_read_tokens: u64,
    /// Cache-write tokens.
    pub cache_write_tokens: u64,

    /// The decimal billed to the account for this call.
    pub cost_usd: Decimal,

    /// `true` iff `cache_read_tokens > 0`.
    pub is_cache_hit: bool,

    /// `true` when no `ModelCost` row existed for this call, forcing
    /// `cost_usd` to zero (`gateway-service::ledger::settle`).
    pub pricing_missing: bool,

    /// Opaque request body, as sent to the adapter.
    pub request_payload: serde_json::Value,
    /// Opaque response body (or its aggregation, for streams).
    pub response_payload: serde_json::Value,

    /// Server-assigned at finalization.
    pub timestamp: DateTime<Utc>,
}

impl UsageLog {
    /// `total_tokens` = sum of the four token counters.
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.cache_read_tokens + self.cache_write_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_total_sums_all_counters() {
        let usage = Usage {
            input: 1000,
            output: 500,
            cache_read: 10,
            cache_write: 20,
        };
        assert_eq!(usage.total(), 1530);
    }

    #[test]
    fn usage_log_total_tokens_matches_counters() {
        let log = UsageLog {
            user_id: "u1".into(),
            api_key: "sk-a".into(),
            model_name: "m1".into(),
            request_endpoint: "/v1/chat/completions".into(),
            ip_address: None,
            input_tokens: 1000,
            output_tokens: 500,
            cache_read_tokens: 0,
            cache_write_tokens: 0,
            cost_usd: Decimal::new(105, 4),
            is_cache_hit: false,
            pricing_missing: false,
            request_payload: serde_json::Value::Null,
            response_payload: serde_json::Value::Null,
            timestamp: Utc::now(),
        };
        assert_eq!(log.total_tokens(), 1500);
        assert!(!log.is_cache_hit);
    }
}
