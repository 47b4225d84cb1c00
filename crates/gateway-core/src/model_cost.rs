//! Per-model pricing rows.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pricing row for one model, rates expressed per million tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCost {
    /// Unique key, e.g. `"gpt-4o"` or `"claude-3-5-sonnet"`.
    pub model_name: String,

    /// Informational tag; does not determine routing.
    pub provider: String,

    /// Rate per million input tokens, USD.
    pub input_cost_per_million_tokens_usd: Decimal,

    /// Rate per million output tokens, USD.
    pub output_cost_per_million_tokens_usd: Decimal,

    /// Rate per million cache-read tokens, USD.
    pub cache_read_cost_per_million_tokens_usd: Decimal,

    /// Rate per million cache-write tokens, USD.
    pub cache_write_cost_per_million_tokens_usd: Decimal,
}

impl ModelCost {
    /// Construct a pricing row with all four rates set explicitly.
    #[must_use]
    pub fn new(
        model_name: impl Into<String>,
        provider: impl Into<String>,
        input_cost_per_million_tokens_usd: Decimal,
        output_cost_per_million_tokens_usd: Decimal,
        cache_read_cost_per_million_tokens_usd: Decimal,
        cache_write_cost_per_million_tokens_usd: Decimal,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            provider: provider.into(),
            input_cost_per_million_tokens_usd,
            output_cost_per_million_tokens_usd,
            cache_read_cost_per_million_tokens_usd,
            cache_write_cost_per_million_tokens_usd,
        }
    }
}
