//! Cost computation from token usage (spec §4.5).

use rust_decimal::Decimal;

use crate::{ModelCost, Usage};

/// One million, the unit the four rates in [`ModelCost`] are expressed per.
const TOKENS_PER_RATE_UNIT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// `cost = input*in_rate/1e6 + output*out_rate/1e6 + cache_read*cr_rate/1e6 + cache_write*cw_rate/1e6`.
///
/// Arithmetic is decimal throughout; `rust_decimal::Decimal` carries 28-29
/// significant digits, far more than the `>= 6` fractional digits spec.md
/// requires to avoid cumulative drift.
#[must_use]
pub fn cost_usd(model_cost: &ModelCost, usage: &Usage) -> Decimal {
    let input = Decimal::from(usage.input) * model_cost.input_cost_per_million_tokens_usd
        / TOKENS_PER_RATE_UNIT;
    let output = Decimal::from(usage.output) * model_cost.output_cost_per_million_tokens_usd
        / TOKENS_PER_RATE_UNIT;
    let cache_read = Decimal::from(usage.cache_read)
        * model_cost.cache_read_cost_per_million_tokens_usd
        / TOKENS_PER_RATE_UNIT;
    let cache_write = Decimal::from(usage.cache_write)
        * model_cost.cache_write_cost_per_million_tokens_usd
        / TOKENS_PER_RATE_UNIT;
    input + output + cache_read + cache_write
}
