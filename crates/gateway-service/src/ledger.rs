//! Post-flight settlement: compute cost, debit, append the audit row
//! (spec.md §4.6).

use gateway_cache::AuthCache;
use gateway_core::{pricing, GatewayError, RequestId, Usage, UsageLog};
use gateway_store::Store;
use rust_decimal::Decimal;

/// Everything `Settle` needs about the call being billed.
pub struct SettleCall<'a> {
    /// Correlation id for tracing spans and dead-letter log entries.
    pub request_id: RequestId,
    /// Owning account.
    pub user_id: &'a str,
    /// The caller's credential, recorded on the audit row.
    pub api_key: &'a str,
    /// Model requested.
    pub model_name: &'a str,
    /// Ingress route the call arrived on.
    pub request_endpoint: &'a str,
    /// Caller's IP, if known.
    pub ip_address: Option<String>,
    /// Tokens reported by the adapter.
    pub usage: Usage,
    /// Opaque blob recorded on the audit row.
    pub request_payload: serde_json::Value,
    /// Opaque blob recorded on the audit row (may be the aggregated stream).
    pub response_payload: serde_json::Value,
    /// Skip the pricing lookup and settle as unpriced regardless of whether
    /// the model has a `ModelCost` row. Set when a stream closed without a
    /// usage trailer (spec.md §4.7): the call is unbillable, not merely
    /// unpriced, and must not silently pass through at `cost_usd = 0` with
    /// `pricing_missing = false` just because the model happens to have a
    /// price list entry.
    pub force_pricing_missing: bool,
}

/// Compute cost, debit the account (if non-zero), and append the usage log.
///
/// The increment runs before the log append (spec.md §4.6): if the log
/// append then fails, the account is still correctly debited and the gap is
/// surfaced via a dead-letter log line rather than losing the debit. This
/// function never fails the caller's HTTP response — any error here is
/// logged and swallowed, since by the time `Settle` runs the client already
/// has its answer.
pub async fn settle(store: &dyn Store, cache: &AuthCache, call: SettleCall<'_>) {
    let model_cost = if call.force_pricing_missing {
        tracing::error!(
            request_id = %call.request_id,
            model_name = %call.model_name,
            "settling as pricing-missing by request, not from a pricing lookup"
        );
        None
    } else {
        match cache.get_model_cost(call.model_name).await {
            Ok(model_cost) => Some(model_cost),
            Err(GatewayError::NotFound(_)) => {
                tracing::error!(
                    request_id = %call.request_id,
                    model_name = %call.model_name,
                    "no pricing configured for model, settling at zero cost"
                );
                None
            }
            Err(e) => {
                tracing::error!(
                    request_id = %call.request_id,
                    error = %e,
                    model_name = %call.model_name,
                    "pricing lookup failed, settling at zero cost"
                );
                None
            }
        }
    };

    let pricing_missing = model_cost.is_none();
    let cost_usd = model_cost
        .as_ref()
        .map_or(Decimal::ZERO, |mc| pricing::cost_usd(mc, &call.usage));

    if cost_usd > Decimal::ZERO {
        match store.increment_spent(call.user_id, cost_usd).await {
            Ok(account) => cache.put_account(account).await,
            Err(e) => {
                tracing::error!(
                    request_id = %call.request_id,
                    user_id = %call.user_id,
                    cost_usd = %cost_usd,
                    error = %e,
                    "DEAD LETTER: failed to debit account for completed call"
                );
                return;
            }
        }
    }

    let log = UsageLog {
        user_id: call.user_id.to_string(),
        api_key: call.api_key.to_string(),
        model_name: call.model_name.to_string(),
        request_endpoint: call.request_endpoint.to_string(),
        ip_address: call.ip_address,
        input_tokens: call.usage.input,
        output_tokens: call.usage.output,
        cache_read_tokens: call.usage.cache_read,
        cache_write_tokens: call.usage.cache_write,
        cost_usd,
        is_cache_hit: call.usage.cache_read > 0,
        pricing_missing,
        request_payload: call.request_payload,
        response_payload: call.response_payload,
        timestamp: chrono::Utc::now(),
    };

    if let Err(e) = store.append_usage_log(log).await {
        tracing::error!(
            request_id = %call.request_id,
            user_id = %call.user_id,
            model_name = %call.model_name,
            error = %e,
            "DEAD LETTER: usage log append failed after successful debit"
        );
    }
}
