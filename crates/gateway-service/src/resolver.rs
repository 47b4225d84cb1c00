//! Turns a bearer token into an authenticated Principal (spec.md §4.4).

use std::sync::Arc;

use gateway_cache::AuthCache;
use gateway_core::{GatewayError, Principal, Result};

/// Resolve a raw bearer token into a `Principal`, enforcing active flags and
/// the budget precheck.
///
/// 1. Look up the `ApiKey` by token; reject if absent or inactive.
/// 2. Look up the `Account` the key belongs to; reject if absent or inactive.
/// 3. Budget precheck: `spent_usd >= budget_usd`, or `budget_usd == 0`, rejects.
///
/// # Errors
///
/// `Unauthenticated`, `AccountMissing`, `AccountDisabled`, `BudgetExceeded`,
/// or `Internal` on a store failure.
pub async fn resolve(cache: &Arc<AuthCache>, token: &str) -> Result<Principal> {
    let api_key = match cache.get_api_key(token).await {
        Ok(key) => key,
        Err(GatewayError::NotFound(_)) => return Err(GatewayError::Unauthenticated),
        Err(other) => return Err(other),
    };
    if !api_key.is_active {
        return Err(GatewayError::Unauthenticated);
    }

    let account = match cache.get_account(&api_key.user_id).await {
        Ok(account) => account,
        Err(GatewayError::NotFound(_)) => return Err(GatewayError::AccountMissing),
        Err(other) => return Err(other),
    };
    if !account.is_active {
        return Err(GatewayError::AccountDisabled);
    }

    precheck(&account)?;

    Ok(Principal { api_key, account })
}

/// Pure budget comparison on an already-resolved snapshot (spec.md §4.6
/// `Ledger.Precheck` — kept here since it runs against the same snapshot the
/// resolver just fetched, not a second store read).
///
/// # Errors
///
/// `BudgetExceeded` if the account has no remaining budget.
pub fn precheck(account: &gateway_core::Account) -> Result<()> {
    if account.has_budget_remaining() {
        Ok(())
    } else {
        Err(GatewayError::BudgetExceeded)
    }
}
