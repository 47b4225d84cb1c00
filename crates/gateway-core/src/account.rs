//! The budget-owning entity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reserved for future budget-window semantics; only `Total` is honored today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetDuration {
    /// The budget never resets except via an explicit admin edit.
    Total,
}

/// An account owns a spending budget and may have multiple [`crate::ApiKey`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique stable identifier.
    pub user_id: String,

    /// Optional human label.
    pub account_name: Option<String>,

    /// Non-negative decimal ceiling. `0` means "no positive allowance configured".
    pub budget_usd: Decimal,

    /// Non-negative decimal, monotonically non-decreasing except via admin reset.
    ///
    /// Must only be mutated through [`crate::Store::increment_spent`]; no other
    /// code path may assign this field after the account is created.
    pub spent_usd: Decimal,

    /// Budget window; currently always [`BudgetDuration::Total`].
    pub budget_duration: BudgetDuration,

    /// Boolean gate. An inactive account makes every `ApiKey` bound to it unusable.
    pub is_active: bool,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new active account with zero spend.
    #[must_use]
    pub fn new(user_id: impl Into<String>, budget_usd: Decimal) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            account_name: None,
            budget_usd,
            spent_usd: Decimal::ZERO,
            budget_duration: BudgetDuration::Total,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// `spec.md` §4.4 step 3: a `budget_usd` of zero is default-deny, not
    /// "unlimited". Returns `true` when the account still has headroom.
    #[must_use]
    pub fn has_budget_remaining(&self) -> bool {
        self.budget_usd > Decimal::ZERO && self.spent_usd < self.budget_usd
    }
}
