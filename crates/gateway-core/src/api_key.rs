//! The bearer credential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A bearer credential bound to one [`crate::Account`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    /// Opaque string, unique, indexed. This is the value clients send as
    /// `Authorization: Bearer <api_key>`.
    pub api_key: String,

    /// References an [`crate::Account::user_id`].
    pub user_id: String,

    /// Human label.
    pub key_name: Option<String>,

    /// Boolean gate.
    pub is_active: bool,

    /// `None` means "no restriction". `Some(set)` restricts to those model names.
    pub allowed_models: Option<HashSet<String>>,

    /// When the key was created.
    pub created_at: DateTime<Utc>,

    /// When the key was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ApiKey {
    /// Create a new active, unrestricted key.
    #[must_use]
    pub fn new(api_key: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            api_key: api_key.into(),
            user_id: user_id.into(),
            key_name: None,
            is_active: true,
            allowed_models: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `true` when `model_name` is permitted for this key: either no
    /// restriction is configured, or the model is explicitly listed.
    #[must_use]
    pub fn permits_model(&self, model_name: &str) -> bool {
        match &self.allowed_models {
            None => true,
            Some(allowed) => allowed.contains(model_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrestricted_key_permits_any_model() {
        let key = ApiKey::new("sk-a", "u1");
        assert!(key.permits_model("anything"));
    }

    #[test]
    fn restricted_key_rejects_model_not_in_set() {
        let mut key = ApiKey::new("sk-a", "u1");
        key.allowed_models = Some(["m1".to_string()].into_iter().collect());
        assert!(key.permits_model("m1"));
        assert!(!key.permits_model("m2"));
    }
}
