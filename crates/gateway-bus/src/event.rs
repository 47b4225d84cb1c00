//! The invalidation event shape shared by every transport.

use serde::{Deserialize, Serialize};

/// Which [`crate::EventSource`] subscriber namespace an event targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// An `Account` row changed.
    Account,
    /// An `ApiKey` row changed.
    Apikey,
    /// A `ModelCost` row changed.
    Modelcost,
}

impl EventKind {
    /// Parse the wire `type` field; unknown values are not an error here —
    /// the subscriber logs and ignores them per spec.md §4.3.
    #[must_use]
    pub fn from_wire(type_str: &str) -> Option<Self> {
        match type_str {
            "account" => Some(Self::Account),
            "apikey" => Some(Self::Apikey),
            "modelcost" => Some(Self::Modelcost),
            _ => None,
        }
    }
}

/// `{type, key}` published by admin writers after their store commit
/// succeeds, and consumed by `AuthCache` to evict stale entries.
#[derive(Debug, Clone, Serialize)]
pub struct InvalidationEvent {
    /// Which namespace to evict from.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// The entity key to evict: `user_id`, `api_key`, or `model_name`.
    pub key: String,
}

impl InvalidationEvent {
    /// Build an event for an `Account` mutation.
    #[must_use]
    pub fn account(user_id: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Account,
            key: user_id.into(),
        }
    }

    /// Build an event for an `ApiKey` mutation.
    #[must_use]
    pub fn api_key(api_key: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Apikey,
            key: api_key.into(),
        }
    }

    /// Build an event for a `ModelCost` mutation.
    #[must_use]
    pub fn model_cost(model_name: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Modelcost,
            key: model_name.into(),
        }
    }

    /// Decode a published wire payload. A malformed payload or an unknown
    /// event `type` is logged and dropped rather than returned as an error —
    /// the subscriber just ignores it (spec.md §4.3) — so every transport
    /// should route inbound bytes through this rather than deserializing
    /// `Self` directly.
    #[must_use]
    pub fn parse_wire(payload: &str) -> Option<Self> {
        #[derive(Deserialize)]
        struct Wire {
            #[serde(rename = "type")]
            kind: String,
            key: String,
        }

        let wire: Wire = match serde_json::from_str(payload) {
            Ok(wire) => wire,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed invalidation event");
                return None;
            }
        };

        match EventKind::from_wire(&wire.kind) {
            Some(kind) => Some(Self { kind, key: wire.key }),
            None => {
                tracing::warn!(kind = %wire.kind, "unknown invalidation event kind, ignoring");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_wire_round_trips_a_known_kind() {
        let event = InvalidationEvent::account("u1");
        let payload = serde_json::to_string(&event).unwrap();

        let parsed = InvalidationEvent::parse_wire(&payload).unwrap();
        assert_eq!(parsed.kind, EventKind::Account);
        assert_eq!(parsed.key, "u1");
    }

    #[test]
    fn parse_wire_ignores_an_unknown_kind() {
        let payload = r#"{"type":"widget","key":"w1"}"#;
        assert!(InvalidationEvent::parse_wire(payload).is_none());
    }

    #[test]
    fn parse_wire_ignores_malformed_json() {
        assert!(InvalidationEvent::parse_wire("not json").is_none());
    }
}
