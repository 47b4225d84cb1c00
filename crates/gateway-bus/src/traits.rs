//! The inverted-dependency seam between `AuthCache` and the admin surface
//! (spec.md §9 "Cyclic ownership of cache and invalidation").
//!
//! `AuthCache` depends only on [`EventSource`]; admin writers depend only on
//! [`EventSink`]. Neither refers to the other's concrete type — they are
//! wired together at process init by whichever concrete bus is configured.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{InvalidationEvent, Result};

/// Published to after an admin writer's store commit succeeds.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publish one event. Callers must only call this after the
    /// corresponding store write has committed (events published iff the
    /// store write committed, spec.md §6).
    async fn publish(&self, event: InvalidationEvent) -> Result<()>;

    /// Cheap reachability probe used by `/health` (spec.md §6).
    async fn ping(&self) -> Result<()>;
}

/// Subscribed to by `AuthCache` to learn when to evict.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Open a subscription stream. Delivery is at-least-once; duplicate
    /// delivery must be harmless since eviction is idempotent. Ordering
    /// across or within keys is not guaranteed.
    async fn subscribe(&self) -> Result<BoxStream<'static, InvalidationEvent>>;
}
