//! In-process invalidation bus for tests, backed by `tokio::sync::broadcast`.
//!
//! Stands in for [`crate::RedisBus`] when a test wants multiple simulated
//! instances (or a single one) sharing invalidation events without a real
//! Redis server — see spec.md §8 property 4 and scenario S4.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::{EventSink, EventSource, InvalidationEvent, Result};

/// A broadcast channel every subscriber sees every published event on.
#[derive(Clone)]
pub struct LocalBus {
    sender: broadcast::Sender<InvalidationEvent>,
}

impl LocalBus {
    /// Create a bus with the given channel capacity (lagging subscribers
    /// drop the oldest events once this is exceeded).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl EventSink for LocalBus {
    async fn publish(&self, event: InvalidationEvent) -> Result<()> {
        // No receivers yet is not an error: an admin mutation before any
        // instance has subscribed is simply a no-op delivery.
        let _ = self.sender.send(event);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl EventSource for LocalBus {
    async fn subscribe(&self) -> Result<BoxStream<'static, InvalidationEvent>> {
        let receiver = self.sender.subscribe();
        let stream = BroadcastStream::new(receiver).filter_map(|item| match item {
            Ok(event) => Some(event),
            Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "local bus subscriber lagged, events dropped");
                None
            }
        });
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn subscriber_sees_published_event() {
        let bus = LocalBus::default();
        let mut stream = bus.subscribe().await.unwrap();
        bus.publish(InvalidationEvent::account("u1")).await.unwrap();

        let event = stream.next().await.unwrap();
        assert_eq!(event.key, "u1");
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let bus = LocalBus::default();
        let mut s1 = bus.subscribe().await.unwrap();
        let mut s2 = bus.subscribe().await.unwrap();
        bus.publish(InvalidationEvent::model_cost("m1")).await.unwrap();

        assert_eq!(s1.next().await.unwrap().key, "m1");
        assert_eq!(s2.next().await.unwrap().key, "m1");
    }

    #[tokio::test]
    async fn publish_before_any_subscriber_is_not_an_error() {
        let bus = LocalBus::default();
        bus.publish(InvalidationEvent::api_key("sk-a")).await.unwrap();
    }
}
