//! Redis pub/sub transport for the invalidation bus.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::{BusError, EventSink, EventSource, InvalidationEvent, Result};

/// A Redis-backed [`EventSink`] + [`EventSource`].
///
/// Publishing uses a long-lived [`ConnectionManager`] (auto-reconnecting).
/// Subscribing opens a dedicated pub/sub connection per call to
/// [`EventSource::subscribe`]; the gateway opens exactly one such
/// subscription for the lifetime of the process (spec.md §5 "per-instance
/// singletons").
#[derive(Clone)]
pub struct RedisBus {
    client: redis::Client,
    publish_conn: ConnectionManager,
    channel: String,
}

impl RedisBus {
    /// Connect to `url` and use `channel` for publish/subscribe. Failure to
    /// connect is treated the same as store unreachability at startup
    /// (spec.md §6: non-zero exit).
    pub async fn connect(url: &str, channel: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| BusError::Unavailable(format!("invalid bus url: {e}")))?;
        let publish_conn = client
            .get_connection_manager()
            .await
            .map_err(|e| BusError::Unavailable(format!("connecting to bus: {e}")))?;
        Ok(Self {
            client,
            publish_conn,
            channel: channel.into(),
        })
    }
}

#[async_trait]
impl EventSink for RedisBus {
    async fn publish(&self, event: InvalidationEvent) -> Result<()> {
        let payload =
            serde_json::to_string(&event).map_err(|e| BusError::Codec(e.to_string()))?;
        let mut conn = self.publish_conn.clone();
        let _: () = conn
            .publish(&self.channel, payload)
            .await
            .map_err(|e| BusError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.publish_conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| BusError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl EventSource for RedisBus {
    async fn subscribe(&self) -> Result<futures::stream::BoxStream<'static, InvalidationEvent>> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| BusError::Unavailable(e.to_string()))?;
        pubsub
            .subscribe(&self.channel)
            .await
            .map_err(|e| BusError::Unavailable(e.to_string()))?;

        let channel = self.channel.clone();
        let stream = pubsub.into_on_message().filter_map(move |msg| {
            let channel = channel.clone();
            async move {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!(error = %e, %channel, "invalidation event payload not a string");
                        return None;
                    }
                };
                InvalidationEvent::parse_wire(&payload)
            }
        });
        Ok(Box::pin(stream))
    }
}
