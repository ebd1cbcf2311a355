//! Redis pub/sub transport.
//!
//! Publishing opens a connection, sends one message and drops it, so request
//! handlers never hold idle broker connections. Subscribing opens a single
//! dedicated pub/sub connection owned by the returned stream.

use async_trait::async_trait;
use futures::StreamExt;
use ::redis::AsyncCommands;

use crate::channel::{CoverLookupRequest, CoverPublisher, CoverSubscriber, PayloadStream, COVER_CHANNEL};
use crate::error::ChannelError;

pub const DEFAULT_URL: &str = "redis://localhost:6379";

pub struct RedisChannel {
    client: ::redis::Client,
}

impl RedisChannel {
    /// Parse the broker URL. No connection is made until publish or subscribe.
    pub fn open(url: &str) -> Result<Self, ChannelError> {
        let client = ::redis::Client::open(url).map_err(|e| ChannelError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CoverPublisher for RedisChannel {
    async fn publish(&self, request: &CoverLookupRequest) -> Result<(), ChannelError> {
        let payload = request.to_payload()?;
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| ChannelError::Connection(e.to_string()))?;
        let receivers: i64 = conn
            .publish(COVER_CHANNEL, payload)
            .await
            .map_err(|e| ChannelError::Publish(e.to_string()))?;
        tracing::debug!(book_id = %request.id, receivers, "published cover request");
        Ok(())
    }
}

#[async_trait]
impl CoverSubscriber for RedisChannel {
    async fn subscribe(&self) -> Result<PayloadStream, ChannelError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| ChannelError::Connection(e.to_string()))?;
        pubsub
            .subscribe(COVER_CHANNEL)
            .await
            .map_err(|e| ChannelError::Subscribe {
                channel: COVER_CHANNEL.to_string(),
                message: e.to_string(),
            })?;
        tracing::info!(channel = COVER_CHANNEL, "subscribed to cover channel");

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            if msg.get_channel_name() != COVER_CHANNEL {
                return None;
            }
            match msg.get_payload::<String>() {
                Ok(payload) => Some(payload),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping non-text message on cover channel");
                    None
                }
            }
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_accepts_default_url_without_connecting() {
        assert!(RedisChannel::open(DEFAULT_URL).is_ok());
    }

    #[test]
    fn open_rejects_malformed_url() {
        let err = RedisChannel::open("localhost:::6379").err().unwrap();
        assert!(matches!(err, ChannelError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn publish_to_unreachable_broker_is_an_error() {
        // Port 1 is reserved; nothing listens there.
        let channel = RedisChannel::open("redis://127.0.0.1:1").unwrap();
        let err = channel
            .publish(&CoverLookupRequest::new("b1", "Dune"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Connection(_)));
    }
}
