//! In-process transport on `tokio::sync::broadcast`, for single-process deployments and tests.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::broadcast;

use crate::channel::{CoverLookupRequest, CoverPublisher, CoverSubscriber, PayloadStream};
use crate::error::ChannelError;

pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct MemoryChannel {
    sender: broadcast::Sender<String>,
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MemoryChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish a raw payload. Lets tests inject payloads the typed API cannot produce.
    pub fn publish_raw(&self, payload: impl Into<String>) -> usize {
        self.sender.send(payload.into()).unwrap_or(0)
    }
}

#[async_trait]
impl CoverPublisher for MemoryChannel {
    async fn publish(&self, request: &CoverLookupRequest) -> Result<(), ChannelError> {
        let receivers = self.publish_raw(request.to_payload()?);
        if receivers == 0 {
            tracing::debug!(book_id = %request.id, "no subscribers; cover request dropped");
        }
        Ok(())
    }
}

#[async_trait]
impl CoverSubscriber for MemoryChannel {
    async fn subscribe(&self) -> Result<PayloadStream, ChannelError> {
        let receiver = self.sender.subscribe();
        let stream = futures::stream::unfold(receiver, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(payload) => return Some((payload, rx)),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "cover subscriber lagged; messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(stream.boxed())
    }
}
