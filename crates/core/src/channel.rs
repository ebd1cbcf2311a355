//! Publish/subscribe transport between book creation and cover resolution.
//!
//! Messages are JSON `{"id": "...", "title": "..."}` on the fixed topic
//! [`COVER_CHANNEL`]. Delivery is at-most-once: a message published while no
//! subscriber is listening is dropped.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

pub const COVER_CHANNEL: &str = "book-cover-fetch";

/// A request to resolve the cover of an existing book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverLookupRequest {
    pub id: String,
    pub title: String,
}

impl CoverLookupRequest {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    pub fn to_payload(&self) -> Result<String, ChannelError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_payload(payload: &str) -> Result<Self, ChannelError> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// Raw payloads received on the cover topic.
pub type PayloadStream = BoxStream<'static, String>;

#[async_trait]
pub trait CoverPublisher: Send + Sync {
    async fn publish(&self, request: &CoverLookupRequest) -> Result<(), ChannelError>;
}

#[async_trait]
pub trait CoverSubscriber: Send + Sync {
    /// Subscribe to the cover topic. The underlying connection lives as long as the stream.
    async fn subscribe(&self) -> Result<PayloadStream, ChannelError>;
}
