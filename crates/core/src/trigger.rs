//! Publish trigger invoked after a book is created.

use std::sync::Arc;

use crate::channel::{CoverLookupRequest, CoverPublisher};

/// Schedules cover enrichment for newly created books.
///
/// A disabled trigger holds no publisher and never touches the network.
/// Publish failures are logged and swallowed so book creation always succeeds.
#[derive(Clone, Default)]
pub struct CoverTrigger {
    publisher: Option<Arc<dyn CoverPublisher>>,
}

impl CoverTrigger {
    pub fn new(publisher: Arc<dyn CoverPublisher>) -> Self {
        Self {
            publisher: Some(publisher),
        }
    }

    pub fn disabled() -> Self {
        Self { publisher: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.publisher.is_some()
    }

    /// Emit a cover request for `book_id`. Call only once the book is persisted.
    pub async fn request_cover(&self, book_id: &str, title: &str) {
        let Some(publisher) = &self.publisher else {
            return;
        };
        let request = CoverLookupRequest::new(book_id, title);
        if let Err(e) = publisher.publish(&request).await {
            tracing::error!(book_id, error = %e, "error publishing cover request");
        }
    }
}

impl std::fmt::Debug for CoverTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverTrigger")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
