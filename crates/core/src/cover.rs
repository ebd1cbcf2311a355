//! Cover resolution: query both catalogs, pick a candidate, derive a cover URL and persist it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::channel::CoverLookupRequest;
use crate::error::{BookshelfError, StoreError};
use crate::lookup::{CatalogClient, CoverCandidate, IsbnCoverLookup};

/// Storage side of the pipeline: writes a resolved cover onto a book.
#[async_trait]
pub trait CoverStore: Send + Sync {
    /// Overwrites the book's cover URL. `StoreError::NotFound` if the book was deleted meanwhile.
    async fn update_cover_url(&self, book_id: &str, cover_url: &str) -> Result<(), StoreError>;
}

/// Which branch a resolution took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverOutcome {
    /// A catalog returned a cover URL directly.
    Direct(String),
    /// The cover came from the per-ISBN lookup.
    ByIsbn(String),
    NotFound,
    Failed,
}

impl CoverOutcome {
    pub fn cover_url(&self) -> Option<&str> {
        match self {
            CoverOutcome::Direct(url) | CoverOutcome::ByIsbn(url) => Some(url),
            CoverOutcome::NotFound | CoverOutcome::Failed => None,
        }
    }
}

/// The primary catalog wins whenever it has any signal (ISBN or cover); otherwise the fallback is used.
pub fn prefer_candidate(primary: CoverCandidate, fallback: CoverCandidate) -> CoverCandidate {
    if primary.has_signal() {
        primary
    } else {
        fallback
    }
}

pub struct CoverResolver {
    primary: Arc<dyn CatalogClient>,
    fallback: Arc<dyn CatalogClient>,
    isbn_lookup: Arc<dyn IsbnCoverLookup>,
    store: Arc<dyn CoverStore>,
}

impl CoverResolver {
    pub fn new(
        primary: Arc<dyn CatalogClient>,
        fallback: Arc<dyn CatalogClient>,
        isbn_lookup: Arc<dyn IsbnCoverLookup>,
        store: Arc<dyn CoverStore>,
    ) -> Self {
        Self {
            primary,
            fallback,
            isbn_lookup,
            store,
        }
    }

    /// Query both catalogs concurrently and return the preferred candidate, without persisting.
    pub async fn best_candidate(&self, title: &str) -> CoverCandidate {
        let (primary, fallback) = tokio::join!(
            self.primary.search_by_title(title),
            self.fallback.search_by_title(title)
        );
        tracing::debug!(
            primary = self.primary.name(),
            primary_hit = primary.has_signal(),
            fallback = self.fallback.name(),
            fallback_hit = fallback.has_signal(),
            "catalog candidates"
        );
        prefer_candidate(primary, fallback)
    }

    /// Resolve and persist the cover for one book. Never fails; errors are logged and reported as `Failed`.
    pub async fn resolve(&self, request: &CoverLookupRequest) -> CoverOutcome {
        let book_id = request.id.as_str();
        let candidate = self.best_candidate(&request.title).await;
        match self.apply(book_id, candidate).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(book_id, error = %e, "error fetching cover");
                CoverOutcome::Failed
            }
        }
    }

    async fn apply(&self, book_id: &str, candidate: CoverCandidate) -> Result<CoverOutcome, BookshelfError> {
        if let Some(url) = candidate.cover_url {
            self.store.update_cover_url(book_id, &url).await?;
            tracing::info!(book_id, cover_url = %url, "updated cover from direct URL");
            return Ok(CoverOutcome::Direct(url));
        }
        let Some(isbn) = candidate.isbn else {
            tracing::info!(book_id, "no ISBN or cover found");
            return Ok(CoverOutcome::NotFound);
        };
        match self.isbn_lookup.cover_by_isbn(&isbn).await? {
            Some(url) => {
                self.store.update_cover_url(book_id, &url).await?;
                tracing::info!(book_id, isbn = %isbn, cover_url = %url, "updated cover using ISBN");
                Ok(CoverOutcome::ByIsbn(url))
            }
            None => {
                tracing::info!(book_id, isbn = %isbn, "no cover found for ISBN");
                Ok(CoverOutcome::NotFound)
            }
        }
    }
}
