//! Cover lookup via external catalog services (Open Library, Google Books).

pub mod googlebooks;
pub mod openlibrary;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LookupError};

pub(crate) const USER_AGENT: &str = concat!("bookshelf/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout for catalog calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// What a single catalog knows about a title: an ISBN, a direct cover URL, both, or neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverCandidate {
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
}

impl CoverCandidate {
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when the candidate carries an ISBN or a cover URL.
    pub fn has_signal(&self) -> bool {
        self.isbn.is_some() || self.cover_url.is_some()
    }
}

/// A catalog that can be searched by title.
///
/// Implementations never fail: transport and parse errors are logged and
/// reported as an empty candidate.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    fn name(&self) -> &str;
    async fn search_by_title(&self, title: &str) -> CoverCandidate;
}

/// Secondary lookup of a cover image by ISBN.
#[async_trait]
pub trait IsbnCoverLookup: Send + Sync {
    async fn cover_by_isbn(&self, isbn: &str) -> Result<Option<String>, LookupError>;
}

/// Build the shared HTTP client used by every catalog. Each request is bounded by `timeout`.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}

/// Send a GET and decode a JSON body, mapping non-2xx statuses and bad bodies to `LookupError`.
pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
    provider: &str,
) -> Result<T, LookupError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(LookupError::Status {
            provider: provider.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| LookupError::Malformed {
        provider: provider.to_string(),
        message: e.to_string(),
    })
}
