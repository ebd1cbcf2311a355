//! Google Books catalog client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::LookupError;
use crate::lookup::{get_json, CatalogClient, CoverCandidate};

pub const BASE_URL: &str = "https://www.googleapis.com";

const PROVIDER: &str = "googlebooks";

#[derive(Debug, Default, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    extra_large: Option<String>,
    large: Option<String>,
    thumbnail: Option<String>,
}

pub struct GoogleBooksClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleBooksClient {
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
            api_key: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Requests without a key share an anonymous quota.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    async fn try_search(&self, title: &str) -> Result<CoverCandidate, LookupError> {
        let mut request = self
            .client
            .get(format!("{}/books/v1/volumes", self.base_url))
            .query(&[("q", title)]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }
        let response: VolumesResponse = get_json(request, PROVIDER).await?;
        Ok(response
            .items
            .first()
            .map(|v| candidate_from_volume(&v.volume_info))
            .unwrap_or_default())
    }
}

#[async_trait]
impl CatalogClient for GoogleBooksClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn search_by_title(&self, title: &str) -> CoverCandidate {
        match self.try_search(title).await {
            Ok(candidate) => candidate,
            Err(e) => {
                tracing::warn!(provider = PROVIDER, title, error = %e, "title search failed");
                CoverCandidate::empty()
            }
        }
    }
}

fn candidate_from_volume(info: &VolumeInfo) -> CoverCandidate {
    let by_kind = |kind: &str| {
        info.industry_identifiers
            .iter()
            .find(|id| id.kind == kind)
            .map(|id| id.identifier.clone())
    };
    let cover_url = info
        .image_links
        .as_ref()
        .and_then(|l| l.extra_large.clone().or_else(|| l.large.clone()).or_else(|| l.thumbnail.clone()));
    CoverCandidate {
        isbn: by_kind("ISBN_13").or_else(|| by_kind("ISBN_10")),
        cover_url,
    }
}
