//! Open Library catalog client: title search and per-ISBN cover lookup.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::LookupError;
use crate::lookup::{get_json, CatalogClient, CoverCandidate, IsbnCoverLookup};

pub const BASE_URL: &str = "https://openlibrary.org";
pub const COVERS_URL: &str = "https://covers.openlibrary.org";

const PROVIDER: &str = "openlibrary";

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchDoc {
    #[serde(default)]
    isbn: Vec<String>,
    cover_i: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct BookData {
    cover: Option<CoverLinks>,
}

#[derive(Debug, Default, Deserialize)]
struct CoverLinks {
    large: Option<String>,
    medium: Option<String>,
}

pub struct OpenLibraryClient {
    client: Client,
    base_url: String,
    covers_url: String,
}

impl OpenLibraryClient {
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
            covers_url: COVERS_URL.to_string(),
        }
    }

    /// Point the client at different hosts (mirrors, mock servers).
    pub fn with_base_urls(mut self, base_url: impl Into<String>, covers_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self.covers_url = covers_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn try_search(&self, title: &str) -> Result<CoverCandidate, LookupError> {
        let request = self
            .client
            .get(format!("{}/search.json", self.base_url))
            .query(&[("title", title)]);
        let response: SearchResponse = get_json(request, PROVIDER).await?;
        Ok(candidate_from_docs(&response.docs, &self.covers_url))
    }
}

#[async_trait]
impl CatalogClient for OpenLibraryClient {
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

#[async_trait]
impl IsbnCoverLookup for OpenLibraryClient {
    async fn cover_by_isbn(&self, isbn: &str) -> Result<Option<String>, LookupError> {
        let bibkey = format!("ISBN:{}", isbn);
        let request = self
            .client
            .get(format!("{}/api/books", self.base_url))
            .query(&[("bibkeys", bibkey.as_str()), ("format", "json"), ("jscmd", "data")]);
        let mut records: HashMap<String, BookData> = get_json(request, PROVIDER).await?;
        Ok(records
            .remove(&bibkey)
            .and_then(|r| r.cover)
            .and_then(|c| c.large.or(c.medium)))
    }
}

/// First doc with an ISBN wins; its `cover_i`, if any, becomes a large cover URL.
fn candidate_from_docs(docs: &[SearchDoc], covers_url: &str) -> CoverCandidate {
    let Some(doc) = docs.iter().find(|d| !d.isbn.is_empty()) else {
        return CoverCandidate::empty();
    };
    CoverCandidate {
        isbn: doc.isbn.first().cloned(),
        cover_url: doc.cover_i.map(|id| format!("{}/b/id/{}-L.jpg", covers_url, id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::http_client;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout: Duration) -> OpenLibraryClient {
        OpenLibraryClient::with_client(http_client(timeout).unwrap())
            .with_base_urls(server.uri(), "https://covers.test")
    }

    #[test]
    fn skips_docs_without_isbn() {
        let docs = vec![
            SearchDoc { isbn: vec![], cover_i: Some(1) },
            SearchDoc { isbn: vec!["111".into(), "222".into()], cover_i: None },
        ];
        let c = candidate_from_docs(&docs, COVERS_URL);
        assert_eq!(c, CoverCandidate { isbn: Some("111".into()), cover_url: None });
    }

    #[test]
    fn builds_large_cover_url_from_cover_id() {
        let docs = vec![SearchDoc { isbn: vec!["9780441013593".into()], cover_i: Some(8231856) }];
        let c = candidate_from_docs(&docs, COVERS_URL);
        assert_eq!(
            c.cover_url.as_deref(),
            Some("https://covers.openlibrary.org/b/id/8231856-L.jpg")
        );
    }

    #[test]
    fn no_docs_is_empty() {
        assert_eq!(candidate_from_docs(&[], COVERS_URL), CoverCandidate::empty());
    }

    #[tokio::test]
    async fn search_by_title_queries_title_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("title", "Dune Messiah"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "numFound": 1,
                "docs": [{ "title": "Dune Messiah", "isbn": ["9780593098233"], "cover_i": 42 }]
            })))
            .mount(&server)
            .await;

        let c = client_for(&server, Duration::from_secs(5)).search_by_title("Dune Messiah").await;
        assert_eq!(c.isbn.as_deref(), Some("9780593098233"));
        assert_eq!(c.cover_url.as_deref(), Some("https://covers.test/b/id/42-L.jpg"));
    }

    #[tokio::test]
    async fn server_error_degrades_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let c = client_for(&server, Duration::from_secs(5)).search_by_title("Dune").await;
        assert_eq!(c, CoverCandidate::empty());
    }

    #[tokio::test]
    async fn malformed_body_degrades_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let c = client_for(&server, Duration::from_secs(5)).search_by_title("Dune").await;
        assert_eq!(c, CoverCandidate::empty());
    }

    #[tokio::test]
    async fn slow_response_times_out_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "docs": [{ "isbn": ["1"] }] }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let c = client_for(&server, Duration::from_millis(100)).search_by_title("Dune").await;
        assert_eq!(c, CoverCandidate::empty());
    }

    #[tokio::test]
    async fn cover_by_isbn_prefers_large() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/books"))
            .and(query_param("bibkeys", "ISBN:9780441013593"))
            .and(query_param("jscmd", "data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ISBN:9780441013593": {
                    "cover": {
                        "small": "https://covers.test/S.jpg",
                        "medium": "https://covers.test/M.jpg",
                        "large": "https://covers.test/L.jpg"
                    }
                }
            })))
            .mount(&server)
            .await;

        let cover = client_for(&server, Duration::from_secs(5))
            .cover_by_isbn("9780441013593")
            .await
            .unwrap();
        assert_eq!(cover.as_deref(), Some("https://covers.test/L.jpg"));
    }

    #[tokio::test]
    async fn cover_by_isbn_falls_back_to_medium() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/books"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ISBN:123": { "cover": { "medium": "https://covers.test/M.jpg" } }
            })))
            .mount(&server)
            .await;

        let cover = client_for(&server, Duration::from_secs(5)).cover_by_isbn("123").await.unwrap();
        assert_eq!(cover.as_deref(), Some("https://covers.test/M.jpg"));
    }

    #[tokio::test]
    async fn cover_by_isbn_unknown_isbn_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/books"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let cover = client_for(&server, Duration::from_secs(5)).cover_by_isbn("000").await.unwrap();
        assert_eq!(cover, None);
    }

    #[tokio::test]
    async fn cover_by_isbn_reports_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/books"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server, Duration::from_secs(5)).cover_by_isbn("000").await.unwrap_err();
        assert!(matches!(err, LookupError::Status { status: 500, .. }));
    }
}
