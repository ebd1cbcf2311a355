//! Wires catalogs, resolver, channel, trigger and worker from configuration.

use std::sync::Arc;

use crate::channel::redis::RedisChannel;
use crate::channel::{CoverPublisher, CoverSubscriber};
use crate::config::{AppConfig, LookupConfig};
use crate::cover::{CoverResolver, CoverStore};
use crate::error::ConfigError;
use crate::lookup::googlebooks::GoogleBooksClient;
use crate::lookup::openlibrary::OpenLibraryClient;
use crate::lookup::http_client;
use crate::trigger::CoverTrigger;
use crate::worker::CoverWorker;

/// The publish side and (when enabled) the subscribe side of cover enrichment.
pub struct CoverPipeline {
    pub trigger: CoverTrigger,
    pub worker: Option<CoverWorker>,
}

impl CoverPipeline {
    /// Build from config. Disabled config opens nothing; a malformed broker URL fails here.
    pub fn from_config(config: &AppConfig, store: Arc<dyn CoverStore>) -> Result<Self, ConfigError> {
        if !config.cover.enabled {
            tracing::info!("cover service is disabled");
            return Ok(Self::disabled());
        }
        let channel = Arc::new(RedisChannel::open(&config.cover.redis_url)?);
        let resolver = Arc::new(build_resolver(&config.lookup, store)?);
        Ok(Self::with_channel(channel, resolver))
    }

    /// Use any transport implementing both halves, e.g. the in-process channel.
    pub fn with_channel<C>(channel: Arc<C>, resolver: Arc<CoverResolver>) -> Self
    where
        C: CoverPublisher + CoverSubscriber + 'static,
    {
        Self {
            trigger: CoverTrigger::new(channel.clone()),
            worker: Some(CoverWorker::new(channel, resolver)),
        }
    }

    pub fn disabled() -> Self {
        Self {
            trigger: CoverTrigger::disabled(),
            worker: None,
        }
    }
}

/// Both catalog clients sharing one HTTP client.
pub fn catalog_clients(lookup: &LookupConfig) -> Result<(Arc<OpenLibraryClient>, Arc<GoogleBooksClient>), ConfigError> {
    let client = http_client(lookup.timeout())?;
    let openlibrary = OpenLibraryClient::with_client(client.clone())
        .with_base_urls(lookup.openlibrary_url.clone(), lookup.covers_url.clone());
    let googlebooks = GoogleBooksClient::with_client(client)
        .with_base_url(lookup.google_books_url.clone())
        .with_api_key(lookup.google_books_api_key.clone());
    Ok((Arc::new(openlibrary), Arc::new(googlebooks)))
}

/// Open Library is primary and also serves the per-ISBN lookup; Google Books is the fallback.
pub fn build_resolver(lookup: &LookupConfig, store: Arc<dyn CoverStore>) -> Result<CoverResolver, ConfigError> {
    let (openlibrary, googlebooks) = catalog_clients(lookup)?;
    Ok(CoverResolver::new(openlibrary.clone(), googlebooks, openlibrary, store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::memory::MemoryChannel;
    use crate::config::CoverConfig;
    use crate::cover::tests::RecordingStore;
    use crate::error::ChannelError;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn disabled_config_builds_nothing() {
        let pipeline = CoverPipeline::from_config(&AppConfig::default(), Arc::new(RecordingStore::default())).unwrap();
        assert!(!pipeline.trigger.is_enabled());
        assert!(pipeline.worker.is_none());
    }

    #[test]
    fn disabled_config_ignores_bad_url() {
        let config = AppConfig {
            cover: CoverConfig { enabled: false, redis_url: "not a url".into() },
            ..Default::default()
        };
        assert!(CoverPipeline::from_config(&config, Arc::new(RecordingStore::default())).is_ok());
    }

    #[test]
    fn enabled_config_fails_fast_on_bad_url() {
        let config = AppConfig {
            cover: CoverConfig { enabled: true, redis_url: "not a url".into() },
            ..Default::default()
        };
        let err = CoverPipeline::from_config(&config, Arc::new(RecordingStore::default())).err().unwrap();
        assert!(matches!(err, ConfigError::Channel(ChannelError::InvalidUrl { .. })));
    }

    #[test]
    fn enabled_config_builds_both_halves() {
        let config = AppConfig {
            cover: CoverConfig { enabled: true, ..Default::default() },
            ..Default::default()
        };
        let pipeline = CoverPipeline::from_config(&config, Arc::new(RecordingStore::default())).unwrap();
        assert!(pipeline.trigger.is_enabled());
        assert!(pipeline.worker.is_some());
    }

    /// Dune: Open Library knows the ISBN but has no cover id; the ISBN lookup supplies the large cover.
    #[tokio::test]
    async fn end_to_end_over_memory_channel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "docs": [{ "title": "Dune", "isbn": ["9780441013593"] }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/books/v1/volumes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "volumeInfo": { "imageLinks": { "thumbnail": "https://g/t.jpg" } } }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/books"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ISBN:9780441013593": { "cover": { "large": "https://covers.test/b/id/1-L.jpg" } }
            })))
            .mount(&server)
            .await;

        let lookup = LookupConfig {
            timeout_secs: 5,
            openlibrary_url: server.uri(),
            covers_url: "https://covers.test".into(),
            google_books_url: server.uri(),
            google_books_api_key: None,
        };
        let store = Arc::new(RecordingStore::default());
        let resolver = Arc::new(build_resolver(&lookup, store.clone()).unwrap());
        let channel = Arc::new(MemoryChannel::default());
        let CoverPipeline { trigger, worker } = CoverPipeline::with_channel(channel.clone(), resolver);

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = worker.unwrap().spawn(async move {
            let _ = stop_rx.await;
        });
        while channel.subscriber_count() == 0 {
            tokio::task::yield_now().await;
        }

        trigger.request_cover("dune-1", "Dune").await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while store.cover("dune-1").is_none() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        stop_tx.send(()).unwrap();
        handle.await.unwrap();

        assert_eq!(store.cover("dune-1").as_deref(), Some("https://covers.test/b/id/1-L.jpg"));
    }
}
