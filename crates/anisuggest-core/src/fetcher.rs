use crate::config::Config;
use crate::types::RawItem;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Source of raw search records for a category and query text.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Search `category` for `text`.
    async fn search(&self, category: &str, text: &str) -> Result<Vec<RawItem>>;
}

/// HTTP client for the remote search endpoint
pub struct Fetcher {
    client: Client,
    api_url: Url,
    no_cache: Option<(HeaderName, HeaderValue)>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("api_url", &self.api_url.as_str())
            .field("no_cache", &self.no_cache.as_ref().map(|(name, _)| name))
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Creates a fetcher for `api_url` with the default 30 second timeout
    pub fn new(api_url: Url) -> Result<Self> {
        Self::with_timeout(api_url, Duration::from_secs(30))
    }

    /// Creates a fetcher with a custom request timeout (primarily for tests)
    pub fn with_timeout(api_url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("anisuggest/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self {
            client,
            api_url,
            no_cache: None,
        })
    }

    /// Creates a fetcher from the `[site]` and `[request]` settings
    pub fn from_config(config: &Config) -> Result<Self> {
        let header = &config.site.no_cache_header;
        Self::with_timeout(config.site.api_url()?, config.request.timeout())?
            .with_no_cache_header(&header.name, &header.value)
    }

    /// Sends `name: value` with every request to suppress intermediary caching
    pub fn with_no_cache_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Config(format!("Invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::Config(format!("Invalid header value '{value}': {e}")))?;
        self.no_cache = Some((name, value));
        Ok(self)
    }

    /// Endpoint URL for one search
    pub fn search_url(&self, category: &str, text: &str) -> Url {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("type", category)
            .append_pair("query", text);
        url
    }

    /// Fetches and parses the records for one search
    pub async fn fetch_items(&self, category: &str, text: &str) -> Result<Vec<RawItem>> {
        let url = self.search_url(category, text);
        let mut request = self.client.get(url.clone());
        if let Some((name, value)) = &self.no_cache {
            request = request.header(name.clone(), value.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| request_error(&url, e))?
            .error_for_status()?;
        let body = response.bytes().await.map_err(|e| request_error(&url, e))?;
        let items = parse_items(&body)?;

        info!("Fetched {} records from {}", items.len(), url);
        Ok(items)
    }
}

fn request_error(url: &Url, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("no answer from {url}"))
    } else {
        Error::Network(err)
    }
}

#[async_trait]
impl SearchBackend for Fetcher {
    async fn search(&self, category: &str, text: &str) -> Result<Vec<RawItem>> {
        self.fetch_items(category, text).await
    }
}

/// Parse an endpoint payload into records.
///
/// The payload must be a JSON array; elements that are not record-shaped
/// are skipped rather than failing the batch.
pub fn parse_items(body: &[u8]) -> Result<Vec<RawItem>> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| Error::Parse(format!("Invalid JSON payload: {e}")))?;
    let Value::Array(elements) = value else {
        return Err(Error::Parse("Expected a JSON array of records".into()));
    };

    let total = elements.len();
    let items: Vec<RawItem> = elements
        .into_iter()
        .filter_map(|element| serde_json::from_value(element).ok())
        .collect();
    if items.len() < total {
        debug!("Skipped {} malformed records", total - items.len());
    }
    Ok(items)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path, query_param},
    };

    fn fetcher_for(server: &MockServer) -> Fetcher {
        let api_url =
            Url::parse(&format!("{}/perl-bin/animedb.pl?show=json&action=search", server.uri()))
                .unwrap();
        Fetcher::with_timeout(api_url, Duration::from_millis(500))
            .unwrap()
            .with_no_cache_header("X-LControl", "x-no-cache")
            .unwrap()
    }

    #[test]
    fn test_search_url_encodes_query() {
        let fetcher = Fetcher::new(
            Url::parse("https://anidb.net/perl-bin/animedb.pl?show=json&action=search").unwrap(),
        )
        .unwrap();
        let url = fetcher.search_url("anime", "cowboy bebop&co");
        assert_eq!(
            url.as_str(),
            "https://anidb.net/perl-bin/animedb.pl?show=json&action=search&type=anime&query=cowboy+bebop%26co"
        );
    }

    #[tokio::test]
    async fn test_fetch_sends_query_and_no_cache_header() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/perl-bin/animedb.pl"))
            .and(query_param("type", "character"))
            .and(query_param("query", "onizuka"))
            .and(header("X-LControl", "x-no-cache"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "Onizuka", "desc": "Character, Score: 9.1", "link": "ch1", "picurl": ""},
                {"name": "Onizuka Eikichi", "desc": "Character, Score: 8.0"}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let items = fetcher_for(&mock_server).search("character", "onizuka").await?;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Onizuka");
        assert_eq!(items[1].link, "");
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_error_status() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        match fetcher_for(&mock_server).search("anime", "x").await {
            Err(Error::Network(e)) => assert_eq!(e.status().map(|s| s.as_u16()), Some(503)),
            other => panic!("expected network error, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_timeout() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("[]")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let err = fetcher_for(&mock_server).search("anime", "x").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "expected a timeout: {err}");
        assert!(err.is_recoverable());
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_malformed_payload() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
            .mount(&mock_server)
            .await;

        let err = fetcher_for(&mock_server).search("anime", "x").await.unwrap_err();
        assert_eq!(err.category(), "parse");
        Ok(())
    }

    #[test]
    fn test_parse_items_skips_bad_elements() {
        let items = parse_items(br#"[{"name":"A"}, 42, {"name":"B","desc":"Song, 1.0"}]"#).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].desc, "Song, 1.0");

        assert!(matches!(parse_items(br#"{"name":"A"}"#), Err(Error::Parse(_))));
        assert!(parse_items(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_header_rejected() {
        let fetcher = Fetcher::new(Url::parse("https://anidb.net/").unwrap()).unwrap();
        assert!(fetcher.with_no_cache_header("bad header", "x").is_err());
    }
}
