//! Tavily web search client
//!
//! Search results are cached for an hour. Queries are trimmed and domain
//! filters sorted before hashing so equivalent requests share an entry.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::{credential, default_http_client, read_json, CachedFetcher, UpstreamError};
use crate::cache::{normalize_set, CacheKey};

/// Base URL for the Tavily API
pub const TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// How long search results stay cached
pub const SEARCH_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default number of results per search
pub const DEFAULT_MAX_RESULTS: u32 = 5;

/// Parameters of a web search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Free-text query
    pub query: String,
    /// Upper bound on returned results
    pub max_results: u32,
    /// Only search these domains
    pub include_domains: Vec<String>,
    /// Never return results from these domains
    pub exclude_domains: Vec<String>,
}

impl SearchRequest {
    /// Creates a request with default limits and no domain filters
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: DEFAULT_MAX_RESULTS,
            include_domains: Vec::new(),
            exclude_domains: Vec::new(),
        }
    }

    /// Sets the result limit
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    /// Restricts results to `domains`
    pub fn including<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Drops results from `domains`
    pub fn excluding<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_domains = domains.into_iter().map(Into::into).collect();
        self
    }
}

/// JSON body of a Tavily search call
#[derive(Serialize)]
struct SearchBody<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    include_domains: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exclude_domains: Vec<String>,
    include_raw_content: bool,
}

/// Domains compare case-insensitively
fn normalize_domains(domains: &[String]) -> Vec<String> {
    normalize_set(domains.iter().map(|d| d.to_lowercase()))
}

/// Client for web search through the cache
#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    fetcher: CachedFetcher,
    base_url: String,
    api_key: Option<String>,
}

impl SearchClient {
    /// Creates a new SearchClient with default settings
    pub fn new(fetcher: CachedFetcher, api_key: Option<String>) -> Self {
        Self {
            client: default_http_client(),
            fetcher,
            base_url: TAVILY_BASE_URL.to_string(),
            api_key,
        }
    }

    /// Use a custom HTTP client
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Point the client at another endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Cache key for a search request
    pub fn cache_key(request: &SearchRequest) -> CacheKey {
        CacheKey::builder("tavily_search")
            .param("query", request.query.trim())
            .param("max_results", request.max_results)
            .param("include_domains", normalize_domains(&request.include_domains))
            .param("exclude_domains", normalize_domains(&request.exclude_domains))
            .build()
    }

    /// Searches the web for `request`
    ///
    /// Returns `None` if the upstream call failed; failures are not cached.
    pub async fn search(&self, request: &SearchRequest) -> Option<Value> {
        let key = Self::cache_key(request);
        self.fetcher
            .fetch(&key, SEARCH_CACHE_TTL, || self.search_uncached(request))
            .await
    }

    /// Searches straight against the API, bypassing the cache
    pub async fn search_uncached(&self, request: &SearchRequest) -> Result<Value, UpstreamError> {
        let api_key = credential(&self.api_key, "TAVILY_API_KEY")?;

        let body = SearchBody {
            api_key: &api_key,
            query: request.query.trim(),
            max_results: request.max_results,
            include_domains: normalize_domains(&request.include_domains),
            exclude_domains: normalize_domains(&request.exclude_domains),
            include_raw_content: true,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&body)
            .send()
            .await?;

        read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheFacade, LocalTtlPolicy};
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_results() -> Value {
        json!({
            "query": "vintage denim wholesale",
            "results": [
                {"title": "Denim lots", "url": "https://example.com/denim", "score": 0.92, "raw_content": "..."}
            ],
            "response_time": 1.02
        })
    }

    fn client_for(server: &MockServer) -> SearchClient {
        let cache = Arc::new(CacheFacade::local_only(LocalTtlPolicy::Ignore));
        SearchClient::new(CachedFetcher::new(cache), Some("test-tavily-key".to_string()))
            .with_base_url(server.uri())
    }

    #[test]
    fn test_cache_key_normalizes_query_and_domains() {
        let a = SearchRequest::new("vintage denim wholesale")
            .including(["example.com", "Shop.example.org"]);
        let b = SearchRequest::new("  vintage denim wholesale ")
            .including(["shop.example.org", "example.com"]);

        assert_eq!(SearchClient::cache_key(&a), SearchClient::cache_key(&b));
    }

    #[test]
    fn test_cache_key_distinguishes_include_from_exclude() {
        let a = SearchRequest::new("denim").including(["example.com"]);
        let b = SearchRequest::new("denim").excluding(["example.com"]);

        assert_ne!(SearchClient::cache_key(&a), SearchClient::cache_key(&b));
    }

    #[test]
    fn test_default_max_results() {
        assert_eq!(SearchRequest::new("q").max_results, DEFAULT_MAX_RESULTS);
    }

    #[tokio::test]
    async fn test_search_posts_expected_body_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(json!({
                "api_key": "test-tavily-key",
                "query": "vintage denim wholesale",
                "max_results": 3,
                "include_domains": ["example.com"],
                "include_raw_content": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_results()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = SearchRequest::new("vintage denim wholesale")
            .with_max_results(3)
            .including(["example.com"]);

        assert_eq!(client.search(&request).await, Some(sample_results()));
        assert_eq!(client.search(&request).await, Some(sample_results()));
    }

    #[tokio::test]
    async fn test_body_domains_match_cache_key_normalization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(json!({
                "include_domains": ["example.com", "shop.example.org"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_results()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let messy = SearchRequest::new("denim")
            .including([" Shop.Example.org", "example.com", "EXAMPLE.com "]);
        let clean = SearchRequest::new("denim").including(["example.com", "shop.example.org"]);

        assert_eq!(SearchClient::cache_key(&messy), SearchClient::cache_key(&clean));
        assert!(client.search(&messy).await.is_some());
        assert!(client.search(&clean).await.is_some());
    }

    #[tokio::test]
    async fn test_empty_result_set_is_cached() {
        let server = MockServer::start().await;
        let empty = json!({"query": "zzzz", "results": []});
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(empty.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = SearchRequest::new("zzzz");

        assert_eq!(client.search(&request).await, Some(empty.clone()));
        assert_eq!(client.search(&request).await, Some(empty));
    }

    #[tokio::test]
    async fn test_custom_client_is_used() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("user-agent", "ronin-cache-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_results()))
            .expect(1)
            .mount(&server)
            .await;

        let http = Client::builder()
            .user_agent("ronin-cache-test")
            .build()
            .expect("client should build");
        let client = client_for(&server).with_client(http);

        assert!(client.search(&SearchRequest::new("denim")).await.is_some());
    }

    #[tokio::test]
    async fn test_rate_limited_search_returns_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = SearchRequest::new("denim");

        assert!(client.search(&request).await.is_none());
        assert!(client.search(&request).await.is_none());
    }
}
