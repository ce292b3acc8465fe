//! PredictHQ scheduled-events client
//!
//! Event listings change slowly, so results are cached for thirty minutes.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use super::{credential, default_http_client, read_json, CachedFetcher, UpstreamError};
use crate::cache::{normalize_set, CacheKey};

/// Base URL for the PredictHQ API
pub const PREDICTHQ_BASE_URL: &str = "https://api.predicthq.com/v1";

/// How long an event listing stays cached
pub const EVENTS_CACHE_TTL: Duration = Duration::from_secs(1800);

/// Maximum number of events requested per call
const EVENTS_PAGE_LIMIT: u32 = 50;

/// Parameters of an events lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsQuery {
    /// Place identifier (e.g. a GeoNames id)
    pub location: String,
    /// Earliest event start, `YYYY-MM-DD`
    pub start_date: String,
    /// Latest event end, `YYYY-MM-DD`
    pub end_date: String,
    /// Optional category filter
    pub categories: Vec<String>,
}

impl EventsQuery {
    /// Creates a query without a category filter
    pub fn new(
        location: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            categories: Vec::new(),
        }
    }

    /// Restricts the query to the given categories
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Categories trimmed, sorted and de-duplicated
    fn normalized_categories(&self) -> Vec<String> {
        normalize_set(&self.categories)
    }
}

/// Client for fetching scheduled events through the cache
#[derive(Clone)]
pub struct EventsClient {
    client: Client,
    fetcher: CachedFetcher,
    base_url: String,
    access_token: Option<String>,
}

impl EventsClient {
    /// Creates a new EventsClient with default settings
    pub fn new(fetcher: CachedFetcher, access_token: Option<String>) -> Self {
        Self {
            client: default_http_client(),
            fetcher,
            base_url: PREDICTHQ_BASE_URL.to_string(),
            access_token,
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

    /// Cache key for an events query
    pub fn cache_key(query: &EventsQuery) -> CacheKey {
        CacheKey::builder("predicthq_events")
            .param("location", query.location.trim())
            .param("start_date", query.start_date.trim())
            .param("end_date", query.end_date.trim())
            .param("categories", query.normalized_categories())
            .build()
    }

    /// Fetches events matching `query`
    ///
    /// Returns `None` if the upstream call failed; failures are not cached.
    pub async fn events(&self, query: &EventsQuery) -> Option<Value> {
        let key = Self::cache_key(query);
        self.fetcher
            .fetch(&key, EVENTS_CACHE_TTL, || self.fetch_events_uncached(query))
            .await
    }

    /// Fetches events straight from the API, bypassing the cache
    pub async fn fetch_events_uncached(&self, query: &EventsQuery) -> Result<Value, UpstreamError> {
        let token = credential(&self.access_token, "PREDICTHQ_ACCESS_TOKEN")?;

        let mut params = vec![
            ("location.place_id", query.location.trim().to_string()),
            ("start.gte", query.start_date.trim().to_string()),
            ("end.lte", query.end_date.trim().to_string()),
            ("limit", EVENTS_PAGE_LIMIT.to_string()),
        ];
        let categories = query.normalized_categories();
        if !categories.is_empty() {
            params.push(("category", categories.join(",")));
        }

        let response = self
            .client
            .get(format!("{}/events", self.base_url))
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&params)
            .send()
            .await?;

        read_json(response).await
    }
}
