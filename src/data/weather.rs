//! OpenWeatherMap forecast client
//!
//! Fetches 3-hour-step forecasts from the OpenWeatherMap API and caches them
//! for fifteen minutes, since weather changes fast.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use super::{credential, default_http_client, read_json, CachedFetcher, UpstreamError};
use crate::cache::CacheKey;

/// Base URL for the OpenWeatherMap API
pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// How long a forecast stays cached
pub const WEATHER_CACHE_TTL: Duration = Duration::from_secs(900);

/// Default forecast length in days
pub const DEFAULT_FORECAST_DAYS: u32 = 5;

/// OpenWeatherMap returns one forecast every 3 hours
const FORECASTS_PER_DAY: u32 = 8;

/// Client for fetching weather forecasts through the cache
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    fetcher: CachedFetcher,
    base_url: String,
    api_key: Option<String>,
}

impl WeatherClient {
    /// Create a new WeatherClient with default settings
    pub fn new(fetcher: CachedFetcher, api_key: Option<String>) -> Self {
        Self {
            client: default_http_client(),
            fetcher,
            base_url: OPENWEATHER_BASE_URL.to_string(),
            api_key,
        }
    }

    /// Use a custom HTTP client
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Point the client at another endpoint (a mock server in tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Cache key for a forecast request
    pub fn cache_key(lat: f64, lon: f64, days: u32) -> CacheKey {
        CacheKey::builder("weather_forecast")
            .param("lat", lat)
            .param("lon", lon)
            .param("days", days)
            .build()
    }

    /// Fetch a forecast for the given coordinates
    ///
    /// # Arguments
    /// * `lat` - Latitude coordinate
    /// * `lon` - Longitude coordinate
    /// * `days` - Number of days to forecast
    ///
    /// # Returns
    /// * `Some(Value)` - Forecast payload, fresh or cached
    /// * `None` - If the upstream call failed (nothing is cached)
    pub async fn forecast(&self, lat: f64, lon: f64, days: u32) -> Option<Value> {
        let key = Self::cache_key(lat, lon, days);
        self.fetcher
            .fetch(&key, WEATHER_CACHE_TTL, || {
                self.fetch_forecast_uncached(lat, lon, days)
            })
            .await
    }

    /// Fetch a forecast straight from the API, bypassing the cache
    pub async fn fetch_forecast_uncached(
        &self,
        lat: f64,
        lon: f64,
        days: u32,
    ) -> Result<Value, UpstreamError> {
        let api_key = credential(&self.api_key, "OPENWEATHER_API_KEY")?;
        let count = days.saturating_mul(FORECASTS_PER_DAY);

        let response = self
            .client
            .get(format!("{}/forecast", self.base_url))
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", api_key),
                ("units", "metric".to_string()),
                ("cnt", count.to_string()),
            ])
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
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Trimmed OpenWeatherMap forecast response
    fn sample_forecast() -> Value {
        json!({
            "cod": "200",
            "cnt": 2,
            "list": [
                {"dt": 1721055600, "main": {"temp": 21.4, "humidity": 60}, "weather": [{"main": "Clouds"}]},
                {"dt": 1721066400, "main": {"temp": 19.8, "humidity": 71}, "weather": [{"main": "Rain"}]}
            ],
            "city": {"name": "New York", "coord": {"lat": 40.0, "lon": -74.0}}
        })
    }

    fn client_for(server: &MockServer, api_key: Option<&str>) -> WeatherClient {
        let cache = Arc::new(CacheFacade::local_only(LocalTtlPolicy::Ignore));
        WeatherClient::new(CachedFetcher::new(cache), api_key.map(str::to_string))
            .with_base_url(server.uri())
    }

    #[test]
    fn test_cache_key_depends_on_all_inputs() {
        let base = WeatherClient::cache_key(40.0, -74.0, 5);

        assert_eq!(base, WeatherClient::cache_key(40.0, -74.0, 5));
        assert_ne!(base, WeatherClient::cache_key(40.0, -74.0, 3));
        assert_ne!(base, WeatherClient::cache_key(41.0, -74.0, 5));
        assert!(base.as_str().starts_with("weather_forecast:"));
    }

    #[tokio::test]
    async fn test_forecast_sends_expected_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("lat", "40"))
            .and(query_param("lon", "-74"))
            .and(query_param("appid", "test-weather-key"))
            .and(query_param("units", "metric"))
            .and(query_param("cnt", "40"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_forecast()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-weather-key"));

        assert_eq!(client.forecast(40.0, -74.0, 5).await, Some(sample_forecast()));
    }

    #[tokio::test]
    async fn test_custom_client_is_used() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(header("user-agent", "ronin-cache-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_forecast()))
            .expect(1)
            .mount(&server)
            .await;

        let http = Client::builder()
            .user_agent("ronin-cache-test")
            .build()
            .expect("client should build");
        let client = client_for(&server, Some("test-weather-key")).with_client(http);

        assert!(client.forecast(40.0, -74.0, 5).await.is_some());
    }

    #[tokio::test]
    async fn test_forecast_twice_hits_upstream_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_forecast()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-weather-key"));

        let first = client.forecast(40.0, -74.0, 5).await;
        let second = client.forecast(40.0, -74.0, 5).await;

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_server_error_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-weather-key"));

        assert!(client.forecast(40.0, -74.0, 5).await.is_none());
        assert!(client.forecast(40.0, -74.0, 5).await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{ invalid json }"))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-weather-key"));
        let result = client.fetch_forecast_uncached(40.0, -74.0, 5).await;

        assert!(matches!(result, Err(UpstreamError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_missing_api_key_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_forecast()))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let result = client.fetch_forecast_uncached(40.0, -74.0, 5).await;

        assert!(matches!(
            result,
            Err(UpstreamError::MissingCredentials("OPENWEATHER_API_KEY"))
        ));
        assert!(client.forecast(40.0, -74.0, 5).await.is_none());
    }
}
