//! Upstream data clients wrapped in cache-aside lookups
//!
//! Each client pairs one HTTPS endpoint with a [`CachedFetcher`] and a
//! time-to-live matched to how quickly its data goes stale:
//! search results an hour, scheduled events thirty minutes, weather
//! fifteen minutes. Payloads are passed through as JSON without imposing a
//! schema on them.

pub mod events;
pub mod fetcher;
pub mod search;
pub mod weather;

pub use events::{EventsClient, EventsQuery, EVENTS_CACHE_TTL};
pub use fetcher::CachedFetcher;
pub use search::{SearchClient, SearchRequest, SEARCH_CACHE_TTL};
pub use weather::{WeatherClient, WEATHER_CACHE_TTL};

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use thiserror::Error;

/// Upper bound on a single upstream request
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(15);

/// How much of an error body is kept for diagnostics
const ERROR_BODY_LIMIT: usize = 200;

/// Errors that can occur when calling an upstream data API
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned {status}: {body}")]
    Status {
        /// Response status
        status: StatusCode,
        /// Leading part of the response body
        body: String,
    },

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Response parsed but was not a JSON object
    #[error("Unexpected payload: {0}")]
    UnexpectedPayload(String),

    /// No credential configured for this upstream
    #[error("Missing credential: {0}")]
    MissingCredentials(&'static str),
}

/// Builds the HTTP client shared by the upstream clients
pub fn default_http_client() -> Client {
    Client::builder()
        .timeout(UPSTREAM_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Checks the status and decodes a JSON object body
async fn read_json(response: Response) -> Result<Value, UpstreamError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(UpstreamError::Status {
            status,
            body: text.chars().take(ERROR_BODY_LIMIT).collect(),
        });
    }

    let value: Value = serde_json::from_str(&text)?;
    if !value.is_object() {
        return Err(UpstreamError::UnexpectedPayload(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }
    Ok(value)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Treats blank credentials as missing
fn credential(value: &Option<String>, name: &'static str) -> Result<String, UpstreamError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(UpstreamError::MissingCredentials(name))
}
