//! Errors raised by cache backends
//!
//! These never escape [`CacheFacade`](super::CacheFacade)'s public operations.
//! The facade logs them and answers with a miss or a failed write instead.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to a cache backend
#[derive(Debug, Error)]
pub enum CacheError {
    /// Remote cache could not be reached or refused the connection
    #[error("Remote cache unavailable: {0}")]
    BackendUnavailable(String),

    /// Remote call did not complete within the configured bound
    #[error("Remote cache call timed out after {0:?}")]
    Timeout(Duration),

    /// Value could not be encoded for, or decoded from, the cache
    #[error("Failed to encode or decode value for key '{key}': {source}")]
    Serialization {
        /// Key whose value failed to round-trip
        key: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Redis command failed
    #[error("Redis command failed: {0}")]
    Redis(#[from] redis::RedisError),

    /// No pooled connection could be obtained
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Connection string was rejected when building the pool
    #[error("Invalid Redis configuration: {0}")]
    CreatePool(#[from] deadpool_redis::CreatePoolError),
}

impl CacheError {
    /// Builds a serialization error for `key`
    pub fn serialization(key: &str, source: serde_json::Error) -> Self {
        Self::Serialization {
            key: key.to_string(),
            source,
        }
    }
}
