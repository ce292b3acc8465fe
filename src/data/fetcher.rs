//! Cache-aside helper shared by the upstream clients
//!
//! Look up the key, return a hit untouched, otherwise run the upstream call
//! and store its result. Upstream failures are never cached. Callers get the
//! same value whether it came from the cache or the network.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

use crate::cache::{CacheFacade, CacheKey};

/// Runs upstream calls through a shared [`CacheFacade`]
#[derive(Debug, Clone)]
pub struct CachedFetcher {
    cache: Arc<CacheFacade>,
}

impl CachedFetcher {
    /// Creates a fetcher over `cache`
    pub fn new(cache: Arc<CacheFacade>) -> Self {
        Self { cache }
    }

    /// Returns the underlying cache
    pub fn cache(&self) -> &CacheFacade {
        &self.cache
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches its result
    ///
    /// # Arguments
    /// * `key` - Deterministic key for the request
    /// * `ttl` - How long a fresh result stays cached
    /// * `fetch` - The upstream call, only invoked on a miss
    ///
    /// # Returns
    /// * `Some(T)` from the cache or from a successful upstream call
    /// * `None` if the upstream call failed (logged, nothing cached)
    pub async fn fetch<T, E, F, Fut>(&self, key: &CacheKey, ttl: Duration, fetch: F) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.cache.get::<T>(key.as_str()).await {
            return Some(hit);
        }

        match fetch().await {
            Ok(value) => {
                if !self.cache.set(key.as_str(), &value, ttl).await {
                    tracing::warn!(key = %key, "Fetched value was not cached");
                }
                Some(value)
            }
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Upstream call failed");
                None
            }
        }
    }
}
