//! Fallback-aware cache facade
//!
//! `CacheFacade` answers `get`/`set`/`delete` the same way whether or not a
//! remote cache is reachable. On first use it probes the remote backend once;
//! if the probe fails the facade settles on an in-memory store for the rest of
//! the process and never probes again.
//!
//! Backend trouble is logged and turned into a miss (`None`) or a failed write
//! (`false`). No operation here returns an error to the caller.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::OnceCell;

use super::local::{LocalStore, LocalTtlPolicy};
use super::remote::{redact_url, RedisStore, RemoteStore};
use super::CacheError;

/// Default bound on the liveness probe and every remote call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default number of pooled remote connections
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Settings consumed by [`CacheFacade`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Remote cache connection string; `None` or empty selects `Local` mode
    pub redis_url: Option<String>,
    /// Bound on the liveness probe and each remote call
    pub timeout: Duration,
    /// Remote connection pool size
    pub pool_size: usize,
    /// Expiry behaviour of the in-memory fallback
    pub local_ttl: LocalTtlPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            timeout: DEFAULT_TIMEOUT,
            pool_size: DEFAULT_POOL_SIZE,
            local_ttl: LocalTtlPolicy::default(),
        }
    }
}

/// Which store currently serves cache operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// No operation has run yet, so the remote backend has not been probed
    Uninitialized,
    /// The remote cache answered the liveness probe
    Remote,
    /// The in-process map, either by configuration or after a failed probe
    Local,
}

enum RemoteSource {
    None,
    Url(String),
    Store(Arc<dyn RemoteStore>),
}

enum Backend {
    Remote(Arc<dyn RemoteStore>),
    Local(LocalStore),
}

/// Key/value cache with time-to-live that degrades to process memory
///
/// Construct one per process (or per cache namespace) and share it behind
/// an `Arc`. All methods take `&self` and are safe to call concurrently.
pub struct CacheFacade {
    config: CacheConfig,
    source: RemoteSource,
    backend: OnceCell<Backend>,
}

impl fmt::Debug for CacheFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheFacade")
            .field("mode", &self.mode())
            .field("timeout", &self.config.timeout)
            .field("local_ttl", &self.config.local_ttl)
            .finish()
    }
}

impl CacheFacade {
    /// Creates a facade that will try Redis at `config.redis_url` on first use
    pub fn new(config: CacheConfig) -> Self {
        let source = match config.redis_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => RemoteSource::Url(url.to_string()),
            _ => RemoteSource::None,
        };

        Self {
            config,
            source,
            backend: OnceCell::new(),
        }
    }

    /// Creates a facade over an arbitrary remote store
    ///
    /// `config.redis_url` is ignored; the store is probed on first use.
    pub fn with_remote_store(store: Arc<dyn RemoteStore>, config: CacheConfig) -> Self {
        Self {
            config,
            source: RemoteSource::Store(store),
            backend: OnceCell::new(),
        }
    }

    /// Creates a facade that only ever uses process memory
    pub fn local_only(policy: LocalTtlPolicy) -> Self {
        Self::new(CacheConfig {
            local_ttl: policy,
            ..CacheConfig::default()
        })
    }

    /// Reports the active backend without triggering initialization
    pub fn mode(&self) -> BackendMode {
        match self.backend.get() {
            None => BackendMode::Uninitialized,
            Some(Backend::Remote(_)) => BackendMode::Remote,
            Some(Backend::Local(_)) => BackendMode::Local,
        }
    }

    /// Runs the one-time backend selection now instead of on first use
    pub async fn ensure_initialized(&self) -> BackendMode {
        self.backend().await;
        self.mode()
    }

    /// Reads `key`
    ///
    /// `None` means "no entry or backend trouble", never proof of absence.
    /// A stored empty value (`[]`, `""`, `{}`) comes back as `Some`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.backend().await {
            Backend::Remote(store) => {
                let raw = match self.bounded(store.get(key)).await {
                    Ok(Some(raw)) => raw,
                    Ok(None) => {
                        tracing::debug!(key = %key, "Cache miss");
                        return None;
                    }
                    Err(e) => {
                        tracing::error!(key = %key, error = %e, "Cache get error");
                        return None;
                    }
                };

                match serde_json::from_str(&raw) {
                    Ok(value) => {
                        tracing::debug!(key = %key, "Cache hit");
                        Some(value)
                    }
                    Err(source) => {
                        let e = CacheError::serialization(key, source);
                        tracing::error!(key = %key, error = %e, "Cache get error");
                        None
                    }
                }
            }
            Backend::Local(store) => {
                let Some(value) = store.get(key) else {
                    tracing::debug!(key = %key, "Cache miss (local)");
                    return None;
                };

                match serde_json::from_value(value) {
                    Ok(value) => {
                        tracing::debug!(key = %key, "Cache hit (local)");
                        Some(value)
                    }
                    Err(source) => {
                        let e = CacheError::serialization(key, source);
                        tracing::error!(key = %key, error = %e, "Cache get error");
                        None
                    }
                }
            }
        }
    }

    /// Stores `value` under `key` for `ttl`, replacing any previous entry
    ///
    /// Returns `false` (and logs) when the write could not be made. In
    /// `Local` mode that only happens for a value with no JSON form, since
    /// both stores hold the same JSON encoding. Remote expiry has
    /// one-second granularity; sub-second remainders round up.
    /// The in-memory fallback ignores `ttl` unless configured with
    /// [`LocalTtlPolicy::Enforce`].
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        match self.backend().await {
            Backend::Remote(store) => {
                let encoded = match serde_json::to_string(value) {
                    Ok(encoded) => encoded,
                    Err(source) => {
                        let e = CacheError::serialization(key, source);
                        tracing::error!(key = %key, error = %e, "Cache set error");
                        return false;
                    }
                };

                let ttl_secs = ttl_secs(ttl);
                match self.bounded(store.set_ex(key, &encoded, ttl_secs)).await {
                    Ok(()) => {
                        tracing::debug!(key = %key, ttl_secs, "Cache set");
                        true
                    }
                    Err(e) => {
                        tracing::error!(key = %key, error = %e, "Cache set error");
                        false
                    }
                }
            }
            Backend::Local(store) => match serde_json::to_value(value) {
                Ok(value) => {
                    store.insert(key, value, ttl);
                    tracing::debug!(key = %key, "Cache set (local)");
                    true
                }
                Err(source) => {
                    let e = CacheError::serialization(key, source);
                    tracing::error!(key = %key, error = %e, "Cache set error");
                    false
                }
            },
        }
    }

    /// Removes `key`; removing a missing key succeeds
    pub async fn delete(&self, key: &str) -> bool {
        match self.backend().await {
            Backend::Remote(store) => match self.bounded(store.del(key)).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "Cache delete error");
                    false
                }
            },
            Backend::Local(store) => {
                store.remove(key);
                true
            }
        }
    }

    /// Sweeps expired in-memory entries; returns how many were dropped
    pub fn purge_expired(&self) -> usize {
        match self.backend.get() {
            Some(Backend::Local(store)) => store.purge_expired(),
            _ => 0,
        }
    }

    /// Releases the remote connection pool
    ///
    /// Calls made in `Remote` mode afterwards fail and degrade like any
    /// other backend error.
    pub fn close(&self) {
        if let Some(Backend::Remote(store)) = self.backend.get() {
            store.close();
            tracing::info!("Remote cache connection closed");
        }
    }

    async fn backend(&self) -> &Backend {
        self.backend.get_or_init(|| self.initialize()).await
    }

    async fn initialize(&self) -> Backend {
        let store: Arc<dyn RemoteStore> = match &self.source {
            RemoteSource::None => {
                tracing::info!("No remote cache configured, using in-memory cache");
                return self.local_backend();
            }
            RemoteSource::Url(url) => {
                match RedisStore::connect(url, self.config.pool_size, self.config.timeout) {
                    Ok(store) => Arc::new(store),
                    Err(e) => {
                        tracing::warn!(
                            url = %redact_url(url),
                            error = %e,
                            "Redis unavailable, using in-memory cache"
                        );
                        return self.local_backend();
                    }
                }
            }
            RemoteSource::Store(store) => Arc::clone(store),
        };

        match self.bounded(store.ping()).await {
            Ok(()) => {
                tracing::info!("Redis connection established");
                Backend::Remote(store)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, using in-memory cache");
                store.close();
                self.local_backend()
            }
        }
    }

    fn local_backend(&self) -> Backend {
        Backend::Local(LocalStore::new(self.config.local_ttl))
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        match tokio::time::timeout(self.config.timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.config.timeout)),
        }
    }
}

/// Whole seconds for `SETEX`, rounded up and never zero
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs().saturating_add(u64::from(ttl.subsec_nanos() > 0));
    secs.max(1)
}
