//! Cache module with a remote backend and an in-memory fallback
//!
//! [`CacheFacade`] picks Redis when it answers a liveness probe and process
//! memory otherwise, then serves every call from that one store. Failures in
//! either store are logged and reported as a miss or a failed write, so the
//! cache can slow a request down but never break it.

mod error;
mod facade;
mod key;
mod local;
mod remote;

pub use error::CacheError;
pub use facade::{BackendMode, CacheConfig, CacheFacade, DEFAULT_POOL_SIZE, DEFAULT_TIMEOUT};
pub use key::{normalize_set, CacheKey, CacheKeyBuilder};
pub use local::{LocalStore, LocalTtlPolicy};
pub use remote::{redact_url, RedisStore, RemoteStore};
