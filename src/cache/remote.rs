//! Remote cache backend
//!
//! [`RemoteStore`] is the narrow contract the facade needs from a network
//! cache: `PING`, `GET`, `SETEX` and `DEL`. [`RedisStore`] implements it over
//! a pooled Redis connection; any other service offering the same four
//! commands can be plugged in through the trait.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Pool, PoolConfig, Runtime};
use redis::AsyncCommands;

use super::CacheError;

/// Key/value network cache supporting the four commands the facade uses
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Round-trips to the server to prove it is reachable
    async fn ping(&self) -> Result<(), CacheError>;

    /// Reads the encoded value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Writes `value` under `key`, expiring after `ttl_secs` seconds
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;

    /// Deletes `key`; deleting a missing key succeeds
    async fn del(&self, key: &str) -> Result<(), CacheError>;

    /// Releases connections held by the store
    fn close(&self) {}
}

/// Redis-backed [`RemoteStore`] sharing one connection pool across callers
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Builds a pool for `url` without opening any connection yet
    ///
    /// Fails only when the connection string itself is malformed.
    pub fn connect(url: &str, pool_size: usize, timeout: Duration) -> Result<Self, CacheError> {
        let mut config = deadpool_redis::Config::from_url(url);

        let mut pool_config = PoolConfig::new(pool_size.max(1));
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);
        config.pool = Some(pool_config);

        let pool = config.create_pool(Some(Runtime::Tokio1))?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool
    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply != "PONG" {
            return Err(CacheError::BackendUnavailable(format!(
                "unexpected PING reply '{}'",
                reply
            )));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.pool.get().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    fn close(&self) {
        self.pool.close();
    }
}

/// Hides the password of a connection string so it can be logged
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "<unparseable url>".to_string(),
    }
}
