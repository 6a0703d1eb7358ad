//! Redis cache adapter
//!
//! - Key: the key given by the session layer (`C-S-` + session id)
//! - Value: JSON encoded value store
//! - TTL: `PX` on first write, `KEEPTTL` on overwrite (Redis >= 6.0)

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;

use super::Cache;
use crate::error::SessionError;

/// Redis cache adapter
///
/// # Example
///
/// ```rust,ignore
/// use salvo_cache_session::RedisCache;
///
/// let client = redis::Client::open("redis://127.0.0.1/")?;
/// let cache = RedisCache::new(client).await?;
/// ```
pub struct RedisCache {
    conn: Arc<ConnectionManager>,
}

impl RedisCache {
    /// Create a new Redis cache from a client
    pub async fn new(client: redis::Client) -> Result<Self, SessionError> {
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn: Arc::new(conn),
        })
    }

    /// Create a new Redis cache from a connection string
    pub async fn from_url(url: &str) -> Result<Self, SessionError> {
        let client = redis::Client::open(url)
            .map_err(|e| SessionError::CacheError(format!("Failed to create Redis client: {}", e)))?;
        Self::new(client).await
    }

    /// Create a new Redis cache from an existing connection manager
    pub fn from_connection_manager(conn: ConnectionManager) -> Self {
        Self {
            conn: Arc::new(conn),
        }
    }

    fn connection(&self) -> ConnectionManager {
        (*self.conn).clone()
    }
}

impl Clone for RedisCache {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

/// Largest `PX` Redis accepts without overflowing its absolute expiry
const MAX_PX_MILLIS: u64 = (i64::MAX / 2) as u64;

/// `PX` argument for a TTL, `None` when the entry gets no expiry
///
/// Sub-millisecond TTLs round up to 1ms. TTLs past what Redis can represent
/// are stored without expiry, matching a zero TTL.
fn px_millis(ttl: Duration) -> Option<u64> {
    if ttl.is_zero() {
        return None;
    }
    let millis = u64::try_from(ttl.as_millis()).ok()?.max(1);
    (millis <= MAX_PX_MILLIS).then_some(millis)
}

#[async_trait]
impl Cache for RedisCache {
    async fn exists(&self, key: &str) -> Result<bool, SessionError> {
        let mut conn = self.connection();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn bytes(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        let mut conn = self.connection();
        let data: Option<Vec<u8>> = conn.get(key).await?;
        Ok(data)
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), SessionError> {
        let mut conn = self.connection();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("KEEPTTL")
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn put(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), SessionError> {
        let mut conn = self.connection();

        match px_millis(ttl) {
            None => conn.set::<_, _, ()>(key, value).await?,
            Some(millis) => {
                let _: () = redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("PX")
                    .arg(millis)
                    .query_async(&mut conn)
                    .await?;
            }
        }
        Ok(())
    }

    async fn forget(&self, key: &str) -> Result<(), SessionError> {
        let mut conn = self.connection();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }
}
