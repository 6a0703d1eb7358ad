//! In-memory cache
//!
//! This is primarily for development and testing.
//! For production, use RedisCache or another shared cache.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::Cache;
use crate::error::SessionError;

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(exp) => exp > now,
            None => true,
        }
    }
}

/// In-memory cache
///
/// Warning: This cache is not suitable for production use because:
/// - Sessions are lost on server restart
/// - Sessions are not shared across multiple server instances
/// - Expired entries are only dropped by `cleanup_expired` or on overwrite
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryCache {
    /// Create a new memory cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Instant at which the entry under `key` expires
    ///
    /// None if the entry is missing, expired, or has no expiry.
    pub fn expires_at(&self, key: &str) -> Option<Instant> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .and_then(|entry| entry.expires_at)
    }

    /// Remaining time to live of the entry under `key`
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.expires_at(key)
            .map(|exp| exp.saturating_duration_since(Instant::now()))
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clean up expired entries
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.write().retain(|_, entry| entry.is_live(now));
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn exists(&self, key: &str) -> Result<bool, SessionError> {
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .map_or(false, |entry| entry.is_live(Instant::now())))
    }

    async fn bytes(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), SessionError> {
        let mut entries = self.entries.write();
        let now = Instant::now();

        if let Some(entry) = entries.get_mut(key).filter(|entry| entry.is_live(now)) {
            entry.value = value.to_vec();
            return Ok(());
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn put(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), SessionError> {
        // A TTL past the clock's range is stored without expiry, like zero
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Instant::now().checked_add(ttl)
        };

        self.entries.write().insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn forget(&self, key: &str) -> Result<(), SessionError> {
        self.entries.write().remove(key);
        Ok(())
    }
}
