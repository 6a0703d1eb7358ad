//! Cache adapter trait

use async_trait::async_trait;
use std::time::Duration;

use crate::error::SessionError;

/// Key/value cache with per-entry TTL
///
/// Sessions are written under `C-S-` + session id as a JSON object. The
/// session layer only needs point-wise operations on single keys; no
/// cross-key atomicity is expected from implementations.
#[async_trait]
pub trait Cache: Send + Sync + 'static {
    /// Check whether a live entry exists under `key`
    async fn exists(&self, key: &str) -> Result<bool, SessionError>;

    /// Get the raw bytes stored under `key`
    ///
    /// Returns None if the entry doesn't exist or has expired
    async fn bytes(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError>;

    /// Overwrite the value under `key`, keeping its current TTL
    ///
    /// When the entry doesn't exist it is created without expiry.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), SessionError>;

    /// Write the value under `key` with a fresh TTL
    ///
    /// A zero TTL stores the entry without expiry.
    async fn put(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), SessionError>;

    /// Remove the entry under `key`. Removing a missing key is not an error.
    async fn forget(&self, key: &str) -> Result<(), SessionError>;
}
