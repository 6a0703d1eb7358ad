//! Session error types

use std::fmt;

/// Errors that can occur during session operations
///
/// None of these are turned into HTTP errors by the middleware; they are
/// returned to callers of the session API and logged by the handler.
#[derive(Debug)]
pub enum SessionError {
    /// Error reported by the cache backend
    CacheError(String),
    /// Error while encoding or decoding the value store
    SerializationError(String),
    /// Header name or value that cannot be written to a response
    InvalidHeader(String),
    /// Redis error (when redis-cache feature is enabled)
    #[cfg(feature = "redis-cache")]
    RedisError(redis::RedisError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::CacheError(msg) => write!(f, "Session cache error: {}", msg),
            SessionError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            SessionError::InvalidHeader(msg) => write!(f, "Invalid session header: {}", msg),
            #[cfg(feature = "redis-cache")]
            SessionError::RedisError(e) => write!(f, "Redis error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(feature = "redis-cache")]
            SessionError::RedisError(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "redis-cache")]
impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        SessionError::RedisError(err)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::SerializationError(err.to_string())
    }
}
