//! Cache adapters backing session persistence

mod memory;
mod traits;

pub use memory::MemoryCache;
pub use traits::Cache;

#[cfg(feature = "redis-cache")]
mod redis_cache;

#[cfg(feature = "redis-cache")]
pub use redis_cache::RedisCache;
