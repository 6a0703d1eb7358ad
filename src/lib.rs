//! # salvo-cache-session
//!
//! Server-side sessions for the Salvo web framework, backed by a key/value
//! cache such as Redis.
//!
//! The session id travels in a cookie or in a custom header. The values
//! attached to it live in the cache under `C-S-<id>` as one JSON object and
//! are loaded when the request starts and written back when it ends.
//!
//! ## Features
//!
//! - **Cookie or header transport**: the same session core behind both
//! - **Typed values**: integers keep their width across requests, typed
//!   accessors never coerce
//! - **Pluggable caches**: Redis, Memory, or any [`Cache`] implementation
//! - **Guaranteed save**: the session is written back on every exit path
//! - **CSRF tokens**: a per-session token issued by [`CsrfHandler`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use salvo::prelude::*;
//! use salvo_cache_session::{CookieConfig, MemoryCache, SessionDepotExt, SessionHandler};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = MemoryCache::new();
//!     let session_handler = SessionHandler::cookie(cache, CookieConfig::new().with_secure(true));
//!
//!     let router = Router::new()
//!         .hoop(session_handler)
//!         .get(index);
//!
//!     let acceptor = TcpListener::new("127.0.0.1:5800").bind().await;
//!     Server::new(acceptor).serve(router).await;
//! }
//!
//! #[handler]
//! async fn index(depot: &mut Depot) -> String {
//!     let session = depot.session_mut().unwrap();
//!     let (views, _) = session.int64("views", 0);
//!     session.set("views", views + 1);
//!     format!("views: {}", views + 1)
//! }
//! ```

pub mod cache;
pub mod config;
pub mod csrf;
pub mod data;
pub mod error;
pub mod generator;
pub mod handler;
pub mod session;
pub mod transport;
pub mod value;

pub use cache::{Cache, MemoryCache};
pub use config::{CookieConfig, HeaderConfig, SameSite};
pub use csrf::CsrfHandler;
pub use data::ValueStore;
pub use error::SessionError;
pub use generator::{IdGenerator, UuidGenerator};
pub use handler::SessionHandler;
pub use session::{Session, SessionPhase};
pub use transport::{CookieTransport, HeaderTransport, Transport};
pub use value::{FromValue, Value};

#[cfg(feature = "redis-cache")]
pub use cache::RedisCache;

/// Extension trait for Depot to easily access session
pub mod depot_ext;
pub use depot_ext::SessionDepotExt;
