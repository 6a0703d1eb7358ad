//! How the session id travels between client and server

mod cookie;
mod header;

pub use cookie::CookieTransport;
pub use header::HeaderTransport;

use salvo_core::{Request, Response};
use std::time::Duration;

use crate::error::SessionError;

/// Binding between a session id and the HTTP exchange
pub trait Transport: Send + Sync + 'static {
    /// Read the candidate session id from the request
    ///
    /// Empty values are reported as None.
    fn extract(&self, req: &Request) -> Option<String>;

    /// Send a freshly issued session id to the client
    fn emit(&self, res: &mut Response, id: &str) -> Result<(), SessionError>;

    /// Session lifetime, None for the 24 hour default
    fn expiration(&self) -> Option<Duration>;

    /// Whether `parse` clears the value store before consulting the cache
    fn resets_on_parse(&self) -> bool {
        false
    }
}
