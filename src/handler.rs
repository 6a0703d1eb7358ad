//! Session middleware handler for Salvo

use salvo_core::{async_trait, Depot, FlowCtrl, Handler, Request, Response};
use std::sync::Arc;

use crate::cache::Cache;
use crate::config::{CookieConfig, HeaderConfig};
use crate::generator::{IdGenerator, UuidGenerator};
use crate::session::Session;
use crate::transport::{CookieTransport, HeaderTransport, Transport};

pub(crate) const SESSION_KEY: &str = "salvo.cache.session";

/// Session middleware for Salvo
///
/// For every request a [`Session`] is parsed from the configured transport,
/// stored in the depot, and saved back to the cache once the rest of the
/// chain has run. The save also runs if a downstream handler panics or the
/// request future is dropped.
pub struct SessionHandler {
    cache: Arc<dyn Cache>,
    transport: Arc<dyn Transport>,
    generator: Arc<dyn IdGenerator>,
}

impl SessionHandler {
    /// Create a handler with a custom transport
    pub fn new<C: Cache, T: Transport>(cache: C, transport: T) -> Self {
        Self {
            cache: Arc::new(cache),
            transport: Arc::new(transport),
            generator: Arc::new(UuidGenerator),
        }
    }

    /// Sessions carried in a cookie
    pub fn cookie<C: Cache>(cache: C, config: CookieConfig) -> Self {
        Self::new(cache, CookieTransport::new(config))
    }

    /// Sessions carried in a request/response header
    pub fn header<C: Cache>(cache: C, config: HeaderConfig) -> Self {
        Self::new(cache, HeaderTransport::new(config))
    }

    /// Replace the session id generator (default: UUID v4)
    pub fn with_generator<G: IdGenerator>(mut self, generator: G) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    /// Build an unparsed session for one request
    pub fn session(&self) -> Session {
        Session::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.transport),
            Arc::clone(&self.generator),
        )
    }
}

impl Clone for SessionHandler {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            transport: Arc::clone(&self.transport),
            generator: Arc::clone(&self.generator),
        }
    }
}

async fn persist(session: &Session) {
    if let Err(e) = session.save().await {
        tracing::error!("Failed to save session: {}", e);
    }
}

/// Saves the session when dropped without `finish` having run
struct SaveGuard {
    session: Option<Session>,
}

impl SaveGuard {
    fn new(session: Session) -> Self {
        Self {
            session: Some(session),
        }
    }

    async fn finish(mut self) {
        if let Some(session) = self.session.take() {
            persist(&session).await;
        }
    }
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!("Request ended early, saving session in the background");
                handle.spawn(async move {
                    persist(&session).await;
                });
            }
            Err(_) => {
                tracing::error!("Request ended early outside a tokio runtime, session not saved");
            }
        }
    }
}

#[async_trait]
impl Handler for SessionHandler {
    async fn handle(&self, req: &mut Request, depot: &mut Depot, res: &mut Response, ctrl: &mut FlowCtrl) {
        let session = self.session();
        let guard = SaveGuard::new(session.clone());

        if let Err(e) = session.parse(req, res).await {
            tracing::error!("Failed to establish session: {}", e);
        }

        depot.insert(SESSION_KEY, session);

        ctrl.call_next(req, depot, res).await;

        guard.finish().await;
    }
}
