//! CSRF token middleware
//!
//! Makes sure every session carries a `csrf_token` value that templates and
//! handlers can read through [`SessionDepotExt::csrf_token`].

use salvo_core::http::StatusError;
use salvo_core::{async_trait, Depot, FlowCtrl, Handler, Request, Response};
use std::sync::Arc;

use crate::depot_ext::SessionDepotExt;
use crate::generator::{IdGenerator, UuidGenerator};

/// Session key holding the CSRF token
pub const CSRF_TOKEN_KEY: &str = "csrf_token";

/// Issues a CSRF token for sessions that don't have one yet
///
/// Must be mounted after [`SessionHandler`](crate::SessionHandler). Without a
/// session in the depot the request is answered with 500.
#[derive(Clone)]
pub struct CsrfHandler {
    generator: Arc<dyn IdGenerator>,
}

impl CsrfHandler {
    pub fn new() -> Self {
        Self {
            generator: Arc::new(UuidGenerator),
        }
    }

    /// Replace the token generator (default: UUID v4)
    pub fn with_generator<G: IdGenerator>(mut self, generator: G) -> Self {
        self.generator = Arc::new(generator);
        self
    }
}

impl Default for CsrfHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for CsrfHandler {
    async fn handle(&self, req: &mut Request, depot: &mut Depot, res: &mut Response, ctrl: &mut FlowCtrl) {
        let Some(session) = depot.session_mut() else {
            tracing::error!("CSRF: no session in depot, mount SessionHandler first");
            res.render(StatusError::internal_server_error());
            ctrl.skip_rest();
            return;
        };

        let (token, _) = session.string(CSRF_TOKEN_KEY, String::new());
        if token.is_empty() {
            session.set(CSRF_TOKEN_KEY, self.generator.generate());
        }

        ctrl.call_next(req, depot, res).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::HeaderConfig;
    use crate::SessionHandler;
    use salvo::prelude::*;
    use salvo::test::{ResponseExt, TestClient};

    #[handler]
    async fn show_token(depot: &mut Depot) -> String {
        depot.csrf_token()
    }

    fn service(cache: &MemoryCache) -> Service {
        let router = Router::new()
            .hoop(SessionHandler::header(cache.clone(), HeaderConfig::new()))
            .hoop(CsrfHandler::new().with_generator(|| "token-1".to_string()))
            .get(show_token);
        Service::new(router)
    }

    #[tokio::test]
    async fn test_token_issued_once() {
        let cache = MemoryCache::new();
        let service = service(&cache);

        let mut res = TestClient::get("http://127.0.0.1:5800/").send(&service).await;
        let id = res
            .headers()
            .get("x-session-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .expect("session id");
        assert_eq!(res.take_string().await.unwrap(), "token-1");

        // Existing token is kept, the generator is not consulted again
        let router = Router::new()
            .hoop(SessionHandler::header(cache.clone(), HeaderConfig::new()))
            .hoop(CsrfHandler::new().with_generator(|| "token-2".to_string()))
            .get(show_token);
        let service = Service::new(router);
        let mut res = TestClient::get("http://127.0.0.1:5800/")
            .add_header("x-session-id", id.as_str(), true)
            .send(&service)
            .await;
        assert_eq!(res.take_string().await.unwrap(), "token-1");
    }

    #[tokio::test]
    async fn test_missing_session_is_rejected() {
        let router = Router::new().hoop(CsrfHandler::new()).get(show_token);
        let service = Service::new(router);
        let res = TestClient::get("http://127.0.0.1:5800/").send(&service).await;
        assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_csrf_token_without_session_is_empty() {
        let depot = Depot::new();
        assert_eq!(depot.csrf_token(), "");
    }
}
