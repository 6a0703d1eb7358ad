//! Header-carried session ids

use salvo_core::http::header::{HeaderName, HeaderValue};
use salvo_core::{Request, Response};
use std::time::Duration;

use super::Transport;
use crate::config::HeaderConfig;
use crate::error::SessionError;

/// Carries the session id in a custom header, read from the request and
/// echoed back under the same name on the response
#[derive(Clone, Debug)]
pub struct HeaderTransport {
    config: HeaderConfig,
}

impl HeaderTransport {
    pub fn new(config: HeaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeaderConfig {
        &self.config
    }
}

impl Transport for HeaderTransport {
    fn extract(&self, req: &Request) -> Option<String> {
        req.headers()
            .get(self.config.header_name.as_str())
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string())
            .filter(|id| !id.is_empty())
    }

    fn emit(&self, res: &mut Response, id: &str) -> Result<(), SessionError> {
        let name = HeaderName::from_bytes(self.config.header_name.as_bytes())
            .map_err(|e| SessionError::InvalidHeader(format!("{}: {}", self.config.header_name, e)))?;
        let value = HeaderValue::from_str(id)
            .map_err(|e| SessionError::InvalidHeader(format!("{}: {}", id, e)))?;
        res.headers_mut().insert(name, value);
        Ok(())
    }

    fn expiration(&self) -> Option<Duration> {
        self.config.expiration
    }

    fn resets_on_parse(&self) -> bool {
        true
    }
}
