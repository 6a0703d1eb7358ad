//! Cookie-carried session ids

use salvo_core::http::cookie::{self, time::OffsetDateTime, Cookie};
use salvo_core::{Request, Response};
use std::time::Duration;

use super::Transport;
use crate::config::{CookieConfig, SameSite};
use crate::error::SessionError;

/// Carries the session id in a cookie
#[derive(Clone, Debug)]
pub struct CookieTransport {
    config: CookieConfig,
}

impl CookieTransport {
    pub fn new(config: CookieConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CookieConfig {
        &self.config
    }

    /// Build the response cookie for `id`
    fn build_cookie(&self, id: &str) -> Cookie<'static> {
        let mut cookie_builder = Cookie::build((self.config.cookie_name.clone(), id.to_string()))
            .path(self.config.cookie_path.clone())
            .http_only(self.config.cookie_http_only)
            .secure(self.config.cookie_secure);

        if let Some(domain) = self.config.cookie_domain.clone() {
            cookie_builder = cookie_builder.domain(domain);
        }

        // Absolute expiry only for positive lifetimes, otherwise a browser-session cookie
        if let Some(expiration) = self.config.expiration.filter(|d| !d.is_zero()) {
            let lifetime = cookie::time::Duration::try_from(expiration)
                .unwrap_or(cookie::time::Duration::MAX);
            cookie_builder = cookie_builder.expires(OffsetDateTime::now_utc().saturating_add(lifetime));
        }

        cookie_builder = match self.config.cookie_same_site {
            SameSite::Strict => cookie_builder.same_site(cookie::SameSite::Strict),
            SameSite::Lax => cookie_builder.same_site(cookie::SameSite::Lax),
            SameSite::None => cookie_builder.same_site(cookie::SameSite::None),
        };

        cookie_builder.build()
    }
}

impl Transport for CookieTransport {
    fn extract(&self, req: &Request) -> Option<String> {
        req.cookie(&self.config.cookie_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|id| !id.is_empty())
    }

    fn emit(&self, res: &mut Response, id: &str) -> Result<(), SessionError> {
        res.add_cookie(self.build_cookie(id));
        Ok(())
    }

    fn expiration(&self) -> Option<Duration> {
        self.config.expiration
    }
}
