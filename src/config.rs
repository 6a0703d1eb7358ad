//! Transport configuration

use std::time::Duration;

/// Default name of the session cookie
pub const DEFAULT_COOKIE_NAME: &str = "session";

/// Default name of the session header
pub const DEFAULT_HEADER_NAME: &str = "X-SESSION-ID";

/// Configuration for cookie-carried sessions
#[derive(Clone, Debug)]
pub struct CookieConfig {
    /// Name of the session cookie (default: "session")
    pub cookie_name: String,

    /// Cookie path (default: "/")
    pub cookie_path: String,

    /// Cookie domain (default: None - current domain only)
    pub cookie_domain: Option<String>,

    /// HttpOnly flag for cookie (default: true)
    pub cookie_http_only: bool,

    /// Secure flag for cookie (default: false)
    pub cookie_secure: bool,

    /// SameSite attribute for cookie
    pub cookie_same_site: SameSite,

    /// Session lifetime
    ///
    /// None: cache entries live 24 hours and the cookie has no expiry.
    /// Some(zero): cache entries don't expire and the cookie has no expiry.
    /// Some(d): cache entries live `d` and the cookie expires at now + `d`.
    pub expiration: Option<Duration>,
}

/// SameSite cookie attribute
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    /// Strict - cookie only sent for same-site requests
    Strict,
    /// Lax - cookie sent for same-site requests and top-level navigations
    Lax,
    /// None - cookie sent for all requests (requires Secure)
    None,
}

impl std::str::FromStr for SameSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            other => Err(format!("unknown SameSite policy: {}", other)),
        }
    }
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_path: "/".to_string(),
            cookie_domain: None,
            cookie_http_only: true,
            cookie_secure: false,
            cookie_same_site: SameSite::Lax,
            expiration: None,
        }
    }
}

impl CookieConfig {
    /// Create a new cookie configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cookie name (default: "session")
    pub fn with_cookie_name<S: Into<String>>(mut self, name: S) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the cookie path (default: "/")
    pub fn with_cookie_path<S: Into<String>>(mut self, path: S) -> Self {
        self.cookie_path = path.into();
        self
    }

    /// Set the cookie domain
    pub fn with_cookie_domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    /// Set the HttpOnly flag (default: true)
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.cookie_http_only = http_only;
        self
    }

    /// Set the Secure flag (default: false)
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Set the SameSite attribute (default: Lax)
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.cookie_same_site = same_site;
        self
    }

    /// Set the session lifetime. Pass None for the 24 hour default.
    pub fn with_expiration(mut self, expiration: impl Into<Option<Duration>>) -> Self {
        self.expiration = expiration.into();
        self
    }
}

/// Configuration for header-carried sessions
#[derive(Clone, Debug)]
pub struct HeaderConfig {
    /// Request and response header holding the session id (default: "X-SESSION-ID")
    pub header_name: String,

    /// Cache lifetime of the session. None means 24 hours, zero means no expiry.
    pub expiration: Option<Duration>,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_HEADER_NAME.to_string(),
            expiration: None,
        }
    }
}

impl HeaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header name (default: "X-SESSION-ID")
    pub fn with_header_name<S: Into<String>>(mut self, name: S) -> Self {
        self.header_name = name.into();
        self
    }

    /// Set the session lifetime. Pass None for the 24 hour default.
    pub fn with_expiration(mut self, expiration: impl Into<Option<Duration>>) -> Self {
        self.expiration = expiration.into();
        self
    }
}
