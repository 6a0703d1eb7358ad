//! Extension trait for Depot to easily access sessions

use salvo_core::Depot;

use crate::csrf::CSRF_TOKEN_KEY;
use crate::handler::SESSION_KEY;
use crate::session::Session;

/// Extension trait for Salvo's Depot to provide easy session access
pub trait SessionDepotExt {
    /// Get a reference to the session
    fn session(&self) -> Option<&Session>;

    /// Get a session handle (a clone sharing the same state)
    fn session_mut(&mut self) -> Option<Session>;

    /// CSRF token of the current session, empty if there is none
    fn csrf_token(&self) -> String;
}

impl SessionDepotExt for Depot {
    fn session(&self) -> Option<&Session> {
        self.get::<Session>(SESSION_KEY).ok()
    }

    fn session_mut(&mut self) -> Option<Session> {
        self.get::<Session>(SESSION_KEY).ok().cloned()
    }

    fn csrf_token(&self) -> String {
        self.session()
            .map(|session| session.string(CSRF_TOKEN_KEY, String::new()).0)
            .unwrap_or_default()
    }
}
