//! Session state machine
//!
//! A [`Session`] is created per request. `parse` either adopts the id the
//! client presented (when the cache still holds it) or issues a fresh one,
//! handlers read and write values in memory, and `save` writes the whole
//! value store back to the cache at the end of the request.
//!
//! ```text
//! Unparsed --parse (miss)----------> Fresh
//! Unparsed --parse (hit, decoded)--> Loaded
//! Unparsed --parse (hit, corrupt)--> Fresh
//! any      --regenerate-----------> Fresh
//! any      --destroy--------------> Destroyed
//! ```

use parking_lot::Mutex;
use salvo_core::{Request, Response};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::Cache;
use crate::data::ValueStore;
use crate::error::SessionError;
use crate::generator::IdGenerator;
use crate::transport::Transport;
use crate::value::{typed_accessors, FromValue, Value};

/// Prefix of every session entry in the cache
pub const SESSION_KEY_PREFIX: &str = "C-S-";

/// Cache TTL used when no expiration is configured
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache key holding the value store of session `id`
pub fn cache_key(id: &str) -> String {
    format!("{}{}", SESSION_KEY_PREFIX, id)
}

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Constructed, `parse` not called yet
    Unparsed,
    /// Fresh id, or an existing id whose stored data could not be decoded
    Fresh,
    /// Data loaded from an existing cache entry
    Loaded,
    /// Id and data cleared by `destroy`
    Destroyed,
}

#[derive(Debug)]
struct SessionState {
    id: String,
    data: ValueStore,
    phase: SessionPhase,
}

/// Per-request session handle
///
/// Clones share the same state, so the handle stored in the depot and the
/// one kept by the middleware for the final save see the same values. The
/// inner lock is never held across an `.await`.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    cache: Arc<dyn Cache>,
    transport: Arc<dyn Transport>,
    generator: Arc<dyn IdGenerator>,
}

impl Session {
    /// Create an unparsed session
    pub fn new(
        cache: Arc<dyn Cache>,
        transport: Arc<dyn Transport>,
        generator: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                id: String::new(),
                data: ValueStore::new(),
                phase: SessionPhase::Unparsed,
            })),
            cache,
            transport,
            generator,
        }
    }

    /// Read the session id from the request and load its data
    ///
    /// When the request carries no id, or the cache has no entry for it, the
    /// session is regenerated and the new id is written to `res`. Undecodable
    /// cache data is logged and leaves the store as it was; it never fails
    /// the request. The returned error only reports cache or transport
    /// failures hit while regenerating.
    pub async fn parse(&self, req: &Request, res: &mut Response) -> Result<(), SessionError> {
        let candidate = self.transport.extract(req);

        if self.transport.resets_on_parse() {
            self.state.lock().data.clear();
        }

        let Some(candidate) = candidate else {
            tracing::debug!("no session id on request, starting a new session");
            return self.regenerate(res).await;
        };

        let key = cache_key(&candidate);
        let exists = match self.cache.exists(&key).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!("Failed to look up session, starting a new one: {}", e);
                false
            }
        };

        if !exists {
            tracing::debug!("unknown or expired session id, starting a new session");
            return self.regenerate(res).await;
        }

        let decoded = match self.cache.bytes(&key).await {
            Ok(Some(bytes)) => match ValueStore::from_json(&bytes) {
                Ok(data) => Some(data),
                Err(e) => {
                    tracing::warn!("Discarding undecodable session data: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to load session data: {}", e);
                None
            }
        };

        let mut state = self.state.lock();
        state.id = candidate;
        match decoded {
            Some(data) => {
                state.data = data;
                state.phase = SessionPhase::Loaded;
            }
            None => state.phase = SessionPhase::Fresh,
        }
        Ok(())
    }

    /// Current session id, empty before `parse` and after `destroy`
    pub fn id(&self) -> String {
        self.state.lock().id.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.lock().phase
    }

    /// Drop the current identity and data and issue a new id
    ///
    /// Values that should survive must be set again afterwards. The new id is
    /// assigned and emitted even when removing the old cache entry fails; that
    /// failure is still returned.
    pub async fn regenerate(&self, res: &mut Response) -> Result<(), SessionError> {
        let destroyed = self.destroy().await;

        let id = self.generator.generate();
        {
            let mut state = self.state.lock();
            state.id = id.clone();
            state.phase = SessionPhase::Fresh;
        }

        self.transport.emit(res, &id)?;
        destroyed
    }

    /// Set a value
    pub fn set<K: Into<String>, V: Into<Value>>(&self, key: K, value: V) {
        self.state.lock().data.set(key, value);
    }

    /// Store any serializable value as JSON
    pub fn set_json<K: Into<String>, T: Serialize>(
        &self,
        key: K,
        value: &T,
    ) -> Result<(), SessionError> {
        self.state.lock().data.set_json(key, value)
    }

    /// Get a value, None if absent
    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.lock().data.get(key).cloned()
    }

    /// Check if a key exists
    pub fn exists(&self, key: &str) -> bool {
        self.state.lock().data.exists(key)
    }

    /// Remove a value. Removing a missing key is a no-op.
    pub fn delete(&self, key: &str) -> Option<Value> {
        self.state.lock().data.delete(key)
    }

    /// Copy of all stored values
    pub fn all(&self) -> HashMap<String, Value> {
        self.state.lock().data.all().clone()
    }

    /// Copy of the value store
    pub fn data(&self) -> ValueStore {
        self.state.lock().data.clone()
    }

    /// Get a value stored as exactly `T`, see [`ValueStore::typed`]
    pub fn typed<T: FromValue>(&self, key: &str, fallback: T) -> (T, bool) {
        self.state.lock().data.typed(key, fallback)
    }

    typed_accessors!();

    /// Remove the cache entry and reset id and data
    ///
    /// Nothing is sent to the client: the old cookie or header stays until the
    /// next regeneration.
    pub async fn destroy(&self) -> Result<(), SessionError> {
        let old_id = {
            let mut state = self.state.lock();
            state.data.clear();
            state.phase = SessionPhase::Destroyed;
            std::mem::take(&mut state.id)
        };

        if old_id.is_empty() {
            return Ok(());
        }
        self.cache.forget(&cache_key(&old_id)).await
    }

    /// Write the value store to the cache
    ///
    /// An existing entry is overwritten in place and keeps its TTL. A missing
    /// entry is created with the configured expiration, or 24 hours when none
    /// is configured. Saving a session without an id does nothing.
    pub async fn save(&self) -> Result<(), SessionError> {
        let (id, payload) = {
            let state = self.state.lock();
            if state.id.is_empty() {
                tracing::debug!("session has no id, nothing to save");
                return Ok(());
            }
            (state.id.clone(), state.data.to_json()?)
        };

        let key = cache_key(&id);
        if self.cache.exists(&key).await? {
            self.cache.set(&key, &payload).await
        } else {
            self.cache.put(&key, &payload, self.ttl()).await
        }
    }

    /// TTL given to newly created cache entries
    pub fn ttl(&self) -> Duration {
        self.transport.expiration().unwrap_or(DEFAULT_TTL)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Session")
            .field("id", &state.id)
            .field("phase", &state.phase)
            .field("data", &state.data)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::{CookieConfig, HeaderConfig, SameSite};
    use crate::generator::UuidGenerator;
    use crate::transport::{CookieTransport, HeaderTransport};
    use salvo_core::http::cookie::Cookie;
    use salvo_core::http::header::HeaderValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn header_session(cache: &MemoryCache, expiration: Option<Duration>) -> Session {
        Session::new(
            Arc::new(cache.clone()),
            Arc::new(HeaderTransport::new(
                HeaderConfig::new().with_expiration(expiration),
            )),
            Arc::new(UuidGenerator),
        )
    }

    fn cookie_session(cache: &MemoryCache, config: CookieConfig) -> Session {
        Session::new(
            Arc::new(cache.clone()),
            Arc::new(CookieTransport::new(config)),
            Arc::new(UuidGenerator),
        )
    }

    fn request_with_header(id: &str) -> Request {
        let mut req = Request::new();
        req.headers_mut()
            .insert("x-session-id", HeaderValue::from_str(id).unwrap());
        req
    }

    fn request_with_cookie(id: &str) -> Request {
        let mut req = Request::new();
        req.cookies_mut()
            .add(Cookie::new("session", id.to_string()));
        req
    }

    #[tokio::test]
    async fn test_new_cookie_session_issues_cookie() {
        let cache = MemoryCache::new();
        let session = cookie_session(
            &cache,
            CookieConfig::new()
                .with_secure(true)
                .with_cookie_domain("example.com")
                .with_same_site(SameSite::None)
                .with_expiration(Duration::from_secs(600)),
        );
        assert_eq!(session.phase(), SessionPhase::Unparsed);
        assert_eq!(session.id(), "");

        let req = Request::new();
        let mut res = Response::new();
        session.parse(&req, &mut res).await.unwrap();

        assert_eq!(session.phase(), SessionPhase::Fresh);
        assert!(!session.id().is_empty());

        let issued = res.cookies().get("session").expect("session cookie");
        assert_eq!(issued.value(), session.id());
        assert_eq!(issued.secure(), Some(true));
        assert_eq!(issued.domain(), Some("example.com"));
        assert!(issued.expires_datetime().is_some());
    }

    #[tokio::test]
    async fn test_existing_header_session_is_loaded() {
        let cache = MemoryCache::new();
        cache
            .put(&cache_key("abc"), br#"{"role":"admin"}"#, DEFAULT_TTL)
            .await
            .unwrap();

        let session = header_session(&cache, None);
        let mut res = Response::new();
        session
            .parse(&request_with_header("abc"), &mut res)
            .await
            .unwrap();

        assert_eq!(session.phase(), SessionPhase::Loaded);
        assert_eq!(session.id(), "abc");
        assert_eq!(session.get("role"), Some(Value::String("admin".to_string())));
        assert_eq!(
            session.string("role", String::new()),
            ("admin".to_string(), true)
        );
        // No new id is sent for an adopted session
        assert!(res.headers().get("x-session-id").is_none());
    }

    #[tokio::test]
    async fn test_unknown_id_is_regenerated() {
        let cache = MemoryCache::new();
        let session = header_session(&cache, None);
        let mut res = Response::new();
        session
            .parse(&request_with_header("stale"), &mut res)
            .await
            .unwrap();

        let id = session.id();
        assert_ne!(id, "stale");
        assert_eq!(session.phase(), SessionPhase::Fresh);
        assert_eq!(
            res.headers().get("x-session-id").and_then(|v| v.to_str().ok()),
            Some(id.as_str())
        );
    }

    #[tokio::test]
    async fn test_save_then_parse_round_trip() {
        let cache = MemoryCache::new();
        let first = header_session(&cache, None);
        let mut res = Response::new();
        first.parse(&Request::new(), &mut res).await.unwrap();

        first.set("flag", true);
        first.set("count", 7i64);
        first.set("small", 3u8);
        first.set("ratio", 0.5f64);
        first.set("name", "alice");
        first.set("blob", vec![1u8, 2, 3]);
        first
            .set_json("prefs", &serde_json::json!({"theme": "dark"}))
            .unwrap();
        first.save().await.unwrap();

        let second = header_session(&cache, None);
        let mut res = Response::new();
        second
            .parse(&request_with_header(&first.id()), &mut res)
            .await
            .unwrap();

        assert_eq!(second.phase(), SessionPhase::Loaded);
        assert_eq!(second.data(), first.data());
        assert_eq!(second.int64("count", 0), (7, true));
        assert_eq!(second.uint8("small", 0), (3, true));
        assert_eq!(second.bytes("blob", Vec::new()), (vec![1, 2, 3], true));
    }

    #[tokio::test]
    async fn test_regenerate_changes_id_and_clears_data() {
        let cache = MemoryCache::new();
        let session = header_session(&cache, None);
        let mut res = Response::new();
        session.parse(&Request::new(), &mut res).await.unwrap();
        session.set("user", "alice");
        session.save().await.unwrap();
        let old_id = session.id();

        session.regenerate(&mut res).await.unwrap();

        assert_ne!(session.id(), old_id);
        assert!(session.all().is_empty());
        assert_eq!(session.phase(), SessionPhase::Fresh);
        assert!(!cache.exists(&cache_key(&old_id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_destroy_clears_id_and_cache() {
        let cache = MemoryCache::new();
        let session = header_session(&cache, None);
        let mut res = Response::new();
        session.parse(&Request::new(), &mut res).await.unwrap();
        session.set("user", "alice");
        session.save().await.unwrap();
        let old_id = session.id();
        assert!(cache.exists(&cache_key(&old_id)).await.unwrap());

        let res = Response::new();
        session.destroy().await.unwrap();

        assert_eq!(session.id(), "");
        assert_eq!(session.phase(), SessionPhase::Destroyed);
        assert!(session.all().is_empty());
        assert!(!cache.exists(&cache_key(&old_id)).await.unwrap());

        // Save after destroy must not write the bare prefix key
        session.save().await.unwrap();
        assert!(!cache.exists(SESSION_KEY_PREFIX).await.unwrap());
        assert!(cache.is_empty());

        // Nothing goes back to the client
        assert!(res.headers().get("x-session-id").is_none());
        assert!(res.cookies().get("session").is_none());
        assert!(res.headers().get("set-cookie").is_none());
    }

    #[tokio::test]
    async fn test_destroy_sends_no_cookie() {
        let cache = MemoryCache::new();
        let session = cookie_session(&cache, CookieConfig::new());
        let mut res = Response::new();
        session.parse(&Request::new(), &mut res).await.unwrap();
        assert!(res.cookies().get("session").is_some());

        let res = Response::new();
        session.destroy().await.unwrap();
        session.save().await.unwrap();

        assert!(res.cookies().get("session").is_none());
        assert!(res.headers().get("x-session-id").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_unbounded_expiration_saves_without_expiry() {
        let cache = MemoryCache::new();
        let session = header_session(&cache, Some(Duration::MAX));
        let mut res = Response::new();
        session.parse(&Request::new(), &mut res).await.unwrap();

        session.set("k", 1i32);
        session.save().await.unwrap();

        let key = cache_key(&session.id());
        assert!(cache.exists(&key).await.unwrap());
        assert_eq!(cache.expires_at(&key), None);
    }

    #[tokio::test]
    async fn test_second_save_keeps_ttl() {
        let cache = MemoryCache::new();
        let session = header_session(&cache, Some(Duration::from_secs(120)));
        let mut res = Response::new();
        session.parse(&Request::new(), &mut res).await.unwrap();

        session.save().await.unwrap();
        let key = cache_key(&session.id());
        let first_expiry = cache.expires_at(&key).expect("entry has a ttl");

        session.save().await.unwrap();
        assert_eq!(cache.expires_at(&key), Some(first_expiry));
    }

    #[tokio::test]
    async fn test_default_expiration_is_24_hours() {
        let cache = MemoryCache::new();
        let session = header_session(&cache, None);
        assert_eq!(session.ttl(), DEFAULT_TTL);

        let mut res = Response::new();
        session.parse(&Request::new(), &mut res).await.unwrap();
        session.save().await.unwrap();

        let ttl = cache.ttl(&cache_key(&session.id())).expect("entry has a ttl");
        assert!(ttl <= DEFAULT_TTL);
        assert!(ttl > DEFAULT_TTL - Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_corrupt_entry_keeps_id_with_empty_store() {
        let cache = MemoryCache::new();
        cache
            .put(&cache_key("abc"), b"not json", DEFAULT_TTL)
            .await
            .unwrap();

        let session = header_session(&cache, None);
        let mut res = Response::new();
        session
            .parse(&request_with_header("abc"), &mut res)
            .await
            .unwrap();

        assert_eq!(session.id(), "abc");
        assert_eq!(session.phase(), SessionPhase::Fresh);
        assert!(session.all().is_empty());
    }

    #[tokio::test]
    async fn test_reparse_with_corrupt_entry_differs_by_transport() {
        let cache = MemoryCache::new();
        cache
            .put(&cache_key("abc"), b"{broken", DEFAULT_TTL)
            .await
            .unwrap();

        // Header transport clears the store before looking at the cache
        let session = header_session(&cache, None);
        session.set("leftover", 1i32);
        let mut res = Response::new();
        session
            .parse(&request_with_header("abc"), &mut res)
            .await
            .unwrap();
        assert!(!session.exists("leftover"));

        // Cookie transport leaves it alone
        let session = cookie_session(&cache, CookieConfig::new());
        session.set("leftover", 1i32);
        let mut res = Response::new();
        session
            .parse(&request_with_cookie("abc"), &mut res)
            .await
            .unwrap();
        assert!(session.exists("leftover"));
        assert_eq!(session.id(), "abc");
    }

    #[tokio::test]
    async fn test_save_reports_encode_failure() {
        let cache = MemoryCache::new();
        let session = header_session(&cache, None);
        let mut res = Response::new();
        session.parse(&Request::new(), &mut res).await.unwrap();
        session.set("bad", f32::NAN);

        assert!(matches!(
            session.save().await,
            Err(SessionError::SerializationError(_))
        ));
        assert!(!cache.exists(&cache_key(&session.id())).await.unwrap());
    }

    #[tokio::test]
    async fn test_injected_generator_is_used() {
        let counter = Arc::new(AtomicUsize::new(0));
        let ids = Arc::clone(&counter);
        let generator = move || format!("id-{}", ids.fetch_add(1, Ordering::SeqCst));

        let cache = MemoryCache::new();
        let session = Session::new(
            Arc::new(cache.clone()),
            Arc::new(HeaderTransport::new(HeaderConfig::new())),
            Arc::new(generator),
        );
        let mut res = Response::new();
        session.parse(&Request::new(), &mut res).await.unwrap();
        assert_eq!(session.id(), "id-0");

        session.regenerate(&mut res).await.unwrap();
        assert_eq!(session.id(), "id-1");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_value_operations() {
        let cache = MemoryCache::new();
        let session = header_session(&cache, None);

        assert_eq!(session.get("missing"), None);
        assert_eq!(session.int("missing", 4), (4, false));

        session.set("n", 10isize);
        assert_eq!(session.int("n", 0), (10, true));
        assert_eq!(session.int64("n", 0), (0, false));
        assert_eq!(session.get("n"), Some(Value::Int(10)));

        session.delete("n");
        session.delete("n");
        assert!(!session.exists("n"));
    }
}
