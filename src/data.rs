//! The per-session value store

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::SessionError;
use crate::value::{typed_accessors, FromValue, Value};

/// Flat key/value map persisted as one JSON object per session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueStore {
    entries: HashMap<String, Value>,
}

impl ValueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any previous value under `key`
    pub fn set<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.entries.insert(key.into(), value.into());
    }

    /// Store any serializable value as [`Value::Json`]
    pub fn set_json<K: Into<String>, T: Serialize>(
        &mut self,
        key: K,
        value: &T,
    ) -> Result<(), SessionError> {
        let json = serde_json::to_value(value)?;
        self.entries.insert(key.into(), Value::Json(json));
        Ok(())
    }

    /// Get a value, or None when the key is absent
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Check if a key exists
    pub fn exists(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove a value. Removing a missing key is a no-op.
    pub fn delete(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// All stored values
    pub fn all(&self) -> &HashMap<String, Value> {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the value under `key` if it was stored as exactly `T`
    ///
    /// Returns `(value, true)` on an exact match and `(fallback, false)` when
    /// the key is absent or holds a different type.
    pub fn typed<T: FromValue>(&self, key: &str, fallback: T) -> (T, bool) {
        match self.entries.get(key).and_then(T::from_value) {
            Some(v) => (v, true),
            None => (fallback, false),
        }
    }

    typed_accessors!();

    /// Encode the store as the JSON object kept in the cache
    pub fn to_json(&self) -> Result<Vec<u8>, SessionError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a store previously written by [`ValueStore::to_json`]
    pub fn from_json(bytes: &[u8]) -> Result<Self, SessionError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
