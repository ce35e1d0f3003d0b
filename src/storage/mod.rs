//! Persistent key/value state
//!
//! The authorization handshake spans two separate invocations (begin the
//! login, then handle the callback), so its ephemeral values and the
//! resulting credential live in a [`PersistentStore`]. The store is always
//! injected; nothing in the crate reaches for a global.
//!
//! - [`MemoryStore`] -- process-local, for tests
//! - [`SledStore`]   -- embedded `sled` database used by the CLI

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{OsmSubmitError, Result};

pub mod sled_store;

pub use sled_store::SledStore;

/// Key/value capability that survives between invocations.
///
/// Implementations must treat `delete` of an absent key as a no-op.
pub trait PersistentStore: Send + Sync {
    /// Returns the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`
    fn delete(&self, key: &str) -> Result<()>;
}

/// In-memory [`PersistentStore`]
///
/// # Examples
///
/// ```
/// use osm_submit::storage::{MemoryStore, PersistentStore};
///
/// let store = MemoryStore::new();
/// store.set("k", "v").unwrap();
/// assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
/// store.delete("k").unwrap();
/// assert!(store.get("k").unwrap().is_none());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    /// True when no keys are held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> OsmSubmitError {
    OsmSubmitError::Storage("memory store lock poisoned".to_string())
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_overwrites() {
        let store = MemoryStore::new();
        store.set("token", "a").unwrap();
        store.set("token", "b").unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("b"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_store_get_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("missing").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_store_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.delete("never_set").unwrap();
        store.set("k", "v").unwrap();
        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }
}
