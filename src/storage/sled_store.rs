//! `sled`-backed persistent store

use std::path::Path;

use sled::Db;

use crate::error::{OsmSubmitError, Result};
use crate::storage::PersistentStore;

/// Persistent store backed by an embedded `sled` database
///
/// Every write is flushed before returning so the value is durable when the
/// process exits straight after (the CLI runs one command per process).
pub struct SledStore {
    db: Db,
}

impl SledStore {
    /// Open or create a store at `path`
    ///
    /// # Errors
    ///
    /// Returns `OsmSubmitError::Storage` if the database cannot be opened,
    /// including when another process already holds it.
    ///
    /// # Examples
    ///
    /// ```
    /// use osm_submit::storage::{PersistentStore, SledStore};
    ///
    /// # fn main() -> osm_submit::error::Result<()> {
    /// let dir = tempfile::TempDir::new()?;
    /// let store = SledStore::open(dir.path().join("state"))?;
    /// store.set("oauth_state", "abc")?;
    /// assert_eq!(store.get("oauth_state")?.as_deref(), Some("abc"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    OsmSubmitError::Storage(format!("Failed to create state directory: {}", e))
                })?;
            }
        }
        let db = sled::open(path)
            .map_err(|e| OsmSubmitError::Storage(format!("Failed to open database: {}", e)))?;
        tracing::debug!(path = %path.display(), "Opened persistent store");
        Ok(Self { db })
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| OsmSubmitError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

impl PersistentStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| OsmSubmitError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let value = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    OsmSubmitError::Storage(format!("Stored value is not UTF-8: {}", e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| OsmSubmitError::Storage(format!("Insert failed: {}", e)))?;
        self.flush()
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| OsmSubmitError::Storage(format!("Remove failed: {}", e)))?;
        self.flush()
    }
}
