//! Persistence for session records.
//!
//! A [`Store`] is a plain key/value medium over serialized text.
//! [`SessionStorage`] layers the record format and the failure policy on
//! top: the medium is checked once, and when it is unusable every read comes
//! back empty and every write is skipped. Nothing here returns an error to
//! the session; failures are logged and swallowed.
//!
//! Instances sharing one medium and key are not coordinated. The last write
//! wins.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::record::SessionRecord;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Key written and removed by [`Store::check_access`]
const ACCESS_CHECK_KEY: &str = "__websession_access_check__";

pub trait Store: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<String>>;

    fn set(&self, name: &str, value: &str) -> Result<()>;

    fn remove(&self, name: &str) -> Result<()>;

    /// Whether the medium can currently store and delete a value
    fn check_access(&self) -> bool {
        self.set(ACCESS_CHECK_KEY, "1")
            .and_then(|_| self.remove(ACCESS_CHECK_KEY))
            .is_ok()
    }
}

/// Record-level access to a [`Store`] with a cached capability flag.
#[derive(Clone)]
pub struct SessionStorage {
    store: Arc<dyn Store>,
    supported: bool,
}

impl SessionStorage {
    /// Wrap a store, probing it once.
    pub fn new(store: Arc<dyn Store>) -> Self {
        let supported = store.check_access();
        if !supported {
            error!("Persistent storage is not supported; session data will not survive this page");
        }
        Self { store, supported }
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Read the record stored under `name`.
    ///
    /// Unsupported storage, a missing key, a failed read and an unparseable
    /// value all come back as `None`.
    pub fn load(&self, name: &str) -> Option<SessionRecord> {
        if !self.supported {
            return None;
        }

        let raw = match self.store.get(name) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read session record '{}': {}", name, e);
                return None;
            }
        };

        match serde_json::from_str::<SessionRecord>(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring malformed session record '{}': {}", name, e);
                None
            }
        }
    }

    /// Whether a readable record is stored under `name` right now
    pub fn exists(&self, name: &str) -> bool {
        self.load(name).is_some()
    }

    pub fn save(&self, name: &str, record: &SessionRecord) {
        if !self.supported {
            return;
        }

        let content = match serde_json::to_string(record) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to serialize session record '{}': {}", name, e);
                return;
            }
        };

        match self.store.set(name, &content) {
            Ok(()) => debug!("Saved session record '{}'", name),
            Err(e) => warn!("Failed to write session record '{}': {}", name, e),
        }
    }

    pub fn remove(&self, name: &str) {
        if !self.supported {
            return;
        }

        if let Err(e) = self.store.remove(name) {
            warn!("Failed to remove session record '{}': {}", name, e);
        }
    }
}

impl std::fmt::Debug for SessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStorage")
            .field("supported", &self.supported)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::Campaign;
    use crate::location::Location;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;

    fn sample_record() -> SessionRecord {
        let now = Utc
            .with_ymd_and_hms(1999, 12, 31, 23, 15, 0)
            .unwrap()
            .with_timezone(&Tz::UTC);
        SessionRecord::initial(
            &now,
            &Location::parse("/").unwrap(),
            Campaign::new(),
            "1999-12-31T23:45:00.000Z".to_string(),
        )
    }

    #[test]
    fn test_access_check_leaves_no_trace() {
        let store = Arc::new(MemoryStore::new());
        let storage = SessionStorage::new(store.clone());
        assert!(storage.is_supported());
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let storage = SessionStorage::new(Arc::new(MemoryStore::new()));
        assert!(storage.load("NEW").is_none());
        assert!(!storage.exists("NEW"));

        let record = sample_record();
        storage.save("NEW", &record);
        assert_eq!(storage.load("NEW"), Some(record));
        assert!(storage.exists("NEW"));

        storage.remove("NEW");
        assert!(storage.load("NEW").is_none());
    }

    #[test]
    fn test_unsupported_store() {
        let store = Arc::new(MemoryStore::unsupported());
        let storage = SessionStorage::new(store.clone());
        assert!(!storage.is_supported());

        storage.save("NEW", &sample_record());
        assert!(storage.load("NEW").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_malformed_record_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        store.set("NEW", "{not json").unwrap();

        let storage = SessionStorage::new(store);
        assert!(storage.load("NEW").is_none());
        assert!(!storage.exists("NEW"));
    }
}
