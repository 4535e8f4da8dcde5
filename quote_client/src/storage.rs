//! Durable key-value storage behind the quote store.
//!
//! Values are JSON-serialized strings keyed by well-known names. Two backends
//! are provided:
//!
//! - `MemoryStorage`: a `HashMap`, used by tests and `--ephemeral` runs.
//! - `JsonFileStorage`: a single JSON object on disk. The whole object is
//!   rewritten through a temporary file followed by a rename on every mutation,
//!   so a crash mid-write leaves the previous state intact.
use log::debug;
use quote_common::{QuoteError, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Key holding the serialized quote sequence.
pub const QUOTES_KEY: &str = "quotes";
/// Key holding the category the user last filtered by.
pub const SELECTED_CATEGORY_KEY: &str = "selectedCategory";
/// Key holding the sync cursor.
pub const LAST_SYNC_KEY: &str = "lastSyncTimestamp";

/// String key-value store.
pub trait KeyValueStore: Send {
    /// Value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    /// Deletes `key`; a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Volatile storage.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Storage persisted as one JSON object file.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStorage {
    /// Opens `path`, treating a missing file as empty storage.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                QuoteError::Storage(format!("{} is not a storage file: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(QuoteError::Io(e)),
        };
        debug!("Opened storage {} ({} keys)", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, serde_json::to_vec_pretty(&self.entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::model::store::QuoteStore;
    use quote_common::Quote;
    use std::sync::{Arc, Mutex};

    /// Memory storage that tests can inspect after handing a clone to a store.
    #[derive(Clone, Default)]
    pub(crate) struct SharedStorage {
        inner: Arc<Mutex<MemoryStorage>>,
        pub(crate) fail_writes: Arc<Mutex<bool>>,
    }

    impl SharedStorage {
        /// Seeds this storage with `quotes` and `cursor`, then opens a store on it.
        pub(crate) fn open_store(&self, quotes: &[Quote], cursor: i64) -> QuoteStore {
            let mut seed = self.clone();
            seed.set(QUOTES_KEY, &serde_json::to_string(quotes).unwrap())
                .unwrap();
            seed.set(LAST_SYNC_KEY, &cursor.to_string()).unwrap();
            QuoteStore::open(Box::new(self.clone())).unwrap()
        }

        pub(crate) fn stored_quotes(&self) -> Vec<Quote> {
            let json = self.get(QUOTES_KEY).unwrap().unwrap();
            serde_json::from_str(&json).unwrap()
        }
    }

    impl KeyValueStore for SharedStorage {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.lock()?.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            if *self.fail_writes.lock()? {
                return Err(QuoteError::Storage("disk full".to_string()));
            }
            self.inner.lock()?.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<()> {
            self.inner.lock()?.remove(key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_set_get_remove() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.get(QUOTES_KEY).unwrap(), None);
        storage.set(QUOTES_KEY, "[]").unwrap();
        assert_eq!(storage.get(QUOTES_KEY).unwrap().as_deref(), Some("[]"));
        storage.remove(QUOTES_KEY).unwrap();
        storage.remove(QUOTES_KEY).unwrap();
        assert_eq!(storage.get(QUOTES_KEY).unwrap(), None);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut storage = JsonFileStorage::open(&path).unwrap();
        storage.set(SELECTED_CATEGORY_KEY, "Life").unwrap();
        storage.set(LAST_SYNC_KEY, "1700000000000").unwrap();
        storage.remove(LAST_SYNC_KEY).unwrap();
        drop(storage);

        let reopened = JsonFileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get(SELECTED_CATEGORY_KEY).unwrap().as_deref(),
            Some("Life")
        );
        assert_eq!(reopened.get(LAST_SYNC_KEY).unwrap(), None);
        assert!(!dir.path().join("store.json.tmp").exists());
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(storage.get(QUOTES_KEY).unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "[1, 2, 3]").unwrap();
        let err = JsonFileStorage::open(file.path()).unwrap_err();
        assert!(matches!(err, QuoteError::Storage(_)));
    }
}
