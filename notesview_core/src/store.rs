// Key-value persistence port for the practice profile.
//
// The session never touches files or globals directly; it is handed a
// `Store` and reads/writes JSON values under a handful of fixed keys (see
// `profile.rs`). Two implementations ship:
// - `MemoryStore`: a `BTreeMap` in memory. Used by tests and by the CLI's
//   `--ephemeral` mode.
// - `JsonFileStore`: one `<key>.json` file per key inside a directory.
//   Writes go to a temporary sibling first and are renamed into place so a
//   crash mid-write leaves the previous value intact.
//
// There is no cross-process locking; two writers on the same directory are
// last-write-wins.

use crate::error::StoreError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Storage collaborator. `get` returns `Ok(None)` for a missing key.
pub trait Store {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
    /// Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Directory of JSON files, one per key.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        if dir.exists() && !dir.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "{} exists and is not a directory",
                dir.display()
            )));
        }
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::Unavailable(format!("invalid store key {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl Store for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key)?;
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    key: key.to_string(),
                    source,
                });
            }
        };
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|source| StoreError::Serialize {
                key: key.to_string(),
                source,
            })
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let data = serde_json::to_string_pretty(&value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        std::fs::write(&tmp, data).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn exercise(store: &mut dyn Store) {
        assert!(store.get("notesview_high_scores").unwrap().is_none());
        store.set("notesview_high_scores", json!({"beginner": 420})).unwrap();
        assert_eq!(
            store.get("notesview_high_scores").unwrap(),
            Some(json!({"beginner": 420}))
        );
        store.set("notesview_high_scores", json!({"beginner": 500})).unwrap();
        assert_eq!(
            store.get("notesview_high_scores").unwrap(),
            Some(json!({"beginner": 500}))
        );
        store.remove("notesview_high_scores").unwrap();
        assert!(store.get("notesview_high_scores").unwrap().is_none());
        // Second remove is a no-op.
        store.remove("notesview_high_scores").unwrap();
    }

    #[test]
    fn memory_store_get_set_remove() {
        let mut store = MemoryStore::new();
        exercise(&mut store);
        assert!(store.is_empty());
    }

    #[test]
    fn file_store_get_set_remove() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("profile")).unwrap();
        exercise(&mut store);
    }

    #[test]
    fn file_store_writes_one_file_per_key() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::open(dir.path()).unwrap();
        store.set("notesview_user_stats", json!({"totalGames": 3})).unwrap();
        let path = dir.path().join("notesview_user_stats.json");
        assert!(path.is_file());
        assert!(!dir.path().join("notesview_user_stats.json.tmp").exists());

        // A second handle on the same directory sees the value.
        let reopened = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(
            reopened.get("notesview_user_stats").unwrap(),
            Some(json!({"totalGames": 3}))
        );
    }

    #[test]
    fn file_store_reports_corrupt_json() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("notesview_memory_curve.json"),
            "{not json",
        )
        .unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.get("notesview_memory_curve"),
            Err(StoreError::Serialize { .. })
        ));
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.set("../escape", json!(1)),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn file_store_refuses_file_as_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(
            JsonFileStore::open(&file),
            Err(StoreError::Unavailable(_))
        ));
    }
}
