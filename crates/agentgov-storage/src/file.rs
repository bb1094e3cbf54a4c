// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! File-based JSON storage backend.
//!
//! Grounded on the teacher's `aumos-governance-std/src/storage/file.rs`
//! atomic write-rename pattern, generalized from one fixed-schema snapshot
//! to a generic [`Store<T>`] over any serde-serializable `T`: one JSON file
//! holds the whole logical store (an `IndexMap`-shaped `key -> value` map,
//! serialized in insertion order), and every mutation flushes the file
//! atomically so a crash mid-write never corrupts existing data.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use agentgov_core::error::{GovernorError, Result};
use agentgov_core::store::Store;

/// A file-backed [`Store`] implementation that persists its entire contents
/// as a single pretty-printed JSON object.
///
/// # Caveats
///
/// Holds the full in-memory state and flushes on every mutation — not
/// intended for high-frequency write workloads, and concurrent access from
/// multiple *processes* is not supported (spec §1's non-goal: no claim about
/// cross-node consistency).
pub struct FileStorage<T> {
    path: PathBuf,
    data: Mutex<IndexMap<String, T>>,
}

impl<T> FileStorage<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned,
{
    /// Open an existing JSON file, or start empty if the path does not
    /// exist yet — the file is created on the first mutation.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| GovernorError::StoreRead(format!("{}: {}", path.display(), e)))?;
            serde_json::from_str(&raw)
                .map_err(|e| GovernorError::StoreRead(format!("malformed JSON in {}: {}", path.display(), e)))?
        } else {
            IndexMap::new()
        };
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Flush the current in-memory state to disk using an atomic
    /// write-rename: write to `<path>.tmp` then rename over the target.
    fn flush(&self, guard: &IndexMap<String, T>) -> Result<()> {
        let json = serde_json::to_string_pretty(guard)
            .map_err(|e| GovernorError::StoreWrite(format!("serialization failed: {}", e)))?;
        let tmp_path = self.path.with_extension("tmp");
        write_and_rename(&tmp_path, &self.path, &json)
            .map_err(|e| GovernorError::StoreWrite(format!("{}: {}", self.path.display(), e)))
    }
}

fn write_and_rename(tmp_path: &Path, final_path: &Path, contents: &str) -> io::Result<()> {
    fs::write(tmp_path, contents)?;
    fs::rename(tmp_path, final_path)
}

impl<T> Store<T> for FileStorage<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned,
{
    fn put(&self, key: &str, value: T) -> Result<()> {
        let mut guard = self.data.lock().map_err(|_| GovernorError::StoreWrite("file store lock poisoned".into()))?;
        guard.insert(key.to_string(), value);
        self.flush(&guard)
    }

    fn get(&self, key: &str) -> Result<Option<T>> {
        let guard = self.data.lock().map_err(|_| GovernorError::StoreRead("file store lock poisoned".into()))?;
        Ok(guard.get(key).cloned())
    }

    fn list(&self, prefix: &str) -> Result<Vec<T>> {
        let guard = self.data.lock().map_err(|_| GovernorError::StoreRead("file store lock poisoned".into()))?;
        Ok(guard.iter().filter(|(k, _)| k.starts_with(prefix)).map(|(_, v)| v.clone()).collect())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut guard = self.data.lock().map_err(|_| GovernorError::StoreWrite("file store lock poisoned".into()))?;
        let removed = guard.shift_remove(key).is_some();
        if removed {
            self.flush(&guard)?;
        }
        Ok(removed)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        let guard = self.data.lock().map_err(|_| GovernorError::StoreRead("file store lock poisoned".into()))?;
        Ok(guard.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        name: String,
        count: u32,
    }

    #[test]
    fn put_get_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widgets.json");

        {
            let store: FileStorage<Widget> = FileStorage::open(&path).unwrap();
            store
                .put("w1", Widget { name: "bolt".into(), count: 3 })
                .unwrap();
        }

        let reopened: FileStorage<Widget> = FileStorage::open(&path).unwrap();
        let widget = reopened.get("w1").unwrap().unwrap();
        assert_eq!(widget, Widget { name: "bolt".into(), count: 3 });
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist-yet.json");
        let store: FileStorage<Widget> = FileStorage::open(&path).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn delete_then_list_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widgets.json");
        let store: FileStorage<Widget> = FileStorage::open(&path).unwrap();
        store.put("o1:a", Widget { name: "a".into(), count: 1 }).unwrap();
        store.put("o1:b", Widget { name: "b".into(), count: 2 }).unwrap();
        store.put("o2:c", Widget { name: "c".into(), count: 3 }).unwrap();
        assert_eq!(store.list("o1:").unwrap().len(), 2);
        assert!(store.delete("o1:a").unwrap());
        assert_eq!(store.list("o1:").unwrap().len(), 1);
        assert!(!store.delete("o1:a").unwrap());
    }
}