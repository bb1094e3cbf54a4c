// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Generic keyed-value persistence contract.
//!
//! [`Store`] is the uniform abstraction every service (orgs, agents,
//! policies, budgets, usage reports) persists through — "put a value under a
//! key, get it back, list by prefix, delete, check existence". The
//! in-process implementation here is backed by an [`indexmap::IndexMap`] so
//! iteration order follows insertion order, matching the "stable iteration
//! order" requirement. File- and Postgres-backed implementations live in
//! `agentgov-storage`.

use std::sync::Mutex;

use indexmap::IndexMap;

use crate::error::{GovernorError, Result};

/// A keyed collection of values of type `T`.
///
/// Implementations must be safe under concurrent access from multiple
/// threads — no caller-visible synchronization is required.
pub trait Store<T>: Send + Sync
where
    T: Clone + Send + Sync,
{
    fn put(&self, key: &str, value: T) -> Result<()>;
    fn get(&self, key: &str) -> Result<Option<T>>;
    /// Ordered (insertion order) list of values whose key starts with
    /// `prefix`. `prefix = ""` lists everything.
    fn list(&self, prefix: &str) -> Result<Vec<T>>;
    fn delete(&self, key: &str) -> Result<bool>;
    fn exists(&self, key: &str) -> Result<bool>;
}

/// In-process `Store` guarded by a single mutex.
pub struct InMemoryStore<T> {
    data: Mutex<IndexMap<String, T>>,
}

impl<T> InMemoryStore<T> {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(IndexMap::new()),
        }
    }
}

impl<T> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Store<T> for InMemoryStore<T>
where
    T: Clone + Send + Sync,
{
    fn put(&self, key: &str, value: T) -> Result<()> {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| GovernorError::StoreWrite("store lock poisoned".into()))?;
        guard.insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<T>> {
        let guard = self
            .data
            .lock()
            .map_err(|_| GovernorError::StoreRead("store lock poisoned".into()))?;
        Ok(guard.get(key).cloned())
    }

    fn list(&self, prefix: &str) -> Result<Vec<T>> {
        let guard = self
            .data
            .lock()
            .map_err(|_| GovernorError::StoreRead("store lock poisoned".into()))?;
        Ok(guard
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| GovernorError::StoreWrite("store lock poisoned".into()))?;
        Ok(guard.shift_remove(key).is_some())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        let guard = self
            .data
            .lock()
            .map_err(|_| GovernorError::StoreRead("store lock poisoned".into()))?;
        Ok(guard.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_roundtrip() {
        let store: InMemoryStore<String> = InMemoryStore::new();
        store.put("o1:org", "hello".to_string()).unwrap();
        assert_eq!(store.get("o1:org").unwrap(), Some("hello".to_string()));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn list_by_prefix_preserves_insertion_order() {
        let store: InMemoryStore<i32> = InMemoryStore::new();
        store.put("o1:agent:a", 1).unwrap();
        store.put("o1:agent:b", 2).unwrap();
        store.put("o2:agent:c", 3).unwrap();
        assert_eq!(store.list("o1:").unwrap(), vec![1, 2]);
        assert_eq!(store.list("").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn delete_and_exists() {
        let store: InMemoryStore<i32> = InMemoryStore::new();
        store.put("k", 1).unwrap();
        assert!(store.exists("k").unwrap());
        assert!(store.delete("k").unwrap());
        assert!(!store.exists("k").unwrap());
        assert!(!store.delete("k").unwrap());
    }
}