//! The storage area abstraction.
//!
//! A browser exposes two key/value areas: a short-lived one that dies with
//! the tab and a persistent one that survives restarts. The session layer
//! doesn't care where the bytes end up, only that it can list, read, write
//! and remove string keys. [`StorageArea`] is that contract.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::StorageError;

/// A string key/value store.
///
/// `Send + Sync` because the same areas are shared between the HTTP
/// client's interceptor, the idle monitor's logout and the runtime.
pub trait StorageArea: Send + Sync {
    /// Every key currently stored.
    fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// The value under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Returns `true` if it was present.
    ///
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

/// An in-memory [`StorageArea`], used as the short-lived area.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageArea for MemoryStorage {
    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.lock().keys().cloned().collect())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.lock().remove(key).is_some())
    }
}
