//! In-memory content store.
//!
//! Maps resource keys to raw byte payloads. One payload per key, last write
//! wins. Reads of absent keys yield empty bytes through [`ContentStore::get`]
//! and [`ContentStore::size`]; callers that must distinguish absence use
//! [`ContentStore::lookup`].

use crate::request::ResourceKey;
use std::collections::HashMap;

/// Mapping from [`ResourceKey`] to byte payload.
#[derive(Debug, Default)]
pub struct ContentStore {
    payloads: HashMap<ResourceKey, Vec<u8>>,
}

impl ContentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored payload for `key`, or empty bytes if absent. Never fails.
    pub fn get(&self, key: &ResourceKey) -> Vec<u8> {
        self.payloads.get(key).cloned().unwrap_or_default()
    }

    /// Presence-aware read, used to decide interception outcome.
    pub fn lookup(&self, key: &ResourceKey) -> Option<&[u8]> {
        self.payloads.get(key).map(|p| p.as_slice())
    }

    /// Store or overwrite the payload for `key`.
    pub fn set(&mut self, key: ResourceKey, payload: Vec<u8>) {
        self.payloads.insert(key, payload);
    }

    /// Byte length of the stored payload, 0 if absent.
    pub fn size(&self, key: &ResourceKey) -> usize {
        self.payloads.get(key).map(|p| p.len()).unwrap_or(0)
    }

    /// Number of distinct keys with a payload.
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Whether the store holds no payloads.
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}
