//! Data providers and the external fixture source.
//!
//! A [`DataProvider`] bridges external fixture storage and a [`ContentStore`].
//! There is one concrete provider type, parameterized by [`ProviderRole`] and
//! a `writable` flag; the response-side store is non-writable by default since
//! response fixtures are registered once from disk and never mutated at
//! runtime.

use crate::request::ResourceKey;
use crate::store::ContentStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Which side of the exchange a provider serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderRole {
    /// Canned request bodies (diagnostic/echo use)
    Request,
    /// Canned response bodies (the interception payload source)
    Response,
}

impl ProviderRole {
    /// Short label for log output.
    pub fn label(&self) -> &'static str {
        match self {
            ProviderRole::Request => "request",
            ProviderRole::Response => "response",
        }
    }
}

/// Read-only byte-content resolver for fixtures.
///
/// `read` resolves a locator to bytes or an I/O error; `list` enumerates the
/// locators under a named logical bucket (e.g. "Requests", "Responses").
pub trait FixtureSource: Send + Sync {
    /// Resolve a locator to its byte content.
    fn read(&self, locator: &str) -> io::Result<Vec<u8>>;

    /// Enumerate the locators in a bucket.
    fn list(&self, bucket: &str) -> io::Result<Vec<String>>;
}

/// Filesystem-backed fixture source.
///
/// Locators are file paths; buckets are subdirectories of the root. Listing
/// is sorted so registration order is deterministic.
#[derive(Debug, Clone)]
pub struct DirFixtureSource {
    root: PathBuf,
}

impl DirFixtureSource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FixtureSource for DirFixtureSource {
    fn read(&self, locator: &str) -> io::Result<Vec<u8>> {
        fs::read(locator)
    }

    fn list(&self, bucket: &str) -> io::Result<Vec<String>> {
        let dir = self.root.join(bucket);
        let mut locators = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                locators.push(entry.path().to_string_lossy().into_owned());
            }
        }
        locators.sort();
        Ok(locators)
    }
}

/// Role-specific owner of a content store plus fixture-loading logic.
#[derive(Debug)]
pub struct DataProvider {
    role: ProviderRole,
    writable: bool,
    store: ContentStore,
}

impl DataProvider {
    /// Create a provider for `role`. `writable` gates runtime
    /// [`set_content`](Self::set_content); registration always writes.
    pub fn new(role: ProviderRole, writable: bool) -> Self {
        Self {
            role,
            writable,
            store: ContentStore::new(),
        }
    }

    /// The role this provider serves.
    pub fn role(&self) -> ProviderRole {
        self.role
    }

    /// Whether runtime writes are honored.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Resolve `locator` via `source` and register the bytes under `key`.
    ///
    /// Best-effort: an unreadable fixture logs a warning and leaves the store
    /// untouched. A missing fixture must never crash interception; the key
    /// simply stays unresolved.
    pub fn register_resource(
        &mut self,
        source: &dyn FixtureSource,
        locator: &str,
        key: &ResourceKey,
    ) {
        match source.read(locator) {
            Ok(payload) => {
                debug!(
                    role = self.role.label(),
                    locator,
                    key = %key,
                    bytes = payload.len(),
                    "Registered fixture"
                );
                self.register_payload(key.clone(), payload);
            }
            Err(err) => {
                warn!(
                    role = self.role.label(),
                    locator,
                    key = %key,
                    error = %err,
                    "Fixture unreadable, skipping registration"
                );
            }
        }
    }

    /// Register `payload` directly under `key`.
    ///
    /// Registration always writes, regardless of the `writable` flag; the
    /// flag gates runtime mutation only.
    pub fn register_payload(&mut self, key: ResourceKey, payload: Vec<u8>) {
        self.store.set(key, payload);
    }

    /// Stored payload for `key`, empty bytes if absent.
    pub fn get_content(&self, key: &ResourceKey) -> Vec<u8> {
        self.store.get(key)
    }

    /// Presence-aware read of the payload for `key`.
    pub fn lookup(&self, key: &ResourceKey) -> Option<Vec<u8>> {
        self.store.lookup(key).map(|p| p.to_vec())
    }

    /// Byte length of the payload for `key`, 0 if absent.
    pub fn content_size(&self, key: &ResourceKey) -> usize {
        self.store.size(key)
    }

    /// Store `payload` under `key` if this provider is writable; logged no-op
    /// otherwise.
    pub fn set_content(&mut self, key: ResourceKey, payload: Vec<u8>) {
        if !self.writable {
            debug!(
                role = self.role.label(),
                key = %key,
                "Store is not writable, discarding set_content"
            );
            return;
        }
        self.store.set(key, payload);
    }
}
