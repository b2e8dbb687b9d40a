//! Key-value persistence collaborator.
//!
//! # Responsibility
//! - Define the `load(key)` / `save(key, blob)` boundary used by the planner.
//! - Encode each store collection as an independent JSON blob.
//! - Provide in-memory and SQLite-backed implementations.
//!
//! # Invariants
//! - Loading never fails upward: absent or undecodable blobs fall back to
//!   the collection default and are logged.
//! - One collection maps to exactly one storage key.

mod codec;
mod sqlite;

pub use codec::{encode_collection, load_snapshot, save_collection};
pub use sqlite::SqliteKeyValueStore;

use crate::error::PersistenceError;
use crate::notify::Collection;
use std::collections::BTreeMap;

/// Storage key for one collection.
pub fn storage_key(collection: Collection) -> &'static str {
    match collection {
        Collection::Subjects => "subjects",
        Collection::Semesters => "semesters",
        Collection::Lectures => "lectures",
        Collection::Assignments => "assignments",
        Collection::Todos => "todos",
        Collection::Profile => "profileData",
        Collection::ActivityLog => "activityLog",
        Collection::Preferences => "darkMode",
        Collection::IdSequence => "idSequence",
    }
}

/// Raw picture key written by builds that stored it apart from the profile.
pub const LEGACY_PICTURE_KEY: &str = "profilePictureData";

/// Opaque blob storage keyed by string.
pub trait KeyValueStore {
    /// Returns `Ok(None)` when the key was never written.
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn save(&mut self, key: &str, blob: &str) -> Result<(), PersistenceError>;
}

/// Process-local backend, used by tests and ephemeral sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}
