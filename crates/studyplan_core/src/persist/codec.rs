//! JSON encoding of store collections into per-key blobs.

use super::{storage_key, KeyValueStore, LEGACY_PICTURE_KEY};
use crate::error::PersistenceError;
use crate::model::{Profile, DEFAULT_PICTURE_REF};
use crate::notify::Collection;
use crate::store::ids::IdSequence;
use crate::store::{PlannerStore, StoreSnapshot};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

const DARK_MODE_ENABLED: &str = "enabled";
const DARK_MODE_DISABLED: &str = "disabled";

/// Loads every collection, substituting defaults for absent or bad blobs.
pub fn load_snapshot<B: KeyValueStore>(backend: &B) -> StoreSnapshot {
    let mut profile: Profile = load_value(backend, Collection::Profile).unwrap_or_default();
    if profile.picture_ref.is_empty() || profile.picture_ref == DEFAULT_PICTURE_REF {
        if let Some(picture) = load_raw(backend, LEGACY_PICTURE_KEY).filter(|p| !p.is_empty()) {
            profile.picture_ref = picture;
        } else if profile.picture_ref.is_empty() {
            profile.picture_ref = DEFAULT_PICTURE_REF.to_string();
        }
    }

    StoreSnapshot {
        subjects: load_value(backend, Collection::Subjects).unwrap_or_default(),
        semesters: load_value(backend, Collection::Semesters).unwrap_or_default(),
        lectures: load_value(backend, Collection::Lectures).unwrap_or_default(),
        assignments: load_value(backend, Collection::Assignments).unwrap_or_default(),
        todos: load_value(backend, Collection::Todos).unwrap_or_default(),
        profile,
        activity: load_value(backend, Collection::ActivityLog).unwrap_or_default(),
        dark_mode: load_raw(backend, storage_key(Collection::Preferences))
            .map(|value| decode_dark_mode(&value))
            .unwrap_or(false),
        ids: load_value::<IdSequence, _>(backend, Collection::IdSequence),
    }
}

/// Serializes the current value of one collection.
pub fn encode_collection(
    store: &PlannerStore,
    collection: Collection,
) -> Result<String, PersistenceError> {
    match collection {
        Collection::Subjects => encode(collection, store.subjects()),
        Collection::Semesters => encode(collection, store.semesters()),
        Collection::Lectures => encode(collection, store.lectures()),
        Collection::Assignments => encode(collection, store.assignments()),
        Collection::Todos => encode(collection, store.todos()),
        Collection::Profile => encode(collection, store.profile()),
        Collection::ActivityLog => encode(collection, &store.activity().collect::<Vec<_>>()),
        Collection::Preferences => Ok(if store.dark_mode() {
            DARK_MODE_ENABLED.to_string()
        } else {
            DARK_MODE_DISABLED.to_string()
        }),
        Collection::IdSequence => encode(collection, store.ids()),
    }
}

/// Writes one collection through to `backend`.
pub fn save_collection<B: KeyValueStore>(
    backend: &mut B,
    store: &PlannerStore,
    collection: Collection,
) -> Result<(), PersistenceError> {
    let blob = encode_collection(store, collection)?;
    backend.save(storage_key(collection), &blob)
}

fn encode<T: Serialize + ?Sized>(
    collection: Collection,
    value: &T,
) -> Result<String, PersistenceError> {
    serde_json::to_string(value).map_err(|err| PersistenceError::Serialize {
        key: storage_key(collection),
        message: err.to_string(),
    })
}

fn load_value<T: DeserializeOwned, B: KeyValueStore>(
    backend: &B,
    collection: Collection,
) -> Option<T> {
    let key = storage_key(collection);
    let blob = load_raw(backend, key)?;
    match serde_json::from_str(&blob) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                "event=blob_load module=persist status=fallback key={key} reason=decode_failed line={} column={}",
                err.line(),
                err.column()
            );
            None
        }
    }
}

fn load_raw<B: KeyValueStore>(backend: &B, key: &str) -> Option<String> {
    match backend.load(key) {
        Ok(blob) => blob,
        Err(err) => {
            warn!("event=blob_load module=persist status=fallback key={key} reason=backend error={err}");
            None
        }
    }
}

fn decode_dark_mode(value: &str) -> bool {
    matches!(value.trim(), DARK_MODE_ENABLED | "true")
}

#[cfg(test)]
mod tests {
    use super::{encode_collection, load_snapshot};
    use crate::model::DEFAULT_PICTURE_REF;
    use crate::notify::Collection;
    use crate::persist::{KeyValueStore, MemoryKeyValueStore};
    use crate::store::PlannerStore;

    #[test]
    fn empty_backend_loads_defaults() {
        let snapshot = load_snapshot(&MemoryKeyValueStore::new());
        assert!(snapshot.subjects.is_empty());
        assert!(snapshot.ids.is_none());
        assert!(!snapshot.dark_mode);
        assert_eq!(snapshot.profile.picture_ref, DEFAULT_PICTURE_REF);
    }

    #[test]
    fn corrupt_blob_falls_back_per_key() {
        let mut backend = MemoryKeyValueStore::new();
        backend.save("subjects", "{not json").unwrap();
        backend.save("todos", r#"[{"id":1,"text":"read","completed":true}]"#).unwrap();
        let snapshot = load_snapshot(&backend);
        assert!(snapshot.subjects.is_empty());
        assert_eq!(snapshot.todos.len(), 1);
    }

    #[test]
    fn dark_mode_uses_enabled_disabled_text() {
        let mut store = PlannerStore::default();
        store.set_dark_mode(true);
        assert_eq!(
            encode_collection(&store, Collection::Preferences).unwrap(),
            "enabled"
        );
    }

    #[test]
    fn legacy_picture_key_fills_default_picture() {
        let mut backend = MemoryKeyValueStore::new();
        backend.save("profileData", r#"{"fullName":"Ada"}"#).unwrap();
        backend
            .save("profilePictureData", "data:image/png;base64,AAAA")
            .unwrap();
        let snapshot = load_snapshot(&backend);
        assert_eq!(snapshot.profile.full_name, "Ada");
        assert_eq!(snapshot.profile.picture_ref, "data:image/png;base64,AAAA");
    }
}
