//! SQLite-backed blob store over the `planner_blobs` table.
//!
//! # Invariants
//! - `save` is an upsert; the last write for a key wins.
//! - Connections are migrated before the first read.

use super::KeyValueStore;
use crate::db::{open_db, open_db_in_memory};
use crate::error::PersistenceError;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SELECT_BLOB_SQL: &str = "SELECT blob FROM planner_blobs WHERE key = ?1";
const UPSERT_BLOB_SQL: &str = "INSERT INTO planner_blobs (key, blob, updated_at)
VALUES (?1, ?2, CAST(strftime('%s','now') AS INTEGER) * 1000)
ON CONFLICT(key) DO UPDATE SET
    blob = excluded.blob,
    updated_at = excluded.updated_at";

pub struct SqliteKeyValueStore {
    conn: Connection,
}

impl SqliteKeyValueStore {
    /// Opens the database file at `path`, creating and migrating it as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let blob = self
            .conn
            .query_row(SELECT_BLOB_SQL, params![key], |row| row.get::<_, String>(0))
            .optional()?;
        debug!(
            "event=blob_load module=persist status=ok key={key} present={}",
            blob.is_some()
        );
        Ok(blob)
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), PersistenceError> {
        self.conn.execute(UPSERT_BLOB_SQL, params![key, blob])?;
        debug!(
            "event=blob_save module=persist status=ok key={key} bytes={}",
            blob.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteKeyValueStore;
    use crate::persist::KeyValueStore;

    #[test]
    fn upsert_replaces_existing_blob() {
        let mut store = SqliteKeyValueStore::open_in_memory().expect("in-memory db should open");
        store.save("subjects", r#"["Math"]"#).unwrap();
        store.save("subjects", r#"["Math","Physics"]"#).unwrap();
        assert_eq!(
            store.load("subjects").unwrap().as_deref(),
            Some(r#"["Math","Physics"]"#)
        );
        let rows: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM planner_blobs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn missing_key_loads_none() {
        let store = SqliteKeyValueStore::open_in_memory().unwrap();
        assert_eq!(store.load("todos").unwrap(), None);
    }
}
