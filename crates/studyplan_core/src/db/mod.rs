//! SQLite file backing the planner's blob store.
//!
//! # Responsibility
//! - Hand out connections whose `planner_blobs` table is ready for use.
//! - Refuse databases written by a newer build instead of guessing.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - A migration either applies completely or leaves the version unchanged.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening or upgrading the planner database.
#[derive(Debug)]
pub enum DbError {
    /// Driver-level failure outside a migration step.
    Sqlite(rusqlite::Error),
    /// File carries a schema this build does not know how to read.
    SchemaFromNewerBuild { found: u32, supported: u32 },
    /// Migration script `version` failed; nothing from it was kept.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::SchemaFromNewerBuild { found, supported } => write!(
                f,
                "planner database uses schema v{found}; this build reads up to v{supported}"
            ),
            Self::Migration { version, source } => {
                write!(f, "planner schema migration v{version} failed: {source}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaFromNewerBuild { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
