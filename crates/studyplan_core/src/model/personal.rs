//! To-do, profile and activity records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub type TodoId = u64;
pub type ActivityId = u64;

/// Picture reference used until the user uploads one.
pub const DEFAULT_PICTURE_REF: &str = "https://via.placeholder.com/150";

/// Placeholder for to-dos saved without an id; the store replaces it on load.
pub const UNASSIGNED_TODO_ID: TodoId = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawTodo")]
pub struct Todo {
    pub id: TodoId,
    pub text: String,
    pub completed: bool,
}

/// Older builds kept to-dos as bare `{text, completed}` pairs.
#[derive(Deserialize)]
struct RawTodo {
    #[serde(default)]
    id: Option<TodoId>,
    text: String,
    #[serde(default)]
    completed: bool,
}

impl From<RawTodo> for Todo {
    fn from(value: RawTodo) -> Self {
        Self {
            id: value.id.unwrap_or(UNASSIGNED_TODO_ID),
            text: value.text,
            completed: value.completed,
        }
    }
}

/// Singleton student profile. Missing fields decode as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub student_id: String,
    pub major: String,
    pub year: String,
    pub picture_ref: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            email: String::new(),
            phone: String::new(),
            student_id: String::new(),
            major: String::new(),
            year: String::new(),
            picture_ref: DEFAULT_PICTURE_REF.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub id: ActivityId,
    pub message: String,
    pub timestamp: NaiveDateTime,
}
