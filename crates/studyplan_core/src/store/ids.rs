//! Monotonic identifier issuance.
//!
//! # Invariants
//! - Issued ids start at 1 and strictly increase per entity family.
//! - An id is never issued twice, even after the entity is deleted.
//! - `raise_to_cover` only ever moves counters forward.
//! - A counter at `u64::MAX` is exhausted and issues nothing further.

use serde::{Deserialize, Serialize};

/// Next-id counters for every identified entity family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdSequence {
    next_semester: u64,
    next_lecture: u64,
    next_assignment: u64,
    next_todo: u64,
    next_activity: u64,
}

impl Default for IdSequence {
    fn default() -> Self {
        Self {
            next_semester: 1,
            next_lecture: 1,
            next_assignment: 1,
            next_todo: 1,
            next_activity: 1,
        }
    }
}

/// Entity family that owns a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Semester,
    Lecture,
    Assignment,
    Todo,
    Activity,
}

impl IdKind {
    pub const ALL: [IdKind; 5] = [
        Self::Semester,
        Self::Lecture,
        Self::Assignment,
        Self::Todo,
        Self::Activity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Semester => "semester",
            Self::Lecture => "lecture",
            Self::Assignment => "assignment",
            Self::Todo => "todo",
            Self::Activity => "activity",
        }
    }
}

impl IdSequence {
    /// Hands out the next id, or `None` once the family is exhausted.
    pub fn issue(&mut self, kind: IdKind) -> Option<u64> {
        let counter = self.counter_mut(kind);
        let id = *counter;
        *counter = id.checked_add(1)?;
        Some(id)
    }

    pub fn is_exhausted(&self, kind: IdKind) -> bool {
        self.peek(kind) == u64::MAX
    }

    pub fn peek(&self, kind: IdKind) -> u64 {
        match kind {
            IdKind::Semester => self.next_semester,
            IdKind::Lecture => self.next_lecture,
            IdKind::Assignment => self.next_assignment,
            IdKind::Todo => self.next_todo,
            IdKind::Activity => self.next_activity,
        }
    }

    /// Moves the counter past `max_existing` when it lags behind.
    ///
    /// Used after loading persisted collections whose counters were lost or
    /// written by an older build.
    pub fn raise_to_cover(&mut self, kind: IdKind, max_existing: Option<u64>) {
        if let Some(max_existing) = max_existing {
            let counter = self.counter_mut(kind);
            if *counter <= max_existing {
                *counter = max_existing.saturating_add(1);
            }
        }
        let counter = self.counter_mut(kind);
        if *counter == 0 {
            *counter = 1;
        }
    }

    fn counter_mut(&mut self, kind: IdKind) -> &mut u64 {
        match kind {
            IdKind::Semester => &mut self.next_semester,
            IdKind::Lecture => &mut self.next_lecture,
            IdKind::Assignment => &mut self.next_assignment,
            IdKind::Todo => &mut self.next_todo,
            IdKind::Activity => &mut self.next_activity,
        }
    }
}
