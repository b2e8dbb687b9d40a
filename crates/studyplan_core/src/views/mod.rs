//! Derived read views over the entity store.
//!
//! # Responsibility
//! - Filter and order collections for list, dashboard and calendar views.
//!
//! # Invariants
//! - Every function here is pure and idempotent for identical inputs.

pub mod calendar;
pub mod filters;
