//! Planner use-case services.
//!
//! # Responsibility
//! - Sequence validate -> mutate -> persist -> notify for every user action.
//! - Keep rendering layers decoupled from storage details.

pub mod clock;
pub mod planner;
