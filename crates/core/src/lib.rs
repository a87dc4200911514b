//! Taskwatch domain logic.
//!
//! Pure functions and types shared by the repository and HTTP layers:
//! recurrence expansion, occurrence lifecycle rules, event validation,
//! the pending-work query contract, XP/level/streak statistics, friend
//! rankings, timeline rules and the friendship graph. Nothing in this
//! crate performs I/O.

pub mod error;
pub mod event;
pub mod friendship;
pub mod occurrence;
pub mod patch;
pub mod pending;
pub mod ranking;
pub mod recurrence;
pub mod search;
pub mod stats;
pub mod status;
pub mod time;
pub mod timeline;
pub mod types;
pub mod users;
