//! Request handlers, one submodule per resource.
//!
//! Handlers validate input through `taskwatch_core`, delegate persistence to
//! the repositories in `taskwatch_db`, and map errors via [`AppError`].
//! Mutations that other clients should see are published on the
//! [`EventBus`](taskwatch_events::EventBus) after the write has committed.
//!
//! [`AppError`]: crate::error::AppError

pub mod events;
pub mod friendships;
pub mod occurrences;
pub mod rankings;
pub mod realtime;
pub mod stats;
pub mod timeline;
pub mod users;
