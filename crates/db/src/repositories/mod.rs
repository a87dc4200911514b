//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument. Every query on user-owned
//! rows filters by the owner id so foreign rows read as absent.

pub mod event_repo;
pub mod friendship_repo;
pub mod occurrence_repo;
pub mod stats_repo;
pub mod timeline_repo;
pub mod user_repo;

pub use event_repo::EventRepo;
pub use friendship_repo::FriendshipRepo;
pub use occurrence_repo::OccurrenceRepo;
pub use stats_repo::StatsRepo;
pub use timeline_repo::TimelineRepo;
pub use user_repo::UserRepo;
