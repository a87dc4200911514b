//! Row structs and read models.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - Joined read models for listings that embed related rows
//! - Insert inputs for rows created outside the HTTP layer

pub mod event;
pub mod friendship;
pub mod occurrence;
pub mod stats;
pub mod timeline;
pub mod user;
