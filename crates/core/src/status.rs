//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding lookup table, and its label is the name exposed on
//! the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// A SMALLINT read from the database that matches no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} id {id}")]
pub struct UnknownStatusId {
    pub kind: &'static str,
    pub id: StatusId,
}

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant = $val ),+
        }

        impl $name {
            /// Every variant in seed order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Wire label, e.g. `"SCHEDULED"`.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            /// Parse a wire label, ignoring ASCII case.
            pub fn parse(value: &str) -> Option<Self> {
                let value = value.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(value))
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl TryFrom<StatusId> for $name {
            type Error = UnknownStatusId;

            fn try_from(id: StatusId) -> Result<Self, Self::Error> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.id() == id)
                    .ok_or(UnknownStatusId {
                        kind: stringify!($name),
                        id,
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_status_enum! {
    /// Occurrence lifecycle status.
    OccurrenceStatus {
        Scheduled = 1 => "SCHEDULED",
        Done = 2 => "DONE",
        Missed = 3 => "MISSED",
    }
}

define_status_enum! {
    /// Friend request lifecycle status. Everything but `Pending` is terminal.
    FriendRequestStatus {
        Pending = 1 => "PENDING",
        Accepted = 2 => "ACCEPTED",
        Rejected = 3 => "REJECTED",
        Cancelled = 4 => "CANCELLED",
    }
}

define_status_enum! {
    /// Timeline post kind.
    TimelinePostKind {
        AutoDone = 1 => "AUTO_DONE",
        AutoMissed = 2 => "AUTO_MISSED",
        ManualNote = 3 => "MANUAL_NOTE",
    }
}

define_status_enum! {
    /// Reaction left on a timeline post.
    ReactionType {
        Like = 1 => "LIKE",
        Bad = 2 => "BAD",
    }
}

define_status_enum! {
    /// Event visibility.
    Visibility {
        Private = 1 => "PRIVATE",
        Public = 2 => "PUBLIC",
    }
}

impl TimelinePostKind {
    /// Auto posts are generated from occurrence status changes.
    pub fn is_auto(self) -> bool {
        matches!(self, Self::AutoDone | Self::AutoMissed)
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::Private
    }
}
