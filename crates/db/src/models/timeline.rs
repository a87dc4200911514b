//! Timeline post and reaction models.

use serde::Serialize;
use sqlx::FromRow;
use taskwatch_core::status::{OccurrenceStatus, ReactionType, StatusId, TimelinePostKind};
use taskwatch_core::timeline::{PostPermissions, ReactionCounts, ReactionSummary};
use taskwatch_core::types::{DbId, Timestamp};

/// A row from the `timeline_posts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimelinePost {
    pub id: DbId,
    pub user_id: DbId,
    #[sqlx(rename = "kind_id", try_from = "i16")]
    pub kind: TimelinePostKind,
    pub occurrence_id: Option<DbId>,
    pub message: String,
    pub memo: Option<String>,
    pub memo_updated_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostAuthor {
    pub id: DbId,
    pub name: String,
    pub avatar_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostEvent {
    pub id: DbId,
    pub title: String,
    pub is_all_day: bool,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostOccurrence {
    pub id: DbId,
    pub status: OccurrenceStatus,
    pub start_at: Timestamp,
    pub end_at: Timestamp,
    pub is_all_day: bool,
    pub event: PostEvent,
}

/// A feed item as seen by one viewer.
#[derive(Debug, Clone, Serialize)]
pub struct TimelinePostView {
    pub id: DbId,
    pub message: String,
    pub kind: TimelinePostKind,
    pub memo: Option<String>,
    pub memo_updated_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub author: PostAuthor,
    pub occurrence: Option<PostOccurrence>,
    pub reactions: ReactionSummary,
    pub permissions: PostPermissions,
}

impl TimelinePostView {
    /// Copy with viewer-specific fields cleared, for fan-out to every client.
    pub fn for_broadcast(&self) -> Self {
        Self {
            reactions: ReactionSummary {
                counts: self.reactions.counts,
                viewer_reaction: None,
            },
            permissions: PostPermissions::default(),
            ..self.clone()
        }
    }
}

/// Joined row behind [`TimelinePostView`].
#[derive(Debug, Clone, FromRow)]
pub struct TimelineFeedRow {
    #[sqlx(flatten)]
    pub post: TimelinePost,
    pub author_name: String,
    pub author_avatar_color: Option<String>,
    pub occ_status_id: Option<StatusId>,
    pub occ_start_at: Option<Timestamp>,
    pub occ_end_at: Option<Timestamp>,
    pub occ_is_all_day: Option<bool>,
    pub event_id: Option<DbId>,
    pub event_title: Option<String>,
    pub event_is_all_day: Option<bool>,
    pub event_tag: Option<String>,
    pub likes: i64,
    pub bads: i64,
    pub viewer_reaction_id: Option<StatusId>,
}

impl TimelineFeedRow {
    pub fn into_view(self, viewer_id: DbId) -> TimelinePostView {
        let occurrence = self.occurrence();
        let post = self.post;
        TimelinePostView {
            permissions: PostPermissions::for_viewer(post.user_id, post.kind, viewer_id),
            reactions: ReactionSummary {
                counts: ReactionCounts {
                    likes: self.likes,
                    bads: self.bads,
                },
                viewer_reaction: self
                    .viewer_reaction_id
                    .and_then(|id| ReactionType::try_from(id).ok()),
            },
            author: PostAuthor {
                id: post.user_id,
                name: self.author_name,
                avatar_color: self.author_avatar_color,
            },
            occurrence,
            id: post.id,
            message: post.message,
            kind: post.kind,
            memo: post.memo,
            memo_updated_at: post.memo_updated_at,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }

    fn occurrence(&self) -> Option<PostOccurrence> {
        let status = OccurrenceStatus::try_from(self.occ_status_id?).ok()?;
        Some(PostOccurrence {
            id: self.post.occurrence_id?,
            status,
            start_at: self.occ_start_at?,
            end_at: self.occ_end_at?,
            is_all_day: self.occ_is_all_day.unwrap_or(false),
            event: PostEvent {
                id: self.event_id?,
                title: self.event_title.clone()?,
                is_all_day: self.event_is_all_day.unwrap_or(false),
                tag: self.event_tag.clone(),
            },
        })
    }
}

/// Result of an occurrence status change's timeline side effect.
#[derive(Debug, Clone)]
pub struct AutoPostUpsert {
    pub post_id: DbId,
    /// `true` when this change created the post rather than rewriting it.
    pub created: bool,
}
