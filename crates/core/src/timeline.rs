//! Timeline post rules: message and memo validation, auto-post templates,
//! reaction toggling and per-viewer permissions.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, FieldErrors};
use crate::patch::double_option;
use crate::status::{OccurrenceStatus, ReactionType, TimelinePostKind};
use crate::types::DbId;

pub const MANUAL_MESSAGE_MIN_LENGTH: usize = 1;
pub const MANUAL_MESSAGE_MAX_LENGTH: usize = 280;
pub const MEMO_MAX_LENGTH: usize = 500;

const FALLBACK_TITLE: &str = "Task";

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Trim and bound a manual post message.
pub fn validate_message(raw: Option<&str>) -> Result<String, String> {
    let Some(raw) = raw else {
        return Err("message is required.".to_string());
    };
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len < MANUAL_MESSAGE_MIN_LENGTH {
        return Err("message must not be empty.".to_string());
    }
    if len > MANUAL_MESSAGE_MAX_LENGTH {
        return Err(format!(
            "message must be at most {MANUAL_MESSAGE_MAX_LENGTH} characters."
        ));
    }
    Ok(trimmed.to_string())
}

/// Trim and bound a memo. Blank clears it.
pub fn validate_memo(raw: Option<&str>) -> Result<Option<String>, String> {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MEMO_MAX_LENGTH {
        return Err(format!("memo must be at most {MEMO_MAX_LENGTH} characters."));
    }
    Ok(Some(trimmed.to_string()))
}

/// Auto post kind mirroring an evaluated occurrence status.
pub fn auto_kind_for(status: OccurrenceStatus) -> Option<TimelinePostKind> {
    match status {
        OccurrenceStatus::Done => Some(TimelinePostKind::AutoDone),
        OccurrenceStatus::Missed => Some(TimelinePostKind::AutoMissed),
        OccurrenceStatus::Scheduled => None,
    }
}

/// Message text of an auto post for an event titled `title`.
pub fn auto_message(kind: TimelinePostKind, title: Option<&str>) -> String {
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(FALLBACK_TITLE);
    match kind {
        TimelinePostKind::AutoDone => format!("Completed \"{title}\"."),
        TimelinePostKind::AutoMissed => format!("Missed \"{title}\"."),
        TimelinePostKind::ManualNote => "Added a progress note.".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct CreateManualPostRequest {
    pub message: Option<String>,
    pub occurrence_id: Option<serde_json::Value>,
    pub memo: Option<serde_json::Value>,
    pub visibility: Option<serde_json::Value>,
}

impl CreateManualPostRequest {
    /// Validated message, or every field problem at once.
    pub fn validate(&self) -> Result<String, CoreError> {
        let mut issues = FieldErrors::new();
        if is_present(&self.occurrence_id) {
            issues.insert(
                "occurrence_id".into(),
                "Manual posts cannot be linked to a task.".into(),
            );
        }
        if is_present(&self.memo) {
            issues.insert(
                "memo".into(),
                "Manual posts do not accept a memo at creation.".into(),
            );
        }
        if is_present(&self.visibility) {
            issues.insert(
                "visibility".into(),
                "Visibility cannot be set on timeline posts.".into(),
            );
        }
        let message = validate_message(self.message.as_deref());
        match message {
            Ok(message) if issues.is_empty() => Ok(message),
            Ok(_) => Err(CoreError::Validation(issues)),
            Err(err) => {
                issues.insert("message".into(), err);
                Err(CoreError::Validation(issues))
            }
        }
    }
}

fn is_present(value: &Option<serde_json::Value>) -> bool {
    value.as_ref().is_some_and(|v| !v.is_null())
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateManualPostRequest {
    pub message: Option<String>,
}

impl UpdateManualPostRequest {
    pub fn validate(&self) -> Result<String, CoreError> {
        validate_message(self.message.as_deref())
            .map_err(|err| CoreError::Validation(FieldErrors::from([("message".into(), err)])))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMemoRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub memo: Option<Option<String>>,
}

impl UpdateMemoRequest {
    /// True when `memo` was not named at all; `null` is an explicit clear.
    pub fn is_empty(&self) -> bool {
        self.memo.is_none()
    }

    pub fn validate(&self) -> Result<Option<String>, CoreError> {
        validate_memo(self.memo.as_ref().and_then(|m| m.as_deref()))
            .map_err(|err| CoreError::Validation(FieldErrors::from([("memo".into(), err)])))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReactionRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ReactionRequest {
    pub fn validate(&self) -> Result<ReactionType, CoreError> {
        self.kind
            .as_deref()
            .and_then(ReactionType::parse)
            .ok_or_else(|| CoreError::invalid("INVALID_REACTION", "type must be LIKE or BAD."))
    }
}

// ---------------------------------------------------------------------------
// Reactions
// ---------------------------------------------------------------------------

/// What to do with the viewer's stored reaction when they react with `requested`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    Insert(ReactionType),
    Replace(ReactionType),
    Remove,
}

pub fn toggle_reaction(existing: Option<ReactionType>, requested: ReactionType) -> ReactionChange {
    match existing {
        Some(current) if current == requested => ReactionChange::Remove,
        Some(_) => ReactionChange::Replace(requested),
        None => ReactionChange::Insert(requested),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCounts {
    pub likes: i64,
    pub bads: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReactionSummary {
    #[serde(flatten)]
    pub counts: ReactionCounts,
    pub viewer_reaction: Option<ReactionType>,
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostPermissions {
    pub can_edit_manual: bool,
    pub can_edit_memo: bool,
}

impl PostPermissions {
    pub fn for_viewer(author_id: DbId, kind: TimelinePostKind, viewer_id: DbId) -> Self {
        let is_owner = author_id == viewer_id;
        Self {
            can_edit_manual: is_owner && kind == TimelinePostKind::ManualNote,
            can_edit_memo: is_owner && kind.is_auto(),
        }
    }
}

pub fn post_not_found() -> CoreError {
    CoreError::not_found("POST_NOT_FOUND", "Timeline post not found.")
}

/// Owner-only manual edit guard.
pub fn ensure_manual_edit(author_id: DbId, kind: TimelinePostKind, viewer_id: DbId) -> Result<(), CoreError> {
    if author_id != viewer_id {
        return Err(post_not_found());
    }
    if kind != TimelinePostKind::ManualNote {
        return Err(CoreError::forbidden(
            "EDIT_NOT_ALLOWED",
            "Only manual notes can be edited.",
        ));
    }
    Ok(())
}

pub fn ensure_manual_delete(author_id: DbId, kind: TimelinePostKind, viewer_id: DbId) -> Result<(), CoreError> {
    if author_id != viewer_id {
        return Err(post_not_found());
    }
    if kind != TimelinePostKind::ManualNote {
        return Err(CoreError::forbidden(
            "DELETE_NOT_ALLOWED",
            "Only manual notes can be deleted.",
        ));
    }
    Ok(())
}

pub fn ensure_memo_edit(author_id: DbId, kind: TimelinePostKind, viewer_id: DbId) -> Result<(), CoreError> {
    if author_id != viewer_id {
        return Err(post_not_found());
    }
    if !kind.is_auto() {
        return Err(CoreError::forbidden(
            "MEMO_NOT_ALLOWED",
            "Only automatic timeline posts support memos.",
        ));
    }
    Ok(())
}

/// Reactions require the viewer to be the author or one of their friends.
pub fn ensure_can_react(author_id: DbId, viewer_id: DbId, are_friends: bool) -> Result<(), CoreError> {
    if author_id == viewer_id || are_friends {
        Ok(())
    } else {
        Err(CoreError::forbidden(
            "FORBIDDEN",
            "You do not have access to this post.",
        ))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn message_is_trimmed_and_bounded() {
        assert_eq!(validate_message(Some("  hi ")).unwrap(), "hi");
        assert!(validate_message(Some("   ")).is_err());
        assert!(validate_message(None).is_err());
        assert!(validate_message(Some(&"x".repeat(280))).is_ok());
        assert!(validate_message(Some(&"x".repeat(281))).is_err());
    }

    #[test]
    fn memo_blank_clears() {
        assert_eq!(validate_memo(None).unwrap(), None);
        assert_eq!(validate_memo(Some("  ")).unwrap(), None);
        assert_eq!(validate_memo(Some(" note ")).unwrap().as_deref(), Some("note"));
        assert!(validate_memo(Some(&"m".repeat(501))).is_err());
    }

    #[test]
    fn memo_request_distinguishes_absent_from_null() {
        let absent: UpdateMemoRequest = serde_json::from_str("{}").unwrap();
        assert!(absent.is_empty());

        let cleared: UpdateMemoRequest = serde_json::from_str(r#"{"memo": null}"#).unwrap();
        assert!(!cleared.is_empty());
        assert_eq!(cleared.validate().unwrap(), None);
    }

    #[test]
    fn auto_messages() {
        assert_eq!(
            auto_message(TimelinePostKind::AutoDone, Some("Run")),
            "Completed \"Run\"."
        );
        assert_eq!(
            auto_message(TimelinePostKind::AutoMissed, Some("  ")),
            "Missed \"Task\"."
        );
        assert_eq!(auto_kind_for(OccurrenceStatus::Scheduled), None);
    }

    #[test]
    fn manual_post_rejects_foreign_fields() {
        let req = CreateManualPostRequest {
            message: Some(" ".into()),
            occurrence_id: Some(serde_json::json!(4)),
            memo: Some(serde_json::Value::Null),
            visibility: Some(serde_json::json!("PUBLIC")),
        };
        assert_matches!(req.validate(), Err(CoreError::Validation(fields)) => {
            assert!(fields.contains_key("message"));
            assert!(fields.contains_key("occurrence_id"));
            assert!(fields.contains_key("visibility"));
            assert!(!fields.contains_key("memo"));
        });
    }

    #[test]
    fn reaction_toggle_rules() {
        use ReactionType::*;
        assert_eq!(toggle_reaction(None, Like), ReactionChange::Insert(Like));
        assert_eq!(toggle_reaction(Some(Like), Like), ReactionChange::Remove);
        assert_eq!(toggle_reaction(Some(Like), Bad), ReactionChange::Replace(Bad));
    }

    #[test]
    fn reaction_type_is_case_insensitive() {
        let req = ReactionRequest {
            kind: Some("like".into()),
        };
        assert_eq!(req.validate().unwrap(), ReactionType::Like);
        let bad = ReactionRequest {
            kind: Some("love".into()),
        };
        assert_matches!(
            bad.validate(),
            Err(CoreError::InvalidInput { code: "INVALID_REACTION", .. })
        );
    }

    #[test]
    fn permissions_and_guards() {
        let p = PostPermissions::for_viewer(1, TimelinePostKind::AutoDone, 1);
        assert!(p.can_edit_memo && !p.can_edit_manual);
        let p = PostPermissions::for_viewer(1, TimelinePostKind::ManualNote, 2);
        assert!(!p.can_edit_memo && !p.can_edit_manual);

        assert_matches!(
            ensure_manual_edit(1, TimelinePostKind::ManualNote, 2),
            Err(CoreError::NotFound { code: "POST_NOT_FOUND", .. })
        );
        assert_matches!(
            ensure_manual_delete(1, TimelinePostKind::AutoMissed, 1),
            Err(CoreError::Forbidden { code: "DELETE_NOT_ALLOWED", .. })
        );
        assert_matches!(
            ensure_memo_edit(1, TimelinePostKind::ManualNote, 1),
            Err(CoreError::Forbidden { code: "MEMO_NOT_ALLOWED", .. })
        );
        assert!(ensure_can_react(1, 2, true).is_ok());
        assert_matches!(
            ensure_can_react(1, 2, false),
            Err(CoreError::Forbidden { code: "FORBIDDEN", .. })
        );
    }

    #[test]
    fn summary_serializes_flat() {
        let summary = ReactionSummary {
            counts: ReactionCounts { likes: 2, bads: 1 },
            viewer_reaction: Some(ReactionType::Bad),
        };
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json, serde_json::json!({"likes": 2, "bads": 1, "viewer_reaction": "BAD"}));
    }
}
