//! Profile updates and user search input rules.

use serde::Deserialize;

use crate::error::{CoreError, Issues};
use crate::patch::double_option;

pub const NAME_MAX_LENGTH: usize = 50;

pub fn validate_name(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("name must not be empty.".to_string());
    }
    if trimmed.chars().count() > NAME_MAX_LENGTH {
        return Err(format!("name must be at most {NAME_MAX_LENGTH} characters."));
    }
    Ok(trimmed.to_string())
}

/// `#RRGGBB`, normalised to upper case. Blank clears the color.
pub fn validate_avatar_color(raw: &str) -> Result<Option<String>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let well_formed = trimmed.len() == 7
        && trimmed.starts_with('#')
        && trimmed[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !well_formed {
        return Err("avatar_color must be formatted as #RRGGBB.".to_string());
    }
    Ok(Some(trimmed.to_ascii_uppercase()))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub avatar_color: Option<Option<String>>,
}

/// Validated profile changes. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub avatar_color: Option<Option<String>>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.avatar_color.is_none()
    }
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<ProfileChanges, CoreError> {
        let mut issues = Issues::new();
        let name = self
            .name
            .as_deref()
            .and_then(|n| issues.check("name", validate_name(n)));
        let avatar_color = match &self.avatar_color {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) => issues.check("avatar_color", validate_avatar_color(raw)),
        };
        issues.finish()?;
        Ok(ProfileChanges { name, avatar_color })
    }
}

/// Trimmed search term; blank is `INVALID_QUERY`.
pub fn validate_search_query(raw: Option<&str>) -> Result<String, CoreError> {
    match raw.map(str::trim) {
        Some(q) if !q.is_empty() => Ok(q.to_string()),
        _ => Err(CoreError::invalid(
            "INVALID_QUERY",
            "Query parameter q is required.",
        )),
    }
}
