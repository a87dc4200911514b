use std::collections::BTreeMap;

use crate::recurrence::RecurrenceError;

/// Per-field validation messages keyed by request field name.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not found: {message}")]
    NotFound { code: &'static str, message: String },

    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    #[error("Invalid input: {message}")]
    InvalidInput { code: &'static str, message: String },

    #[error(transparent)]
    Recurrence(#[from] RecurrenceError),

    #[error("Conflict: {message}")]
    Conflict { code: &'static str, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {message}")]
    Forbidden { code: &'static str, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn invalid(code: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::Forbidden {
            code,
            message: message.into(),
        }
    }

    /// Machine-readable error code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { code, .. }
            | Self::InvalidInput { code, .. }
            | Self::Conflict { code, .. }
            | Self::Forbidden { code, .. } => code,
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Recurrence(_) => "INVALID_RRULE",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Collects field-level validation failures so a request can report every
/// problem in one response instead of stopping at the first.
#[derive(Debug, Default)]
pub struct Issues {
    fields: FieldErrors,
}

impl Issues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `field`. The first message for a field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    /// Unwrap a field validator result, recording its error under `field`.
    pub fn check<T>(&mut self, field: &str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `Ok(())` when nothing was recorded, otherwise a [`CoreError::Validation`].
    pub fn finish(self) -> Result<(), CoreError> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(self.fields))
        }
    }
}
