//! Typed failure model for the stores and the PDF renderer.

use thiserror::Error;

/// Result type used across the store layer.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level error.
///
/// Every failure surfaces synchronously as one of these kinds; nothing is
/// retried or swallowed. The calling layer decides user-facing messaging.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested id or invoice number has no matching row.
    #[error("{kind} with id {id} does not exist")]
    NotFound { kind: &'static str, id: String },

    /// An insert violated a uniqueness constraint (duplicate id, invoice
    /// number, or invoice-line key).
    #[error("{kind} with id {id} already exists")]
    Conflict { kind: &'static str, id: String },

    /// An invoice references an entity that is absent or does not match the
    /// stored record field-for-field.
    #[error("{kind} with id {id} does not match any stored record")]
    Referential { kind: &'static str, id: String },

    /// Malformed input detected before any store interaction.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Underlying SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound { kind, id: id.to_string() }
    }

    pub fn conflict(kind: &'static str, id: impl ToString) -> Self {
        Self::Conflict { kind, id: id.to_string() }
    }

    pub fn referential(kind: &'static str, id: impl ToString) -> Self {
        Self::Referential { kind, id: id.to_string() }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Returns true when a rusqlite error is a constraint violation, which the
/// stores report as [`StoreError::Conflict`].
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// PDF renderer error.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The company has no logo; the layout requires one.
    #[error("company {0} has no logo")]
    MissingLogo(i64),

    /// The PDF backend failed to assemble or write the document.
    #[error("pdf generation failed: {0}")]
    Pdf(String),
}
