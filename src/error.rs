// Error taxonomy for the assignment core
// Every operation surfaces exactly one of these kinds to its caller

use thiserror::Error;

/// Errors produced by provisioning, the selection ledger and the status aggregator
#[derive(Error, Debug)]
pub enum CoreError {
    /// A referenced entity is absent (event, organizer, donor owner, binding)
    #[error("Not found: {0}")]
    NotFound(String),

    /// A Selection already exists for the (donor, event) pair
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input failed validation (malformed donor-id set, bad draft, illegal transition)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No account id was supplied, or it maps to no fundraiser
    #[error("Authentication required: {0}")]
    Authentication(String),

    /// Underlying persistence failure, propagated unchanged
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Discriminant of a `CoreError`, for callers that map errors to responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Authentication,
    Storage,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Conflict(_) => ErrorKind::Conflict,
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::Authentication(_) => ErrorKind::Authentication,
            CoreError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        CoreError::NotFound(what.into())
    }

    pub(crate) fn validation(what: impl Into<String>) -> Self {
        CoreError::Validation(what.into())
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// True when a rusqlite error is a UNIQUE constraint violation
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_distinguishable() {
        assert_eq!(CoreError::not_found("event 1").kind(), ErrorKind::NotFound);
        assert_eq!(CoreError::Conflict("dup".into()).kind(), ErrorKind::Conflict);
        assert_eq!(CoreError::validation("bad").kind(), ErrorKind::Validation);
        assert_eq!(
            CoreError::Authentication("missing".into()).kind(),
            ErrorKind::Authentication
        );
        assert_eq!(
            CoreError::from(rusqlite::Error::QueryReturnedNoRows).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_display_carries_detail() {
        let err = CoreError::not_found("event 42");
        assert_eq!(err.to_string(), "Not found: event 42");
    }
}
