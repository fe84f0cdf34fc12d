//! crates/library_core/src/error.rs
//!
//! The domain error taxonomy. Every failure a caller can observe maps to one
//! of these variants and to a stable, machine-readable kind.

use crate::ports::PortError;

/// Errors surfaced by the catalog, lending and user services.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// No authenticated actor could be resolved for the request.
    #[error("Authentication required")]
    Unauthenticated,

    /// The actor is known but their role does not permit the operation.
    #[error("Not permitted: {0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The requested transition is illegal for the entity's current state.
    #[error("{0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A persistence or infrastructure fault. The transition may not have happened.
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl LibraryError {
    /// The stable kind reported to callers alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            LibraryError::Unauthenticated => "unauthenticated",
            LibraryError::Forbidden(_) => "forbidden",
            LibraryError::NotFound(_) => "not_found",
            LibraryError::Conflict(_) => "conflict",
            LibraryError::InvalidInput(_) => "invalid_input",
            LibraryError::Storage(_) => "internal",
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        LibraryError::InvalidInput(message.into())
    }
}

impl From<PortError> for LibraryError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(msg) => LibraryError::NotFound(msg),
            PortError::Conflict(msg) => LibraryError::Conflict(msg),
            PortError::Unauthorized => LibraryError::Unauthenticated,
            PortError::Unexpected(msg) => LibraryError::Storage(msg),
        }
    }
}

/// A convenience type alias for `Result<T, LibraryError>`.
pub type LibraryResult<T> = Result<T, LibraryError>;
