//! Service-level error taxonomy.
//!
//! Every public operation returns `Result<T, ServiceError>`. The variants
//! keep "who are you" (`Unauthenticated`), "you may not" (`Forbidden`) and
//! "no such thing for you" (`NotFound`) apart, and carry field-level detail
//! for validation failures.

use serde::Serialize;
use thiserror::Error;
use tradepost_core::feed::FeedError;
use tradepost_core::{FieldError, ValidationErrors};

use crate::store::RepositoryError;

/// Application-level error type for the engine.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No authenticated caller.
    #[error("authentication required")]
    Unauthenticated,

    /// Caller is inactive, has the wrong role, or does not own the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource absent or not visible to the caller.
    #[error("not found: {0}")]
    NotFound(String),

    /// Request fields are missing or malformed.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// The catalog feed was rejected; nothing was written.
    #[error("ingestion failed: {0}")]
    Ingestion(#[from] FeedError),

    /// The request conflicts with current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Store operation failed.
    #[error("repository error: {0}")]
    Repository(RepositoryError),
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource".to_owned()),
            RepositoryError::Conflict(message) => Self::Conflict(message),
            RepositoryError::OwnershipMismatch(message) => Self::Forbidden(message),
            other @ (RepositoryError::Database(_)
            | RepositoryError::DataCorruption(_)
            | RepositoryError::MissingReference { .. }) => Self::Repository(other),
        }
    }
}

/// Serializable failure envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub status: bool,
    pub kind: &'static str,
    pub message: String,
    pub errors: Vec<FieldError>,
}

impl ServiceError {
    /// Stable machine-readable name of the variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Ingestion(_) => "ingestion",
            Self::Conflict(_) => "conflict",
            Self::Repository(_) => "internal",
        }
    }

    /// Failure envelope for callers.
    ///
    /// Store errors are reported without their details.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        let (message, errors) = match self {
            Self::Repository(err) => {
                tracing::error!(error = %err, "Store operation failed");
                ("internal error".to_owned(), Vec::new())
            }
            Self::Validation(errors) => (self.to_string(), errors.errors().to_vec()),
            Self::Ingestion(err) => (self.to_string(), err.field_errors().to_vec()),
            _ => (self.to_string(), Vec::new()),
        };
        ErrorBody {
            status: false,
            kind: self.kind(),
            message,
            errors,
        }
    }
}

/// Result type alias for `ServiceError`.
pub type Result<T> = std::result::Result<T, ServiceError>;
