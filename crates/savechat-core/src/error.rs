//! Error types for savechat-core

use std::time::Duration;

use thiserror::Error;

/// Result type alias using savechat-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in savechat-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required field was missing or blank
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Lookup by id or natural key found nothing
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity kind, e.g. "conversation"
        entity: &'static str,
        /// The id or natural key that was looked up
        key: String,
    },

    /// Uniqueness constraint violated on a natural key
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A store operation exceeded its deadline
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Name of the service operation, e.g. "upsert_conversation"
        operation: &'static str,
        /// The deadline that elapsed
        after: Duration,
    },
}

/// Coarse classification used by the boundary layer to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Store,
    Timeout,
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_) | Self::InvalidInput(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Database(_) | Self::LibSql(_) | Self::Io(_) | Self::Serialization(_) => {
                ErrorKind::Store
            }
        }
    }

    /// Map a failed write: uniqueness violations become `Conflict`, dangling
    /// references and check failures become `InvalidInput`.
    pub(crate) fn from_write(error: libsql::Error) -> Self {
        let message = error.to_string();
        if message.contains("UNIQUE constraint failed") {
            Self::Conflict(message)
        } else if message.contains("FOREIGN KEY constraint failed")
            || message.contains("CHECK constraint failed")
        {
            Self::InvalidInput(message)
        } else {
            Self::LibSql(error)
        }
    }

    /// Whether this is a natural-key uniqueness violation.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_names_the_field() {
        let err = Error::MissingField("title");
        assert_eq!(err.to_string(), "title is required");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn timeout_is_distinct_from_store_failures() {
        let timeout = Error::Timeout {
            operation: "upsert_conversation",
            after: Duration::from_millis(50),
        };
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
        assert_eq!(Error::Database("boom".into()).kind(), ErrorKind::Store);
        assert_eq!(
            Error::not_found("conversation", 7).to_string(),
            "conversation not found: 7"
        );
    }
}
