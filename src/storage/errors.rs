//! Collaborator error types.
//!
//! These errors describe failures of the model store and the other
//! collaborators the engine calls. They carry no knowledge of validation
//! rules; the engine maps them onto its own taxonomy in
//! [`crate::error::AttributeError`].

use std::fmt;

/// Errors returned by [`ModelStore`](super::ModelStore) and the other collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The requested record was not found.
    NotFound { kind: String, id: String },

    /// A record with the same identity already exists.
    AlreadyExists {
        object_id: String,
        key: String,
        biz_id: i64,
    },

    /// The collaborator is temporarily unavailable.
    Unavailable { message: String },

    /// The collaborator refused one item with a coded reason.
    Rejected { code: i64, message: String },

    /// A stored document could not be encoded or decoded.
    Serialization { message: String },

    /// Generic internal failure.
    Internal { message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { kind, id } => write!(f, "{} not found: {}", kind, id),
            StoreError::AlreadyExists {
                object_id,
                key,
                biz_id,
            } => write!(
                f,
                "Record already exists: {}/{} (biz {})",
                object_id, key, biz_id
            ),
            StoreError::Unavailable { message } => write!(f, "Store unavailable: {}", message),
            StoreError::Rejected { code, message } => {
                write!(f, "Rejected with code {}: {}", code, message)
            }
            StoreError::Serialization { message } => write!(f, "Serialization error: {}", message),
            StoreError::Internal { message } => write!(f, "Internal store error: {}", message),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization {
            message: error.to_string(),
        }
    }
}

impl StoreError {
    /// Create a new NotFound error.
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Create a new AlreadyExists error.
    pub fn already_exists(object_id: impl Into<String>, key: impl Into<String>, biz_id: i64) -> Self {
        Self::AlreadyExists {
            object_id: object_id.into(),
            key: key.into(),
            biz_id,
        }
    }

    /// Create a new Unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a new Rejected error.
    pub fn rejected(code: i64, message: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            message: message.into(),
        }
    }

    /// Create a new Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error indicates a record was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Check if this error indicates a uniqueness conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }

    /// Check if this error indicates a temporary failure that might succeed on retry.
    pub fn is_temporary(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }
}
