//! Error types for attribute definition operations.
//!
//! Errors are layered the same way the engine is: [`ValidationError`] for
//! malformed definitions and option payloads, [`PolicyViolation`] for
//! definitions that are well formed but forbidden by topology rules,
//! [`StoreError`] for collaborator failures, and [`AttributeError`] which
//! every public engine operation returns.

use crate::storage::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for attribute engine operations.
#[derive(Debug, thiserror::Error)]
pub enum AttributeError {
    /// The definition or one of its option payloads is malformed
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced object, instance, attribute or group does not exist
    #[error("Reference not found: {kind} '{id}'")]
    ReferenceNotFound { kind: String, id: String },

    /// An attribute with the same identity already exists
    #[error(
        "Duplicate attribute: '{property_id}' already exists on object '{object_id}' (biz {biz_id})"
    )]
    Duplicate {
        object_id: String,
        property_id: String,
        biz_id: i64,
    },

    /// The definition is well formed but not allowed
    #[error("Policy violation: {0}")]
    Policy(#[from] PolicyViolation),

    /// A collaborator failed
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Table attribute creation stopped after its child object was written
    #[error(
        "Table attribute '{property_id}' on '{object_id}' is incomplete, failed at {step}: {source}"
    )]
    IncompleteTable {
        object_id: String,
        property_id: String,
        child_object_id: String,
        step: TableCreationStep,
        #[source]
        source: Box<AttributeError>,
    },

    /// At least one object or row of a bulk operation failed
    #[error("Not all succeeded: {failed_objects} object(s) and {failed_rows} row(s) failed")]
    PartialFailure {
        failed_objects: usize,
        failed_rows: usize,
    },
}

/// Validation errors raised while checking attribute definitions.
///
/// Every variant is a caller mistake and maps to [`ErrorKind::ParameterInvalid`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Required field is absent or empty
    #[error("Field '{field}' must be set")]
    MissingField { field: String },

    /// Field is longer than allowed
    #[error("Field '{field}' exceeds the maximum length {max}")]
    ExceedsMaxLength { field: String, max: usize },

    /// Field value does not match the allowed format
    #[error("Field '{field}' has invalid value '{value}'")]
    InvalidFormat { field: String, value: String },

    /// Property type cannot be used here
    #[error("Unsupported property type '{property_type}'")]
    UnsupportedPropertyType { property_type: String },

    /// The property type does not accept the given multiplicity
    #[error("Property type '{property_type}' does not support ismultiple = {is_multiple}")]
    MultiplicityNotSupported {
        property_type: String,
        is_multiple: bool,
    },

    /// A single choice attribute was given several choices
    #[error("Field '{field}' is single choice but several values were given")]
    NeedSingleChoice { field: String },

    /// A list payload is longer than allowed
    #[error("Field '{field}' has more than {max} items")]
    TooManyItems { field: String, max: usize },

    /// Option payload violates its type grammar
    #[error("Invalid option for '{property_type}': {details}")]
    InvalidOption {
        property_type: String,
        details: String,
    },

    /// Default value is incompatible with the option payload
    #[error("Invalid default value for '{field}': {details}")]
    InvalidDefault { field: String, details: String },

    /// A table default row names a column the header does not declare
    #[error("Table default row references unknown column '{column}'")]
    UnknownTableColumn { column: String },

    /// A payload could not be decoded into its typed shape
    #[error("Failed to decode '{field}': {message}")]
    Decode { field: String, message: String },
}

/// Rules forbidding otherwise valid definitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("Cannot add required attribute to mainline object '{object_id}'")]
    RequiredOnMainline { object_id: String },

    #[error("Object '{object_id}' cannot quote itself")]
    SelfQuote { object_id: String },

    #[error("Object '{quoted_object_id}' is an inner topology model and cannot be quoted")]
    QuoteStructuralModel { quoted_object_id: String },

    #[error("Object '{quoted_object_id}' is a custom topology level and cannot be quoted")]
    QuoteCustomLevel { quoted_object_id: String },
}

/// Errors raised while assembling an engine.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A collaborator was not provided to the builder
    #[error("Collaborator '{name}' is required but not provided")]
    MissingCollaborator { name: &'static str },

    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ParameterInvalid,
    ReferenceNotFound,
    ConflictDuplicate,
    PolicyViolation,
    Infrastructure,
    PartialBatchFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ParameterInvalid => "parameter_invalid",
            ErrorKind::ReferenceNotFound => "reference_not_found",
            ErrorKind::ConflictDuplicate => "conflict_duplicate",
            ErrorKind::PolicyViolation => "policy_violation",
            ErrorKind::Infrastructure => "infrastructure",
            ErrorKind::PartialBatchFailure => "partial_batch_failure",
        };
        f.write_str(name)
    }
}

/// Ordered steps of table attribute creation after validation passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableCreationStep {
    ChildObject,
    DefaultGroup,
    AuditLog,
    QuoteRelation,
}

impl fmt::Display for TableCreationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TableCreationStep::ChildObject => "child object",
            TableCreationStep::DefaultGroup => "child default group",
            TableCreationStep::AuditLog => "child audit log",
            TableCreationStep::QuoteRelation => "quote relation",
        };
        f.write_str(name)
    }
}

impl From<StoreError> for AttributeError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::AlreadyExists {
                object_id,
                key,
                biz_id,
            } => AttributeError::Duplicate {
                object_id,
                property_id: key,
                biz_id,
            },
            other => AttributeError::Store(other),
        }
    }
}

impl AttributeError {
    /// Create a reference not found error
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ReferenceNotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Create a duplicate attribute error
    pub fn duplicate(object_id: impl Into<String>, property_id: impl Into<String>, biz_id: i64) -> Self {
        Self::Duplicate {
            object_id: object_id.into(),
            property_id: property_id.into(),
            biz_id,
        }
    }

    /// Classify this error into the caller facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AttributeError::Validation(_) => ErrorKind::ParameterInvalid,
            AttributeError::ReferenceNotFound { .. } => ErrorKind::ReferenceNotFound,
            AttributeError::Duplicate { .. } => ErrorKind::ConflictDuplicate,
            AttributeError::Policy(_) => ErrorKind::PolicyViolation,
            AttributeError::Store(_) => ErrorKind::Infrastructure,
            AttributeError::IncompleteTable { source, .. } => source.kind(),
            AttributeError::PartialFailure { .. } => ErrorKind::PartialBatchFailure,
        }
    }
}

impl ValidationError {
    /// Create a missing field error
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an over-length error
    pub fn too_long(field: impl Into<String>, max: usize) -> Self {
        Self::ExceedsMaxLength {
            field: field.into(),
            max,
        }
    }

    /// Create an invalid format error
    pub fn invalid(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidFormat {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an invalid option error
    pub fn option(property_type: impl fmt::Display, details: impl Into<String>) -> Self {
        Self::InvalidOption {
            property_type: property_type.to_string(),
            details: details.into(),
        }
    }

    /// Create an invalid default error
    pub fn default_value(field: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidDefault {
            field: field.into(),
            details: details.into(),
        }
    }
}

// Result type aliases for convenience
pub type AttributeResult<T> = Result<T, AttributeError>;
pub type ValidationResult<T> = Result<T, ValidationError>;
pub type BuildResult<T> = Result<T, BuildError>;
