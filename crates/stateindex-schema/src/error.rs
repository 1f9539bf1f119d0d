//! Error types for schema and update validation.

use thiserror::Error;

/// Errors raised while validating schemas, keys, values, and object updates.
///
/// Validation is fail-fast: the first problem found is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("object type name cannot be empty")]
    EmptyTypeName,

    #[error("field name cannot be empty")]
    EmptyFieldName,

    #[error("invalid field {field:?}: kind {kind} is not a valid field kind")]
    InvalidKind { field: String, kind: String },

    #[error("invalid field {field:?}: enum kind requires an enum definition")]
    MissingEnumDefinition { field: String },

    #[error("invalid enum definition {name:?}: {reason}")]
    InvalidEnum { name: String, reason: String },

    #[error("object type {type_name:?} has no key or value fields")]
    NoFields { type_name: String },

    #[error("object type {type_name:?} has duplicate {list} field {field:?}")]
    DuplicateField {
        type_name: String,
        list: &'static str,
        field: String,
    },

    #[error("object type {type_name:?} unique constraint references unknown field {field:?}")]
    UnknownConstraintField { type_name: String, field: String },

    #[error("duplicate object type name {0:?}")]
    DuplicateObjectType(String),

    #[error("enum {0:?} has conflicting definitions")]
    ConflictingEnum(String),

    #[error("object type {0:?} not found")]
    UnknownObjectType(String),

    #[error("object type name {expected:?} does not match update type name {actual:?}")]
    TypeNameMismatch { expected: String, actual: String },

    #[error("expected slice of values for {count} fields")]
    ExpectedSlice { count: usize },

    #[error("expected {expected} key fields, got {actual} values")]
    KeyFieldCount { expected: usize, actual: usize },

    #[error("expected {expected} value fields, got {actual} values")]
    ValueFieldCount { expected: usize, actual: usize },

    #[error("invalid value for field {field:?}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("invalid value at position {position} for field {field:?}: {reason}")]
    InvalidValueAt {
        position: usize,
        field: String,
        reason: String,
    },

    #[error("unexpected values in value updates: {0:?}")]
    UnexpectedValues(Vec<String>),
}
