// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for rowbind.
//!
//! Errors are grouped by the phase that raises them. Registration errors
//! indicate a mismatch between code and schema and are expected to abort
//! startup; mapping, decode and render errors are per-call and leave the
//! caller's data untouched.

use thiserror::Error;

/// Boxed error coming from an external collaborator (result cursor).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Umbrella error for callers that do not care about the phase.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// Errors raised while building the registry.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The record type was registered before.
    #[error("record {type_name} already registered")]
    DuplicateType { type_name: &'static str },

    /// Two fields of one record resolve to the same column.
    #[error("record {type_name}: duplicate column {column:?}")]
    DuplicateColumn {
        type_name: &'static str,
        column: String,
    },

    /// Column override is empty or not lowercase.
    #[error("record {type_name}: field {field} has bad column tag {column:?}")]
    BadTag {
        type_name: &'static str,
        field: String,
        column: String,
    },

    /// The natural type already has a wire substitution.
    #[error("type {natural} already substituted")]
    DuplicateSubstitution { natural: &'static str },

    /// Registration attempted after the registry was sealed.
    #[error("registry is sealed, cannot {operation}")]
    Sealed { operation: &'static str },
}

/// Errors resolving columns, types or fields against the registry.
#[derive(Debug, Error)]
pub enum MappingError {
    /// Result column matches neither the current nor the next destination.
    #[error("column {column:?} at position {position} has no mapping")]
    UnmappedColumn { column: String, position: usize },

    /// Record type was never registered.
    #[error("record {type_name} has no mapping")]
    UnmappedType { type_name: &'static str },

    /// Explicit field path is not mapped for the record type.
    #[error("record {type_name} has no field {field:?}")]
    UnknownField {
        type_name: &'static str,
        field: String,
    },

    /// Registry is still open for registration.
    #[error("registry must be sealed before use")]
    Unsealed,
}

/// Errors raised by the result decoder.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no destination given")]
    NoDestinations,

    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// The cursor failed to decode a whole row.
    #[error("row {row}: {source}")]
    RowDecode {
        row: usize,
        #[source]
        source: BoxError,
    },

    /// A scanned value could not be stored in its field.
    #[error("row {row}, column {column:?}: {source}")]
    FieldDecode {
        row: usize,
        column: String,
        #[source]
        source: WireError,
    },

    /// A decoded record was rejected by its destination.
    #[error("row {row}: {source}")]
    Stage {
        row: usize,
        #[source]
        source: WireError,
    },

    /// The cursor reported a fetch or terminal error.
    #[error("cursor failed: {source}")]
    Cursor {
        #[source]
        source: BoxError,
    },
}

/// Errors raised by the value-string builder.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// The field's wire type has neither an encoder nor a scalar kind.
    #[error("field {field} of type {type_name} cannot be rendered")]
    CannotRender {
        type_name: &'static str,
        field: String,
    },

    #[error("element {index} of the sequence is empty")]
    NilElement { index: usize },

    #[error("sequence of {type_name} is empty")]
    EmptySequence { type_name: &'static str },

    #[error("field {field}: {source}")]
    Encode {
        field: String,
        #[source]
        source: WireError,
    },
}

/// Errors converting a single value to or from its wire form.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("value {value} out of range for {target}")]
    Overflow { target: &'static str, value: i64 },

    #[error("unexpected NULL for {target}")]
    UnexpectedNull { target: &'static str },

    #[error("invalid text for {target}: {reason}")]
    InvalidText { target: &'static str, reason: String },

    /// The type lacks the requested capability (decode or render).
    #[error("type {type_name} cannot be {capability}")]
    Unsupported {
        type_name: &'static str,
        capability: &'static str,
    },

    /// A field accessor was applied to a value of another type.
    #[error("storage slot is not a {expected}")]
    SlotMismatch { expected: &'static str },

    #[error("non-finite value {value} has no literal form")]
    NonFinite { value: f64 },
}
