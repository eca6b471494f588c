//! Error types shared across the pipeline.
//!
//! Field-level errors ([`TransformError`]) and resolution errors
//! ([`FactoryError`]) are usually caught by the caller and logged; the rest
//! abort the run.

use thiserror::Error;

/// Precondition and shape failures raised by the field transforms.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("record is empty")]
    EmptyObject,

    #[error("key is empty")]
    EmptyKey,

    #[error("property name is empty")]
    EmptyProperty,

    #[error("property \"{0}\" not found")]
    PropertyNotFound(String),

    #[error("invalid item in \"{0}\"")]
    InvalidItem(String),

    #[error("invalid date in \"{0}\"")]
    InvalidDate(String),

    #[error("invalid duration in \"{0}\"")]
    InvalidDuration(String),
}

/// Failures of the canonical reference converter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("malformed reference: {0}")]
    Malformed(String),

    #[error("unknown collection \"{collection}\" in reference {reference}")]
    UnknownCollection { collection: String, reference: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("{kind} has no relation \"{field}\"")]
    UnknownRelation { kind: String, field: String },

    #[error("{kind}.{field} expects {expected}, got {actual}")]
    WrongTarget {
        kind: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("{kind}.{field} holds a single entity, got {count}")]
    TooManyTargets {
        kind: String,
        field: String,
        count: usize,
    },

    #[error("store version mismatch: found {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("store file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures raised while fetching or creating an entity from a fragment.
#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("{0}")]
    RequiredFieldsEmpty(&'static str),

    #[error("{kind} fragment must be a structured value or a string, found {found}")]
    InvalidFragment { kind: &'static str, found: String },

    #[error("{kind}.{key} must hold a single value, found {found}")]
    InvalidNaturalKey {
        kind: &'static str,
        key: &'static str,
        found: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

/// Failures turning a flat record into an entity.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("{kind}.{field}: cannot read {found} as {expected}")]
    InvalidScalar {
        kind: &'static str,
        field: String,
        expected: &'static str,
        found: String,
    },

    #[error("{kind}.{field}: expected an entity reference, found {found}")]
    UnresolvedRelation {
        kind: &'static str,
        field: String,
        found: String,
    },

    #[error("{kind}.{field}: reference points to {actual}, expected {expected}")]
    WrongTarget {
        kind: &'static str,
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("unknown normalization group \"{0}\"")]
    UnknownGroup(String),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("serialization for the format \"{0}\" is not supported")]
    UnsupportedFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected an array of objects, found {0}")]
    InvalidRoot(String),

    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("CSV writer error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal option resolution failures; reported before any row is processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionError {
    #[error("destination directory cannot be empty")]
    EmptyDestinationDirectory,

    #[error("source directory cannot be empty")]
    EmptySourceDirectory,

    #[error("source file cannot be empty")]
    EmptySourceFile,

    #[error("class name and encoder cannot both be empty")]
    MissingClassAndEncoder,

    #[error("entity not found: {0}")]
    EntityNotFound(String),
}

#[derive(Error, Debug)]
pub enum FileError {
    #[error("file \"{name}\" not found in \"{directory}\"")]
    NotFound { name: String, directory: String },

    #[error("file \"{name}\" found {count} times in \"{directory}\"")]
    Ambiguous {
        name: String,
        directory: String,
        count: usize,
    },

    #[error("file \"{name}\" in \"{directory}\" is empty")]
    Empty { name: String, directory: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
