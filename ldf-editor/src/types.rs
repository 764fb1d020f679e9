//! Core types for the LDF editor library
//!
//! This module defines the error taxonomy shared by every layer plus the small
//! value types (initial values, entity kinds) that appear in both the document
//! model and the edit records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for editor operations
pub type Result<T> = std::result::Result<T, LdfError>;

/// Errors that can occur while loading, editing or saving an LDF document
#[derive(Debug, thiserror::Error)]
pub enum LdfError {
    #[error("LDF file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse LDF at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("{kind} '{name}' already exists")]
    DuplicateName { kind: EntityKind, name: String },

    #[error("Out of range: {0}")]
    RangeError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{entity} edit #{index} ('{name}') failed: {source}")]
    EditFailed {
        entity: EntityKind,
        index: usize,
        name: String,
        #[source]
        source: Box<LdfError>,
    },
}

impl LdfError {
    /// Create a parse error for the given 1-based line
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Classify this error into the user-visible taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            LdfError::NotFound(_) => ErrorKind::NotFound,
            LdfError::ParseError { .. } => ErrorKind::ParseError,
            LdfError::DuplicateName { .. } => ErrorKind::DuplicateName,
            LdfError::RangeError(_) => ErrorKind::RangeError,
            LdfError::ValidationError(_) => ErrorKind::ValidationError,
            LdfError::InternalError(_) | LdfError::IoError(_) => ErrorKind::InternalError,
            LdfError::EditFailed { source, .. } => source.kind(),
        }
    }
}

/// Error taxonomy reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    ParseError,
    DuplicateName,
    RangeError,
    ValidationError,
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::DuplicateName => "DuplicateName",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::InternalError => "InternalError",
        };
        f.write_str(name)
    }
}

/// Kind of entity held by a document registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Signal,
    Frame,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Node => write!(f, "Node"),
            EntityKind::Signal => write!(f, "Signal"),
            EntityKind::Frame => write!(f, "Frame"),
        }
    }
}

/// Initial value of a signal
///
/// Scalar signals carry a single integer; byte-array signals carry one byte
/// per 8 bits of width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InitValue {
    /// Integer value for scalar signals (1-16 bits)
    Scalar(u64),
    /// Byte values for byte-array signals (1-8 bytes)
    Array(Vec<u8>),
}

impl Default for InitValue {
    fn default() -> Self {
        InitValue::Scalar(0)
    }
}

impl InitValue {
    /// True if this is a byte-array value
    pub fn is_array(&self) -> bool {
        matches!(self, InitValue::Array(_))
    }
}

impl fmt::Display for InitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitValue::Scalar(v) => write!(f, "{}", v),
            InitValue::Array(bytes) => {
                write!(f, "{{")?;
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", b)?;
                }
                write!(f, "}}")
            }
        }
    }
}
