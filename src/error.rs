// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for germ selection.

use std::fmt;

/// Result type alias for germ-selection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Germ-selection error types.
#[derive(Debug)]
pub enum Error {
    /// Configuration error (rejected before any computation)
    Config(String),
    /// Input validation error
    Validation(ValidationError),
    /// Numerical failure promoted to a hard error
    Numeric(String),
    /// IO error
    Io(std::io::Error),
    /// Serialization error
    Serialization(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Numeric(msg) => write!(f, "Numerical error: {}", msg),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Validation errors for models, sequences and weight vectors.
#[derive(Debug)]
pub enum ValidationError {
    /// Field validation failed
    Field { field: String, message: String },
    /// Gate label not present in the model
    UnknownGate(String),
    /// Matrix or vector has the wrong shape
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },
    /// Sequence with no gates where a germ is required
    EmptySequence,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Field { field, message } => {
                write!(f, "Field '{}': {}", field, message)
            }
            ValidationError::UnknownGate(label) => write!(f, "Unknown gate label: {}", label),
            ValidationError::DimensionMismatch {
                context,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Dimension mismatch for {}: expected {}, got {}",
                    context, expected, actual
                )
            }
            ValidationError::EmptySequence => write!(f, "Gate sequence is empty"),
        }
    }
}

impl std::error::Error for ValidationError {}
