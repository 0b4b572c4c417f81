//! Error types for tilemm.
//!
//! The multiply kernels themselves never fail: precondition violations are
//! caller errors. Errors only come out of buffer allocation, configuration
//! parsing and the benchmark harness.

use std::fmt;

/// Errors that can occur around the multiply kernels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TilemmError {
    /// Memory allocation for a matrix buffer failed.
    AllocationError {
        /// Number of elements that was requested.
        requested_elements: usize,
        /// Human-readable error message.
        message: String,
    },
    /// Input validation error.
    ValidationError {
        /// Human-readable error message.
        message: String,
    },
    /// A configuration value could not be parsed or is out of range.
    ConfigError {
        /// The option or environment variable name.
        key: String,
        /// The offending raw value.
        value: String,
        /// Human-readable error message.
        message: String,
    },
    /// Writing harness output failed.
    IoError {
        /// Human-readable error message.
        message: String,
    },
}

impl fmt::Display for TilemmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TilemmError::AllocationError {
                requested_elements,
                message,
            } => write!(
                f,
                "Memory allocation failed: {} (requested {} elements)",
                message, requested_elements
            ),
            TilemmError::ValidationError { message } => {
                write!(f, "Validation error: {}", message)
            }
            TilemmError::ConfigError {
                key,
                value,
                message,
            } => write!(
                f,
                "Invalid configuration: {} (key: {}, value: {:?})",
                message, key, value
            ),
            TilemmError::IoError { message } => write!(f, "I/O error: {}", message),
        }
    }
}

impl std::error::Error for TilemmError {}

impl From<std::io::Error> for TilemmError {
    fn from(err: std::io::Error) -> Self {
        TilemmError::IoError {
            message: err.to_string(),
        }
    }
}

/// Result type alias for tilemm operations.
pub type Result<T> = std::result::Result<T, TilemmError>;

/// Creates an allocation error.
pub fn allocation_error(requested_elements: usize, message: impl Into<String>) -> TilemmError {
    TilemmError::AllocationError {
        requested_elements,
        message: message.into(),
    }
}

/// Creates a validation error.
pub fn validation_error(message: impl Into<String>) -> TilemmError {
    TilemmError::ValidationError {
        message: message.into(),
    }
}

/// Creates a configuration error.
pub fn config_error(
    key: impl Into<String>,
    value: impl Into<String>,
    message: impl Into<String>,
) -> TilemmError {
    TilemmError::ConfigError {
        key: key.into(),
        value: value.into(),
        message: message.into(),
    }
}
