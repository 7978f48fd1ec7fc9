//! Error types and handling for SolaXd
//!
//! This module defines the error types used throughout the daemon. Per-tick
//! protocol failures are classified by [`crate::protocol::FrameError`] and
//! never escape a tick; everything here is either fatal or a startup problem.

use thiserror::Error;

/// Result type alias for SolaXd operations
pub type Result<T> = std::result::Result<T, SolaxError>;

/// Main error type for SolaXd
#[derive(Debug, Error)]
pub enum SolaxError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Transport read/write failures; the serial link is considered broken
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serial port could not be opened or configured
    #[error("Serial port error: {message}")]
    Serial { message: String },

    /// Frame construction errors (never raised for received data)
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// HTTP/Web server errors
    #[error("Web server error: {message}")]
    Web { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },
}

impl SolaxError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        SolaxError::Config {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        SolaxError::Io {
            message: message.into(),
        }
    }

    /// Create a new serial port error
    pub fn serial<S: Into<String>>(message: S) -> Self {
        SolaxError::Serial {
            message: message.into(),
        }
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        SolaxError::Protocol {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        SolaxError::Web {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        SolaxError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this error must terminate the polling loop
    pub fn is_fatal(&self) -> bool {
        matches!(self, SolaxError::Io { .. } | SolaxError::Serial { .. })
    }
}

impl From<std::io::Error> for SolaxError {
    fn from(err: std::io::Error) -> Self {
        SolaxError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for SolaxError {
    fn from(err: serde_yaml::Error) -> Self {
        SolaxError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SolaxError {
    fn from(err: serde_json::Error) -> Self {
        SolaxError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<tokio_serial::Error> for SolaxError {
    fn from(err: tokio_serial::Error) -> Self {
        SolaxError::serial(err.to_string())
    }
}

impl From<crate::protocol::FrameError> for SolaxError {
    fn from(err: crate::protocol::FrameError) -> Self {
        SolaxError::protocol(err.to_string())
    }
}
