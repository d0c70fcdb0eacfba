//! Error handling for the COS client
//!
//! This module defines the error types used throughout the library
//! and the classification the upload engine uses to decide what to retry.

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CosError>;

/// Error types that can occur when talking to COS
#[derive(Error, Debug)]
pub enum CosError {
    /// Bad caller input; never retried
    #[error("Invalid argument: {parameter} - {message}")]
    InvalidArgument { parameter: String, message: String },

    /// Non-2xx status or non-zero response code from the service
    #[error("Server error (status {status}, code {code}): {message}")]
    ServerError {
        status: u16,
        code: i64,
        message: String,
    },

    /// Network-level failure (timeout, connection reset, DNS, ...)
    #[error("Transport error: {message}")]
    TransportError { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CosError {
    /// Create a new invalid argument error
    pub fn invalid_argument(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        CosError::InvalidArgument {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a new server error
    pub fn server_error(status: u16, code: i64, message: impl Into<String>) -> Self {
        CosError::ServerError {
            status,
            code,
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport_error(message: impl Into<String>) -> Self {
        CosError::TransportError {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        CosError::ConfigError {
            message: message.into(),
        }
    }

    /// Whether the upload engine may try the same request again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CosError::ServerError { .. } | CosError::TransportError { .. }
        )
    }

    /// The remote response code, if this error came from the service
    pub fn server_code(&self) -> Option<i64> {
        match self {
            CosError::ServerError { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CosError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CosError::transport_error(format!("request timed out: {}", err))
        } else if err.is_connect() {
            CosError::transport_error(format!("connection failed: {}", err))
        } else {
            CosError::transport_error(err.to_string())
        }
    }
}
