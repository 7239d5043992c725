//! Unified error system for warden
//!
//! A single error type shared by every crate in the workspace. Expected
//! outcomes of holder mutations (already has, lacks) are not errors and are
//! reported through result enums in `warden-model` instead.

use serde::{Deserialize, Serialize};

/// Unified error type for all warden operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum WardenError {
    /// Invalid input, such as an empty node key or context entry
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl WardenError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Standard Result type for warden operations
pub type Result<T> = std::result::Result<T, WardenError>;

impl From<std::io::Error> for WardenError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for WardenError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<serde_json::Error> for WardenError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = WardenError::invalid("test message");
        assert!(matches!(err, WardenError::Invalid { .. }));
        assert_eq!(err.to_string(), "Invalid: test message");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        assert!(matches!(WardenError::from(io_err), WardenError::NotFound { .. }));

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(matches!(WardenError::from(io_err), WardenError::Internal { .. }));
    }

    #[test]
    fn test_toml_error_conversion() {
        let err = toml::from_str::<toml::Value>("= nope").unwrap_err();
        assert!(matches!(WardenError::from(err), WardenError::Config { .. }));
    }
}
