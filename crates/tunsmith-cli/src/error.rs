// ============================================
// File: crates/tunsmith-cli/src/error.rs
// ============================================
//! # CLI Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI errors

use thiserror::Error;

use tunsmith_common::error::CommonError;

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        path: String,
        reason: String,
    },

    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        field: String,
        reason: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CliError {
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigLoad { .. } | Self::ConfigInvalid { .. } | Self::Common(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CliError::config_load("/etc/tunsmith.toml", "file not found");
        assert!(err.to_string().contains("/etc/tunsmith.toml"));
    }

    #[test]
    fn test_error_classification() {
        let config_err = CliError::config_invalid("tap.component_id", "cannot be empty");
        assert!(config_err.is_config_error());

        let internal_err = CliError::internal("toml serializer failed");
        assert!(!internal_err.is_config_error());
    }
}
