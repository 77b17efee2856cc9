// ============================================
// File: crates/tunsmith-transport/src/error.rs
// ============================================
//! # Provisioning Error Types
//!
//! ## Creation Reason
//! Each step of bringing up a tunnel fails for a different reason and
//! needs a different fix (install the driver, run elevated, pass a
//! descriptor). One opaque error would hide that, so every step has its
//! own variant with an actionable message.
//!
//! ## Main Functionality
//! - `ProvisionError`: one variant per failing step
//! - Classification helpers (`requires_privileges`, `is_retryable`)
//!
//! ## Error Categories
//! 1. **Linux**: missing descriptor, rejected `TUNSETIFF`, device node open
//! 2. **Windows**: adapter scan, name lookup, device open, control requests
//! 3. **Platform**: no tunnel support at all
//! 4. **Configuration**: invalid bring-up values
//!
//! ## ⚠️ Important Note for Next Developer
//! - The first line of each message is surfaced verbatim to embedders;
//!   keep them stable
//! - Nothing here is retryable: a second registry scan or device open
//!   will not succeed without outside remediation
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::io;

use thiserror::Error;

use tunsmith_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// `EPERM` / `EACCES` as reported by the kernel.
const EPERM: i32 = 1;
const EACCES: i32 = 13;

// ============================================
// ProvisionError
// ============================================

/// Provisioning error types.
#[derive(Error, Debug)]
pub enum ProvisionError {
    // ========================================
    // Linux Errors
    // ========================================

    /// No descriptor was passed to the Linux provisioner.
    #[error("No fd provided.")]
    NoDescriptorProvided,

    /// The kernel rejected the `TUNSETIFF` request.
    #[error("Failure during ioctl. (os error {code})")]
    IoctlFailed {
        /// errno returned by the kernel
        code: i32,
    },

    /// The generic tunnel device node could not be opened.
    #[error("Failed to open tunnel device node {path}: {source}")]
    DeviceNodeOpenFailed {
        /// Path of the device node
        path: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    // ========================================
    // Windows Errors
    // ========================================

    /// No adapter in the registry carries the TAP component id.
    #[error("Error retrieving device guid. Is the tap driver installed? (component id '{component_id}')")]
    AdapterNotFound {
        /// Component id that was searched for
        component_id: String,
    },

    /// The adapter was found but its connection name could not be read.
    #[error("Error retrieving network name for tap device. (adapter {instance_id})")]
    NameLookupFailed {
        /// Instance id of the adapter
        instance_id: String,
    },

    /// The adapter's device file could not be opened.
    #[error("Error opening tap file. Are you running as root? ({path}, os error {code})")]
    DeviceOpenFailed {
        /// Device path that was opened
        path: String,
        /// Win32 error code
        code: i32,
    },

    /// A bring-up control request failed (strict mode only).
    #[error("Tap control request {request} failed (os error {code})")]
    ConfigIoctlFailed {
        /// Request number (6 = media status, 10 = addressing)
        request: u32,
        /// Win32 error code
        code: i32,
    },

    // ========================================
    // Platform / Configuration Errors
    // ========================================

    /// This platform has no tunnel provisioning support.
    #[error("Tunnel provisioning is not supported on {platform}")]
    Unsupported {
        /// Name of the platform
        platform: &'static str,
    },

    /// Invalid provisioning configuration.
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig {
        /// Configuration field name
        field: String,
        /// Why it's invalid
        reason: String,
    },

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl ProvisionError {
    /// Creates an `InvalidConfig` error.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `IoctlFailed` error from an I/O error.
    #[must_use]
    pub fn ioctl_failed(err: &io::Error) -> Self {
        Self::IoctlFailed {
            code: err.raw_os_error().unwrap_or(-1),
        }
    }

    /// Creates a `DeviceOpenFailed` error from an I/O error.
    pub fn device_open_failed(path: impl Into<String>, err: &io::Error) -> Self {
        Self::DeviceOpenFailed {
            path: path.into(),
            code: err.raw_os_error().unwrap_or(-1),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if retrying could succeed without outside changes.
    ///
    /// Provisioning failures are never retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }

    /// Returns `true` if the failure is likely a missing privilege.
    #[must_use]
    pub fn requires_privileges(&self) -> bool {
        match self {
            Self::DeviceOpenFailed { .. } => true,
            Self::IoctlFailed { code } => *code == EPERM || *code == EACCES,
            Self::DeviceNodeOpenFailed { source, .. } => {
                source.kind() == io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }

    /// Returns `true` if the failure happened while searching the registry.
    #[must_use]
    pub const fn is_adapter_error(&self) -> bool {
        matches!(
            self,
            Self::AdapterNotFound { .. } | Self::NameLookupFailed { .. }
        )
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. } | Self::Common(_))
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ProvisionError::NoDescriptorProvided.to_string(), "No fd provided.");

        let err = ProvisionError::AdapterNotFound {
            component_id: "tap0901".into(),
        };
        assert!(err.to_string().starts_with("Error retrieving device guid."));
        assert!(err.to_string().contains("tap0901"));

        let err = ProvisionError::device_open_failed(
            r"\\.\Global\{X}.tap",
            &io::Error::from_raw_os_error(5),
        );
        assert!(err.to_string().contains("Are you running as root?"));
    }

    #[test]
    fn test_ioctl_error_code() {
        let err = ProvisionError::ioctl_failed(&io::Error::from_raw_os_error(1));
        assert!(matches!(err, ProvisionError::IoctlFailed { code: 1 }));
        assert!(err.requires_privileges());

        let err = ProvisionError::ioctl_failed(&io::Error::from_raw_os_error(22));
        assert!(!err.requires_privileges());
    }

    #[test]
    fn test_error_classification() {
        let err = ProvisionError::NameLookupFailed {
            instance_id: "{GUID}".into(),
        };
        assert!(err.is_adapter_error());
        assert!(!err.is_retryable());

        let err = ProvisionError::invalid_config("interface_name", "too long");
        assert!(err.is_config_error());

        let err = ProvisionError::DeviceNodeOpenFailed {
            path: "/dev/net/tun".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.requires_privileges());
    }
}
