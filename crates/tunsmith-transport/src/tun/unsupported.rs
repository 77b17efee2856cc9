// ============================================
// File: crates/tunsmith-transport/src/tun/unsupported.rs
// ============================================
//! # Unsupported Platform Stub
//!
//! Platforms without a tunnel mechanism (macOS included) fail with an
//! explicit `Unsupported` error rather than an empty result that looks
//! like success.

use tracing::warn;

use crate::error::ProvisionError;
use crate::handle::RawDescriptor;
use crate::traits::{Platform, ProvisioningOutcome, TunnelProvisioner};

/// Provisioner for platforms with no tunnel support.
#[derive(Debug, Clone, Copy)]
pub struct UnsupportedProvisioner {
    platform: &'static str,
}

impl UnsupportedProvisioner {
    /// Creates a stub reporting `platform` in its error.
    #[must_use]
    pub const fn new(platform: &'static str) -> Self {
        Self { platform }
    }

    /// Creates a stub named after the build target.
    #[must_use]
    pub const fn current() -> Self {
        Self::new(std::env::consts::OS)
    }
}

impl TunnelProvisioner for UnsupportedProvisioner {
    fn provision(&self, _fd: Option<RawDescriptor>) -> ProvisioningOutcome {
        warn!("Tunnel provisioning requested on unsupported platform {}", self.platform);
        Err(ProvisionError::Unsupported {
            platform: self.platform,
        })
    }

    fn platform(&self) -> Platform {
        Platform::Unsupported(self.platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_unsupported() {
        let stub = UnsupportedProvisioner::new("macos");

        for fd in [None, Some(3)] {
            let err = stub.provision(fd).unwrap_err();
            assert!(matches!(err, ProvisionError::Unsupported { platform: "macos" }));
        }
        assert_eq!(stub.platform(), Platform::Unsupported("macos"));
    }
}
