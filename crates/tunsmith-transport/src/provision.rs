// ============================================
// File: crates/tunsmith-transport/src/provision.rs
// ============================================
//! # Provisioning Entry Point
//!
//! ## Creation Reason
//! Embedders want one call that provisions a tunnel on whatever platform
//! they were built for, and one result shape to hand across their own
//! boundary.
//!
//! ## Main Functionality
//! - `platform_provisioner`: the build target's `TunnelProvisioner`
//! - `setup_tunnel` / `setup_tun`: validate, provision, log
//! - `WireOutcome`: the outcome flattened to `handle` / `interface` / `error`
//!
//! ## Platform Selection
//! | Target | Provisioner | `fd` |
//! |--------|-------------|------|
//! | Linux | `TunBinder<SysTunControl>` | required |
//! | Windows | `TapProvisioner<Win32Registry, Win32Devices>` | ignored |
//! | Other | `UnsupportedProvisioner` | ignored |
//!
//! ## ⚠️ Important Note for Next Developer
//! - Converting an outcome into `WireOutcome` transfers any opened handle
//!   out of Rust ownership; the receiver must close it
//!
//! ## Last Modified
//! v0.1.0 - Initial entry point

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::handle::RawDescriptor;
use crate::traits::{Provisioned, ProvisioningOutcome, TunnelConfig, TunnelProvisioner};

// ============================================
// Platform Selection
// ============================================

/// Returns the provisioner for the platform this crate was built for.
///
/// The provisioner does not validate the whole of `config`; only the
/// Linux binder re-checks the interface name. Call
/// [`TunnelConfig::validate`] first, or use [`setup_tunnel`].
#[cfg(target_os = "linux")]
#[must_use]
pub fn platform_provisioner(config: &TunnelConfig) -> Box<dyn TunnelProvisioner> {
    use crate::tun::{SysTunControl, TunBinder};

    Box::new(TunBinder::new(SysTunControl, config.clone()))
}

/// Returns the provisioner for the platform this crate was built for.
#[cfg(windows)]
#[must_use]
pub fn platform_provisioner(config: &TunnelConfig) -> Box<dyn TunnelProvisioner> {
    use crate::tap::{TapProvisioner, Win32Devices, Win32Registry};

    Box::new(TapProvisioner::new(Win32Registry, Win32Devices, config.clone()))
}

/// Returns the provisioner for the platform this crate was built for.
#[cfg(not(any(target_os = "linux", windows)))]
#[must_use]
pub fn platform_provisioner(_config: &TunnelConfig) -> Box<dyn TunnelProvisioner> {
    Box::new(crate::tun::UnsupportedProvisioner::current())
}

// ============================================
// Entry Points
// ============================================

/// Provisions a tunnel with the platform provisioner.
///
/// # Arguments
/// * `fd` - Open `/dev/net/tun` descriptor on Linux; ignored elsewhere
/// * `config` - Validated before anything touches the OS
///
/// # Errors
/// `InvalidConfig` / `Common` for a bad configuration, otherwise the error of
/// the first provisioning step that failed.
pub fn setup_tunnel(fd: Option<RawDescriptor>, config: &TunnelConfig) -> ProvisioningOutcome {
    config.validate()?;

    let provisioner = platform_provisioner(config);
    provision_with(provisioner.as_ref(), fd)
}

/// Provisions a tunnel with the default configuration.
///
/// # Errors
/// See [`setup_tunnel`].
pub fn setup_tun(fd: Option<RawDescriptor>) -> ProvisioningOutcome {
    setup_tunnel(fd, &TunnelConfig::default())
}

/// Runs one provisioning call through `provisioner`, logging the outcome.
///
/// No configuration is validated here; see [`setup_tunnel`].
///
/// # Errors
/// Whatever `provisioner` returns.
pub fn provision_with(
    provisioner: &dyn TunnelProvisioner,
    fd: Option<RawDescriptor>,
) -> ProvisioningOutcome {
    debug!("Provisioning tunnel via {} (fd: {:?})", provisioner.platform(), fd);

    match provisioner.provision(fd) {
        Ok(provisioned) => {
            match &provisioned {
                Provisioned::Bound(bound) => {
                    info!("Tunnel ready: interface {} on fd {}", bound.name, bound.fd);
                }
                Provisioned::Opened { adapter, handle } => {
                    info!(
                        "Tunnel ready: adapter '{}' handle {}",
                        adapter.connection_name,
                        handle.as_raw()
                    );
                }
            }
            Ok(provisioned)
        }
        Err(e) => {
            warn!("Tunnel provisioning failed: {}", e);
            Err(e)
        }
    }
}

// ============================================
// WireOutcome
// ============================================

/// A provisioning outcome as plain data.
///
/// Serializes to exactly one of:
/// - `{"handle": 412}`
/// - `{"interface": "tun0", "fd": 42}`
/// - `{"error": "No fd provided."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireOutcome {
    /// An opened device handle, now owned by the receiver.
    Handle {
        /// Raw handle value.
        handle: i64,
    },
    /// A caller descriptor bound to an interface.
    Interface {
        /// Kernel-assigned interface name.
        interface: String,
        /// The caller's descriptor.
        fd: RawDescriptor,
    },
    /// Provisioning failed.
    Error {
        /// Human-readable message.
        error: String,
    },
}

impl WireOutcome {
    /// Returns `true` unless this is an error.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Error { .. })
    }

    /// Serializes to a single-line JSON object.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<ProvisioningOutcome> for WireOutcome {
    fn from(outcome: ProvisioningOutcome) -> Self {
        match outcome {
            Ok(Provisioned::Bound(bound)) => Self::Interface {
                interface: bound.name,
                fd: bound.fd,
            },
            Ok(Provisioned::Opened { handle, .. }) => Self::Handle {
                handle: handle.into_raw(),
            },
            Err(e) => Self::Error {
                error: e.to_string(),
            },
        }
    }
}

// ============================================
// Tests
// ============================================
