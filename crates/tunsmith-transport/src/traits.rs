// ============================================
// File: crates/tunsmith-transport/src/traits.rs
// ============================================
//! # Provisioning Traits
//!
//! ## Creation Reason
//! Linux, Windows and "everything else" provision tunnels in completely
//! different ways. Callers should depend on one interface and never on a
//! platform's types, so the platform choice lives behind
//! `TunnelProvisioner`.
//!
//! ## Main Functionality
//! - `TunnelProvisioner`: the "provision tunnel" capability
//! - `TunnelConfig`: interface name, TAP component id, addressing
//! - `Provisioned`, `BoundInterface`, `AdapterDescriptor`: success payloads
//!
//! ## ⚠️ Important Note for Next Developer
//! - Provisioning is blocking by contract; do not call it from an async
//!   executor thread without moving it off first
//! - Implementations must not cache adapter state between calls
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use std::fmt;

use tunsmith_common::BringUpAddressing;

use crate::error::{ProvisionError, Result};
use crate::handle::{RawDescriptor, TunnelHandle};

// ============================================
// Constants
// ============================================

/// Base interface name requested from the kernel; it appends an index.
pub const DEFAULT_INTERFACE_NAME: &str = "tun";

/// Driver component id of the general-purpose TAP adapter.
pub const DEFAULT_COMPONENT_ID: &str = "tap0901";

/// Maximum interface name length (IFNAMSIZ - 1).
pub const MAX_INTERFACE_NAME_LEN: usize = 15;

// ============================================
// Platform
// ============================================

/// Which provisioning mechanism a provisioner uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// `TUNSETIFF` on a caller-supplied descriptor.
    Linux,
    /// Registry lookup plus TAP device control.
    Windows,
    /// No tunnel support.
    Unsupported(&'static str),
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Windows => write!(f, "windows"),
            Self::Unsupported(name) => write!(f, "{name} (unsupported)"),
        }
    }
}

// ============================================
// Success Payloads
// ============================================

/// A caller-owned descriptor that is now attached to a TUN interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundInterface {
    /// The caller's descriptor, unchanged.
    pub fd: RawDescriptor,
    /// Interface name reported back by the kernel (e.g. `tun0`).
    pub name: String,
}

/// The TAP adapter found in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterDescriptor {
    /// `NetCfgInstanceId` of the adapter (a braced GUID).
    pub instance_id: String,
    /// User-visible connection name (e.g. `Ethernet 5`).
    pub connection_name: String,
}

/// Successful provisioning result.
#[derive(Debug)]
pub enum Provisioned {
    /// The caller's descriptor was bound; no new handle was created.
    Bound(BoundInterface),
    /// A device was opened and configured; the handle is now the caller's.
    Opened {
        /// Adapter that was brought up.
        adapter: AdapterDescriptor,
        /// Open device handle.
        handle: TunnelHandle,
    },
}

/// Outcome of one provisioning call: exactly one of success or error.
pub type ProvisioningOutcome = Result<Provisioned>;

// ============================================
// TunnelProvisioner Trait
// ============================================

/// The "provision tunnel" capability.
///
/// # Example
/// ```ignore
/// fn bring_up(provisioner: &dyn TunnelProvisioner, fd: Option<i32>) {
///     match provisioner.provision(fd) {
///         Ok(Provisioned::Bound(iface)) => println!("bound {}", iface.name),
///         Ok(Provisioned::Opened { handle, .. }) => keep(handle),
///         Err(e) => eprintln!("{e}"),
///     }
/// }
/// ```
pub trait TunnelProvisioner {
    /// Provisions a tunnel interface.
    ///
    /// # Arguments
    /// * `fd` - Open descriptor of the tunnel device node. Required on
    ///   Linux, ignored elsewhere.
    ///
    /// # Errors
    /// Returns the error of the first step that failed.
    fn provision(&self, fd: Option<RawDescriptor>) -> ProvisioningOutcome;

    /// Returns the mechanism this provisioner uses.
    fn platform(&self) -> Platform;
}

// ============================================
// TunnelConfig
// ============================================

/// Configuration for tunnel provisioning.
///
/// # Example
/// ```
/// use tunsmith_transport::traits::TunnelConfig;
///
/// let config = TunnelConfig::new("tun")
///     .with_component_id("tap0901")
///     .with_strict_control(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelConfig {
    /// Requested interface name (Linux).
    pub interface_name: String,
    /// Whether to mark the interface persistent after binding (Linux).
    pub persist: bool,
    /// Driver component id of the TAP adapter (Windows).
    pub component_id: String,
    /// Fail when a bring-up control request fails (Windows).
    pub strict_control: bool,
    /// Point-to-point addressing applied at bring-up (Windows).
    pub addressing: BringUpAddressing,
}

impl TunnelConfig {
    /// Creates a configuration with defaults for everything but the name.
    #[must_use]
    pub fn new(interface_name: impl Into<String>) -> Self {
        Self {
            interface_name: interface_name.into(),
            persist: false,
            component_id: DEFAULT_COMPONENT_ID.to_string(),
            strict_control: false,
            addressing: BringUpAddressing::default(),
        }
    }

    /// Sets whether the interface persists after the descriptor closes.
    #[must_use]
    pub const fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Sets the TAP component id to search for.
    #[must_use]
    pub fn with_component_id(mut self, component_id: impl Into<String>) -> Self {
        self.component_id = component_id.into();
        self
    }

    /// Enables or disables strict control-request checking.
    #[must_use]
    pub const fn with_strict_control(mut self, strict: bool) -> Self {
        self.strict_control = strict;
        self
    }

    /// Sets the bring-up addressing.
    #[must_use]
    pub const fn with_addressing(mut self, addressing: BringUpAddressing) -> Self {
        self.addressing = addressing;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        self.validate_interface_name()?;

        if self.component_id.is_empty() {
            return Err(ProvisionError::invalid_config(
                "component_id",
                "component id cannot be empty",
            ));
        }

        self.addressing.validate()?;

        Ok(())
    }

    /// Checks that the interface name fits `ifr_name` without truncation.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the name is empty or longer than 15 bytes.
    pub fn validate_interface_name(&self) -> Result<()> {
        if self.interface_name.is_empty() {
            return Err(ProvisionError::invalid_config(
                "interface_name",
                "interface name cannot be empty",
            ));
        }

        if self.interface_name.len() > MAX_INTERFACE_NAME_LEN {
            return Err(ProvisionError::invalid_config(
                "interface_name",
                "interface name cannot exceed 15 characters",
            ));
        }

        Ok(())
    }
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INTERFACE_NAME)
    }
}

// ============================================
// Tests
// ============================================
