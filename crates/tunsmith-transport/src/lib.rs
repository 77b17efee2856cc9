// ============================================
// File: crates/tunsmith-transport/src/lib.rs
// ============================================
//! # Tunsmith Transport - Tunnel Provisioning
//!
//! ## Creation Reason
//! Provisions the virtual network interface a tunnel reads and writes
//! packets through: a TUN interface on Linux, the TAP-Windows adapter on
//! Windows, and an explicit "unsupported" everywhere else.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`traits`]: `TunnelProvisioner` and the configuration / result types
//! - [`tun`]: Linux `TUNSETIFF` binding and the unsupported-platform stub
//! - [`tap`]: Windows registry lookup and device bring-up
//! - [`provision`]: platform selection, entry points, `WireOutcome`
//! - [`handle`]: owned device handles
//! - [`error`]: provisioning error type
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 tunsmith-cli                        │
//! │                      │                              │
//! │                      ▼                              │
//! │              tunsmith-transport                     │
//! │              You are here ◄──                       │
//! │                      │                              │
//! │                      ▼                              │
//! │               tunsmith-common                       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Platform Support
//! | Platform | Mechanism | Needs |
//! |----------|-----------|-------|
//! | Linux | `TUNSETIFF` on caller's fd | `CAP_NET_ADMIN` |
//! | Windows | TAP-Windows (`tap0901`) | Administrator |
//! | macOS / other | ❌ `Unsupported` | - |
//!
//! ## ⚠️ Important Note for Next Developer
//! - Provisioning requires elevated privileges on every supported platform
//! - Always use traits for testability
//! - Platform-specific code must be isolated
//! - Mock implementations available with `mock` feature
//!
//! ## Last Modified
//! v0.1.0 - Initial provisioning layer

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handle;
pub mod provision;
pub mod tap;
pub mod traits;
pub mod tun;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export primary types
pub use error::{ProvisionError, Result};
pub use handle::{RawDescriptor, TunnelHandle};
pub use provision::{platform_provisioner, provision_with, setup_tun, setup_tunnel, WireOutcome};
pub use traits::{
    AdapterDescriptor, BoundInterface, Platform, Provisioned, ProvisioningOutcome, TunnelConfig,
    TunnelProvisioner,
};

#[cfg(target_os = "linux")]
pub use tun::open_tun_device;
