// ============================================
// File: crates/tunsmith-transport/src/tun/mod.rs
// ============================================
//! # TUN Device Module
//!
//! ## Creation Reason
//! Groups the provisioners that work on POSIX-style descriptors, plus the
//! stub used where no tunnel mechanism exists.
//!
//! ## Platform Implementations
//! - `linux`: `TUNSETIFF` on a descriptor of `/dev/net/tun`. The binding
//!   logic builds everywhere so it can be tested against the mock control;
//!   the real ioctl backend is Linux-only.
//! - `unsupported`: explicit `Unsupported` error (macOS and the rest)
//!
//! ## What is a TUN Device?
//! A TUN device is a virtual network interface that operates at
//! Layer 3 (IP). Userspace reads and writes raw IP packets through
//! the bound descriptor.
//!
//! ## ⚠️ Important Note for Next Developer
//! - TUN operations require root or CAP_NET_ADMIN capability
//! - Device names are limited to 15 characters on Linux
//!
//! ## Last Modified
//! v0.1.0 - Initial TUN module structure

pub mod linux;
pub mod unsupported;

#[cfg(target_os = "linux")]
pub use linux::{open_tun_device, SysTunControl};
pub use linux::{TunBinder, TunControl};
pub use unsupported::UnsupportedProvisioner;
