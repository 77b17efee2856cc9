// ============================================
// File: crates/tunsmith-common/src/lib.rs
// ============================================
//! # tunsmith Common - Shared Types
//!
//! ## Creation Reason
//! Holds the small set of types shared by the provisioning library and the
//! operator CLI, so neither has to depend on the other.
//!
//! ## Main Functionality
//! - [`types`]: Bring-up addressing and its TAP driver word encoding
//! - [`error`]: Common error type and result alias
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 tunsmith-cli                        │
//! │                      │                              │
//! │                      ▼                              │
//! │              tunsmith-transport                     │
//! │                      │                              │
//! │                      ▼                              │
//! │              tunsmith-common  ◄── You are here      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Leaf crate: no internal dependencies, keep external ones minimal
//! - The addressing byte layout is consumed by a kernel driver; do not
//!   change `to_driver_bytes` without checking the TAP driver ABI
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod types;

pub use error::{CommonError, Result};
pub use types::BringUpAddressing;
