// ============================================
// File: crates/tunsmith-cli/src/lib.rs
// ============================================
//! # Tunsmith CLI Library
//!
//! ## Creation Reason
//! Holds the pieces of the `tunsmith` binary that are worth testing on
//! their own: configuration loading and the CLI error type.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: TOML configuration management
//! - [`error`]: CLI-specific error types
//!
//! ## Command Flow
//! ```text
//! tunsmith setup ──► CliConfig::load ──► to_tunnel_config ──► setup_tunnel
//!                                                                  │
//!                                     stdout (text / JSON) ◄── WireOutcome
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `setup` needs root or CAP_NET_ADMIN on Linux, Administrator on Windows
//! - Configuration changes apply to the next invocation only
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;

// Re-export primary types
pub use config::CliConfig;
pub use error::{CliError, Result};
