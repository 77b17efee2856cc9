// ============================================
// File: crates/tunsmith-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! The point-to-point addressing applied when a TAP adapter is brought up
//! used to be three hard-coded integers. It is a configuration value now,
//! with the old literals as defaults.
//!
//! ## Main Functionality
//! - `BringUpAddressing`: local address, network, netmask
//! - Encoding into the 12-byte buffer the TAP driver expects
//!
//! ## Driver Word Layout
//! ```text
//! ┌──────────────┬──────────────┬──────────────┐
//! │ local (u32)  │ network (u32)│ netmask (u32)│
//! │ 0a 00 00 01  │ 0a 00 00 00  │ ff ff ff 00  │  bytes in memory
//! └──────────────┴──────────────┴──────────────┘
//!   word = u32::from_le_bytes(octets), stored little-endian
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, Result};

// ============================================
// Constants
// ============================================

/// Default local address of the tunnel endpoint.
pub const DEFAULT_LOCAL_ADDRESS: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

/// Default tunnel network.
pub const DEFAULT_NETWORK: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 0);

/// Default tunnel netmask.
pub const DEFAULT_NETMASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

/// Size of the encoded addressing buffer in bytes.
pub const DRIVER_ADDRESSING_LEN: usize = 12;

// ============================================
// BringUpAddressing
// ============================================

/// Point-to-point addressing applied to a virtual adapter at bring-up.
///
/// # Example
/// ```
/// use tunsmith_common::types::BringUpAddressing;
///
/// let addressing = BringUpAddressing::default();
/// assert_eq!(addressing.to_driver_words(), [0x0100_000a, 0x0000_000a, 0x00ff_ffff]);
/// ```
/// Fields left out when deserializing take their defaults, except a missing
/// `network`, which is derived as `local_address & netmask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "AddressingFields")]
pub struct BringUpAddressing {
    /// Address of the local tunnel endpoint.
    pub local_address: Ipv4Addr,
    /// Network the local address belongs to.
    pub network: Ipv4Addr,
    /// Network mask.
    pub netmask: Ipv4Addr,
}

/// Deserialization shape of `BringUpAddressing`, every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AddressingFields {
    local_address: Option<Ipv4Addr>,
    network: Option<Ipv4Addr>,
    netmask: Option<Ipv4Addr>,
}

impl From<AddressingFields> for BringUpAddressing {
    fn from(fields: AddressingFields) -> Self {
        let local_address = fields.local_address.unwrap_or(DEFAULT_LOCAL_ADDRESS);
        let netmask = fields.netmask.unwrap_or(DEFAULT_NETMASK);
        let network = fields
            .network
            .unwrap_or_else(|| Ipv4Addr::from(u32::from(local_address) & u32::from(netmask)));

        Self::new(local_address, network, netmask)
    }
}

impl BringUpAddressing {
    /// Creates an addressing triple.
    #[must_use]
    pub const fn new(local_address: Ipv4Addr, network: Ipv4Addr, netmask: Ipv4Addr) -> Self {
        Self {
            local_address,
            network,
            netmask,
        }
    }

    /// Returns the CIDR prefix length of the netmask.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn prefix_len(&self) -> u8 {
        u32::from(self.netmask).count_ones() as u8
    }

    /// Validates the triple.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the netmask is not contiguous or the
    /// network does not match `local_address & netmask`.
    pub fn validate(&self) -> Result<()> {
        let mask = u32::from(self.netmask);
        if mask.leading_ones() + mask.trailing_zeros() != 32 {
            return Err(CommonError::invalid_input(
                "netmask",
                format!("{} is not a contiguous mask", self.netmask),
            ));
        }

        let expected = u32::from(self.local_address) & mask;
        if u32::from(self.network) != expected {
            return Err(CommonError::invalid_input(
                "network",
                format!(
                    "{} does not contain {} (expected {})",
                    self.network,
                    self.local_address,
                    Ipv4Addr::from(expected)
                ),
            ));
        }

        Ok(())
    }

    /// Returns the three words in the order the TAP driver reads them.
    ///
    /// Each word holds the address octets in memory order, so on the wire
    /// the bytes read exactly like the dotted quad.
    #[must_use]
    pub fn to_driver_words(&self) -> [u32; 3] {
        [
            u32::from_le_bytes(self.local_address.octets()),
            u32::from_le_bytes(self.network.octets()),
            u32::from_le_bytes(self.netmask.octets()),
        ]
    }

    /// Encodes the triple into the buffer passed with the addressing request.
    #[must_use]
    pub fn to_driver_bytes(&self) -> [u8; DRIVER_ADDRESSING_LEN] {
        let mut buf = [0u8; DRIVER_ADDRESSING_LEN];
        for (chunk, word) in buf.chunks_exact_mut(4).zip(self.to_driver_words()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        buf
    }
}

impl Default for BringUpAddressing {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_ADDRESS, DEFAULT_NETWORK, DEFAULT_NETMASK)
    }
}

impl fmt::Display for BringUpAddressing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {}/{}",
            self.local_address,
            self.network,
            self.prefix_len()
        )
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_words_match_driver_literals() {
        let words = BringUpAddressing::default().to_driver_words();
        assert_eq!(words[0], 0x0100_000a);
        assert_eq!(words[1], 0x0000_000a);
        assert_eq!(words[2], 0x00ff_ffff);
    }

    #[test]
    fn test_driver_bytes_follow_octet_order() {
        let bytes = BringUpAddressing::default().to_driver_bytes();
        assert_eq!(
            bytes,
            [10, 0, 0, 1, 10, 0, 0, 0, 255, 255, 255, 0]
        );
    }

    #[test]
    fn test_validate() {
        assert!(BringUpAddressing::default().validate().is_ok());

        let gapped = BringUpAddressing::new(
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 0),
            Ipv4Addr::new(255, 0, 255, 0),
        );
        assert!(gapped.validate().is_err());

        let wrong_network = BringUpAddressing::new(
            Ipv4Addr::new(10, 0, 1, 1),
            Ipv4Addr::new(10, 0, 0, 0),
            Ipv4Addr::new(255, 255, 255, 0),
        );
        assert!(wrong_network.validate().is_err());
    }

    #[test]
    fn test_display_and_prefix() {
        let addressing = BringUpAddressing::default();
        assert_eq!(addressing.prefix_len(), 24);
        assert_eq!(addressing.to_string(), "10.0.0.1 on 10.0.0.0/24");
    }

    #[test]
    fn test_serde_defaults() {
        let parsed: BringUpAddressing =
            serde_json::from_str(r#"{"local_address":"192.168.7.1"}"#).unwrap();
        assert_eq!(parsed.local_address, Ipv4Addr::new(192, 168, 7, 1));
        assert_eq!(parsed.netmask, DEFAULT_NETMASK);
    }

    #[test]
    fn test_missing_network_follows_local_address() {
        let parsed: BringUpAddressing =
            serde_json::from_str(r#"{"local_address":"192.168.7.1"}"#).unwrap();
        assert_eq!(parsed.network, Ipv4Addr::new(192, 168, 7, 0));
        assert!(parsed.validate().is_ok());

        let parsed: BringUpAddressing = serde_json::from_str(
            r#"{"local_address":"172.16.4.9","netmask":"255.255.0.0"}"#,
        )
        .unwrap();
        assert_eq!(parsed.network, Ipv4Addr::new(172, 16, 0, 0));

        // An explicit network is kept, even when it does not match.
        let parsed: BringUpAddressing =
            serde_json::from_str(r#"{"local_address":"192.168.7.1","network":"10.0.0.0"}"#)
                .unwrap();
        assert_eq!(parsed.network, DEFAULT_NETWORK);
        assert!(parsed.validate().is_err());

        let parsed: BringUpAddressing = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, BringUpAddressing::default());
    }
}
