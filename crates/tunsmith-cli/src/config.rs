// ============================================
// File: crates/tunsmith-cli/src/config.rs
// ============================================
//! # CLI Configuration
//!
//! ## Creation Reason
//! Operators provision tunnels with site-specific interface names, TAP
//! driver ids and bring-up addressing. These live in a TOML file rather
//! than in a long list of flags.
//!
//! ## Main Functionality
//! - `CliConfig`: Main configuration structure
//! - TOML file loading and parsing
//! - Per-section validation
//! - Conversion into the library's `TunnelConfig`
//!
//! ## Configuration Sections
//! - `tunnel`: Linux interface name, device node, persistence
//! - `tap`: Windows driver component id, strict control mode
//! - `addressing`: bring-up addressing sent to the TAP driver
//! - `logging`: Log level
//!
//! ## Example Configuration
//! ```toml
//! [tunnel]
//! interface_name = "tun"
//! device_path = "/dev/net/tun"
//! persist = false
//!
//! [tap]
//! component_id = "tap0901"
//! strict_control = false
//!
//! [addressing]
//! local_address = "10.0.0.1"
//! network = "10.0.0.0"
//! netmask = "255.255.255.0"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every section and field is optional; missing ones take the defaults
//! - A missing `addressing.network` follows `local_address` and `netmask`
//! - Validate config before provisioning anything
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use tunsmith_common::BringUpAddressing;
use tunsmith_transport::tun::linux::TUN_DEVICE_PATH;
use tunsmith_transport::traits::{DEFAULT_COMPONENT_ID, DEFAULT_INTERFACE_NAME};
use tunsmith_transport::TunnelConfig;

use crate::error::{CliError, Result};

/// Accepted values of `logging.level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// ============================================
// CliConfig
// ============================================

/// Main CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Linux tunnel configuration.
    #[serde(default)]
    pub tunnel: TunnelSection,

    /// Windows TAP configuration.
    #[serde(default)]
    pub tap: TapSection,

    /// Bring-up addressing.
    #[serde(default)]
    pub addressing: BringUpAddressing,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl CliConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| CliError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    ///
    /// # Errors
    /// Returns error if the file exists but is invalid.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!("Config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.tunnel.validate()?;
        self.tap.validate()?;
        self.addressing.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Serializes configuration to TOML string.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CliError::internal(e.to_string()))
    }

    /// Builds the library configuration.
    #[must_use]
    pub fn to_tunnel_config(&self) -> TunnelConfig {
        TunnelConfig::new(self.tunnel.interface_name.clone())
            .with_persist(self.tunnel.persist)
            .with_component_id(self.tap.component_id.clone())
            .with_strict_control(self.tap.strict_control)
            .with_addressing(self.addressing)
    }
}

impl FromStr for CliConfig {
    type Err = CliError;

    /// Parses and validates configuration from a string.
    fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| CliError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================
// TunnelSection
// ============================================

/// Linux tunnel configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelSection {
    /// Name requested in `TUNSETIFF`; the kernel appends an index.
    #[serde(default = "default_interface_name")]
    pub interface_name: String,

    /// Device node opened when no descriptor is passed in.
    #[serde(default = "default_device_path")]
    pub device_path: PathBuf,

    /// Keep the interface after the descriptor is closed.
    #[serde(default)]
    pub persist: bool,
}

fn default_interface_name() -> String {
    DEFAULT_INTERFACE_NAME.to_string()
}

fn default_device_path() -> PathBuf {
    PathBuf::from(TUN_DEVICE_PATH)
}

impl TunnelSection {
    fn validate(&self) -> Result<()> {
        if self.interface_name.is_empty() {
            return Err(CliError::config_invalid(
                "tunnel.interface_name",
                "cannot be empty",
            ));
        }

        if self.interface_name.len() > 15 {
            return Err(CliError::config_invalid(
                "tunnel.interface_name",
                "cannot exceed 15 bytes",
            ));
        }

        if self.device_path.as_os_str().is_empty() {
            return Err(CliError::config_invalid(
                "tunnel.device_path",
                "cannot be empty",
            ));
        }

        Ok(())
    }
}

impl Default for TunnelSection {
    fn default() -> Self {
        Self {
            interface_name: default_interface_name(),
            device_path: default_device_path(),
            persist: false,
        }
    }
}

// ============================================
// TapSection
// ============================================

/// Windows TAP configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapSection {
    /// Driver component id to look for in the registry.
    #[serde(default = "default_component_id")]
    pub component_id: String,

    /// Fail when a bring-up control request fails.
    #[serde(default)]
    pub strict_control: bool,
}

fn default_component_id() -> String {
    DEFAULT_COMPONENT_ID.to_string()
}

impl TapSection {
    fn validate(&self) -> Result<()> {
        if self.component_id.is_empty() {
            return Err(CliError::config_invalid(
                "tap.component_id",
                "cannot be empty",
            ));
        }
        Ok(())
    }
}

impl Default for TapSection {
    fn default() -> Self {
        Self {
            component_id: default_component_id(),
            strict_control: false,
        }
    }
}

// ============================================
// LoggingSection
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingSection {
    fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.level.as_str()) {
            return Err(CliError::config_invalid(
                "logging.level",
                format!("must be one of {}", LOG_LEVELS.join(", ")),
            ));
        }
        Ok(())
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tunnel.device_path, PathBuf::from("/dev/net/tun"));
        assert_eq!(config.to_tunnel_config().component_id, "tap0901");
    }

    #[test]
    fn test_full_config_format() {
        let toml = r#"
            [tunnel]
            interface_name = "wg"
            device_path = "/dev/net/tun"
            persist = true

            [tap]
            component_id = "tap0801"
            strict_control = true

            [addressing]
            local_address = "172.16.0.1"
            network = "172.16.0.0"
            netmask = "255.255.0.0"

            [logging]
            level = "debug"
        "#;

        let config: CliConfig = toml.parse().unwrap();
        let tunnel = config.to_tunnel_config();

        assert_eq!(tunnel.interface_name, "wg");
        assert!(tunnel.persist);
        assert_eq!(tunnel.component_id, "tap0801");
        assert!(tunnel.strict_control);
        assert_eq!(tunnel.addressing.netmask, Ipv4Addr::new(255, 255, 0, 0));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: CliConfig = "[tap]\nstrict_control = true\n".parse().unwrap();

        assert!(config.tap.strict_control);
        assert_eq!(config.tap.component_id, "tap0901");
        assert_eq!(config.tunnel, TunnelSection::default());
        assert_eq!(config.addressing, BringUpAddressing::default());
    }

    #[test]
    fn test_addressing_with_only_local_address() {
        let config: CliConfig = "[addressing]\nlocal_address = \"192.168.7.1\"\n"
            .parse()
            .unwrap();

        assert_eq!(config.addressing.network, Ipv4Addr::new(192, 168, 7, 0));
        assert_eq!(config.addressing.netmask, Ipv4Addr::new(255, 255, 255, 0));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let long_name = "[tunnel]\ninterface_name = \"abcdefghijklmnop\"\n";
        assert!(long_name.parse::<CliConfig>().unwrap_err().is_config_error());

        let empty_component = "[tap]\ncomponent_id = \"\"\n";
        assert!(empty_component.parse::<CliConfig>().is_err());

        let bad_level = "[logging]\nlevel = \"loud\"\n";
        assert!(bad_level.parse::<CliConfig>().is_err());

        let bad_mask = "[addressing]\nnetmask = \"255.0.255.0\"\n";
        assert!(bad_mask.parse::<CliConfig>().unwrap_err().is_config_error());
    }

    #[test]
    fn test_malformed_toml() {
        let err = "[tunnel".parse::<CliConfig>().unwrap_err();
        assert!(matches!(err, CliError::ConfigLoad { .. }));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = CliConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(text.parse::<CliConfig>().unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = CliConfig::load("/nonexistent/tunsmith.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tunsmith.toml"));

        let config = CliConfig::load_or_default(Path::new("/nonexistent/tunsmith.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }
}
