// ============================================
// File: crates/tunsmith-transport/src/tap/registry.rs
// ============================================
//! # TAP Adapter Registry Lookup
//!
//! ## Creation Reason
//! Windows has no device node for the TAP adapter. It has to be found by
//! scanning the network adapter class in the registry for the entry whose
//! driver component id is the TAP driver's, and its connection name read
//! from a second location.
//!
//! ## Main Functionality
//! - `Registry`: seam over read-only registry access
//! - `find_tap_adapter`: first adapter whose `ComponentId` matches
//! - `resolve_connection_name`: `Name` under the adapter's `Connection` key
//!
//! ## Registry Layout
//! ```text
//! HKLM\SYSTEM\CurrentControlSet\Control\Class\{4D36E972-…}
//!   ├── 0000   ComponentId = "pci\ven_8086…"
//!   ├── 0001   ComponentId = "tap0901"   NetCfgInstanceId = "{GUID}"
//!   └── …
//! HKLM\SYSTEM\CurrentControlSet\Control\Network\{4D36E972-…}\{GUID}\Connection
//!              Name = "Ethernet 5"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Keys are RAII values: every key opened here is closed when it goes
//!   out of scope, including on early returns
//! - Subkeys that cannot be opened or have no `ComponentId` are skipped
//!
//! ## Last Modified
//! v0.1.0 - Initial registry lookup

use std::io;

use tracing::{debug, info, warn};

use crate::error::{ProvisionError, Result};

// ============================================
// Constants
// ============================================

/// Class key enumerating installed network adapters.
pub const ADAPTER_CLASS_KEY: &str =
    r"SYSTEM\CurrentControlSet\Control\Class\{4D36E972-E325-11CE-BFC1-08002BE10318}";

/// Root of the per-adapter network connection keys.
pub const NETWORK_CONNECTIONS_KEY: &str =
    r"SYSTEM\CurrentControlSet\Control\Network\{4D36E972-E325-11CE-BFC1-08002BE10318}";

/// Value holding the driver component id.
pub const COMPONENT_ID_VALUE: &str = "ComponentId";

/// Value holding the adapter instance id.
pub const INSTANCE_ID_VALUE: &str = "NetCfgInstanceId";

/// Value holding the connection name.
pub const CONNECTION_NAME_VALUE: &str = "Name";

// ============================================
// Registry Trait
// ============================================

/// Read-only access to `HKEY_LOCAL_MACHINE`.
///
/// `Key` must close the underlying registry handle when dropped.
pub trait Registry {
    /// An open registry key.
    type Key;

    /// Opens `path` under `HKEY_LOCAL_MACHINE` for reading.
    ///
    /// # Errors
    /// Returns the OS error if the key does not exist or access is denied.
    fn open_machine_key(&self, path: &str) -> io::Result<Self::Key>;

    /// Opens the child `name` of `parent` for reading.
    ///
    /// # Errors
    /// Returns the OS error if the key cannot be opened.
    fn open_subkey(&self, parent: &Self::Key, name: &str) -> io::Result<Self::Key>;

    /// Returns the name of the child at `index`, or `None` once enumeration
    /// is exhausted (or fails).
    fn subkey_name(&self, key: &Self::Key, index: u32) -> Option<String>;

    /// Reads a string value.
    ///
    /// # Errors
    /// Returns the OS error if the value is missing or not a string.
    fn read_string(&self, key: &Self::Key, value: &str) -> io::Result<String>;
}

/// Builds the path of an adapter's `Connection` key.
#[must_use]
pub fn connection_key_path(instance_id: &str) -> String {
    format!(r"{NETWORK_CONNECTIONS_KEY}\{instance_id}\Connection")
}

// ============================================
// Adapter Resolver
// ============================================

/// Finds the first installed adapter whose driver is `component_id`.
///
/// Subkeys are visited in index order until enumeration ends. Keys that
/// cannot be opened, or have no readable component id, are skipped.
///
/// # Returns
/// The adapter's `NetCfgInstanceId`.
///
/// # Errors
/// `AdapterNotFound` if the class key cannot be opened, nothing matches,
/// or the matching entry has no readable instance id.
pub fn find_tap_adapter<R: Registry>(registry: &R, component_id: &str) -> Result<String> {
    let not_found = || ProvisionError::AdapterNotFound {
        component_id: component_id.to_string(),
    };

    let class_key = registry.open_machine_key(ADAPTER_CLASS_KEY).map_err(|e| {
        warn!("Failed to open adapter class key: {}", e);
        not_found()
    })?;

    let mut index = 0;
    while let Some(name) = registry.subkey_name(&class_key, index) {
        index += 1;

        let adapter_key = match registry.open_subkey(&class_key, &name) {
            Ok(key) => key,
            Err(e) => {
                debug!("Skipping adapter {}: {}", name, e);
                continue;
            }
        };

        let Ok(found) = registry.read_string(&adapter_key, COMPONENT_ID_VALUE) else {
            debug!("Skipping adapter {}: no {}", name, COMPONENT_ID_VALUE);
            continue;
        };

        if found != component_id {
            continue;
        }

        return match registry.read_string(&adapter_key, INSTANCE_ID_VALUE) {
            Ok(instance_id) => {
                info!("Found {} adapter {} at {}", component_id, instance_id, name);
                Ok(instance_id)
            }
            Err(e) => {
                warn!("Adapter {} matched but has no {}: {}", name, INSTANCE_ID_VALUE, e);
                Err(not_found())
            }
        };
    }

    debug!("Scanned {} adapters, none with component id {}", index, component_id);
    Err(not_found())
}

// ============================================
// Adapter Name Lookup
// ============================================

/// Reads the user-visible connection name of adapter `instance_id`.
///
/// # Errors
/// `NameLookupFailed` if the key cannot be opened or the value read.
pub fn resolve_connection_name<R: Registry>(registry: &R, instance_id: &str) -> Result<String> {
    let path = connection_key_path(instance_id);

    let lookup = registry
        .open_machine_key(&path)
        .and_then(|key| registry.read_string(&key, CONNECTION_NAME_VALUE));

    match lookup {
        Ok(name) => {
            debug!("Adapter {} is connection '{}'", instance_id, name);
            Ok(name)
        }
        Err(e) => {
            warn!("Failed to read connection name at {}: {}", path, e);
            Err(ProvisionError::NameLookupFailed {
                instance_id: instance_id.to_string(),
            })
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRegistry;

    const GUID: &str = "{8E0A4B1C-56F2-4C1E-9E1A-3D7B2F0C9A11}";

    #[test]
    fn test_connection_key_path() {
        assert_eq!(
            connection_key_path("{GUID}"),
            r"SYSTEM\CurrentControlSet\Control\Network\{4D36E972-E325-11CE-BFC1-08002BE10318}\{GUID}\Connection"
        );
    }

    #[test]
    fn test_finds_matching_adapter() {
        let registry = MockRegistry::new()
            .with_adapter("0000", Some("pci\\ven_8086"), Some("{OTHER}"))
            .with_adapter("0001", Some("tap0901"), Some(GUID));

        assert_eq!(find_tap_adapter(&registry, "tap0901").unwrap(), GUID);
        assert_eq!(registry.open_handles(), 0);
    }

    #[test]
    fn test_first_match_wins() {
        let registry = MockRegistry::new()
            .with_adapter("0000", Some("tap0901"), Some("{FIRST}"))
            .with_adapter("0001", Some("tap0901"), Some("{SECOND}"));

        assert_eq!(find_tap_adapter(&registry, "tap0901").unwrap(), "{FIRST}");
        assert!(!registry.opened_paths().iter().any(|p| p.ends_with("0001")));
    }

    #[test]
    fn test_skips_unreadable_entries() {
        let registry = MockRegistry::new()
            .with_locked_adapter("0000")
            .with_adapter("0001", None, None)
            .with_adapter("0002", Some("tap0901"), Some(GUID));

        assert_eq!(find_tap_adapter(&registry, "tap0901").unwrap(), GUID);
        assert_eq!(registry.open_handles(), 0);
    }

    #[test]
    fn test_no_match_is_adapter_not_found() {
        let registry = MockRegistry::new()
            .with_adapter("0000", Some("pci\\ven_8086"), Some("{OTHER}"))
            .with_adapter("0001", Some("tap0801"), Some("{OLD}"));

        let err = find_tap_adapter(&registry, "tap0901").unwrap_err();
        assert!(matches!(err, ProvisionError::AdapterNotFound { .. }));
        assert_eq!(registry.open_handles(), 0);
    }

    #[test]
    fn test_component_id_must_match_exactly() {
        let registry = MockRegistry::new().with_adapter("0000", Some("TAP0901"), Some(GUID));
        assert!(find_tap_adapter(&registry, "tap0901").is_err());
    }

    #[test]
    fn test_missing_class_key() {
        let registry = MockRegistry::empty();
        let err = find_tap_adapter(&registry, "tap0901").unwrap_err();
        assert!(matches!(err, ProvisionError::AdapterNotFound { .. }));
        assert_eq!(registry.total_opened(), 0);
    }

    #[test]
    fn test_match_without_instance_id() {
        let registry = MockRegistry::new().with_adapter("0000", Some("tap0901"), None);
        let err = find_tap_adapter(&registry, "tap0901").unwrap_err();
        assert!(matches!(err, ProvisionError::AdapterNotFound { .. }));
        assert_eq!(registry.open_handles(), 0);
    }

    #[test]
    fn test_resolve_connection_name() {
        let registry = MockRegistry::new().with_connection(GUID, "Ethernet 5");

        assert_eq!(resolve_connection_name(&registry, GUID).unwrap(), "Ethernet 5");
        assert_eq!(registry.open_handles(), 0);
    }

    #[test]
    fn test_resolve_connection_name_missing() {
        let registry = MockRegistry::new();

        let err = resolve_connection_name(&registry, GUID).unwrap_err();
        assert!(matches!(err, ProvisionError::NameLookupFailed { ref instance_id } if instance_id == GUID));
        assert_eq!(registry.open_handles(), 0);
    }
}
