// ============================================
// File: crates/tunsmith-transport/src/tap/mod.rs
// ============================================
//! # Windows TAP Provisioning
//!
//! ## Creation Reason
//! Provisions the TAP adapter on Windows: registry lookup, then device
//! bring-up. The logic is written against the `Registry` and
//! `DeviceControl` traits so it builds and is tested on every platform;
//! only the Win32 backends are Windows-only.
//!
//! ## Main Logical Flow
//! ```text
//! find_tap_adapter ──► resolve_connection_name ──► configure
//!  (instance id)         (connection name)          (TunnelHandle)
//!        │                       │                        │
//!        ▼                       ▼                        ▼
//!  AdapterNotFound        NameLookupFailed         DeviceOpenFailed
//! ```
//! The first failing step ends provisioning; nothing is retried.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Opening the device usually needs an elevated process
//! - No adapter state is cached between calls
//!
//! ## Last Modified
//! v0.1.0 - Initial TAP provisioning

pub mod device;
pub mod registry;
#[cfg(windows)]
pub mod win32;

use tracing::info;

use crate::handle::RawDescriptor;
use crate::traits::{
    AdapterDescriptor, Platform, Provisioned, ProvisioningOutcome, TunnelConfig, TunnelProvisioner,
};

pub use device::{configure, DeviceControl, DeviceOpenOptions};
pub use registry::{find_tap_adapter, resolve_connection_name, Registry};
#[cfg(windows)]
pub use win32::{Win32Devices, Win32Registry};

// ============================================
// TapProvisioner
// ============================================

/// The Windows `TunnelProvisioner`.
///
/// # Example
/// ```ignore
/// use tunsmith_transport::tap::{TapProvisioner, Win32Devices, Win32Registry};
///
/// let provisioner = TapProvisioner::new(Win32Registry, Win32Devices, TunnelConfig::default());
/// let outcome = provisioner.provision(None);
/// ```
#[derive(Debug)]
pub struct TapProvisioner<R, D> {
    registry: R,
    devices: D,
    config: TunnelConfig,
}

impl<R: Registry, D: DeviceControl> TapProvisioner<R, D> {
    /// Creates a provisioner over the given backends.
    pub fn new(registry: R, devices: D, config: TunnelConfig) -> Self {
        Self {
            registry,
            devices,
            config,
        }
    }

    /// Looks up the adapter without opening its device.
    ///
    /// # Errors
    /// `AdapterNotFound` or `NameLookupFailed`.
    pub fn resolve_adapter(&self) -> crate::error::Result<AdapterDescriptor> {
        let instance_id = find_tap_adapter(&self.registry, &self.config.component_id)?;
        let connection_name = resolve_connection_name(&self.registry, &instance_id)?;

        Ok(AdapterDescriptor {
            instance_id,
            connection_name,
        })
    }
}

impl<R: Registry, D: DeviceControl> TunnelProvisioner for TapProvisioner<R, D> {
    fn provision(&self, _fd: Option<RawDescriptor>) -> ProvisioningOutcome {
        let adapter = self.resolve_adapter()?;

        info!(
            "Bringing up TAP adapter '{}' ({})",
            adapter.connection_name, adapter.instance_id
        );

        let handle = configure(
            &self.devices,
            &adapter.instance_id,
            &self.config.addressing,
            self.config.strict_control,
        )?;

        Ok(Provisioned::Opened { adapter, handle })
    }

    fn platform(&self) -> Platform {
        Platform::Windows
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProvisionError;
    use crate::mock::{MockDevices, MockRegistry};

    const GUID: &str = "{8E0A4B1C-56F2-4C1E-9E1A-3D7B2F0C9A11}";

    fn installed_registry() -> MockRegistry {
        MockRegistry::new()
            .with_adapter("0000", Some("pci\\ven_10ec"), Some("{NIC}"))
            .with_adapter("0001", Some("tap0901"), Some(GUID))
            .with_connection(GUID, "Ethernet 5")
    }

    #[test]
    fn test_full_provisioning() {
        let registry = installed_registry();
        let devices = MockDevices::new();
        let provisioner =
            TapProvisioner::new(registry.clone(), devices.clone(), TunnelConfig::default());

        let outcome = provisioner.provision(None).unwrap();
        let Provisioned::Opened { adapter, handle } = outcome else {
            panic!("expected an opened device");
        };

        assert_eq!(adapter.instance_id, GUID);
        assert_eq!(adapter.connection_name, "Ethernet 5");
        assert_eq!(devices.opens()[0].0, format!(r"\\.\Global\{GUID}.tap"));
        assert_eq!(
            devices.requests()[1].input,
            vec![10, 0, 0, 1, 10, 0, 0, 0, 255, 255, 255, 0]
        );
        assert_eq!(registry.open_handles(), 0);

        drop(handle);
        assert_eq!(devices.open_handles(), 0);
    }

    #[test]
    fn test_adapter_missing_opens_no_device() {
        let registry = MockRegistry::new().with_adapter("0000", Some("pci\\ven_10ec"), Some("{NIC}"));
        let devices = MockDevices::new();
        let provisioner =
            TapProvisioner::new(registry.clone(), devices.clone(), TunnelConfig::default());

        let err = provisioner.provision(None).unwrap_err();
        assert!(matches!(err, ProvisionError::AdapterNotFound { .. }));
        assert!(devices.opens().is_empty());
        assert_eq!(registry.open_handles(), 0);
    }

    #[test]
    fn test_name_lookup_failure_opens_no_device() {
        let registry = MockRegistry::new().with_adapter("0000", Some("tap0901"), Some(GUID));
        let devices = MockDevices::new();
        let provisioner =
            TapProvisioner::new(registry.clone(), devices.clone(), TunnelConfig::default());

        let err = provisioner.provision(None).unwrap_err();
        assert!(matches!(err, ProvisionError::NameLookupFailed { .. }));
        assert!(devices.opens().is_empty());
        assert_eq!(registry.open_handles(), 0);
    }

    #[test]
    fn test_descriptor_is_ignored() {
        let devices = MockDevices::new();
        let provisioner =
            TapProvisioner::new(installed_registry(), devices.clone(), TunnelConfig::default());

        assert!(provisioner.provision(Some(42)).is_ok());
        assert_eq!(devices.opens().len(), 1);
    }

    #[test]
    fn test_custom_component_id() {
        let registry = MockRegistry::new()
            .with_adapter("0000", Some("tap0901"), Some(GUID))
            .with_adapter("0001", Some("tap0801"), Some("{LEGACY}"))
            .with_connection("{LEGACY}", "Legacy TAP");
        let provisioner = TapProvisioner::new(
            registry,
            MockDevices::new(),
            TunnelConfig::default().with_component_id("tap0801"),
        );

        let adapter = provisioner.resolve_adapter().unwrap();
        assert_eq!(adapter.instance_id, "{LEGACY}");
        assert_eq!(adapter.connection_name, "Legacy TAP");
    }

    #[test]
    fn test_repeated_calls_repeat_the_same_steps() {
        let registry = installed_registry();
        let devices = MockDevices::new();
        let provisioner =
            TapProvisioner::new(registry.clone(), devices.clone(), TunnelConfig::default());

        // Each device open gets a fresh raw handle, so requests are
        // compared by code and payload only.
        let sent = |devices: &MockDevices| -> Vec<(u32, Vec<u8>)> {
            devices
                .requests()
                .into_iter()
                .map(|r| (r.code, r.input))
                .collect()
        };

        drop(provisioner.provision(None).unwrap());
        let first_keys = registry.opened_paths();
        let first_opens = devices.opens();
        let first_requests = sent(&devices);

        drop(provisioner.provision(None).unwrap());
        let all_keys = registry.opened_paths();
        let all_opens = devices.opens();
        let all_requests = sent(&devices);

        assert_eq!(all_keys.len(), first_keys.len() * 2);
        assert_eq!(&all_keys[first_keys.len()..], first_keys.as_slice());
        assert_eq!(&all_opens[first_opens.len()..], first_opens.as_slice());
        assert_eq!(all_requests.len(), first_requests.len() * 2);
        assert_eq!(&all_requests[first_requests.len()..], first_requests.as_slice());

        // Every request went to the device opened in its own run.
        let requests = devices.requests();
        assert_ne!(requests[0].device, requests[2].device);
        assert_eq!(requests[0].device, requests[1].device);
        assert_eq!(requests[2].device, requests[3].device);
        assert_eq!(registry.open_handles(), 0);
        assert_eq!(devices.open_handles(), 0);
    }
}
