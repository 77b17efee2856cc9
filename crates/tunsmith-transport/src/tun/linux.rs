// ============================================
// File: crates/tunsmith-transport/src/tun/linux.rs
// ============================================
//! # Linux TUN Binding
//!
//! ## Creation Reason
//! On Linux the embedder opens `/dev/net/tun` itself and hands us the
//! descriptor. Our job is the one `TUNSETIFF` request that turns that
//! descriptor into a TUN interface.
//!
//! ## Main Functionality
//! - `IfReq`: the `struct ifreq` layout the kernel expects
//! - `TunControl`: seam over the ioctl calls (real or mock)
//! - `TunBinder`: the Linux `TunnelProvisioner`
//! - `open_tun_device`: host-side open + bind, closing on failure
//!
//! ## Linux TUN Interface
//! 1. Caller opens `/dev/net/tun` read/write
//! 2. `TUNSETIFF` with `IFF_TUN | IFF_NO_PI` and name `"tun"`
//! 3. Kernel picks `tun0`, `tun1`, … and writes it back into the request
//!
//! ## Required Capabilities
//! - `CAP_NET_ADMIN`: for `TUNSETIFF`
//! - Or run as root
//!
//! ## ⚠️ Important Note for Next Developer
//! - The binder never closes the caller's descriptor, success or not
//! - Always set IFF_NO_PI to avoid packet info headers
//! - Test with the mock control when possible
//!
//! ## Last Modified
//! v0.1.0 - Initial Linux binding

use std::io;

use tracing::{debug, info, warn};

use crate::error::{ProvisionError, Result};
use crate::handle::RawDescriptor;
use crate::traits::{
    BoundInterface, Platform, Provisioned, ProvisioningOutcome, TunnelConfig, TunnelProvisioner,
};

// ============================================
// Constants
// ============================================

/// Path to the TUN device clone device.
pub const TUN_DEVICE_PATH: &str = "/dev/net/tun";

/// Size of `ifr_name`, including the NUL terminator.
pub const IFNAMSIZ: usize = 16;

/// IFF_TUN flag - TUN device (no Ethernet headers).
pub const IFF_TUN: i16 = 0x0001;

/// IFF_NO_PI flag - Do not provide packet information.
pub const IFF_NO_PI: i16 = 0x1000;

/// TUNSETIFF ioctl number.
pub const TUNSETIFF: u64 = 0x4004_54ca;

/// TUNSETPERSIST ioctl number.
pub const TUNSETPERSIST: u64 = 0x4004_54cb;

// ============================================
// ifreq Structure
// ============================================

/// Interface request structure for ioctl calls.
///
/// Same size and layout as the kernel's `struct ifreq` (40 bytes); only the
/// name and flags members are used.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct IfReq {
    ifr_name: [u8; IFNAMSIZ],
    ifr_flags: i16,
    _padding: [u8; 22],
}

impl IfReq {
    /// Creates a zeroed request carrying `name` (truncated to 15 bytes).
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut ifr = Self {
            ifr_name: [0; IFNAMSIZ],
            ifr_flags: 0,
            _padding: [0; 22],
        };

        let name_bytes = name.as_bytes();
        let copy_len = name_bytes.len().min(IFNAMSIZ - 1);
        ifr.ifr_name[..copy_len].copy_from_slice(&name_bytes[..copy_len]);

        ifr
    }

    /// Sets the interface flags.
    #[must_use]
    pub const fn with_flags(mut self, flags: i16) -> Self {
        self.ifr_flags = flags;
        self
    }

    /// Returns the flags currently in the request.
    #[must_use]
    pub const fn flags(&self) -> i16 {
        self.ifr_flags
    }

    /// Returns the name currently in the request.
    #[must_use]
    pub fn name(&self) -> String {
        let len = self
            .ifr_name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(IFNAMSIZ);
        String::from_utf8_lossy(&self.ifr_name[..len]).into_owned()
    }

    /// Overwrites the name, as the kernel does after `TUNSETIFF`.
    pub fn set_name(&mut self, name: &str) {
        *self = Self::new(name).with_flags(self.ifr_flags);
    }
}

impl std::fmt::Debug for IfReq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IfReq")
            .field("name", &self.name())
            .field("flags", &format_args!("{:#06x}", self.ifr_flags))
            .finish()
    }
}

// ============================================
// TunControl
// ============================================

/// The tunnel ioctls issued against a descriptor.
pub trait TunControl {
    /// Issues `TUNSETIFF`; on success the kernel has rewritten `ifr`'s name.
    ///
    /// # Errors
    /// Returns the OS error if the kernel rejects the request.
    fn set_iff(&self, fd: RawDescriptor, ifr: &mut IfReq) -> io::Result<()>;

    /// Issues `TUNSETPERSIST`.
    ///
    /// # Errors
    /// Returns the OS error if the kernel rejects the request.
    fn set_persist(&self, fd: RawDescriptor, persist: bool) -> io::Result<()>;
}

/// `TunControl` backed by real `ioctl(2)` calls.
#[cfg(target_os = "linux")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SysTunControl;

#[cfg(target_os = "linux")]
impl TunControl for SysTunControl {
    fn set_iff(&self, fd: RawDescriptor, ifr: &mut IfReq) -> io::Result<()> {
        use nix::libc;

        let result = unsafe { libc::ioctl(fd, TUNSETIFF as _, ifr as *mut IfReq) };
        if result < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn set_persist(&self, fd: RawDescriptor, persist: bool) -> io::Result<()> {
        use nix::libc;

        let result = unsafe { libc::ioctl(fd, TUNSETPERSIST as _, libc::c_ulong::from(persist)) };
        if result < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

// ============================================
// TunBinder
// ============================================

/// Binds caller-supplied descriptors to TUN interfaces.
///
/// # Example
/// ```ignore
/// use tunsmith_transport::tun::linux::{SysTunControl, TunBinder};
/// use tunsmith_transport::traits::TunnelConfig;
///
/// let binder = TunBinder::new(SysTunControl, TunnelConfig::default());
/// let bound = binder.bind(fd)?;
/// println!("fd {} is now {}", bound.fd, bound.name);
/// ```
#[derive(Debug)]
pub struct TunBinder<C> {
    control: C,
    config: TunnelConfig,
}

impl<C: TunControl> TunBinder<C> {
    /// Creates a binder using `control` for the ioctl calls.
    pub fn new(control: C, config: TunnelConfig) -> Self {
        Self { control, config }
    }

    /// Returns the ioctl backend.
    pub fn control(&self) -> &C {
        &self.control
    }

    /// Attaches `fd` to a TUN interface without packet information.
    ///
    /// # Errors
    /// - `InvalidConfig`: the interface name is empty or would be truncated
    /// - `IoctlFailed`: the kernel rejected `TUNSETIFF`
    pub fn bind(&self, fd: RawDescriptor) -> Result<BoundInterface> {
        self.config.validate_interface_name()?;

        let mut ifr = IfReq::new(&self.config.interface_name).with_flags(IFF_TUN | IFF_NO_PI);

        debug!("Issuing TUNSETIFF on fd {} for {:?}", fd, ifr);

        self.control.set_iff(fd, &mut ifr).map_err(|e| {
            warn!("TUNSETIFF failed on fd {}: {}", fd, e);
            ProvisionError::ioctl_failed(&e)
        })?;

        let name = ifr.name();

        if self.config.persist {
            if let Err(e) = self.control.set_persist(fd, true) {
                warn!("Failed to set TUN persistence on {}: {}", name, e);
            }
        }

        info!("Bound fd {} to TUN interface {}", fd, name);
        Ok(BoundInterface { fd, name })
    }

    /// Opens the device node at `path`, binds it, and returns the owned
    /// descriptor. If binding fails the descriptor is closed before the
    /// error is returned.
    ///
    /// # Errors
    /// - `DeviceNodeOpenFailed`: the node could not be opened
    /// - `IoctlFailed`: the kernel rejected `TUNSETIFF`
    #[cfg(unix)]
    pub fn open_and_bind(
        &self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<(crate::handle::TunnelHandle, BoundInterface)> {
        use std::fs::OpenOptions;
        use std::os::fd::{AsRawFd, OwnedFd};

        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| ProvisionError::DeviceNodeOpenFailed {
                path: path.display().to_string(),
                source,
            })?;

        let fd: OwnedFd = file.into();
        // `fd` is dropped, and so closed, if bind returns early.
        let bound = self.bind(fd.as_raw_fd())?;

        Ok((crate::handle::TunnelHandle::new(fd), bound))
    }
}

impl<C: TunControl> TunnelProvisioner for TunBinder<C> {
    fn provision(&self, fd: Option<RawDescriptor>) -> ProvisioningOutcome {
        let Some(fd) = fd else {
            return Err(ProvisionError::NoDescriptorProvided);
        };
        self.bind(fd).map(Provisioned::Bound)
    }

    fn platform(&self) -> Platform {
        Platform::Linux
    }
}

/// Opens `/dev/net/tun` (or `path`) and binds it with the real kernel ioctl.
///
/// # Errors
/// See [`TunBinder::open_and_bind`].
#[cfg(target_os = "linux")]
pub fn open_tun_device(
    path: impl AsRef<std::path::Path>,
    config: &TunnelConfig,
) -> Result<(crate::handle::TunnelHandle, BoundInterface)> {
    TunBinder::new(SysTunControl, config.clone()).open_and_bind(path)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTunControl;

    // Binding against the real kernel needs CAP_NET_ADMIN; these tests
    // drive the binder through the mock control instead.

    #[test]
    fn test_ifreq_layout() {
        assert_eq!(std::mem::size_of::<IfReq>(), 40);
    }

    #[test]
    fn test_ifreq_creation() {
        let ifr = IfReq::new("tun").with_flags(IFF_TUN | IFF_NO_PI);

        assert_eq!(ifr.name(), "tun");
        assert_eq!(ifr.flags(), 0x1001);
    }

    #[test]
    fn test_ifreq_name_truncation() {
        let ifr = IfReq::new(&"a".repeat(20));
        assert_eq!(ifr.name().len(), IFNAMSIZ - 1);
    }

    #[test]
    fn test_bind_success_keeps_descriptor() {
        let control = MockTunControl::new();
        let binder = TunBinder::new(control.clone(), TunnelConfig::default());

        let outcome = binder.provision(Some(42)).unwrap();
        let Provisioned::Bound(bound) = outcome else {
            panic!("expected a bound interface");
        };
        assert_eq!(bound.fd, 42);
        assert_eq!(bound.name, "tun0");

        let calls = control.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].fd, 42);
        assert_eq!(calls[0].flags, IFF_TUN | IFF_NO_PI);
        assert_eq!(calls[0].requested_name, "tun");
    }

    #[test]
    fn test_bind_failure_reports_errno() {
        let control = MockTunControl::failing(1);
        let binder = TunBinder::new(control.clone(), TunnelConfig::default());

        let err = binder.provision(Some(42)).unwrap_err();
        assert!(matches!(err, ProvisionError::IoctlFailed { code: 1 }));
        assert_eq!(control.calls().len(), 1);
    }

    #[test]
    fn test_missing_descriptor_skips_ioctl() {
        let control = MockTunControl::new();
        let binder = TunBinder::new(control.clone(), TunnelConfig::default());

        let err = binder.provision(None).unwrap_err();
        assert!(matches!(err, ProvisionError::NoDescriptorProvided));
        assert!(control.calls().is_empty());
    }

    #[test]
    fn test_persist_requested_only_when_configured() {
        let control = MockTunControl::new();
        TunBinder::new(control.clone(), TunnelConfig::default())
            .bind(7)
            .unwrap();
        assert_eq!(control.persist_calls(), 0);

        let binder = TunBinder::new(control.clone(), TunnelConfig::default().with_persist(true));
        binder.bind(7).unwrap();
        assert_eq!(control.persist_calls(), 1);
    }

    #[test]
    fn test_overlong_name_rejected_before_ioctl() {
        let control = MockTunControl::new();
        let binder = TunBinder::new(control.clone(), TunnelConfig::new("t".repeat(16)));

        let err = binder.provision(Some(42)).unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidConfig { .. }));
        assert!(control.calls().is_empty());

        let binder = TunBinder::new(control.clone(), TunnelConfig::new("t".repeat(15)));
        assert!(binder.bind(42).is_ok());
        assert_eq!(control.calls()[0].requested_name, "t".repeat(15));
    }

    #[cfg(unix)]
    #[test]
    fn test_open_and_bind_missing_node() {
        let binder = TunBinder::new(MockTunControl::new(), TunnelConfig::default());
        let err = binder
            .open_and_bind("/nonexistent/tunsmith/tun")
            .unwrap_err();
        assert!(matches!(err, ProvisionError::DeviceNodeOpenFailed { .. }));
        assert!(binder.control().calls().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_open_and_bind_returns_owned_handle() {
        let binder = TunBinder::new(MockTunControl::new(), TunnelConfig::default());
        let (handle, bound) = binder.open_and_bind("/dev/null").unwrap();

        assert_eq!(handle.as_raw(), i64::from(bound.fd));
        assert_eq!(bound.name, "tun0");
    }
}
