// ============================================
// File: crates/tunsmith-transport/src/handle.rs
// ============================================
//! # Tunnel Handle
//!
//! ## Creation Reason
//! A provisioned tunnel is an open OS handle whose ownership passes to the
//! caller. Passing it around as a bare integer made it unclear who closes
//! it. `TunnelHandle` owns the handle, closes it on drop, and offers one
//! consuming `into_raw()` for callers that take over.
//!
//! ## Ownership Rules
//! - Dropping a `TunnelHandle` closes the underlying handle
//! - `into_raw()` consumes it; the caller must close the returned value
//! - Provisioning code never returns a handle it has not fully configured,
//!   so every failure path drops (and closes) it
//!
//! ## Last Modified
//! v0.1.0 - Initial handle type

use std::fmt;

/// POSIX file descriptor as passed in by the caller.
pub type RawDescriptor = i32;

// ============================================
// DeviceHandle
// ============================================

/// An open OS handle that closes itself on drop.
///
/// Implemented by `OwnedFd` on Unix, the Win32 device handle on Windows,
/// and the mock device in tests.
pub trait DeviceHandle: Send + fmt::Debug {
    /// Returns the raw handle value without giving up ownership.
    fn as_raw(&self) -> i64;

    /// Releases ownership and returns the raw value without closing it.
    fn into_raw(self: Box<Self>) -> i64;
}

#[cfg(unix)]
impl DeviceHandle for std::os::fd::OwnedFd {
    fn as_raw(&self) -> i64 {
        use std::os::fd::AsRawFd;
        i64::from(self.as_raw_fd())
    }

    fn into_raw(self: Box<Self>) -> i64 {
        use std::os::fd::IntoRawFd;
        i64::from((*self).into_raw_fd())
    }
}

// ============================================
// TunnelHandle
// ============================================

/// Owned handle to a provisioned tunnel device.
///
/// # Example
/// ```ignore
/// let (handle, bound) = tunsmith_transport::tun::linux::open_tun_device("/dev/net/tun", &config)?;
/// // Hand the descriptor to code that closes it itself.
/// let fd = handle.into_raw();
/// println!("{} is on fd {}", bound.name, fd);
/// ```
pub struct TunnelHandle {
    inner: Box<dyn DeviceHandle>,
}

impl TunnelHandle {
    /// Wraps an open device handle.
    pub fn new<D: DeviceHandle + 'static>(device: D) -> Self {
        Self {
            inner: Box::new(device),
        }
    }

    /// Returns the raw handle value. Ownership stays with `self`.
    #[must_use]
    pub fn as_raw(&self) -> i64 {
        self.inner.as_raw()
    }

    /// Transfers ownership of the handle to the caller.
    ///
    /// After this call nothing closes the handle; the caller must.
    #[must_use = "the returned handle leaks unless the caller closes it"]
    pub fn into_raw(self) -> i64 {
        self.inner.into_raw()
    }
}

impl fmt::Debug for TunnelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelHandle")
            .field("raw", &self.as_raw())
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevices;

    #[test]
    fn test_drop_closes_handle() {
        let devices = MockDevices::new();
        let handle = TunnelHandle::new(devices.open_for_test(r"\\.\Global\{A}.tap"));
        assert_eq!(devices.open_handles(), 1);

        drop(handle);
        assert_eq!(devices.open_handles(), 0);
        assert_eq!(devices.released(), 0);
    }

    #[test]
    fn test_into_raw_transfers_ownership() {
        let devices = MockDevices::new();
        let handle = TunnelHandle::new(devices.open_for_test(r"\\.\Global\{A}.tap"));
        let raw = handle.as_raw();

        assert_eq!(handle.into_raw(), raw);
        // Released to the caller: counted as no longer ours, but not closed.
        assert_eq!(devices.open_handles(), 0);
        assert_eq!(devices.released(), 1);
        assert_eq!(devices.closed(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_owned_fd_round_trip() {
        use std::os::fd::{FromRawFd, OwnedFd};

        let file = std::fs::File::open("/dev/null").unwrap();
        let fd: OwnedFd = file.into();
        let handle = TunnelHandle::new(fd);
        let raw = handle.into_raw();
        assert!(raw >= 0);

        // Take it back so the descriptor is closed.
        let _owned = unsafe { OwnedFd::from_raw_fd(raw as i32) };
    }
}
