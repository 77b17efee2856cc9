// ============================================
// File: crates/tunsmith-transport/src/mock.rs
// ============================================
//! # Mock OS Backends
//!
//! ## Creation Reason
//! Provisioning talks to the registry, device files and kernel ioctls,
//! none of which a test run can rely on. These in-memory backends stand in
//! for them and record every call.
//!
//! ## Main Functionality
//! - `MockRegistry`: configurable key tree with open/close counting
//! - `MockDevices`: device opens and control requests, with failure knobs
//! - `MockTunControl`: `TUNSETIFF` that echoes `tun0` like the kernel
//!
//! ## Usage in Tests
//! ```ignore
//! use tunsmith_transport::mock::MockRegistry;
//! use tunsmith_transport::tap::find_tap_adapter;
//!
//! let registry = MockRegistry::new().with_adapter("0001", Some("tap0901"), Some("{GUID}"));
//! assert_eq!(find_tap_adapter(&registry, "tap0901").unwrap(), "{GUID}");
//! assert_eq!(registry.open_handles(), 0);
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Test-only; enabled by `cfg(test)` or the `mock` feature
//! - Mocks are cheap to clone and clones share state, so a test can keep a
//!   copy for assertions after moving one into a provisioner
//!
//! ## Last Modified
//! v0.1.0 - Initial mock backends

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::handle::{DeviceHandle, RawDescriptor};
use crate::tap::device::{DeviceControl, DeviceOpenOptions};
use crate::tap::registry::{
    connection_key_path, Registry, ADAPTER_CLASS_KEY, COMPONENT_ID_VALUE, CONNECTION_NAME_VALUE,
    INSTANCE_ID_VALUE,
};
use crate::tun::linux::{IfReq, TunControl};

/// `ERROR_FILE_NOT_FOUND`
const NOT_FOUND: i32 = 2;
/// `ERROR_ACCESS_DENIED`
const ACCESS_DENIED: i32 = 5;

// ============================================
// MockRegistry
// ============================================

#[derive(Debug, Default)]
struct KeyData {
    values: HashMap<String, String>,
    children: Vec<String>,
    locked: bool,
}

#[derive(Debug, Default)]
struct KeyTracker {
    opened: usize,
    closed: usize,
    paths: Vec<String>,
}

/// In-memory `HKEY_LOCAL_MACHINE`.
#[derive(Debug, Clone, Default)]
pub struct MockRegistry {
    keys: Arc<Mutex<HashMap<String, KeyData>>>,
    tracker: Arc<Mutex<KeyTracker>>,
}

/// An open mock key; dropping it counts as a close.
#[derive(Debug)]
pub struct MockKey {
    path: String,
    tracker: Arc<Mutex<KeyTracker>>,
}

impl Drop for MockKey {
    fn drop(&mut self) {
        self.tracker.lock().closed += 1;
    }
}

impl MockRegistry {
    /// Creates a registry with an empty adapter class key.
    #[must_use]
    pub fn new() -> Self {
        let registry = Self::empty();
        registry
            .keys
            .lock()
            .insert(ADAPTER_CLASS_KEY.to_string(), KeyData::default());
        registry
    }

    /// Creates a registry without even the adapter class key.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds adapter subkey `name` under the class key.
    ///
    /// `None` leaves the corresponding value out.
    #[must_use]
    pub fn with_adapter(
        self,
        name: &str,
        component_id: Option<&str>,
        instance_id: Option<&str>,
    ) -> Self {
        let mut data = KeyData::default();
        if let Some(id) = component_id {
            data.values.insert(COMPONENT_ID_VALUE.to_string(), id.to_string());
        }
        if let Some(id) = instance_id {
            data.values.insert(INSTANCE_ID_VALUE.to_string(), id.to_string());
        }
        self.insert_adapter(name, data);
        self
    }

    /// Adds adapter subkey `name` that refuses to be opened.
    #[must_use]
    pub fn with_locked_adapter(self, name: &str) -> Self {
        self.insert_adapter(
            name,
            KeyData {
                locked: true,
                ..KeyData::default()
            },
        );
        self
    }

    /// Adds the `Connection` key of adapter `instance_id`.
    #[must_use]
    pub fn with_connection(self, instance_id: &str, name: &str) -> Self {
        let mut data = KeyData::default();
        data.values
            .insert(CONNECTION_NAME_VALUE.to_string(), name.to_string());
        self.keys.lock().insert(connection_key_path(instance_id), data);
        self
    }

    fn insert_adapter(&self, name: &str, data: KeyData) {
        let mut keys = self.keys.lock();
        keys.entry(ADAPTER_CLASS_KEY.to_string())
            .or_default()
            .children
            .push(name.to_string());
        keys.insert(format!(r"{ADAPTER_CLASS_KEY}\{name}"), data);
    }

    /// Keys opened and not yet closed.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        let tracker = self.tracker.lock();
        tracker.opened - tracker.closed
    }

    /// Total number of successful opens.
    #[must_use]
    pub fn total_opened(&self) -> usize {
        self.tracker.lock().opened
    }

    /// Paths of every successful open, in order.
    #[must_use]
    pub fn opened_paths(&self) -> Vec<String> {
        self.tracker.lock().paths.clone()
    }
}

impl Registry for MockRegistry {
    type Key = MockKey;

    fn open_machine_key(&self, path: &str) -> io::Result<MockKey> {
        match self.keys.lock().get(path) {
            None => return Err(io::Error::from_raw_os_error(NOT_FOUND)),
            Some(data) if data.locked => return Err(io::Error::from_raw_os_error(ACCESS_DENIED)),
            Some(_) => {}
        }

        let mut tracker = self.tracker.lock();
        tracker.opened += 1;
        tracker.paths.push(path.to_string());

        Ok(MockKey {
            path: path.to_string(),
            tracker: Arc::clone(&self.tracker),
        })
    }

    fn open_subkey(&self, parent: &MockKey, name: &str) -> io::Result<MockKey> {
        self.open_machine_key(&format!(r"{}\{}", parent.path, name))
    }

    fn subkey_name(&self, key: &MockKey, index: u32) -> Option<String> {
        let keys = self.keys.lock();
        keys.get(&key.path)?.children.get(index as usize).cloned()
    }

    fn read_string(&self, key: &MockKey, value: &str) -> io::Result<String> {
        self.keys
            .lock()
            .get(&key.path)
            .and_then(|data| data.values.get(value).cloned())
            .ok_or_else(|| io::Error::from_raw_os_error(NOT_FOUND))
    }
}

// ============================================
// MockDevices
// ============================================

/// A control request seen by `MockDevices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRequest {
    /// Raw handle the request was sent to.
    pub device: i64,
    /// Control code.
    pub code: u32,
    /// Input buffer contents.
    pub input: Vec<u8>,
}

#[derive(Debug, Default)]
struct DeviceState {
    opens: Vec<(String, DeviceOpenOptions)>,
    requests: Vec<MockRequest>,
    opened: usize,
    closed: usize,
    released: usize,
    open_error: Option<i32>,
    control_error: Option<i32>,
    /// Restricts `control_error` to one control code.
    failing_code: Option<u32>,
}

/// In-memory device files.
#[derive(Debug, Clone, Default)]
pub struct MockDevices {
    state: Arc<Mutex<DeviceState>>,
}

/// An open mock device.
#[derive(Debug)]
pub struct MockDevice {
    raw: i64,
    released: bool,
    state: Arc<Mutex<DeviceState>>,
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if self.released {
            state.released += 1;
        } else {
            state.closed += 1;
        }
    }
}

impl DeviceHandle for MockDevice {
    fn as_raw(&self) -> i64 {
        self.raw
    }

    fn into_raw(mut self: Box<Self>) -> i64 {
        self.released = true;
        self.raw
    }
}

impl MockDevices {
    /// Creates devices that open and accept every request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates devices whose open fails with `code`.
    #[must_use]
    pub fn failing_open(code: i32) -> Self {
        let devices = Self::new();
        devices.state.lock().open_error = Some(code);
        devices
    }

    /// Creates devices that reject every control request with `code`.
    #[must_use]
    pub fn failing_control(code: i32) -> Self {
        let devices = Self::new();
        devices.state.lock().control_error = Some(code);
        devices
    }

    /// Creates devices that reject only control code `control_code`, with
    /// OS error `err`.
    #[must_use]
    pub fn failing_control_code(control_code: u32, err: i32) -> Self {
        let devices = Self::new();
        {
            let mut state = devices.state.lock();
            state.control_error = Some(err);
            state.failing_code = Some(control_code);
        }
        devices
    }

    /// Opens a device directly, bypassing failure knobs.
    #[must_use]
    pub fn open_for_test(&self, path: &str) -> MockDevice {
        self.register_open(path, crate::tap::device::TAP_OPEN_OPTIONS)
    }

    fn register_open(&self, path: &str, options: DeviceOpenOptions) -> MockDevice {
        let mut state = self.state.lock();
        state.opened += 1;
        state.opens.push((path.to_string(), options));
        // Windows handles are multiples of 4.
        #[allow(clippy::cast_possible_wrap)]
        let raw = (0x100 + state.opened * 4) as i64;
        MockDevice {
            raw,
            released: false,
            state: Arc::clone(&self.state),
        }
    }

    /// Every successful open, in order.
    #[must_use]
    pub fn opens(&self) -> Vec<(String, DeviceOpenOptions)> {
        self.state.lock().opens.clone()
    }

    /// Every control request, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<MockRequest> {
        self.state.lock().requests.clone()
    }

    /// Devices opened and neither closed nor released.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        let state = self.state.lock();
        state.opened - state.closed - state.released
    }

    /// Devices closed by drop.
    #[must_use]
    pub fn closed(&self) -> usize {
        self.state.lock().closed
    }

    /// Devices handed over through `into_raw`.
    #[must_use]
    pub fn released(&self) -> usize {
        self.state.lock().released
    }
}

impl DeviceControl for MockDevices {
    type Device = MockDevice;

    fn open_device(&self, path: &str, options: &DeviceOpenOptions) -> io::Result<MockDevice> {
        if let Some(code) = self.state.lock().open_error {
            return Err(io::Error::from_raw_os_error(code));
        }
        Ok(self.register_open(path, *options))
    }

    fn control(
        &self,
        device: &MockDevice,
        code: u32,
        input: &[u8],
        output: &mut [u8],
    ) -> io::Result<u32> {
        let mut state = self.state.lock();
        state.requests.push(MockRequest {
            device: device.raw,
            code,
            input: input.to_vec(),
        });

        if let Some(err) = state.control_error {
            if state.failing_code.map_or(true, |c| c == code) {
                return Err(io::Error::from_raw_os_error(err));
            }
        }

        // Buffered requests echo the input back.
        let len = input.len().min(output.len());
        output[..len].copy_from_slice(&input[..len]);
        #[allow(clippy::cast_possible_truncation)]
        Ok(len as u32)
    }
}

// ============================================
// MockTunControl
// ============================================

/// A `TUNSETIFF` call seen by `MockTunControl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunCall {
    /// Descriptor the request was issued on.
    pub fd: RawDescriptor,
    /// Flags in the request.
    pub flags: i16,
    /// Name in the request before the kernel rewrote it.
    pub requested_name: String,
}

#[derive(Debug, Default)]
struct TunState {
    calls: Vec<TunCall>,
    persist_calls: usize,
    errno: Option<i32>,
}

/// Stand-in for the kernel's tunnel ioctls.
#[derive(Debug, Clone, Default)]
pub struct MockTunControl {
    state: Arc<Mutex<TunState>>,
}

impl MockTunControl {
    /// Creates a control that accepts every request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a control that rejects `TUNSETIFF` with `errno`.
    #[must_use]
    pub fn failing(errno: i32) -> Self {
        let control = Self::new();
        control.state.lock().errno = Some(errno);
        control
    }

    /// Every `TUNSETIFF` call, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<TunCall> {
        self.state.lock().calls.clone()
    }

    /// Number of `TUNSETPERSIST` calls.
    #[must_use]
    pub fn persist_calls(&self) -> usize {
        self.state.lock().persist_calls
    }
}

impl TunControl for MockTunControl {
    fn set_iff(&self, fd: RawDescriptor, ifr: &mut IfReq) -> io::Result<()> {
        let mut state = self.state.lock();
        state.calls.push(TunCall {
            fd,
            flags: ifr.flags(),
            requested_name: ifr.name(),
        });

        if let Some(errno) = state.errno {
            return Err(io::Error::from_raw_os_error(errno));
        }

        // The kernel appends the first free index.
        let assigned = format!("{}0", ifr.name());
        ifr.set_name(&assigned);
        Ok(())
    }

    fn set_persist(&self, _fd: RawDescriptor, _persist: bool) -> io::Result<()> {
        self.state.lock().persist_calls += 1;
        Ok(())
    }
}
