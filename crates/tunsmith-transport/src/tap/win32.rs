// ============================================
// File: crates/tunsmith-transport/src/tap/win32.rs
// ============================================
//! # Win32 Backends
//!
//! `Registry` and `DeviceControl` over the real Win32 API. Every handle
//! is wrapped in a type whose `Drop` closes it.

#![cfg(windows)]

use std::ffi::c_void;
use std::io;
use std::iter;
use std::mem::ManuallyDrop;
use std::ptr;

use windows_sys::Win32::Foundation::{CloseHandle, ERROR_SUCCESS, HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, FILE_ATTRIBUTE_SYSTEM, FILE_FLAG_NO_BUFFERING, FILE_FLAG_WRITE_THROUGH,
    FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
};
use windows_sys::Win32::System::IO::DeviceIoControl;
use windows_sys::Win32::System::Registry::{
    RegCloseKey, RegEnumKeyExW, RegOpenKeyExW, RegQueryValueExW, HKEY, HKEY_LOCAL_MACHINE,
    KEY_READ, REG_EXPAND_SZ, REG_SZ,
};

use crate::handle::DeviceHandle;
use crate::tap::device::{DeviceControl, DeviceOpenOptions};
use crate::tap::registry::Registry;

/// Device access rights as used by the TAP driver's own tooling.
const FILE_READ_ACCESS: u32 = 0x0001;
const FILE_WRITE_ACCESS: u32 = 0x0002;

/// Longest registry key name.
const MAX_KEY_NAME: usize = 256;

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(iter::once(0)).collect()
}

fn win32_error(status: u32) -> io::Error {
    // Win32 error codes fit in i32.
    #[allow(clippy::cast_possible_wrap)]
    io::Error::from_raw_os_error(status as i32)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// An open registry key, closed on drop.
#[derive(Debug)]
pub struct RegKey(HKEY);

impl Drop for RegKey {
    fn drop(&mut self) {
        unsafe { RegCloseKey(self.0) };
    }
}

/// `Registry` over `HKEY_LOCAL_MACHINE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32Registry;

impl Win32Registry {
    fn open(parent: HKEY, path: &str) -> io::Result<RegKey> {
        let path = wide(path);
        let mut key: HKEY = ptr::null_mut();
        let status = unsafe { RegOpenKeyExW(parent, path.as_ptr(), 0, KEY_READ, &mut key) };
        if status != ERROR_SUCCESS {
            return Err(win32_error(status));
        }
        Ok(RegKey(key))
    }
}

impl Registry for Win32Registry {
    type Key = RegKey;

    fn open_machine_key(&self, path: &str) -> io::Result<RegKey> {
        Self::open(HKEY_LOCAL_MACHINE, path)
    }

    fn open_subkey(&self, parent: &RegKey, name: &str) -> io::Result<RegKey> {
        Self::open(parent.0, name)
    }

    fn subkey_name(&self, key: &RegKey, index: u32) -> Option<String> {
        let mut name = [0u16; MAX_KEY_NAME];
        #[allow(clippy::cast_possible_truncation)]
        let mut len = MAX_KEY_NAME as u32;
        let status = unsafe {
            RegEnumKeyExW(
                key.0,
                index,
                name.as_mut_ptr(),
                &mut len,
                ptr::null(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        if status != ERROR_SUCCESS {
            return None;
        }
        Some(String::from_utf16_lossy(&name[..len as usize]))
    }

    fn read_string(&self, key: &RegKey, value: &str) -> io::Result<String> {
        let value = wide(value);
        let mut kind = 0u32;
        let mut size = 0u32;

        let status = unsafe {
            RegQueryValueExW(
                key.0,
                value.as_ptr(),
                ptr::null(),
                &mut kind,
                ptr::null_mut(),
                &mut size,
            )
        };
        if status != ERROR_SUCCESS {
            return Err(win32_error(status));
        }
        if kind != REG_SZ && kind != REG_EXPAND_SZ {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "registry value is not a string",
            ));
        }

        let mut buf = vec![0u16; (size as usize / 2) + 1];
        let status = unsafe {
            RegQueryValueExW(
                key.0,
                value.as_ptr(),
                ptr::null(),
                &mut kind,
                buf.as_mut_ptr().cast::<u8>(),
                &mut size,
            )
        };
        if status != ERROR_SUCCESS {
            return Err(win32_error(status));
        }

        buf.truncate(size as usize / 2);
        while buf.last() == Some(&0) {
            buf.pop();
        }
        Ok(String::from_utf16_lossy(&buf))
    }
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// An open device handle, closed on drop.
#[derive(Debug)]
pub struct Win32Device(HANDLE);

// SAFETY: a HANDLE is an opaque kernel object reference that may be used
// and closed from any thread.
unsafe impl Send for Win32Device {}

impl Drop for Win32Device {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.0) };
    }
}

impl DeviceHandle for Win32Device {
    fn as_raw(&self) -> i64 {
        self.0 as isize as i64
    }

    fn into_raw(self: Box<Self>) -> i64 {
        let device = ManuallyDrop::new(*self);
        device.0 as isize as i64
    }
}

/// `DeviceControl` over `CreateFileW` and `DeviceIoControl`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32Devices;

impl DeviceControl for Win32Devices {
    type Device = Win32Device;

    fn open_device(&self, path: &str, options: &DeviceOpenOptions) -> io::Result<Win32Device> {
        let mut access = 0;
        if options.read {
            access |= FILE_READ_ACCESS;
        }
        if options.write {
            access |= FILE_WRITE_ACCESS;
        }

        let mut share = 0;
        if options.share_read {
            share |= FILE_SHARE_READ;
        }
        if options.share_write {
            share |= FILE_SHARE_WRITE;
        }

        let mut flags = FILE_ATTRIBUTE_SYSTEM;
        if options.no_buffering {
            flags |= FILE_FLAG_NO_BUFFERING;
        }
        if options.write_through {
            flags |= FILE_FLAG_WRITE_THROUGH;
        }

        let path = wide(path);
        let handle = unsafe {
            CreateFileW(
                path.as_ptr(),
                access,
                share,
                ptr::null(),
                OPEN_EXISTING,
                flags,
                ptr::null_mut(),
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            return Err(io::Error::last_os_error());
        }
        Ok(Win32Device(handle))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn control(
        &self,
        device: &Win32Device,
        code: u32,
        input: &[u8],
        output: &mut [u8],
    ) -> io::Result<u32> {
        let mut returned = 0u32;
        let ok = unsafe {
            DeviceIoControl(
                device.0,
                code,
                input.as_ptr().cast::<c_void>(),
                input.len() as u32,
                output.as_mut_ptr().cast::<c_void>(),
                output.len() as u32,
                &mut returned,
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(returned)
    }
}
