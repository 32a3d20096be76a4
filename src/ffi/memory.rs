//! Allocation, Release, Errors and Configuration
//!
//! The allocation table every other export hands its results to, plus the
//! bridge-level entry points: version, last error, configuration and the
//! name-dispatched registry.

use std::os::raw::c_char;

use parking_lot::Mutex;

use super::{guard, guard_alloc, hand_over_buffer, hand_over_text, host_out, host_str, HostBuffer};
use crate::config::{self, BridgeConfig};
use crate::runtime::{Allocations, OwnedBuffer};
use crate::wrappers::{WrapperError, WrapperRegistry};

lazy_static::lazy_static! {
    /// Owner of every buffer handed to the host
    pub(crate) static ref ALLOCATIONS: Mutex<Allocations> = Mutex::new(Allocations::new());

    /// Operations reachable through `bridge_call`
    static ref REGISTRY: WrapperRegistry = WrapperRegistry::with_builtins();
}

static VERSION: &str = concat!("hostbridge ", env!("CARGO_PKG_VERSION"), "\0");

// ========== Buffers ==========

/// Allocate `size` zeroed bytes owned by the host; null on failure
#[no_mangle]
pub extern "C" fn bridge_alloc(size: usize) -> *mut u8 {
    guard("bridge_alloc", std::ptr::null_mut(), || {
        Ok(ALLOCATIONS.lock().alloc(size)?.ptr)
    })
}

/// Release a buffer returned by any export. Null, foreign and already
/// released pointers are ignored.
#[no_mangle]
pub extern "C" fn bridge_free(ptr: *mut u8) {
    guard("bridge_free", (), || {
        ALLOCATIONS.lock().release(ptr);
        Ok(())
    })
}

/// Length of a live host-owned buffer, 0 for unknown pointers
#[no_mangle]
pub extern "C" fn bridge_buffer_len(ptr: *const u8) -> usize {
    ALLOCATIONS.lock().len_of(ptr).unwrap_or(0)
}

/// Number of buffers the host has not yet released
#[no_mangle]
pub extern "C" fn bridge_live_buffers() -> usize {
    ALLOCATIONS.lock().live_count()
}

// ========== Errors ==========

/// Byte length of the last error message on this thread (0 if none)
#[no_mangle]
pub extern "C" fn bridge_last_error_length() -> usize {
    super::last_error().map(|m| m.len()).unwrap_or(0)
}

/// Copy the last error message plus a NUL into `dst`.
///
/// Returns the message length, 0 when there is no error, or -1 when
/// `capacity` cannot hold the message and its NUL (nothing is written).
///
/// # Safety
///
/// `dst` must be valid for `capacity` writes.
#[no_mangle]
pub unsafe extern "C" fn bridge_last_error_message(dst: *mut u8, capacity: usize) -> isize {
    let Some(message) = super::last_error() else {
        return 0;
    };
    let Ok(mut out) = host_out(dst, capacity) else {
        return -1;
    };
    let mut bytes = message.into_bytes();
    bytes.push(0);
    match out.write_all(&bytes) {
        Ok(written) => (written - 1) as isize,
        Err(_) => -1,
    }
}

/// Forget the last error message on this thread
#[no_mangle]
pub extern "C" fn bridge_clear_last_error() {
    super::clear_last_error();
}

// ========== Configuration ==========

/// Install a configuration from TOML text. 0 on success, -1 on error (the
/// previous configuration stays active).
///
/// # Safety
///
/// `toml` must be valid for `len` reads.
#[no_mangle]
pub unsafe extern "C" fn bridge_configure(toml: *const u8, len: usize) -> i32 {
    guard("bridge_configure", -1, || {
        let text = host_str(toml, len, "config")?;
        let parsed = BridgeConfig::from_toml_str(text)
            .map_err(|e| WrapperError::InvalidArg(e.to_string()))?;
        config::install(parsed).map_err(|e| WrapperError::InvalidArg(e.to_string()))?;
        Ok(0)
    })
}

/// NUL-terminated library version (static, never freed)
#[no_mangle]
pub extern "C" fn bridge_version() -> *const c_char {
    VERSION.as_ptr() as *const c_char
}

// ========== Registry ==========

/// Call a registered operation by name.
///
/// `args` points to `argc` buffer descriptors. Returns a host-owned result
/// (length in `out_len`) or null.
///
/// # Safety
///
/// `name` must be valid for `name_len` reads, `args` for `argc` descriptors,
/// each descriptor for its own length, and `out_len` null or writable.
#[no_mangle]
pub unsafe extern "C" fn bridge_call(
    name: *const u8,
    name_len: usize,
    args: *const HostBuffer,
    argc: usize,
    out_len: *mut usize,
) -> *mut u8 {
    guard_alloc("bridge_call", out_len, || {
        let name = host_str(name, name_len, "name")?;
        let descriptors = super::host_values(args, argc)?;
        let owned = descriptors
            .iter()
            .map(|d| Ok(OwnedBuffer::from_slice(d.as_slice()?)))
            .collect::<Result<Vec<_>, WrapperError>>()?;
        let result = REGISTRY.call_by_name(name, &owned)?;
        hand_over_buffer(result, out_len)
    })
}

/// JSON array describing every operation reachable through `bridge_call`
///
/// # Safety
///
/// `out_len` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn bridge_catalog(out_len: *mut usize) -> *mut u8 {
    guard_alloc("bridge_catalog", out_len, || {
        hand_over_text(REGISTRY.catalog_json(), out_len)
    })
}

/// Copy of a live host-owned buffer, for tests and embedding hosts that keep
/// Rust on both sides
pub fn buffer_contents(ptr: *const u8) -> Option<Vec<u8>> {
    ALLOCATIONS.lock().bytes(ptr).map(|b| b.to_vec())
}
