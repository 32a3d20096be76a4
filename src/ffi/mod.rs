//! C ABI
//!
//! Exported `extern "C"` entry points for C-ABI and WASM hosts. Every export
//! borrows caller memory only for the duration of the call and reports
//! failure as data:
//!
//! ```text
//! host call
//!     │
//!     ▼
//! HostSlice / HostSliceMut (null + bounds checks)
//!     │
//!     ▼
//! wrappers::<adapter> (safe Rust, WrapperResult)
//!     │
//!     ├── Ok  → value, bytes written, or pointer adopted by the allocation table
//!     └── Err → sentinel (null / 0 / -1) + per-thread last-error message
//! ```
//!
//! Panics are caught at the boundary and reported the same way as errors.
//!
//! # Ownership
//!
//! Pointers returned by `*_alloc`, `*_encode`, `*_decode`, `bridge_call` and
//! friends are owned by the host and must be released exactly once with
//! [`bridge_free`]. Text results carry a trailing NUL that is not counted in
//! the reported length.
//!
//! # Sessions
//!
//! Stateful operations (`xxh3_stream_*`, `json_*`, `jq_*`, `matrix_*`,
//! `dsp_*`, `image_editor_*`) take a `u32` handle from their `*_create` /
//! `*_parse` / `*_compile` call. Handle `0` and destroyed handles are rejected with the
//! error sentinel; destroying twice is a no-op.

pub mod compression;
pub mod dsp;
pub mod hashing;
pub mod imaging;
pub mod json;
pub mod math;
pub mod memory;
pub mod text;
mod types;

pub use memory::*;
pub use types::{HdrDescriptor, HostBuffer, ImageDescriptor};

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};

use parking_lot::Mutex;

use crate::runtime::{HostSlice, HostSliceMut, OwnedBuffer};
use crate::wrappers::{WrapperError, WrapperResult};

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Message of the most recent failed call on this thread
pub fn last_error() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

pub(crate) fn set_last_error(export: &'static str, err: &WrapperError) {
    tracing::warn!(export, error = %err, "call failed");
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(format!("{}: {}", export, err)));
}

pub(crate) fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run an export body, mapping errors and panics to `sentinel`
pub(crate) fn guard<T, F>(export: &'static str, sentinel: T, body: F) -> T
where
    F: FnOnce() -> WrapperResult<T>,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            set_last_error(export, &err);
            sentinel
        }
        Err(payload) => {
            let err = WrapperError::Panicked(panic_message(payload.as_ref()));
            set_last_error(export, &err);
            sentinel
        }
    }
}

/// [`guard`] for exports that hand over a buffer: `out_len` reads 0 unless
/// the call succeeds, and failure returns null
///
/// # Safety
///
/// `out_len` must be null or valid for one write.
pub(crate) unsafe fn guard_alloc<T, F>(export: &'static str, out_len: *mut usize, body: F) -> *mut T
where
    F: FnOnce() -> WrapperResult<*mut T>,
{
    store(out_len, 0);
    guard(export, std::ptr::null_mut(), body)
}

// ========== Argument helpers ==========

/// Borrow `len` bytes of host memory
///
/// # Safety
///
/// `ptr` must be null with `len == 0`, or valid for `len` reads for the call.
pub(crate) unsafe fn host_bytes<'a>(ptr: *const u8, len: usize) -> WrapperResult<&'a [u8]> {
    Ok(HostSlice::from_raw(ptr, len)?.as_slice())
}

/// Borrow `len` bytes of host memory as UTF-8
///
/// # Safety
///
/// As [`host_bytes`].
pub(crate) unsafe fn host_str<'a>(ptr: *const u8, len: usize, what: &str) -> WrapperResult<&'a str> {
    HostSlice::from_raw(ptr, len)?.as_str(what)
}

/// Borrow `len` values of typed host memory
///
/// # Safety
///
/// As [`host_bytes`], with `ptr` aligned for `T`.
pub(crate) unsafe fn host_values<'a, T>(ptr: *const T, len: usize) -> WrapperResult<&'a [T]> {
    Ok(HostSlice::from_raw(ptr, len)?.as_slice())
}

/// Writable view of `capacity` values of host memory
///
/// # Safety
///
/// `ptr` must be null with `capacity == 0`, or valid for `capacity` writes.
pub(crate) unsafe fn host_out<'a, T: Copy>(ptr: *mut T, capacity: usize) -> WrapperResult<HostSliceMut<'a, T>> {
    HostSliceMut::from_raw(ptr, capacity)
}

/// Borrow a fixed-size array the host passed by pointer
///
/// # Safety
///
/// `ptr` must be valid for `N` reads of `f32`.
pub(crate) unsafe fn host_array<const N: usize>(ptr: *const f32) -> WrapperResult<[f32; N]> {
    let values = host_values(ptr, N)?;
    let mut out = [0.0; N];
    out.copy_from_slice(values);
    Ok(out)
}

/// Read an in/out parameter the host must supply
///
/// # Safety
///
/// `ptr` must be null or valid for one read of `T`.
pub(crate) unsafe fn load_required<T: Copy>(ptr: *const T, what: &str) -> WrapperResult<T> {
    if ptr.is_null() {
        return Err(WrapperError::InvalidArg(format!("{} is null", what)));
    }
    Ok(ptr.read_unaligned())
}

/// Store `value` through an optional out-pointer
///
/// # Safety
///
/// `out` must be null or valid for one write of `T`.
pub(crate) unsafe fn store<T>(out: *mut T, value: T) {
    if !out.is_null() {
        out.write_unaligned(value);
    }
}

/// Require a non-null out-pointer and store through it
///
/// # Safety
///
/// `out` must be null or valid for one write of `T`.
pub(crate) unsafe fn store_required<T>(out: *mut T, value: T, what: &str) -> WrapperResult<()> {
    if out.is_null() {
        return Err(WrapperError::InvalidArg(format!("{} is null", what)));
    }
    out.write_unaligned(value);
    Ok(())
}

// ========== Ownership hand-over ==========

lazy_static::lazy_static! {
    static ref STATIC_STRINGS: Mutex<HashMap<&'static str, CString>> = Mutex::new(HashMap::new());
}

/// NUL-terminated copy of a static string, valid for the life of the process
pub(crate) fn static_c_str(text: &'static str) -> *const c_char {
    let mut strings = STATIC_STRINGS.lock();
    strings
        .entry(text)
        .or_insert_with(|| CString::new(text).unwrap_or_default())
        .as_ptr()
}

/// Move `bytes` into the allocation table; the host now owns the pointer
///
/// # Safety
///
/// `out_len` must be null or valid for one write.
pub(crate) unsafe fn hand_over(bytes: &[u8], out_len: *mut usize) -> WrapperResult<*mut u8> {
    let allocation = memory::ALLOCATIONS.lock().adopt(bytes)?;
    store(out_len, allocation.len);
    Ok(allocation.ptr)
}

/// Hand over an adapter result
///
/// # Safety
///
/// As [`hand_over`].
pub(crate) unsafe fn hand_over_buffer(buffer: OwnedBuffer, out_len: *mut usize) -> WrapperResult<*mut u8> {
    hand_over(buffer.as_slice(), out_len)
}

/// Hand over text with a trailing NUL; `out_len` excludes the NUL
///
/// # Safety
///
/// As [`hand_over`].
pub(crate) unsafe fn hand_over_text(text: String, out_len: *mut usize) -> WrapperResult<*mut u8> {
    let len = text.len();
    let mut bytes = text.into_bytes();
    bytes.push(0);
    let ptr = hand_over(&bytes, std::ptr::null_mut())?;
    store(out_len, len);
    Ok(ptr)
}

/// Hand over `f32` samples in native byte order; the pointer is aligned
/// for `f32`
pub(crate) fn hand_over_f32s(samples: &[f32]) -> WrapperResult<*mut f32> {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_ne_bytes()).collect();
    let allocation = memory::ALLOCATIONS.lock().adopt(&bytes)?;
    Ok(allocation.ptr as *mut f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_maps_error_to_sentinel() {
        clear_last_error();
        let value = guard("test_export", -1, || {
            Err(WrapperError::InvalidArg("bad".to_string()))
        });
        assert_eq!(value, -1);
        let message = last_error().unwrap();
        assert!(message.starts_with("test_export: "));
        assert!(message.contains("bad"));
    }

    #[test]
    fn test_guard_catches_panics() {
        let value = guard("panicky", 0u32, || -> WrapperResult<u32> { panic!("boom") });
        assert_eq!(value, 0);
        assert!(last_error().unwrap().contains("boom"));
    }

    #[test]
    fn test_guard_success_keeps_previous_error() {
        guard("first", 0, || Err(WrapperError::NotSupported("x".to_string())));
        assert_eq!(guard("second", 0, || Ok(7)), 7);
        assert!(last_error().unwrap().starts_with("first"));
    }

    #[test]
    fn test_text_hand_over_is_nul_terminated() {
        let mut len = 0usize;
        let ptr = unsafe { hand_over_text("abc".to_string(), &mut len) }.unwrap();
        assert_eq!(len, 3);
        let bytes = unsafe { std::slice::from_raw_parts(ptr, 4) };
        assert_eq!(bytes, b"abc\0");
        assert!(memory::ALLOCATIONS.lock().release(ptr));
    }

    #[test]
    fn test_guard_alloc_zeroes_length_on_failure() {
        let mut len = 99usize;
        let ptr = unsafe {
            guard_alloc::<u8, _>("failing_alloc", &mut len, || Err(WrapperError::InvalidArg("no".to_string())))
        };
        assert!(ptr.is_null());
        assert_eq!(len, 0);
    }

    #[test]
    fn test_store_ignores_null() {
        unsafe { store(std::ptr::null_mut::<usize>(), 5) };
        let mut slot = 0usize;
        unsafe { store(&mut slot, 5) };
        assert_eq!(slot, 5);
        assert!(unsafe { store_required(std::ptr::null_mut::<u32>(), 1, "out") }.is_err());
    }
}
