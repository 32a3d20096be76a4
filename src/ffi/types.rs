//! ABI Records
//!
//! Plain `#[repr(C)]` records passed across the boundary. Digest records
//! live with the hash adapter (`wrappers::hashing`).

use crate::wrappers::WrapperResult;

use super::host_bytes;

/// A `(ptr, len)` pair of host memory, used for argument arrays
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HostBuffer {
    pub ptr: *const u8,
    pub len: usize,
}

impl HostBuffer {
    /// Borrow the described bytes
    ///
    /// # Safety
    ///
    /// `ptr` must be null with `len == 0`, or valid for `len` reads.
    pub unsafe fn as_slice<'a>(&self) -> WrapperResult<&'a [u8]> {
        host_bytes(self.ptr, self.len)
    }
}

/// Result of an 8-bit image decode. `data` is host-owned; release it with
/// `bridge_free`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ImageDescriptor {
    pub data: *mut u8,
    /// Bytes at `data` (`width * height * channels`)
    pub len: usize,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl Default for ImageDescriptor {
    fn default() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
            width: 0,
            height: 0,
            channels: 0,
        }
    }
}

/// Result of a float (HDR) image decode. `data` is host-owned; release it
/// with `bridge_free`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HdrDescriptor {
    pub data: *mut f32,
    /// Samples at `data` (`width * height * channels`)
    pub len: usize,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl Default for HdrDescriptor {
    fn default() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
            width: 0,
            height: 0,
            channels: 0,
        }
    }
}
