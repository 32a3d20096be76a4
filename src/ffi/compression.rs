//! Compression Exports
//!
//! LZ4 block functions follow the liblz4 calling convention (`int` sizes,
//! bytes written on success, 0 or a negative value on error). Snappy
//! functions follow snappy-c: a status code plus an in/out length.

use std::os::raw::c_char;

use super::{guard, guard_alloc, hand_over_buffer, host_bytes, host_out, load_required, static_c_str, store_required};
use crate::config;
use crate::wrappers::compression as adapter;
use crate::wrappers::{WrapperError, WrapperResult};

fn size_arg(value: i32, what: &str) -> WrapperResult<usize> {
    usize::try_from(value).map_err(|_| WrapperError::InvalidArg(format!("negative {}: {}", what, value)))
}

fn written(count: usize) -> WrapperResult<i32> {
    i32::try_from(count).map_err(|_| WrapperError::InvalidArg(format!("result of {} bytes overflows int", count)))
}

// ========== LZ4 ==========

/// NUL-terminated LZ4 adapter version
#[no_mangle]
pub extern "C" fn lz4_version() -> *const c_char {
    static_c_str(adapter::lz4_version())
}

/// Worst-case compressed size, 0 when `input_size` is negative or too large
#[no_mangle]
pub extern "C" fn lz4_compress_bound(input_size: i32) -> i32 {
    guard("lz4_compress_bound", 0, || {
        written(adapter::lz4_compress_bound(size_arg(input_size, "input size")?))
    })
}

/// Compress `src_size` bytes into `dst`. Returns bytes written, 0 on error
/// (including insufficient `dst_capacity`; nothing past it is written).
///
/// # Safety
///
/// `src` must be valid for `src_size` reads and `dst` for `dst_capacity`
/// writes.
#[no_mangle]
pub unsafe extern "C" fn lz4_compress(src: *const u8, dst: *mut u8, src_size: i32, dst_capacity: i32) -> i32 {
    lz4_compress_fast(src, dst, src_size, dst_capacity, config::active().lz4.acceleration)
}

/// [`lz4_compress`] with an acceleration factor (values below 1 mean 1)
///
/// # Safety
///
/// As [`lz4_compress`].
#[no_mangle]
pub unsafe extern "C" fn lz4_compress_fast(
    src: *const u8,
    dst: *mut u8,
    src_size: i32,
    dst_capacity: i32,
    acceleration: i32,
) -> i32 {
    guard("lz4_compress_fast", 0, || {
        let src = host_bytes(src, size_arg(src_size, "source size")?)?;
        let mut dst = host_out(dst, size_arg(dst_capacity, "capacity")?)?;
        written(adapter::lz4_compress_fast_into(src, dst.as_mut_slice(), acceleration)?)
    })
}

/// [`lz4_compress`] with the high-compression encoder (level 1..=12)
///
/// # Safety
///
/// As [`lz4_compress`].
#[no_mangle]
pub unsafe extern "C" fn lz4_compress_hc(
    src: *const u8,
    dst: *mut u8,
    src_size: i32,
    dst_capacity: i32,
    level: i32,
) -> i32 {
    guard("lz4_compress_hc", 0, || {
        let src = host_bytes(src, size_arg(src_size, "source size")?)?;
        let mut dst = host_out(dst, size_arg(dst_capacity, "capacity")?)?;
        written(adapter::lz4_compress_hc_into(src, dst.as_mut_slice(), level)?)
    })
}

/// Decompress a block into `dst`. Returns bytes written, -1 on malformed
/// input or insufficient capacity.
///
/// # Safety
///
/// `src` must be valid for `compressed_size` reads and `dst` for
/// `dst_capacity` writes.
#[no_mangle]
pub unsafe extern "C" fn lz4_decompress(src: *const u8, dst: *mut u8, compressed_size: i32, dst_capacity: i32) -> i32 {
    guard("lz4_decompress", -1, || {
        let src = host_bytes(src, size_arg(compressed_size, "compressed size")?)?;
        let mut dst = host_out(dst, size_arg(dst_capacity, "capacity")?)?;
        written(adapter::lz4_decompress_into(src, dst.as_mut_slice())?)
    })
}

/// Compress into a new host-owned buffer; length in `out_len`, null on error
///
/// # Safety
///
/// `src` must be valid for `len` reads; `out_len` null or writable.
#[no_mangle]
pub unsafe extern "C" fn lz4_compress_alloc(src: *const u8, len: usize, out_len: *mut usize) -> *mut u8 {
    guard_alloc("lz4_compress_alloc", out_len, || {
        hand_over_buffer(adapter::lz4_compress(host_bytes(src, len)?)?, out_len)
    })
}

/// Decompress a block whose size the host knows into a new host-owned buffer
///
/// # Safety
///
/// `src` must be valid for `len` reads; `out_len` null or writable.
#[no_mangle]
pub unsafe extern "C" fn lz4_decompress_alloc(
    src: *const u8,
    len: usize,
    original_size: usize,
    out_len: *mut usize,
) -> *mut u8 {
    guard_alloc("lz4_decompress_alloc", out_len, || {
        hand_over_buffer(adapter::lz4_decompress(host_bytes(src, len)?, original_size)?, out_len)
    })
}

/// Compress with a 4-byte little-endian size prefix into a new buffer
///
/// # Safety
///
/// `src` must be valid for `len` reads; `out_len` null or writable.
#[no_mangle]
pub unsafe extern "C" fn lz4_compress_sized(src: *const u8, len: usize, out_len: *mut usize) -> *mut u8 {
    guard_alloc("lz4_compress_sized", out_len, || {
        hand_over_buffer(adapter::lz4_compress_prepend_size(host_bytes(src, len)?)?, out_len)
    })
}

/// Decompress a size-prefixed block into a new buffer
///
/// # Safety
///
/// `src` must be valid for `len` reads; `out_len` null or writable.
#[no_mangle]
pub unsafe extern "C" fn lz4_decompress_sized(src: *const u8, len: usize, out_len: *mut usize) -> *mut u8 {
    guard_alloc("lz4_decompress_sized", out_len, || {
        hand_over_buffer(adapter::lz4_decompress_prepend_size(host_bytes(src, len)?)?, out_len)
    })
}

// ========== Snappy ==========

/// snappy-c status: success
pub const SNAPPY_OK: i32 = 0;
/// snappy-c status: malformed input
pub const SNAPPY_INVALID_INPUT: i32 = 1;
/// snappy-c status: output buffer too small
pub const SNAPPY_BUFFER_TOO_SMALL: i32 = 2;

/// Run a snappy body, mapping its outcome to a status code
fn snappy_status<F>(export: &'static str, body: F) -> i32
where
    F: FnOnce() -> WrapperResult<()>,
{
    let mut status = SNAPPY_INVALID_INPUT;
    guard(export, (), || match body() {
        Ok(()) => {
            status = SNAPPY_OK;
            Ok(())
        }
        Err(err) => {
            if matches!(err, WrapperError::BufferTooSmall { .. }) {
                status = SNAPPY_BUFFER_TOO_SMALL;
            }
            Err(err)
        }
    });
    status
}

/// Worst-case compressed size for `source_length` bytes
#[no_mangle]
pub extern "C" fn snappy_max_compressed_length(source_length: usize) -> usize {
    adapter::snappy_max_compressed_length(source_length)
}

/// Compress into `compressed`. `*compressed_length` is the capacity on entry
/// and the bytes written on success.
///
/// # Safety
///
/// `input` must be valid for `input_length` reads, `compressed_length` for a
/// read and a write, and `compressed` for `*compressed_length` writes.
#[no_mangle]
pub unsafe extern "C" fn snappy_compress(
    input: *const u8,
    input_length: usize,
    compressed: *mut u8,
    compressed_length: *mut usize,
) -> i32 {
    snappy_status("snappy_compress", || {
        let capacity = load_required(compressed_length, "compressed_length")?;
        let input = host_bytes(input, input_length)?;
        let mut out = host_out(compressed, capacity)?;
        let n = adapter::snappy_compress_into(input, out.as_mut_slice())?;
        store_required(compressed_length, n, "compressed_length")
    })
}

/// Uncompress into `uncompressed`. `*uncompressed_length` is the capacity on
/// entry and the bytes written on success.
///
/// # Safety
///
/// As [`snappy_compress`].
#[no_mangle]
pub unsafe extern "C" fn snappy_uncompress(
    compressed: *const u8,
    compressed_length: usize,
    uncompressed: *mut u8,
    uncompressed_length: *mut usize,
) -> i32 {
    snappy_status("snappy_uncompress", || {
        let capacity = load_required(uncompressed_length, "uncompressed_length")?;
        let input = host_bytes(compressed, compressed_length)?;
        let mut out = host_out(uncompressed, capacity)?;
        let n = adapter::snappy_uncompress_into(input, out.as_mut_slice())?;
        store_required(uncompressed_length, n, "uncompressed_length")
    })
}

/// Read the uncompressed length from a block header into `result`
///
/// # Safety
///
/// `compressed` must be valid for `compressed_length` reads and `result`
/// for a write.
#[no_mangle]
pub unsafe extern "C" fn snappy_uncompressed_length(
    compressed: *const u8,
    compressed_length: usize,
    result: *mut usize,
) -> i32 {
    snappy_status("snappy_uncompressed_length", || {
        let n = adapter::snappy_uncompressed_length(host_bytes(compressed, compressed_length)?)?;
        store_required(result, n, "result")
    })
}

/// `SNAPPY_OK` when the whole block decodes
///
/// # Safety
///
/// `compressed` must be valid for `compressed_length` reads.
#[no_mangle]
pub unsafe extern "C" fn snappy_validate_compressed_buffer(compressed: *const u8, compressed_length: usize) -> i32 {
    snappy_status("snappy_validate_compressed_buffer", || {
        if adapter::snappy_validate(host_bytes(compressed, compressed_length)?) {
            Ok(())
        } else {
            Err(WrapperError::invalid("snappy", "block does not decode"))
        }
    })
}

/// Compress into a new host-owned buffer
///
/// # Safety
///
/// `input` must be valid for `len` reads; `out_len` null or writable.
#[no_mangle]
pub unsafe extern "C" fn snappy_compress_alloc(input: *const u8, len: usize, out_len: *mut usize) -> *mut u8 {
    guard_alloc("snappy_compress_alloc", out_len, || {
        hand_over_buffer(adapter::snappy_compress(host_bytes(input, len)?)?, out_len)
    })
}

/// Uncompress into a new host-owned buffer
///
/// # Safety
///
/// `compressed` must be valid for `len` reads; `out_len` null or writable.
#[no_mangle]
pub unsafe extern "C" fn snappy_uncompress_alloc(compressed: *const u8, len: usize, out_len: *mut usize) -> *mut u8 {
    guard_alloc("snappy_uncompress_alloc", out_len, || {
        hand_over_buffer(adapter::snappy_uncompress(host_bytes(compressed, len)?)?, out_len)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::{bridge_free, buffer_contents};

    #[test]
    fn test_lz4_round_trip_through_caller_buffers() {
        let input = b"abcabcabcabcabcabcabcabcabcabc".repeat(8);
        let bound = lz4_compress_bound(input.len() as i32);
        let mut packed = vec![0u8; bound as usize];
        let n = unsafe { lz4_compress(input.as_ptr(), packed.as_mut_ptr(), input.len() as i32, bound) };
        assert!(n > 0 && n < input.len() as i32);

        let mut out = vec![0u8; input.len()];
        let m = unsafe { lz4_decompress(packed.as_ptr(), out.as_mut_ptr(), n, out.len() as i32) };
        assert_eq!(m as usize, input.len());
        assert_eq!(out, input);
    }

    #[test]
    fn test_lz4_rejects_negative_sizes() {
        assert_eq!(lz4_compress_bound(-1), 0);
        let mut dst = [0u8; 8];
        assert_eq!(unsafe { lz4_decompress(dst.as_ptr(), dst.as_mut_ptr(), -4, 8) }, -1);
    }

    #[test]
    fn test_lz4_alloc_pair() {
        let input = vec![7u8; 1000];
        let mut len = 0usize;
        let packed = unsafe { lz4_compress_alloc(input.as_ptr(), input.len(), &mut len) };
        assert!(!packed.is_null());
        let mut out_len = 0usize;
        let unpacked = unsafe { lz4_decompress_alloc(packed, len, input.len(), &mut out_len) };
        assert_eq!(out_len, 1000);
        assert_eq!(buffer_contents(unpacked).unwrap(), input);
        bridge_free(packed);
        bridge_free(unpacked);
    }

    #[test]
    fn test_snappy_status_codes() {
        let input = b"snappy snappy snappy snappy".to_vec();
        let mut compressed = vec![0u8; snappy_max_compressed_length(input.len())];
        let mut compressed_len = compressed.len();
        let status = unsafe {
            snappy_compress(input.as_ptr(), input.len(), compressed.as_mut_ptr(), &mut compressed_len)
        };
        assert_eq!(status, SNAPPY_OK);

        let mut expected = 0usize;
        assert_eq!(
            unsafe { snappy_uncompressed_length(compressed.as_ptr(), compressed_len, &mut expected) },
            SNAPPY_OK
        );
        assert_eq!(expected, input.len());

        let mut small = vec![0u8; 4];
        let mut small_len = small.len();
        let status = unsafe {
            snappy_uncompress(compressed.as_ptr(), compressed_len, small.as_mut_ptr(), &mut small_len)
        };
        assert_eq!(status, SNAPPY_BUFFER_TOO_SMALL);
        assert_eq!(small_len, 4);

        let garbage = [0xffu8; 6];
        assert_eq!(
            unsafe { snappy_validate_compressed_buffer(garbage.as_ptr(), garbage.len()) },
            SNAPPY_INVALID_INPUT
        );
    }

    #[test]
    fn test_version_strings_are_stable() {
        assert_eq!(lz4_version(), lz4_version());
        let text = unsafe { std::ffi::CStr::from_ptr(lz4_version()) };
        assert!(text.to_str().unwrap().starts_with("lz4"));
    }
}
