//! Hashing Exports
//!
//! One-shot xxHash functions and the streaming XXH3 session. 64-bit and
//! 128-bit digests are written into caller-owned [`Digest64`] /
//! [`Digest128`] records, low word first, so 32-bit hosts never handle a
//! 64-bit integer.

use std::os::raw::c_char;

use parking_lot::Mutex;

use super::{guard, host_bytes, static_c_str, store_required};
use crate::runtime::{Handle, HandleTable};
use crate::wrappers::hashing::{self as adapter, Digest128, Digest64, Xxh3Stream};
use crate::wrappers::WrapperError;

lazy_static::lazy_static! {
    static ref STREAMS: Mutex<HandleTable<Xxh3Stream>> = Mutex::new(HandleTable::new("xxh3_stream"));
}

fn seed64(seed_lo: u32, seed_hi: u32) -> u64 {
    (u64::from(seed_hi) << 32) | u64::from(seed_lo)
}

/// NUL-terminated xxHash adapter version
#[no_mangle]
pub extern "C" fn xxhash_version() -> *const c_char {
    static_c_str(adapter::xxhash_version())
}

/// XXH32 of `len` bytes. Returns 0 when `data` is null with a non-zero
/// length (the last error is set).
///
/// # Safety
///
/// `data` must be valid for `len` reads.
#[no_mangle]
pub unsafe extern "C" fn xxhash32(data: *const u8, len: usize, seed: u32) -> u32 {
    guard("xxhash32", 0, || Ok(adapter::xxhash32(host_bytes(data, len)?, seed)))
}

/// XXH64 of `len` bytes with a 64-bit seed. Returns 0 on invalid input.
///
/// # Safety
///
/// `data` must be valid for `len` reads.
#[no_mangle]
pub unsafe extern "C" fn xxhash64(data: *const u8, len: usize, seed: u64) -> u64 {
    guard("xxhash64", 0, || Ok(adapter::xxhash64(host_bytes(data, len)?, seed).to_u64()))
}

/// XXH64 with the seed split into 32-bit halves, digest written to `out`.
/// Returns 1 on success, 0 on error.
///
/// # Safety
///
/// `data` must be valid for `len` reads and `out` for one write.
#[no_mangle]
pub unsafe extern "C" fn xxhash64_split(
    data: *const u8,
    len: usize,
    seed_lo: u32,
    seed_hi: u32,
    out: *mut Digest64,
) -> i32 {
    guard("xxhash64_split", 0, || {
        let digest = adapter::xxhash64(host_bytes(data, len)?, seed64(seed_lo, seed_hi));
        store_required(out, digest, "out")?;
        Ok(1)
    })
}

/// XXH3-64 into `out`; 1 on success, 0 on error
///
/// # Safety
///
/// `data` must be valid for `len` reads and `out` for one write.
#[no_mangle]
pub unsafe extern "C" fn xxh3_64(data: *const u8, len: usize, out: *mut Digest64) -> i32 {
    guard("xxh3_64", 0, || {
        store_required(out, adapter::xxh3_64(host_bytes(data, len)?), "out")?;
        Ok(1)
    })
}

/// Seeded XXH3-64 into `out`; 1 on success, 0 on error
///
/// # Safety
///
/// `data` must be valid for `len` reads and `out` for one write.
#[no_mangle]
pub unsafe extern "C" fn xxh3_64_with_seed(
    data: *const u8,
    len: usize,
    seed_lo: u32,
    seed_hi: u32,
    out: *mut Digest64,
) -> i32 {
    guard("xxh3_64_with_seed", 0, || {
        let digest = adapter::xxh3_64_with_seed(host_bytes(data, len)?, seed64(seed_lo, seed_hi));
        store_required(out, digest, "out")?;
        Ok(1)
    })
}

/// XXH3-128 into `out`; 1 on success, 0 on error
///
/// # Safety
///
/// `data` must be valid for `len` reads and `out` for one write.
#[no_mangle]
pub unsafe extern "C" fn xxh3_128(data: *const u8, len: usize, out: *mut Digest128) -> i32 {
    guard("xxh3_128", 0, || {
        store_required(out, adapter::xxh3_128(host_bytes(data, len)?), "out")?;
        Ok(1)
    })
}

// ========== Streaming XXH3 ==========

/// Start a streaming XXH3 session; returns its handle (never 0)
#[no_mangle]
pub extern "C" fn xxh3_stream_create(seed_lo: u32, seed_hi: u32) -> Handle {
    guard("xxh3_stream_create", 0, || {
        Ok(STREAMS.lock().insert(Xxh3Stream::with_seed(seed64(seed_lo, seed_hi))))
    })
}

/// Feed `len` bytes; 1 on success, 0 for an unknown handle or bad input
///
/// # Safety
///
/// `data` must be valid for `len` reads.
#[no_mangle]
pub unsafe extern "C" fn xxh3_stream_update(handle: Handle, data: *const u8, len: usize) -> i32 {
    guard("xxh3_stream_update", 0, || {
        let data = host_bytes(data, len)?;
        STREAMS
            .lock()
            .with_mut(handle, |stream| stream.update(data))
            .ok_or(WrapperError::HandleNotFound(handle.into()))?;
        Ok(1)
    })
}

/// Write the 64-bit digest of everything fed so far; the session stays
/// usable. 1 on success, 0 on error.
///
/// # Safety
///
/// `out` must be valid for one write.
#[no_mangle]
pub unsafe extern "C" fn xxh3_stream_digest(handle: Handle, out: *mut Digest64) -> i32 {
    guard("xxh3_stream_digest", 0, || {
        let digest = STREAMS
            .lock()
            .with(handle, |stream| stream.digest())
            .ok_or(WrapperError::HandleNotFound(handle.into()))?;
        store_required(out, digest, "out")?;
        Ok(1)
    })
}

/// Write the 128-bit digest of everything fed so far
///
/// # Safety
///
/// `out` must be valid for one write.
#[no_mangle]
pub unsafe extern "C" fn xxh3_stream_digest128(handle: Handle, out: *mut Digest128) -> i32 {
    guard("xxh3_stream_digest128", 0, || {
        let digest = STREAMS
            .lock()
            .with(handle, |stream| stream.digest128())
            .ok_or(WrapperError::HandleNotFound(handle.into()))?;
        store_required(out, digest, "out")?;
        Ok(1)
    })
}

/// Restart the session with its original seed; 1 on success, 0 on error
#[no_mangle]
pub extern "C" fn xxh3_stream_reset(handle: Handle) -> i32 {
    guard("xxh3_stream_reset", 0, || {
        STREAMS
            .lock()
            .with_mut(handle, |stream| stream.reset())
            .ok_or(WrapperError::HandleNotFound(handle.into()))?;
        Ok(1)
    })
}

/// Destroy the session. 1 when it existed, 0 otherwise (a second destroy is
/// a harmless no-op).
#[no_mangle]
pub extern "C" fn xxh3_stream_destroy(handle: Handle) -> i32 {
    guard("xxh3_stream_destroy", 0, || {
        Ok(STREAMS.lock().remove(handle).is_some() as i32)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_seed_matches_native_seed() {
        let data = b"hash me";
        let mut out = Digest64::default();
        let seed = 0x0123_4567_89ab_cdef_u64;
        let ok = unsafe { xxhash64_split(data.as_ptr(), data.len(), seed as u32, (seed >> 32) as u32, &mut out) };
        assert_eq!(ok, 1);
        assert_eq!(out.to_u64(), unsafe { xxhash64(data.as_ptr(), data.len(), seed) });
    }

    #[test]
    fn test_null_out_is_rejected() {
        let data = b"x";
        assert_eq!(unsafe { xxh3_64(data.as_ptr(), 1, std::ptr::null_mut()) }, 0);
    }

    #[test]
    fn test_stream_matches_one_shot() {
        let handle = xxh3_stream_create(0, 0);
        assert_ne!(handle, 0);
        for chunk in [&b"hello "[..], b"streaming ", b"world"] {
            assert_eq!(unsafe { xxh3_stream_update(handle, chunk.as_ptr(), chunk.len()) }, 1);
        }
        let mut streamed = Digest64::default();
        assert_eq!(unsafe { xxh3_stream_digest(handle, &mut streamed) }, 1);
        assert_eq!(streamed, adapter::xxh3_64(b"hello streaming world"));

        assert_eq!(xxh3_stream_reset(handle), 1);
        let mut empty = Digest64::default();
        assert_eq!(unsafe { xxh3_stream_digest(handle, &mut empty) }, 1);
        assert_eq!(empty, adapter::xxh3_64(b""));

        assert_eq!(xxh3_stream_destroy(handle), 1);
        assert_eq!(xxh3_stream_destroy(handle), 0);
        assert_eq!(unsafe { xxh3_stream_update(handle, b"x".as_ptr(), 1) }, 0);
        assert_eq!(xxh3_stream_reset(0), 0);
    }
}
