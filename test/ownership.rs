//! Ownership and Error-Channel Tests
//!
//! Exercises the C ABI the way a host would:
//! - buffers handed out are released exactly once through `bridge_free`
//! - stale and foreign handles/pointers produce sentinels, never crashes
//! - failures leave a readable last-error message

use hostbridge::ffi::*;
use hostbridge::ffi::compression::*;
use hostbridge::ffi::hashing::*;
use hostbridge::ffi::json::*;
use hostbridge::wrappers::hashing::Digest64;

fn last_message() -> String {
    let len = bridge_last_error_length();
    let mut buf = vec![0u8; len + 1];
    let written = unsafe { bridge_last_error_message(buf.as_mut_ptr(), buf.len()) };
    assert_eq!(written as usize, len);
    assert_eq!(buf[len], 0);
    String::from_utf8(buf[..len].to_vec()).unwrap()
}

// =============================================================================
// Buffer ownership
// =============================================================================

#[test]
fn test_alloc_free_twice_is_harmless() {
    let ptr = bridge_alloc(64);
    assert!(!ptr.is_null());
    assert_eq!(bridge_buffer_len(ptr), 64);

    bridge_free(ptr);
    assert_eq!(bridge_buffer_len(ptr), 0);

    // Second release of the same pointer is ignored
    bridge_free(ptr);
    assert_eq!(bridge_buffer_len(ptr), 0);
}

#[test]
fn test_free_of_foreign_and_null_pointers_is_ignored() {
    let mut local = [0u8; 16];
    bridge_free(local.as_mut_ptr());
    bridge_free(std::ptr::null_mut());
    assert_eq!(local, [0u8; 16]);
}

#[test]
fn test_allocating_export_result_is_host_owned() {
    let input = b"ownership ownership ownership ownership";
    let mut len = 0usize;
    let packed = unsafe { lz4_compress_sized(input.as_ptr(), input.len(), &mut len) };
    assert!(!packed.is_null());
    assert_eq!(bridge_buffer_len(packed), len);

    let mut out_len = 0usize;
    let unpacked = unsafe { lz4_decompress_sized(packed, len, &mut out_len) };
    assert_eq!(buffer_contents(unpacked).unwrap(), input.to_vec());
    assert_eq!(out_len, input.len());

    bridge_free(packed);
    bridge_free(unpacked);
    assert_eq!(bridge_buffer_len(packed), 0);
    assert_eq!(bridge_buffer_len(unpacked), 0);
}

#[test]
fn test_failed_allocating_export_zeroes_out_len() {
    let garbage = [0xFFu8; 16];

    let mut len = 77usize;
    let ptr = unsafe { lz4_decompress_alloc(garbage.as_ptr(), garbage.len(), 1024, &mut len) };
    assert!(ptr.is_null());
    assert_eq!(len, 0);

    let mut len = 77usize;
    let ptr = unsafe { snappy_uncompress_alloc(garbage.as_ptr(), garbage.len(), &mut len) };
    assert!(ptr.is_null());
    assert_eq!(len, 0);

    let mut len = 77usize;
    let ptr = unsafe { lz4_compress_alloc(std::ptr::null(), 8, &mut len) };
    assert!(ptr.is_null());
    assert_eq!(len, 0);
}

// =============================================================================
// LZ4 edge cases
// =============================================================================

#[test]
fn test_lz4_empty_input_round_trip() {
    let mut dst = [0u8; 16];
    let written = unsafe { lz4_compress(std::ptr::null(), dst.as_mut_ptr(), 0, dst.len() as i32) };
    assert!(written > 0);

    let mut out = [0u8; 4];
    let restored = unsafe { lz4_decompress(dst.as_ptr(), out.as_mut_ptr(), written, out.len() as i32) };
    assert_eq!(restored, 0);
}

#[test]
fn test_lz4_insufficient_capacity_writes_nothing_past_it() {
    let input: Vec<u8> = (0..512u32).map(|i| (i * 7 % 251) as u8).collect();
    let mut dst = vec![0xAAu8; 32];
    let written = unsafe { lz4_compress(input.as_ptr(), dst.as_mut_ptr(), input.len() as i32, 16) };
    assert_eq!(written, 0);
    assert!(dst[16..].iter().all(|&b| b == 0xAA));
    assert!(last_message().starts_with("lz4_compress"));
}

#[test]
fn test_lz4_negative_sizes_are_rejected() {
    let mut dst = [0u8; 8];
    assert_eq!(unsafe { lz4_compress(dst.as_ptr(), dst.as_mut_ptr(), -1, 8) }, 0);
    assert_eq!(unsafe { lz4_decompress(dst.as_ptr(), dst.as_mut_ptr(), 4, -8) }, -1);
    assert_eq!(lz4_compress_bound(-5), 0);
}

#[test]
fn test_lz4_malformed_block_is_an_error() {
    let garbage = [0xF0u8, 0xFF, 0xFF, 0xFF, 0x01];
    let mut out = [0u8; 64];
    let n = unsafe { lz4_decompress(garbage.as_ptr(), out.as_mut_ptr(), garbage.len() as i32, out.len() as i32) };
    assert_eq!(n, -1);
    assert!(last_message().starts_with("lz4_decompress: "));
}

// =============================================================================
// Snappy status codes
// =============================================================================

#[test]
fn test_snappy_status_codes() {
    let input = b"snappy snappy snappy snappy";
    let mut small = [0u8; 4];
    let mut small_len = small.len();
    let status = unsafe { snappy_compress(input.as_ptr(), input.len(), small.as_mut_ptr(), &mut small_len) };
    assert_eq!(status, SNAPPY_BUFFER_TOO_SMALL);

    let garbage = [0xFFu8, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
    assert_eq!(
        unsafe { snappy_validate_compressed_buffer(garbage.as_ptr(), garbage.len()) },
        SNAPPY_INVALID_INPUT
    );

    let mut result = 0usize;
    assert_eq!(
        unsafe { snappy_uncompressed_length(garbage.as_ptr(), garbage.len(), &mut result) },
        SNAPPY_INVALID_INPUT
    );
}

// =============================================================================
// Handles
// =============================================================================

#[test]
fn test_stale_stream_handle() {
    let handle = xxh3_stream_create(0, 0);
    assert_ne!(handle, 0);
    assert_eq!(xxh3_stream_destroy(handle), 1);

    let data = b"late";
    assert_eq!(unsafe { xxh3_stream_update(handle, data.as_ptr(), data.len()) }, 0);
    let mut digest = Digest64::default();
    assert_eq!(unsafe { xxh3_stream_digest(handle, &mut digest) }, 0);
    assert_eq!(xxh3_stream_destroy(handle), 0);
    assert!(last_message().starts_with("xxh3_stream_digest"));
}

#[test]
fn test_handles_are_not_reused() {
    let first = xxh3_stream_create(0, 0);
    xxh3_stream_destroy(first);
    let second = xxh3_stream_create(0, 0);
    assert_ne!(first, second);
    xxh3_stream_destroy(second);
}

#[test]
fn test_unknown_handle_never_crashes() {
    assert_eq!(json_destroy(0), 0);
    assert_eq!(json_destroy(u32::MAX), 0);
    assert_eq!(jq_destroy(12345), 0);
    let key = b"a";
    assert_eq!(unsafe { json_count_array(987_654, key.as_ptr(), key.len()) }, -1);
}

// =============================================================================
// Error channel
// =============================================================================

#[test]
fn test_jq_invalid_filter_reports_through_last_error() {
    bridge_clear_last_error();
    assert_eq!(bridge_last_error_length(), 0);

    let filter = b"map(";
    let handle = unsafe { jq_compile(filter.as_ptr(), filter.len()) };
    assert_eq!(handle, 0);

    let message = last_message();
    assert!(message.starts_with("jq_compile: "), "{}", message);
}

#[test]
fn test_last_error_message_needs_room_for_nul() {
    let filter = b"][";
    assert_eq!(unsafe { jq_compile(filter.as_ptr(), filter.len()) }, 0);

    let len = bridge_last_error_length();
    let mut exact = vec![0x55u8; len];
    assert_eq!(unsafe { bridge_last_error_message(exact.as_mut_ptr(), exact.len()) }, -1);
    assert!(exact.iter().all(|&b| b == 0x55));
}

#[test]
fn test_last_error_is_per_thread() {
    let bad = b"{";
    assert_eq!(unsafe { json_parse(bad.as_ptr(), bad.len()) }, 0);
    assert!(last_error().is_some());

    let other = std::thread::spawn(|| last_error()).join().unwrap();
    assert!(other.is_none());
}

#[test]
fn test_invalid_utf8_is_reported() {
    let bytes = [0xC3u8, 0x28];
    assert_eq!(unsafe { json_validate(bytes.as_ptr(), bytes.len()) }, 0);
    assert!(last_message().contains("UTF-8"));
}
