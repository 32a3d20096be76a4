//! Compression Wrappers
//!
//! LZ4 block format (the `lz4` crate, binding liblz4) and the raw Snappy
//! format (`snap`).
//!
//! # Supported Operations
//!
//! - **lz4** - bound, capacity-bounded compress (default / fast / HC),
//!   capacity-bounded decompress, allocating compress / decompress and a
//!   self-describing variant with a 4-byte size prefix
//! - **snappy** - max length, uncompressed length, validate,
//!   capacity-bounded and allocating compress / uncompress
//!
//! Sizes taken from untrusted input are checked against
//! `limits.max_output_bytes` before anything is allocated.

use lz4::block::CompressionMode;

use super::{
    arg, arg_u64, check_output_size, OwnedBuffer, WrapperCategory, WrapperError, WrapperRegistry,
    WrapperResult,
};
use crate::config;

/// Largest input LZ4 accepts (`LZ4_MAX_INPUT_SIZE`)
pub const LZ4_MAX_INPUT_SIZE: usize = 0x7E00_0000;

/// Highest LZ4 HC level
pub const LZ4_HC_MAX_LEVEL: i32 = 12;

// =============================================================================
// LZ4
// =============================================================================

/// Adapter version string
pub fn lz4_version() -> &'static str {
    concat!("lz4-adapter ", env!("CARGO_PKG_VERSION"))
}

/// Worst-case compressed size for `input_size` bytes, 0 when the input is
/// too large for LZ4.
pub fn lz4_compress_bound(input_size: usize) -> usize {
    if input_size > LZ4_MAX_INPUT_SIZE {
        return 0;
    }
    lz4::block::compress_bound(input_size).unwrap_or(0)
}

fn check_lz4_input(src: &[u8]) -> WrapperResult<()> {
    if src.len() > LZ4_MAX_INPUT_SIZE {
        return Err(WrapperError::invalid(
            "lz4",
            format!("input of {} bytes exceeds LZ4_MAX_INPUT_SIZE", src.len()),
        ));
    }
    Ok(())
}

fn lz4_compress_mode_into(src: &[u8], dst: &mut [u8], mode: Option<CompressionMode>) -> WrapperResult<usize> {
    check_lz4_input(src)?;
    lz4::block::compress_to_buffer(src, mode, false, dst).map_err(|e| {
        let bound = lz4_compress_bound(src.len());
        if dst.len() < bound {
            WrapperError::BufferTooSmall {
                required: bound,
                provided: dst.len(),
            }
        } else {
            WrapperError::invalid("lz4", e)
        }
    })
}

/// Compress `src` into `dst`, returning the bytes written
pub fn lz4_compress_into(src: &[u8], dst: &mut [u8]) -> WrapperResult<usize> {
    lz4_compress_mode_into(src, dst, None)
}

/// Compress with an acceleration factor (1 = default, higher = faster)
pub fn lz4_compress_fast_into(src: &[u8], dst: &mut [u8], acceleration: i32) -> WrapperResult<usize> {
    lz4_compress_mode_into(src, dst, Some(CompressionMode::FAST(acceleration.max(1))))
}

/// Compress with the high-compression encoder (level 1..=12)
pub fn lz4_compress_hc_into(src: &[u8], dst: &mut [u8], level: i32) -> WrapperResult<usize> {
    let level = level.clamp(1, LZ4_HC_MAX_LEVEL);
    lz4_compress_mode_into(src, dst, Some(CompressionMode::HIGHCOMPRESSION(level)))
}

/// Decompress an LZ4 block into `dst`, returning the bytes written. The
/// destination length is the decompression capacity.
pub fn lz4_decompress_into(src: &[u8], dst: &mut [u8]) -> WrapperResult<usize> {
    if src.is_empty() {
        return Err(WrapperError::invalid("lz4", "empty compressed block"));
    }
    // liblz4 cannot produce more than LZ4_MAX_INPUT_SIZE bytes per block
    let capacity = dst.len().min(LZ4_MAX_INPUT_SIZE);
    lz4::block::decompress_to_buffer(src, Some(capacity as i32), &mut dst[..capacity])
        .map_err(|e| WrapperError::invalid("lz4", e))
}

/// Compress `src` into a new buffer
pub fn lz4_compress(src: &[u8]) -> WrapperResult<OwnedBuffer> {
    check_lz4_input(src)?;
    let compressed =
        lz4::block::compress(src, None, false).map_err(|e| WrapperError::invalid("lz4", e))?;
    Ok(OwnedBuffer::from_vec(compressed))
}

/// Compress with the given mode into a new buffer
pub fn lz4_compress_with(src: &[u8], mode: CompressionMode) -> WrapperResult<OwnedBuffer> {
    check_lz4_input(src)?;
    let compressed = lz4::block::compress(src, Some(mode), false)
        .map_err(|e| WrapperError::invalid("lz4", e))?;
    Ok(OwnedBuffer::from_vec(compressed))
}

/// Decompress an LZ4 block whose decompressed size is known to the caller
pub fn lz4_decompress(src: &[u8], original_size: usize) -> WrapperResult<OwnedBuffer> {
    lz4_decompress_limited(src, original_size, config::active().limits.max_output_bytes)
}

fn lz4_decompress_limited(src: &[u8], original_size: usize, limit: usize) -> WrapperResult<OwnedBuffer> {
    check_output_size("lz4", original_size, limit)?;
    let mut out = OwnedBuffer::zeroed(original_size);
    let written = lz4_decompress_into(src, out.as_mut_slice())?;
    out.truncate(written);
    Ok(out)
}

/// Compress with a 4-byte little-endian size prefix
pub fn lz4_compress_prepend_size(src: &[u8]) -> WrapperResult<OwnedBuffer> {
    check_lz4_input(src)?;
    let compressed =
        lz4::block::compress(src, None, true).map_err(|e| WrapperError::invalid("lz4", e))?;
    Ok(OwnedBuffer::from_vec(compressed))
}

/// Decompress a block produced by [`lz4_compress_prepend_size`]
pub fn lz4_decompress_prepend_size(src: &[u8]) -> WrapperResult<OwnedBuffer> {
    let Some(header) = src.get(..4) else {
        return Err(WrapperError::invalid("lz4", "missing 4-byte size prefix"));
    };
    let size = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    lz4_decompress_limited(&src[4..], size, config::active().limits.max_output_bytes)
}

// =============================================================================
// Snappy
// =============================================================================

/// Worst-case compressed size for `source_length` bytes
pub fn snappy_max_compressed_length(source_length: usize) -> usize {
    snap::raw::max_compress_len(source_length)
}

/// Uncompressed length recorded in a Snappy block header
pub fn snappy_uncompressed_length(compressed: &[u8]) -> WrapperResult<usize> {
    snap::raw::decompress_len(compressed).map_err(|e| WrapperError::invalid("snappy", e))
}

/// Check that `compressed` is a well-formed Snappy block
pub fn snappy_validate(compressed: &[u8]) -> bool {
    snappy_uncompress(compressed).is_ok()
}

/// Compress into `dst`, returning the bytes written. `dst` must hold at least
/// [`snappy_max_compressed_length`] bytes.
pub fn snappy_compress_into(src: &[u8], dst: &mut [u8]) -> WrapperResult<usize> {
    let required = snappy_max_compressed_length(src.len());
    if required == 0 {
        return Err(WrapperError::invalid(
            "snappy",
            format!("input of {} bytes is too large", src.len()),
        ));
    }
    if dst.len() < required {
        return Err(WrapperError::BufferTooSmall {
            required,
            provided: dst.len(),
        });
    }
    snap::raw::Encoder::new()
        .compress(src, dst)
        .map_err(|e| WrapperError::invalid("snappy", e))
}

/// Uncompress into `dst`, returning the bytes written
pub fn snappy_uncompress_into(compressed: &[u8], dst: &mut [u8]) -> WrapperResult<usize> {
    let required = snappy_uncompressed_length(compressed)?;
    if dst.len() < required {
        return Err(WrapperError::BufferTooSmall {
            required,
            provided: dst.len(),
        });
    }
    snap::raw::Decoder::new()
        .decompress(compressed, dst)
        .map_err(|e| WrapperError::invalid("snappy", e))
}

/// Compress into a new buffer
pub fn snappy_compress(src: &[u8]) -> WrapperResult<OwnedBuffer> {
    let compressed = snap::raw::Encoder::new()
        .compress_vec(src)
        .map_err(|e| WrapperError::invalid("snappy", e))?;
    Ok(OwnedBuffer::from_vec(compressed))
}

/// Uncompress into a new buffer
pub fn snappy_uncompress(compressed: &[u8]) -> WrapperResult<OwnedBuffer> {
    let required = snappy_uncompressed_length(compressed)?;
    check_output_size("snappy", required, config::active().limits.max_output_bytes)?;
    let mut out = OwnedBuffer::zeroed(required);
    let written = snappy_uncompress_into(compressed, out.as_mut_slice())?;
    out.truncate(written);
    Ok(out)
}

// =============================================================================
// Registration
// =============================================================================

/// Register all compression wrappers with the registry
pub fn register(registry: &mut WrapperRegistry) {
    registry.register_wrapper(
        "lz4_compress",
        "Compress data as a raw LZ4 block",
        WrapperCategory::Compression,
        1,
        |args| lz4_compress(arg(args, 0, "input")?),
    );

    registry.register_wrapper(
        "lz4_compress_fast",
        "Compress data as an LZ4 block with the configured acceleration",
        WrapperCategory::Compression,
        1,
        |args| {
            let acceleration = config::active().lz4.acceleration;
            lz4_compress_with(arg(args, 0, "input")?, CompressionMode::FAST(acceleration))
        },
    );

    registry.register_wrapper(
        "lz4_compress_hc",
        "Compress data as an LZ4 block with the configured HC level",
        WrapperCategory::Compression,
        1,
        |args| {
            let level = config::active().lz4.hc_level;
            lz4_compress_with(arg(args, 0, "input")?, CompressionMode::HIGHCOMPRESSION(level))
        },
    );

    registry.register_wrapper(
        "lz4_decompress",
        "Decompress a raw LZ4 block (args: block, original size as LE integer)",
        WrapperCategory::Compression,
        2,
        |args| {
            let size = arg_u64(args, 1, "original_size")?;
            let size = usize::try_from(size)
                .map_err(|_| WrapperError::InvalidArg(format!("size out of range: {}", size)))?;
            lz4_decompress(arg(args, 0, "input")?, size)
        },
    );

    registry.register_wrapper(
        "lz4_compress_sized",
        "Compress data as an LZ4 block with a 4-byte size prefix",
        WrapperCategory::Compression,
        1,
        |args| lz4_compress_prepend_size(arg(args, 0, "input")?),
    );

    registry.register_wrapper(
        "lz4_decompress_sized",
        "Decompress an LZ4 block carrying a 4-byte size prefix",
        WrapperCategory::Compression,
        1,
        |args| lz4_decompress_prepend_size(arg(args, 0, "input")?),
    );

    registry.register_wrapper(
        "snappy_compress",
        "Compress data in the raw Snappy format",
        WrapperCategory::Compression,
        1,
        |args| snappy_compress(arg(args, 0, "input")?),
    );

    registry.register_wrapper(
        "snappy_uncompress",
        "Uncompress raw Snappy data",
        WrapperCategory::Compression,
        1,
        |args| snappy_uncompress(arg(args, 0, "input")?),
    );
}
