//! BlurHash Wrappers
//!
//! Compact image placeholders via the `blurhash` crate. Encoding takes RGB
//! rows with an arbitrary stride; decoding produces RGB or RGBA.

use super::{
    arg, arg_str, arg_u32, check_output_size, OwnedBuffer, WrapperCategory, WrapperError,
    WrapperRegistry, WrapperResult,
};
use crate::config;

/// Adapter version string
pub fn blurhash_version() -> &'static str {
    concat!("blurhash-adapter ", env!("CARGO_PKG_VERSION"))
}

fn check_components(x_components: u32, y_components: u32) -> WrapperResult<()> {
    for (axis, n) in [("x", x_components), ("y", y_components)] {
        if !(1..=9).contains(&n) {
            return Err(WrapperError::InvalidArg(format!(
                "{} components must be in 1..=9, got {}",
                axis, n
            )));
        }
    }
    Ok(())
}

fn decoded_len(width: u32, height: u32, channels: u8) -> WrapperResult<usize> {
    if channels != 3 && channels != 4 {
        return Err(WrapperError::InvalidArg(format!(
            "channels must be 3 or 4, got {}",
            channels
        )));
    }
    if width == 0 || height == 0 {
        return Err(WrapperError::InvalidArg(format!(
            "dimensions must be non-zero, got {}x{}",
            width, height
        )));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(channels as usize))
        .ok_or_else(|| WrapperError::InvalidArg(format!("{}x{} is too large", width, height)))
}

/// Encode RGB rows (`bytes_per_row >= width * 3`) into a hash string
pub fn encode(
    x_components: u32,
    y_components: u32,
    width: u32,
    height: u32,
    rgb: &[u8],
    bytes_per_row: usize,
) -> WrapperResult<String> {
    check_components(x_components, y_components)?;
    let row_len = decoded_len(width, height, 3)? / height as usize;
    if bytes_per_row < row_len {
        return Err(WrapperError::InvalidArg(format!(
            "bytes_per_row {} is shorter than a row of {} bytes",
            bytes_per_row, row_len
        )));
    }
    let needed = bytes_per_row * (height as usize - 1) + row_len;
    if rgb.len() < needed {
        return Err(WrapperError::BufferTooSmall {
            required: needed,
            provided: rgb.len(),
        });
    }

    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for row in rgb.chunks(bytes_per_row).take(height as usize) {
        for px in row[..row_len].chunks_exact(3) {
            rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
    }

    blurhash::encode(x_components, y_components, width, height, &rgba)
        .map_err(|e| WrapperError::invalid("blurhash", format!("{:?}", e)))
}

/// Decode a hash into `width * height * channels` bytes
pub fn decode(hash: &str, width: u32, height: u32, punch: f32, channels: u8) -> WrapperResult<OwnedBuffer> {
    let len = decoded_len(width, height, channels)?;
    check_output_size("blurhash", len, config::active().limits.max_output_bytes)?;
    let mut out = OwnedBuffer::zeroed(len);
    decode_into(hash, width, height, punch, channels, out.as_mut_slice())?;
    Ok(out)
}

/// Decode into caller memory, returning the bytes written. Nothing is written
/// when `dst` is too small or the hash is invalid.
pub fn decode_into(
    hash: &str,
    width: u32,
    height: u32,
    punch: f32,
    channels: u8,
    dst: &mut [u8],
) -> WrapperResult<usize> {
    let len = decoded_len(width, height, channels)?;
    if dst.len() < len {
        return Err(WrapperError::BufferTooSmall {
            required: len,
            provided: dst.len(),
        });
    }
    let punch = if punch.is_finite() && punch > 0.0 { punch } else { 1.0 };
    let rgba = blurhash::decode(hash, width, height, punch.into())
        .map_err(|e| WrapperError::invalid("blurhash", format!("{:?}", e)))?;

    if channels == 4 {
        dst[..len].copy_from_slice(&rgba[..len]);
    } else {
        for (out, px) in dst[..len].chunks_exact_mut(3).zip(rgba.chunks_exact(4)) {
            out.copy_from_slice(&px[..3]);
        }
    }
    Ok(len)
}

/// Check whether `hash` is a structurally valid BlurHash
pub fn is_valid(hash: &str) -> bool {
    if hash.len() < 6 {
        return false;
    }
    blurhash::decode(hash, 1, 1, 1.0f32.into()).is_ok()
}

// =============================================================================
// Registration
// =============================================================================

/// Register all BlurHash wrappers with the registry
pub fn register(registry: &mut WrapperRegistry) {
    registry.register_wrapper(
        "blurhash_encode",
        "Encode tightly packed RGB pixels (args: rgb, width, height, x components, y components)",
        WrapperCategory::Image,
        5,
        |args| {
            let width = arg_u32(args, 1, "width")?;
            let height = arg_u32(args, 2, "height")?;
            let x = arg_u32(args, 3, "x_components")?;
            let y = arg_u32(args, 4, "y_components")?;
            let hash = encode(x, y, width, height, arg(args, 0, "rgb")?, width as usize * 3)?;
            Ok(OwnedBuffer::from_string(hash))
        },
    );

    registry.register_wrapper(
        "blurhash_decode",
        "Decode a BlurHash to RGBA pixels (args: hash, width, height)",
        WrapperCategory::Image,
        3,
        |args| {
            let width = arg_u32(args, 1, "width")?;
            let height = arg_u32(args, 2, "height")?;
            let punch = config::active().blurhash.punch;
            decode(arg_str(args, 0, "hash")?, width, height, punch, 4)
        },
    );
}
