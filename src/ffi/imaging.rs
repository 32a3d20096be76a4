//! Image Exports
//!
//! QOI, BlurHash, the stb_image-style decode surface and image editing
//! sessions. Pixel results are host-owned buffers released with
//! `bridge_free`.

use std::os::raw::c_char;

use parking_lot::Mutex;

use super::{
    guard, guard_alloc, hand_over_buffer, hand_over_f32s, hand_over_text, host_bytes, host_out, host_str, static_c_str, store,
    store_required, HdrDescriptor, ImageDescriptor,
};
use crate::config;
use crate::runtime::{Handle, HandleTable};
use crate::wrappers::image::ImageEditor;
use crate::wrappers::{blurhash, image, qoi, WrapperError, WrapperResult};

lazy_static::lazy_static! {
    static ref EDITORS: Mutex<HandleTable<ImageEditor>> = Mutex::new(HandleTable::new("image_editor"));
}

fn pixel_len(width: u32, height: u32, channels: usize) -> WrapperResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(channels))
        .ok_or_else(|| WrapperError::InvalidArg(format!("{}x{} image is too large", width, height)))
}

fn channels_arg(desired: i32) -> WrapperResult<u8> {
    u8::try_from(desired)
        .ok()
        .filter(|c| *c <= 4)
        .ok_or_else(|| WrapperError::InvalidArg(format!("desired channels must be 0..=4, got {}", desired)))
}

// ========== QOI ==========

/// NUL-terminated QOI adapter version
#[no_mangle]
pub extern "C" fn qoi_wasm_version() -> *const c_char {
    static_c_str(qoi::qoi_version())
}

unsafe fn qoi_encode_export(
    export: &'static str,
    pixels: *const u8,
    width: u32,
    height: u32,
    channels: u8,
    out_len: *mut usize,
) -> *mut u8 {
    guard_alloc(export, out_len, || {
        let pixels = host_bytes(pixels, pixel_len(width, height, channels as usize)?)?;
        hand_over_buffer(qoi::encode(pixels, width, height, channels)?, out_len)
    })
}

/// Encode `width * height` RGBA pixels; encoded length in `out_len`
///
/// # Safety
///
/// `pixels` must be valid for `width * height * 4` reads; `out_len` null or
/// writable.
#[no_mangle]
pub unsafe extern "C" fn qoi_encode_rgba(pixels: *const u8, width: u32, height: u32, out_len: *mut usize) -> *mut u8 {
    qoi_encode_export("qoi_encode_rgba", pixels, width, height, 4, out_len)
}

/// Encode `width * height` RGB pixels; encoded length in `out_len`
///
/// # Safety
///
/// `pixels` must be valid for `width * height * 3` reads; `out_len` null or
/// writable.
#[no_mangle]
pub unsafe extern "C" fn qoi_encode_rgb(pixels: *const u8, width: u32, height: u32, out_len: *mut usize) -> *mut u8 {
    qoi_encode_export("qoi_encode_rgb", pixels, width, height, 3, out_len)
}

unsafe fn qoi_decode_export(
    export: &'static str,
    data: *const u8,
    len: usize,
    channels: u8,
    out_width: *mut u32,
    out_height: *mut u32,
) -> *mut u8 {
    store(out_width, 0);
    store(out_height, 0);
    guard(export, std::ptr::null_mut(), || {
        let decoded = qoi::decode(host_bytes(data, len)?, channels)?;
        let ptr = hand_over_buffer(decoded.pixels, std::ptr::null_mut())?;
        store(out_width, decoded.width);
        store(out_height, decoded.height);
        Ok(ptr)
    })
}

/// Decode to RGBA; dimensions in `out_width` / `out_height`
///
/// # Safety
///
/// `data` must be valid for `len` reads; the out-pointers null or writable.
#[no_mangle]
pub unsafe extern "C" fn qoi_decode_to_rgba(
    data: *const u8,
    len: usize,
    out_width: *mut u32,
    out_height: *mut u32,
) -> *mut u8 {
    qoi_decode_export("qoi_decode_to_rgba", data, len, 4, out_width, out_height)
}

/// Decode to RGB; dimensions in `out_width` / `out_height`
///
/// # Safety
///
/// `data` must be valid for `len` reads; the out-pointers null or writable.
#[no_mangle]
pub unsafe extern "C" fn qoi_decode_to_rgb(
    data: *const u8,
    len: usize,
    out_width: *mut u32,
    out_height: *mut u32,
) -> *mut u8 {
    qoi_decode_export("qoi_decode_to_rgb", data, len, 3, out_width, out_height)
}

// ========== BlurHash ==========

/// NUL-terminated BlurHash adapter version
#[no_mangle]
pub extern "C" fn blurhash_version() -> *const c_char {
    static_c_str(blurhash::blurhash_version())
}

/// Encode RGB rows with stride `bytes_per_row` into a NUL-terminated hash
/// string; length (without NUL) in `out_len`
///
/// # Safety
///
/// `rgb` must be valid for `bytes_per_row * (height - 1) + width * 3`
/// reads; `out_len` null or writable.
#[no_mangle]
pub unsafe extern "C" fn blurhash_encode(
    x_components: u32,
    y_components: u32,
    width: u32,
    height: u32,
    rgb: *const u8,
    bytes_per_row: usize,
    out_len: *mut usize,
) -> *mut u8 {
    guard_alloc("blurhash_encode", out_len, || {
        let len = if width == 0 || height == 0 {
            0
        } else {
            bytes_per_row
                .checked_mul(height as usize - 1)
                .and_then(|n| n.checked_add(width as usize * 3))
                .ok_or_else(|| WrapperError::InvalidArg("image is too large".to_string()))?
        };
        let rgb = host_bytes(rgb, len)?;
        let hash = blurhash::encode(x_components, y_components, width, height, rgb, bytes_per_row)?;
        hand_over_text(hash, out_len)
    })
}

/// Decode a hash into `width * height * channels` bytes (3 or 4 channels).
/// A non-positive `punch` uses the configured default.
///
/// # Safety
///
/// `hash` must be valid for `hash_len` reads; `out_len` null or writable.
#[no_mangle]
pub unsafe extern "C" fn blurhash_decode(
    hash: *const u8,
    hash_len: usize,
    width: u32,
    height: u32,
    punch: f32,
    channels: u32,
    out_len: *mut usize,
) -> *mut u8 {
    guard_alloc("blurhash_decode", out_len, || {
        let hash = host_str(hash, hash_len, "hash")?;
        let punch = if punch > 0.0 { punch } else { config::active().blurhash.punch };
        let pixels = blurhash::decode(hash, width, height, punch, channels_arg(channels as i32)?)?;
        hand_over_buffer(pixels, out_len)
    })
}

/// Decode into caller memory. 0 on success, -1 on error (nothing written
/// when `capacity` is too small).
///
/// # Safety
///
/// `hash` must be valid for `hash_len` reads and `dst` for `capacity`
/// writes.
#[no_mangle]
pub unsafe extern "C" fn blurhash_decode_to_array(
    hash: *const u8,
    hash_len: usize,
    width: u32,
    height: u32,
    punch: f32,
    channels: u32,
    dst: *mut u8,
    capacity: usize,
) -> i32 {
    guard("blurhash_decode_to_array", -1, || {
        let hash = host_str(hash, hash_len, "hash")?;
        let punch = if punch > 0.0 { punch } else { config::active().blurhash.punch };
        let mut out = host_out(dst, capacity)?;
        blurhash::decode_into(hash, width, height, punch, channels_arg(channels as i32)?, out.as_mut_slice())?;
        Ok(0)
    })
}

/// 1 when `hash` is a structurally valid BlurHash, 0 otherwise
///
/// # Safety
///
/// `hash` must be valid for `hash_len` reads.
#[no_mangle]
pub unsafe extern "C" fn blurhash_is_valid(hash: *const u8, hash_len: usize) -> i32 {
    guard("blurhash_is_valid", 0, || {
        Ok(blurhash::is_valid(host_str(hash, hash_len, "hash")?) as i32)
    })
}

// ========== stb_image surface ==========

/// Decode an image; `desired_channels` 0 keeps the native layout. 1 on
/// success with `out` filled (its `data` is host-owned), 0 on error.
///
/// # Safety
///
/// `buffer` must be valid for `len` reads and `out` for one write.
#[no_mangle]
pub unsafe extern "C" fn stb_load_image(
    buffer: *const u8,
    len: usize,
    desired_channels: i32,
    out: *mut ImageDescriptor,
) -> i32 {
    guard("stb_load_image", 0, || {
        if out.is_null() {
            return Err(WrapperError::InvalidArg("out is null".to_string()));
        }
        let decoded = image::decode(host_bytes(buffer, len)?, channels_arg(desired_channels)?)?;
        let byte_len = decoded.pixels.len();
        let data = hand_over_buffer(decoded.pixels, std::ptr::null_mut())?;
        let descriptor = ImageDescriptor {
            data,
            len: byte_len,
            width: decoded.width,
            height: decoded.height,
            channels: u32::from(decoded.channels),
        };
        store_required(out, descriptor, "out")?;
        Ok(1)
    })
}

/// Read dimensions and native channel count without decoding pixels.
/// 1 on success, 0 on error.
///
/// # Safety
///
/// `buffer` must be valid for `len` reads; the out-pointers null or writable.
#[no_mangle]
pub unsafe extern "C" fn stb_get_info(
    buffer: *const u8,
    len: usize,
    width: *mut u32,
    height: *mut u32,
    channels: *mut u32,
) -> i32 {
    guard("stb_get_info", 0, || {
        let info = image::probe(host_bytes(buffer, len)?)?;
        store(width, info.width);
        store(height, info.height);
        store(channels, u32::from(info.channels));
        Ok(1)
    })
}

/// Decode a Radiance HDR image to `f32` samples (0, 3 or 4 channels).
/// 1 on success with `out` filled, 0 on error.
///
/// # Safety
///
/// `buffer` must be valid for `len` reads and `out` for one write.
#[no_mangle]
pub unsafe extern "C" fn stb_load_hdr(
    buffer: *const u8,
    len: usize,
    desired_channels: i32,
    out: *mut HdrDescriptor,
) -> i32 {
    guard("stb_load_hdr", 0, || {
        if out.is_null() {
            return Err(WrapperError::InvalidArg("out is null".to_string()));
        }
        let decoded = image::decode_hdr(host_bytes(buffer, len)?, channels_arg(desired_channels)?)?;
        let data = hand_over_f32s(&decoded.samples)?;
        let descriptor = HdrDescriptor {
            data,
            len: decoded.samples.len(),
            width: decoded.width,
            height: decoded.height,
            channels: u32::from(decoded.channels),
        };
        store_required(out, descriptor, "out")?;
        Ok(1)
    })
}

macro_rules! format_check {
    ($export:ident, $check:path) => {
        /// 1 when the buffer holds this format, 0 otherwise
        ///
        /// # Safety
        ///
        /// `buffer` must be valid for `len` reads.
        #[no_mangle]
        pub unsafe extern "C" fn $export(buffer: *const u8, len: usize) -> i32 {
            guard(stringify!($export), 0, || Ok($check(host_bytes(buffer, len)?) as i32))
        }
    };
}

format_check!(stb_is_png, image::is_png);
format_check!(stb_is_jpg, image::is_jpg);
format_check!(stb_is_gif, image::is_gif);
format_check!(stb_is_bmp, image::is_bmp);
format_check!(stb_is_hdr, image::is_hdr);

// ========== Editing sessions ==========

/// Apply an edit to a live session; 1 on success, 0 on error
fn edit<F>(export: &'static str, handle: Handle, f: F) -> i32
where
    F: FnOnce(&mut ImageEditor) -> WrapperResult<()>,
{
    guard(export, 0, || {
        let mut editors = EDITORS.lock();
        let editor = editors
            .get_mut(handle)
            .ok_or(WrapperError::HandleNotFound(handle.into()))?;
        f(editor)?;
        Ok(1)
    })
}

/// Decode PNG/JPEG/GIF/BMP into an editing session; handle 0 on error
///
/// # Safety
///
/// `data` must be valid for `len` reads.
#[no_mangle]
pub unsafe extern "C" fn image_editor_create(data: *const u8, len: usize) -> Handle {
    guard("image_editor_create", 0, || {
        let editor = ImageEditor::decode(host_bytes(data, len)?)?;
        Ok(EDITORS.lock().insert(editor))
    })
}

/// Start a session from `width * height` RGBA pixels; handle 0 on error
///
/// # Safety
///
/// `pixels` must be valid for `width * height * 4` reads.
#[no_mangle]
pub unsafe extern "C" fn image_editor_from_rgba(pixels: *const u8, width: u32, height: u32) -> Handle {
    guard("image_editor_from_rgba", 0, || {
        let pixels = host_bytes(pixels, pixel_len(width, height, 4)?)?;
        let editor = ImageEditor::from_rgba(width, height, pixels.to_vec())?;
        Ok(EDITORS.lock().insert(editor))
    })
}

/// Current width, 0 for an unknown handle
#[no_mangle]
pub extern "C" fn image_editor_width(handle: Handle) -> u32 {
    guard("image_editor_width", 0, || {
        EDITORS
            .lock()
            .with(handle, ImageEditor::width)
            .ok_or(WrapperError::HandleNotFound(handle.into()))
    })
}

/// Current height, 0 for an unknown handle
#[no_mangle]
pub extern "C" fn image_editor_height(handle: Handle) -> u32 {
    guard("image_editor_height", 0, || {
        EDITORS
            .lock()
            .with(handle, ImageEditor::height)
            .ok_or(WrapperError::HandleNotFound(handle.into()))
    })
}

/// Lanczos resize to fit within `width x height`, keeping the aspect ratio
#[no_mangle]
pub extern "C" fn image_editor_resize(handle: Handle, width: u32, height: u32) -> i32 {
    edit("image_editor_resize", handle, |e| e.resize(width, height))
}

/// Lanczos resize to exactly `width x height`
#[no_mangle]
pub extern "C" fn image_editor_resize_exact(handle: Handle, width: u32, height: u32) -> i32 {
    edit("image_editor_resize_exact", handle, |e| e.resize_exact(width, height))
}

/// Nearest-neighbour resize to exactly `width x height`
#[no_mangle]
pub extern "C" fn image_editor_resize_fast(handle: Handle, width: u32, height: u32) -> i32 {
    edit("image_editor_resize_fast", handle, |e| e.resize_fast(width, height))
}

#[no_mangle]
pub extern "C" fn image_editor_blur(handle: Handle, sigma: f32) -> i32 {
    edit("image_editor_blur", handle, |e| e.blur(sigma))
}

/// Rotate clockwise by 90, 180 or 270 degrees
#[no_mangle]
pub extern "C" fn image_editor_rotate(handle: Handle, degrees: u32) -> i32 {
    edit("image_editor_rotate", handle, |e| {
        match degrees {
            90 => e.rotate90(),
            180 => e.rotate180(),
            270 => e.rotate270(),
            other => {
                return Err(WrapperError::InvalidArg(format!(
                    "rotation must be 90, 180 or 270 degrees, got {}",
                    other
                )))
            }
        }
        Ok(())
    })
}

/// Mirror horizontally, or vertically when `vertical` is non-zero
#[no_mangle]
pub extern "C" fn image_editor_flip(handle: Handle, vertical: i32) -> i32 {
    edit("image_editor_flip", handle, |e| {
        if vertical != 0 {
            e.flipv();
        } else {
            e.fliph();
        }
        Ok(())
    })
}

#[no_mangle]
pub extern "C" fn image_editor_grayscale(handle: Handle) -> i32 {
    edit("image_editor_grayscale", handle, |e| {
        e.grayscale();
        Ok(())
    })
}

#[no_mangle]
pub extern "C" fn image_editor_invert(handle: Handle) -> i32 {
    edit("image_editor_invert", handle, |e| {
        e.invert();
        Ok(())
    })
}

/// Positive values increase contrast, negative values decrease it
#[no_mangle]
pub extern "C" fn image_editor_contrast(handle: Handle, contrast: f32) -> i32 {
    edit("image_editor_contrast", handle, |e| {
        if !contrast.is_finite() {
            return Err(WrapperError::InvalidArg(format!("contrast must be finite, got {}", contrast)));
        }
        e.adjust_contrast(contrast);
        Ok(())
    })
}

#[no_mangle]
pub extern "C" fn image_editor_brighten(handle: Handle, value: i32) -> i32 {
    edit("image_editor_brighten", handle, |e| {
        e.brighten(value);
        Ok(())
    })
}

/// Keep the `width x height` region at `(x, y)`
#[no_mangle]
pub extern "C" fn image_editor_crop(handle: Handle, x: u32, y: u32, width: u32, height: u32) -> i32 {
    edit("image_editor_crop", handle, |e| e.crop(x, y, width, height))
}

/// Write the RGBA value at `(x, y)` into `out[0..4]`; 1 on success, 0 when
/// out of range
///
/// # Safety
///
/// `out` must be valid for 4 writes.
#[no_mangle]
pub unsafe extern "C" fn image_editor_get_pixel(handle: Handle, x: u32, y: u32, out: *mut u8) -> i32 {
    guard("image_editor_get_pixel", 0, || {
        let pixel = EDITORS
            .lock()
            .with(handle, |e| e.pixel(x, y))
            .ok_or(WrapperError::HandleNotFound(handle.into()))?
            .ok_or_else(|| WrapperError::InvalidArg(format!("pixel ({}, {}) out of range", x, y)))?;
        host_out(out, 4)?.write_all(&pixel)?;
        Ok(1)
    })
}

/// PNG output format for [`image_editor_encode`]
pub const IMAGE_FORMAT_PNG: u32 = 0;
/// JPEG output format for [`image_editor_encode`]
pub const IMAGE_FORMAT_JPEG: u32 = 1;

/// Encode the current image as PNG or JPEG into a host-owned buffer. A zero
/// `quality` uses the configured JPEG quality.
///
/// # Safety
///
/// `out_len` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn image_editor_encode(handle: Handle, format: u32, quality: u8, out_len: *mut usize) -> *mut u8 {
    guard_alloc("image_editor_encode", out_len, || {
        let editors = EDITORS.lock();
        let editor = editors
            .get(handle)
            .ok_or(WrapperError::HandleNotFound(handle.into()))?;
        let encoded = match format {
            IMAGE_FORMAT_PNG => editor.encode_png()?,
            IMAGE_FORMAT_JPEG => {
                let quality = if quality == 0 { config::active().image.jpeg_quality } else { quality };
                editor.encode_jpeg(quality)?
            }
            other => return Err(WrapperError::NotSupported(format!("image output format {}", other))),
        };
        drop(editors);
        hand_over_buffer(encoded, out_len)
    })
}

/// Current pixels as RGBA in a host-owned buffer
///
/// # Safety
///
/// `out_len` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn image_editor_to_rgba(handle: Handle, out_len: *mut usize) -> *mut u8 {
    guard_alloc("image_editor_to_rgba", out_len, || {
        let pixels = EDITORS
            .lock()
            .with(handle, ImageEditor::to_rgba)
            .ok_or(WrapperError::HandleNotFound(handle.into()))?;
        hand_over_buffer(pixels, out_len)
    })
}

/// Release a session; 1 when it existed, 0 otherwise
#[no_mangle]
pub extern "C" fn image_editor_destroy(handle: Handle) -> i32 {
    guard("image_editor_destroy", 0, || Ok(EDITORS.lock().remove(handle).is_some() as i32))
}
