//! QOI Wrappers
//!
//! "Quite OK Image" encoding and decoding via the `qoi` crate. Pixels are
//! tightly packed RGB (3 channels) or RGBA (4 channels), sRGB.

use qoi::{Channels, ColorSpace, Decoder, Encoder, Header};

use super::{
    arg, arg_u32, OwnedBuffer, WrapperCategory, WrapperError, WrapperRegistry, WrapperResult,
};
use crate::config;

/// Adapter version string
pub fn qoi_version() -> &'static str {
    concat!("qoi-adapter ", env!("CARGO_PKG_VERSION"))
}

/// Decoded pixels and their dimensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPixels {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: OwnedBuffer,
}

/// Header fields of a QOI image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QoiInfo {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub srgb: bool,
}

fn channels_from(count: u8) -> WrapperResult<Channels> {
    match count {
        3 => Ok(Channels::Rgb),
        4 => Ok(Channels::Rgba),
        other => Err(WrapperError::InvalidArg(format!(
            "QOI channels must be 3 or 4, got {}",
            other
        ))),
    }
}

fn check_pixels(width: u32, height: u32, limit: u64) -> WrapperResult<()> {
    if width == 0 || height == 0 {
        return Err(WrapperError::InvalidArg(format!(
            "image dimensions must be non-zero, got {}x{}",
            width, height
        )));
    }
    let pixels = u64::from(width) * u64::from(height);
    if pixels > limit {
        return Err(WrapperError::invalid(
            "qoi",
            format!("{}x{} exceeds the limit of {} pixels", width, height, limit),
        ));
    }
    Ok(())
}

/// Encode packed pixels; `pixels.len()` must equal `width * height * channels`
pub fn encode(pixels: &[u8], width: u32, height: u32, channels: u8) -> WrapperResult<OwnedBuffer> {
    channels_from(channels)?;
    check_pixels(width, height, config::active().limits.max_image_pixels)?;
    let expected = width as usize * height as usize * channels as usize;
    if pixels.len() != expected {
        return Err(WrapperError::InvalidArg(format!(
            "expected {} bytes for {}x{}x{}, got {}",
            expected,
            width,
            height,
            channels,
            pixels.len()
        )));
    }
    let encoded = Encoder::new(&pixels, width, height)
        .map_err(|e| WrapperError::invalid("qoi", e))?
        .with_colorspace(ColorSpace::Srgb)
        .encode_to_vec()
        .map_err(|e| WrapperError::invalid("qoi", e))?;
    Ok(OwnedBuffer::from_vec(encoded))
}

/// Read the header without decoding pixels
pub fn read_header(data: &[u8]) -> WrapperResult<QoiInfo> {
    let header: Header = qoi::decode_header(data).map_err(|e| WrapperError::invalid("qoi", e))?;
    Ok(QoiInfo {
        width: header.width,
        height: header.height,
        channels: header.channels.as_u8(),
        srgb: header.colorspace == ColorSpace::Srgb,
    })
}

/// Decode to `channels` (3 or 4) per pixel regardless of the stored layout
pub fn decode(data: &[u8], channels: u8) -> WrapperResult<DecodedPixels> {
    let target = channels_from(channels)?;
    let info = read_header(data)?;
    check_pixels(info.width, info.height, config::active().limits.max_image_pixels)?;

    let mut decoder = Decoder::new(data)
        .map_err(|e| WrapperError::invalid("qoi", e))?
        .with_channels(target);
    let pixels = decoder
        .decode_to_vec()
        .map_err(|e| WrapperError::invalid("qoi", e))?;
    Ok(DecodedPixels {
        width: info.width,
        height: info.height,
        channels,
        pixels: OwnedBuffer::from_vec(pixels),
    })
}

// =============================================================================
// Registration
// =============================================================================

/// Register all QOI wrappers with the registry
pub fn register(registry: &mut WrapperRegistry) {
    registry.register_wrapper(
        "qoi_encode",
        "Encode packed pixels as QOI (args: pixels, width, height, channels)",
        WrapperCategory::Image,
        4,
        |args| {
            let width = arg_u32(args, 1, "width")?;
            let height = arg_u32(args, 2, "height")?;
            let channels = arg_u32(args, 3, "channels")?;
            let channels = u8::try_from(channels)
                .map_err(|_| WrapperError::InvalidArg(format!("bad channels: {}", channels)))?;
            encode(arg(args, 0, "pixels")?, width, height, channels)
        },
    );

    registry.register_wrapper(
        "qoi_decode",
        "Decode QOI to RGBA pixels",
        WrapperCategory::Image,
        1,
        |args| Ok(decode(arg(args, 0, "image")?, 4)?.pixels),
    );
}
