//! Image Wrappers
//!
//! Decoding (the stb_image surface: probe, 8-bit and float decode, format
//! sniffing) and an editing session, all via the `image` crate.
//!
//! # Supported Formats
//!
//! - **PNG**, **JPEG**, **GIF** (first frame), **BMP** - 8-bit decode
//! - **Radiance HDR** - float decode
//!
//! Editing works on any decoded image and re-encodes to PNG or JPEG.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageFormat, ImageReader, RgbaImage};
use serde::Serialize;

use super::{arg, OwnedBuffer, WrapperCategory, WrapperError, WrapperRegistry, WrapperResult};
use crate::config;

fn image_error(e: impl std::fmt::Display) -> WrapperError {
    WrapperError::invalid("image", e)
}

// =============================================================================
// Decoding
// =============================================================================

/// Header-level facts about an encoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Native channel count (1 = grey, 2 = grey+alpha, 3 = RGB, 4 = RGBA)
    pub channels: u8,
    pub format: &'static str,
}

/// 8-bit pixels, `width * height * channels` bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: OwnedBuffer,
}

/// Float pixels, `width * height * channels` samples
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedHdr {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub samples: Vec<f32>,
}

fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Gif => "gif",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Hdr => "hdr",
        _ => "other",
    }
}

fn check_pixel_limit(width: u32, height: u32) -> WrapperResult<()> {
    let limit = config::active().limits.max_image_pixels;
    if u64::from(width) * u64::from(height) > limit {
        return Err(image_error(format!(
            "{}x{} exceeds the limit of {} pixels",
            width, height, limit
        )));
    }
    Ok(())
}

/// Read dimensions and channel count without decoding pixel data
pub fn probe(data: &[u8]) -> WrapperResult<ImageInfo> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(image_error)?;
    let format = reader
        .format()
        .ok_or_else(|| image_error("unrecognized image format"))?;
    let decoder = reader.into_decoder().map_err(image_error)?;
    let (width, height) = decoder.dimensions();
    Ok(ImageInfo {
        width,
        height,
        channels: decoder.color_type().channel_count(),
        format: format_name(format),
    })
}

fn load(data: &[u8]) -> WrapperResult<(ImageInfo, DynamicImage)> {
    let info = probe(data)?;
    check_pixel_limit(info.width, info.height)?;
    let img = image::load_from_memory(data).map_err(image_error)?;
    Ok((info, img))
}

/// Decode to 8-bit samples. `desired_channels` 0 keeps the native count,
/// 1..=4 converts.
pub fn decode(data: &[u8], desired_channels: u8) -> WrapperResult<DecodedImage> {
    if desired_channels > 4 {
        return Err(WrapperError::InvalidArg(format!(
            "desired channels must be 0..=4, got {}",
            desired_channels
        )));
    }
    let (info, img) = load(data)?;
    let channels = match desired_channels {
        0 => info.channels.clamp(1, 4),
        n => n,
    };
    let pixels = match channels {
        1 => img.to_luma8().into_raw(),
        2 => img.to_luma_alpha8().into_raw(),
        3 => img.to_rgb8().into_raw(),
        _ => img.to_rgba8().into_raw(),
    };
    Ok(DecodedImage {
        width: img.width(),
        height: img.height(),
        channels,
        pixels: OwnedBuffer::from_vec(pixels),
    })
}

/// Decode to `f32` samples. Only RGB (3) and RGBA (4) layouts are produced;
/// 0 picks whichever matches the source.
pub fn decode_hdr(data: &[u8], desired_channels: u8) -> WrapperResult<DecodedHdr> {
    let (info, img) = load(data)?;
    let channels = match desired_channels {
        0 if info.channels == 2 || info.channels == 4 => 4,
        0 => 3,
        3 | 4 => desired_channels,
        other => {
            return Err(WrapperError::NotSupported(format!(
                "float decode to {} channel(s)",
                other
            )))
        }
    };
    let samples = if channels == 3 {
        img.to_rgb32f().into_raw()
    } else {
        img.to_rgba32f().into_raw()
    };
    Ok(DecodedHdr {
        width: img.width(),
        height: img.height(),
        channels,
        samples,
    })
}

fn sniffed(data: &[u8]) -> Option<ImageFormat> {
    image::guess_format(data).ok()
}

pub fn is_png(data: &[u8]) -> bool {
    sniffed(data) == Some(ImageFormat::Png)
}

pub fn is_jpg(data: &[u8]) -> bool {
    sniffed(data) == Some(ImageFormat::Jpeg)
}

pub fn is_gif(data: &[u8]) -> bool {
    sniffed(data) == Some(ImageFormat::Gif)
}

pub fn is_bmp(data: &[u8]) -> bool {
    sniffed(data) == Some(ImageFormat::Bmp)
}

pub fn is_hdr(data: &[u8]) -> bool {
    data.starts_with(b"#?RADIANCE") || data.starts_with(b"#?RGBE")
}

// =============================================================================
// Editing session
// =============================================================================

/// A decoded image with in-place editing operations
#[derive(Debug, Clone)]
pub struct ImageEditor {
    img: DynamicImage,
}

impl ImageEditor {
    /// Wrap tightly packed RGBA pixels
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> WrapperResult<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(WrapperError::InvalidArg(format!(
                "expected {} RGBA bytes for {}x{}, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        let img = RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| WrapperError::InvalidArg("pixel buffer does not match dimensions".to_string()))?;
        Ok(Self {
            img: DynamicImage::ImageRgba8(img),
        })
    }

    /// Decode any supported format
    pub fn decode(data: &[u8]) -> WrapperResult<Self> {
        let (_, img) = load(data)?;
        Ok(Self { img })
    }

    fn decode_as(data: &[u8], format: ImageFormat) -> WrapperResult<Self> {
        let info = probe(data)?;
        check_pixel_limit(info.width, info.height)?;
        let img = image::load_from_memory_with_format(data, format).map_err(image_error)?;
        Ok(Self { img })
    }

    pub fn decode_png(data: &[u8]) -> WrapperResult<Self> {
        Self::decode_as(data, ImageFormat::Png)
    }

    pub fn decode_jpeg(data: &[u8]) -> WrapperResult<Self> {
        Self::decode_as(data, ImageFormat::Jpeg)
    }

    pub fn decode_gif(data: &[u8]) -> WrapperResult<Self> {
        Self::decode_as(data, ImageFormat::Gif)
    }

    pub fn width(&self) -> u32 {
        self.img.width()
    }

    pub fn height(&self) -> u32 {
        self.img.height()
    }

    /// Current pixels as RGBA
    pub fn to_rgba(&self) -> OwnedBuffer {
        OwnedBuffer::from_vec(self.img.to_rgba8().into_raw())
    }

    fn check_size(width: u32, height: u32) -> WrapperResult<()> {
        if width == 0 || height == 0 {
            return Err(WrapperError::InvalidArg(format!(
                "target size must be non-zero, got {}x{}",
                width, height
            )));
        }
        check_pixel_limit(width, height)
    }

    /// Resize to fit within `width x height`, keeping the aspect ratio
    pub fn resize(&mut self, width: u32, height: u32) -> WrapperResult<()> {
        Self::check_size(width, height)?;
        self.img = self.img.resize(width, height, FilterType::Lanczos3);
        Ok(())
    }

    /// Resize to exactly `width x height`
    pub fn resize_exact(&mut self, width: u32, height: u32) -> WrapperResult<()> {
        Self::check_size(width, height)?;
        self.img = self.img.resize_exact(width, height, FilterType::Lanczos3);
        Ok(())
    }

    /// Resize to exactly `width x height` with nearest-neighbour sampling
    pub fn resize_fast(&mut self, width: u32, height: u32) -> WrapperResult<()> {
        Self::check_size(width, height)?;
        self.img = self.img.resize_exact(width, height, FilterType::Nearest);
        Ok(())
    }

    /// Gaussian blur
    pub fn blur(&mut self, sigma: f32) -> WrapperResult<()> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(WrapperError::InvalidArg(format!(
                "blur sigma must be positive, got {}",
                sigma
            )));
        }
        self.img = self.img.blur(sigma);
        Ok(())
    }

    pub fn rotate90(&mut self) {
        self.img = self.img.rotate90();
    }

    pub fn rotate180(&mut self) {
        self.img = self.img.rotate180();
    }

    pub fn rotate270(&mut self) {
        self.img = self.img.rotate270();
    }

    pub fn fliph(&mut self) {
        self.img = self.img.fliph();
    }

    pub fn flipv(&mut self) {
        self.img = self.img.flipv();
    }

    pub fn grayscale(&mut self) {
        self.img = self.img.grayscale();
    }

    pub fn invert(&mut self) {
        self.img.invert();
    }

    /// Positive values increase contrast, negative values decrease it
    pub fn adjust_contrast(&mut self, contrast: f32) {
        self.img = self.img.adjust_contrast(contrast);
    }

    pub fn brighten(&mut self, value: i32) {
        self.img = self.img.brighten(value);
    }

    /// Keep the `width x height` region at `(x, y)`
    pub fn crop(&mut self, x: u32, y: u32, width: u32, height: u32) -> WrapperResult<()> {
        let fits_x = x.checked_add(width).is_some_and(|end| end <= self.width());
        let fits_y = y.checked_add(height).is_some_and(|end| end <= self.height());
        if width == 0 || height == 0 || !fits_x || !fits_y {
            return Err(WrapperError::InvalidArg(format!(
                "crop {}x{} at ({}, {}) is outside {}x{}",
                width,
                height,
                x,
                y,
                self.width(),
                self.height()
            )));
        }
        self.img = self.img.crop_imm(x, y, width, height);
        Ok(())
    }

    /// RGBA value at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x < self.width() && y < self.height() {
            Some(self.img.get_pixel(x, y).0)
        } else {
            None
        }
    }

    pub fn encode_png(&self) -> WrapperResult<OwnedBuffer> {
        let mut out = Cursor::new(Vec::new());
        self.img
            .write_to(&mut out, ImageFormat::Png)
            .map_err(image_error)?;
        Ok(OwnedBuffer::from_vec(out.into_inner()))
    }

    /// JPEG has no alpha channel, so the image is flattened to RGB first
    pub fn encode_jpeg(&self, quality: u8) -> WrapperResult<OwnedBuffer> {
        let rgb = DynamicImage::ImageRgb8(self.img.to_rgb8());
        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
        rgb.write_with_encoder(encoder).map_err(image_error)?;
        Ok(OwnedBuffer::from_vec(out))
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Register all image wrappers with the registry
pub fn register(registry: &mut WrapperRegistry) {
    registry.register_wrapper(
        "image_probe",
        "Describe an encoded image as JSON (width, height, channels, format)",
        WrapperCategory::Image,
        1,
        |args| {
            let info = probe(arg(args, 0, "image")?)?;
            let json = serde_json::to_string(&info).map_err(image_error)?;
            Ok(OwnedBuffer::from_string(json))
        },
    );

    registry.register_wrapper(
        "image_decode_rgba",
        "Decode PNG/JPEG/GIF/BMP/HDR to RGBA pixels",
        WrapperCategory::Image,
        1,
        |args| Ok(decode(arg(args, 0, "image")?, 4)?.pixels),
    );

    registry.register_wrapper(
        "image_to_jpeg",
        "Re-encode an image as JPEG at the configured quality",
        WrapperCategory::Image,
        1,
        |args| {
            let quality = config::active().image.jpeg_quality;
            ImageEditor::decode(arg(args, 0, "image")?)?.encode_jpeg(quality)
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(width: u32, height: u32) -> ImageEditor {
        let mut pixels = Vec::new();
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[(x * 40) as u8, (y * 60) as u8, 200, 255]);
            }
        }
        ImageEditor::from_rgba(width, height, pixels).unwrap()
    }

    #[test]
    fn test_png_roundtrip() {
        let editor = sample(4, 3);
        let png = editor.encode_png().unwrap();
        assert!(is_png(&png));
        assert!(!is_jpg(&png));

        let info = probe(&png).unwrap();
        assert_eq!((info.width, info.height, info.channels), (4, 3, 4));
        assert_eq!(info.format, "png");

        let decoded = decode(&png, 0).unwrap();
        assert_eq!(decoded.channels, 4);
        assert_eq!(decoded.pixels, editor.to_rgba());
    }

    #[test]
    fn test_channel_conversion() {
        let png = sample(2, 2).encode_png().unwrap();
        assert_eq!(decode(&png, 1).unwrap().pixels.len(), 4);
        assert_eq!(decode(&png, 2).unwrap().pixels.len(), 8);
        assert_eq!(decode(&png, 3).unwrap().pixels.len(), 12);
        assert!(decode(&png, 5).is_err());
    }

    #[test]
    fn test_float_decode() {
        let png = sample(2, 2).encode_png().unwrap();
        let hdr = decode_hdr(&png, 3).unwrap();
        assert_eq!(hdr.samples.len(), 12);
        assert!(hdr.samples.iter().all(|s| (0.0..=1.0).contains(s)));
        assert!(matches!(
            decode_hdr(&png, 1),
            Err(WrapperError::NotSupported(_))
        ));
    }

    #[test]
    fn test_jpeg_encode() {
        let jpeg = sample(8, 8).encode_jpeg(90).unwrap();
        assert!(is_jpg(&jpeg));
        let decoded = decode(&jpeg, 3).unwrap();
        assert_eq!((decoded.width, decoded.height), (8, 8));
    }

    #[test]
    fn test_sniffing() {
        assert!(is_gif(b"GIF89a\x01\x00\x01\x00"));
        assert!(is_bmp(b"BM\x00\x00\x00\x00\x00\x00\x00\x00"));
        assert!(is_hdr(b"#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n"));
        assert!(!is_png(b"plain text"));
        assert!(probe(b"plain text").is_err());
        assert!(decode(b"\x89PNG\r\n\x1a\n truncated", 4).is_err());
    }

    #[test]
    fn test_geometry_edits() {
        let mut editor = sample(4, 2);
        editor.rotate90();
        assert_eq!((editor.width(), editor.height()), (2, 4));
        editor.rotate270();
        assert_eq!((editor.width(), editor.height()), (4, 2));

        let before = editor.pixel(0, 0).unwrap();
        editor.fliph();
        assert_eq!(editor.pixel(3, 0).unwrap(), before);
        editor.flipv();
        assert_eq!(editor.pixel(3, 1).unwrap(), before);

        editor.resize_exact(8, 8).unwrap();
        assert_eq!((editor.width(), editor.height()), (8, 8));
        editor.resize(4, 2).unwrap();
        assert_eq!((editor.width(), editor.height()), (2, 2));
        assert!(editor.resize(0, 2).is_err());
    }

    #[test]
    fn test_resize_fast_repeats_pixels() {
        let mut editor = sample(2, 1);
        let (left, right) = (editor.pixel(0, 0).unwrap(), editor.pixel(1, 0).unwrap());
        editor.resize_fast(4, 2).unwrap();
        assert_eq!((editor.width(), editor.height()), (4, 2));
        assert_eq!(editor.pixel(1, 0).unwrap(), left);
        assert_eq!(editor.pixel(3, 1).unwrap(), right);
        assert!(editor.resize_fast(4, 0).is_err());
    }

    #[test]
    fn test_crop_bounds() {
        let mut editor = sample(4, 4);
        assert!(editor.crop(3, 3, 2, 2).is_err());
        assert!(editor.crop(0, 0, 0, 1).is_err());
        let expected = editor.pixel(1, 2).unwrap();
        editor.crop(1, 1, 2, 2).unwrap();
        assert_eq!(editor.pixel(0, 1).unwrap(), expected);
        assert!(editor.pixel(2, 0).is_none());
    }

    #[test]
    fn test_color_edits() {
        let mut editor = sample(2, 1);
        let before = editor.pixel(1, 0).unwrap();
        editor.invert();
        let inverted = editor.pixel(1, 0).unwrap();
        assert_eq!(inverted[0], 255 - before[0]);
        assert_eq!(inverted[3], before[3]);

        editor.grayscale();
        let grey = editor.pixel(1, 0).unwrap();
        assert_eq!(grey[0], grey[1]);
        assert_eq!(grey[1], grey[2]);

        editor.brighten(10);
        editor.adjust_contrast(5.0);
        assert!(editor.blur(0.0).is_err());
        editor.blur(1.0).unwrap();
        assert_eq!(editor.to_rgba().len(), 8);
    }
}
