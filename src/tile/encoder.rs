//! JPEG preview encoder.
//!
//! Turns one pass of a float render buffer into an 8-bit JPEG so a
//! reconstructed frame can be looked at without an EXR viewer.
//!
//! # Conversion
//!
//! - `Value` passes become a grayscale image.
//! - Every other pass kind uses its first three components as RGB; alpha is
//!   dropped.
//! - Values are clamped to `[0, 1]` and scaled to `0..=255`. There is no
//!   tone mapping or color management, so HDR values saturate.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, RgbImage};

use crate::buffers::{PassKind, RenderBuffers};
use crate::error::TileError;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// Preview Encoder
// =============================================================================

/// Encodes a single pass of a [`RenderBuffers`] as JPEG.
///
/// # Example
///
/// ```ignore
/// use tile_spool::tile::PreviewEncoder;
///
/// let encoder = PreviewEncoder::new();
/// let jpeg = encoder.encode(&buffers, "Combined", 85)?;
/// std::fs::write("preview.jpg", &jpeg)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct PreviewEncoder {}

impl PreviewEncoder {
    pub fn new() -> Self {
        Self {}
    }

    /// Encode pass `pass` of `buffers` at the given quality.
    ///
    /// # Errors
    ///
    /// - `InvalidParams` if the buffer has no pass named `pass` or is empty
    /// - `Encode` if JPEG encoding fails
    pub fn encode(
        &self,
        buffers: &RenderBuffers,
        pass: &str,
        quality: u8,
    ) -> Result<Bytes, TileError> {
        let quality = clamp_quality(quality);
        let params = buffers.params();

        let kind = params
            .find_pass(pass)
            .map(|p| p.kind)
            .ok_or_else(|| TileError::InvalidParams(format!("no pass named '{}'", pass)))?;
        let offset = params
            .pass_offset(pass)
            .ok_or_else(|| TileError::InvalidParams(format!("no pass named '{}'", pass)))?;

        if params.width == 0 || params.height == 0 {
            return Err(TileError::InvalidParams(
                "cannot encode an empty buffer".to_string(),
            ));
        }

        let stride = buffers.pixel_stride();
        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);

        let result = match kind {
            PassKind::Value => {
                let img = GrayImage::from_fn(params.width, params.height, |x, y| {
                    let start = (y as usize * params.width as usize + x as usize) * stride;
                    image::Luma([to_u8(buffers.data()[start + offset])])
                });
                encoder.encode_image(&img)
            }
            PassKind::Vector | PassKind::Color | PassKind::Rgba => {
                let img = RgbImage::from_fn(params.width, params.height, |x, y| {
                    let start = (y as usize * params.width as usize + x as usize) * stride;
                    let px = &buffers.data()[start + offset..start + offset + 3];
                    image::Rgb([to_u8(px[0]), to_u8(px[1]), to_u8(px[2])])
                });
                encoder.encode_image(&img)
            }
        };

        result.map_err(|e| TileError::Encode {
            message: e.to_string(),
        })?;

        Ok(Bytes::from(output))
    }

    /// Encode at [`DEFAULT_JPEG_QUALITY`].
    pub fn encode_default(&self, buffers: &RenderBuffers, pass: &str) -> Result<Bytes, TileError> {
        self.encode(buffers, pass, DEFAULT_JPEG_QUALITY)
    }
}

#[inline]
fn to_u8(value: f32) -> u8 {
    // NaN clamps to 0 through the `as` cast
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Validate JPEG quality parameter.
///
/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
