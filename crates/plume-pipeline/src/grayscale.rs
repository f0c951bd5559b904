//! Image decoding and intensity conversion.
//!
//! The pipeline consumes a single intensity grid. Encoded images (PNG,
//! JPEG, BMP, WebP) go through [`decode_and_grayscale`]; raw frames
//! handed over by a capture layer go through [`grayscale_from_raw`].

use image::{GrayImage, Luma};

use crate::types::PipelineError;

/// Decode raw image bytes and convert to grayscale.
///
/// Color is converted with the standard luminance weights
/// `0.299*R + 0.587*G + 0.114*B`.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty,
/// [`PipelineError::ImageDecode`] if the format is unrecognized or the
/// data is corrupt, and [`PipelineError::InvalidImage`] if the decoded
/// image has a zero dimension.
#[must_use = "returns the decoded grayscale image"]
pub fn decode_and_grayscale(bytes: &[u8]) -> Result<GrayImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let gray = image::load_from_memory(bytes)?.to_luma8();
    ensure_non_empty(&gray)?;
    Ok(gray)
}

/// Build an intensity image from an interleaved 8-bit pixel buffer.
///
/// `channels` may be 1 (gray), 3 (RGB) or 4 (RGBA; alpha is ignored).
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] for any other channel count,
/// a zero dimension, or a buffer whose length is not
/// `width * height * channels`.
#[must_use = "returns the grayscale image"]
pub fn grayscale_from_raw(
    width: u32,
    height: u32,
    channels: u8,
    data: &[u8],
) -> Result<GrayImage, PipelineError> {
    if !matches!(channels, 1 | 3 | 4) {
        return Err(PipelineError::InvalidImage(format!(
            "unsupported channel count {channels} (expected 1, 3 or 4)"
        )));
    }
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidImage(format!(
            "image has zero size ({width}x{height})"
        )));
    }
    let expected = width as usize * height as usize * usize::from(channels);
    if data.len() != expected {
        return Err(PipelineError::InvalidImage(format!(
            "buffer holds {} bytes, {width}x{height}x{channels} needs {expected}",
            data.len()
        )));
    }

    let stride = usize::from(channels);
    Ok(GrayImage::from_fn(width, height, |x, y| {
        let i = (y as usize * width as usize + x as usize) * stride;
        if stride == 1 {
            Luma([data[i]])
        } else {
            Luma([luminance(data[i], data[i + 1], data[i + 2])])
        }
    }))
}

fn ensure_non_empty(gray: &GrayImage) -> Result<(), PipelineError> {
    if gray.width() == 0 || gray.height() == 0 {
        return Err(PipelineError::InvalidImage(format!(
            "image has zero size ({}x{})",
            gray.width(),
            gray.height()
        )));
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.114f32.mul_add(
        f32::from(b),
        0.299f32.mul_add(f32::from(r), 0.587 * f32::from(g)),
    );
    y.round().clamp(0.0, 255.0) as u8
}
