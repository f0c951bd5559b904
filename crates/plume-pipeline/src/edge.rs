//! Edge map construction and gap closing.
//!
//! Every [`EdgeMethod`] produces a binary image: 255 for edge pixels,
//! 0 for background. [`close_edges`] then bridges the 1-2 pixel breaks
//! that gradient operators leave along a drawn line, so contour tracing
//! sees one connected boundary instead of fragments.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;

use crate::blur::gaussian_blur;
use crate::types::{EdgeMethod, PipelineConfig};

/// Minimum allowed Canny threshold.
///
/// A low threshold of zero marks every pixel with any gradient as a
/// candidate edge, which floods contour tracing.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Build the binary edge map for `gray` with the configured operator.
#[must_use = "returns the binary edge map"]
pub fn detect_edges(gray: &GrayImage, config: &PipelineConfig) -> GrayImage {
    match config.edge_method {
        EdgeMethod::Canny => canny(
            &gaussian_blur(gray, config.blur_sigma),
            config.canny_low,
            config.canny_high,
        ),
        EdgeMethod::Sobel => sobel(gray),
        EdgeMethod::Laplacian => laplacian(&gaussian_blur(gray, config.blur_sigma)),
    }
}

/// Detect edges using the Canny algorithm.
///
/// Both thresholds are clamped to a minimum of [`MIN_THRESHOLD`] and
/// `low_threshold` is clamped to be at most `high_threshold`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    imageproc::edges::canny(image, low, high)
}

/// Sobel gradient magnitude binarized at Otsu's level.
///
/// The absolute horizontal and vertical responses are saturated to 8
/// bits and averaged before thresholding.
#[must_use = "returns the binary edge map"]
pub fn sobel(image: &GrayImage) -> GrayImage {
    let gx = imageproc::gradients::horizontal_sobel(image);
    let gy = imageproc::gradients::vertical_sobel(image);
    let magnitude = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let ax = u16::from(saturate_abs(gx.get_pixel(x, y).0[0]));
        let ay = u16::from(saturate_abs(gy.get_pixel(x, y).0[0]));
        // Average of two u8 values always fits in u8.
        Luma([u8::try_from((ax + ay).div_ceil(2)).unwrap_or(u8::MAX)])
    });
    binarize_above_otsu(&magnitude)
}

/// 3x3 Laplacian response binarized at Otsu's level.
#[must_use = "returns the binary edge map"]
pub fn laplacian(image: &GrayImage) -> GrayImage {
    let response = imageproc::filter::laplacian_filter(image);
    let magnitude = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([saturate_abs(response.get_pixel(x, y).0[0])])
    });
    binarize_above_otsu(&magnitude)
}

/// Morphological closing with a square structuring element of side
/// `2 * radius + 1`. A radius of 0 returns the map unchanged.
#[must_use = "returns the closed edge map"]
pub fn close_edges(edges: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return edges.clone();
    }
    imageproc::morphology::close(edges, Norm::LInf, radius)
}

/// Number of edge (non-zero) pixels in a binary map.
#[must_use]
pub fn edge_pixel_count(edges: &GrayImage) -> usize {
    edges.pixels().filter(|p| p.0[0] > 0).count()
}

fn saturate_abs(value: i16) -> u8 {
    u8::try_from(value.unsigned_abs()).unwrap_or(u8::MAX)
}

/// Keep pixels strictly brighter than Otsu's level. A black image stays
/// black regardless of the level it produces.
fn binarize_above_otsu(magnitude: &GrayImage) -> GrayImage {
    let level = imageproc::contrast::otsu_level(magnitude);
    GrayImage::from_fn(magnitude.width(), magnitude.height(), |x, y| {
        let v = magnitude.get_pixel(x, y).0[0];
        Luma([if v > level && v > 0 { 255 } else { 0 }])
    })
}
