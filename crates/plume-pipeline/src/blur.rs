//! Gaussian smoothing ahead of edge detection.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`] to suppress the
//! high-frequency noise (paper grain, sensor noise) that would otherwise
//! turn into spurious edge fragments.

use image::GrayImage;

/// Apply Gaussian blur to a grayscale image.
///
/// Higher `sigma` values produce more smoothing; 0.8 approximates a 3x3
/// kernel. Non-positive sigma values return the image unchanged, since
/// `imageproc` panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 || !sigma.is_finite() {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}
