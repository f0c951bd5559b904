//! Raster preview of the ordered strokes.
//!
//! Draws every stroke black on a white canvas the size of the source
//! image with tiny-skia, so the result can be laid next to the input
//! photo or written out as a PNG.

use image::{ImageEncoder, RgbaImage};
use tiny_skia::{Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use plume_pipeline::normalize::to_pixel;
use plume_pipeline::{Dimensions, Polyline};

/// Errors from raster rendering and PNG encoding.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The canvas could not be allocated (zero or oversized dimensions).
    #[error("cannot render a {width}x{height} preview")]
    InvalidSize { width: u32, height: u32 },

    /// The line width is not a positive finite number.
    #[error("line width must be positive, got {0}")]
    InvalidLineWidth(f64),

    /// PNG encoding failed.
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
}

/// Render center-origin strokes onto a white canvas of `dimensions`.
///
/// Strokes with fewer than two points leave no mark.
///
/// # Errors
///
/// Returns [`ExportError::InvalidSize`] when the canvas cannot be
/// allocated and [`ExportError::InvalidLineWidth`] for a non-positive
/// or non-finite `line_width`.
#[allow(clippy::cast_possible_truncation)]
pub fn render_preview(
    strokes: &[Polyline],
    dimensions: Dimensions,
    line_width: f64,
) -> Result<RgbaImage, ExportError> {
    let Dimensions { width, height } = dimensions;
    if !(line_width.is_finite() && line_width > 0.0) {
        return Err(ExportError::InvalidLineWidth(line_width));
    }
    let mut pixmap = Pixmap::new(width, height).ok_or(ExportError::InvalidSize { width, height })?;
    pixmap.fill(Color::WHITE);

    let stroke = Stroke {
        width: line_width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.anti_alias = true;

    for polyline in strokes {
        if polyline.len() < 2 {
            continue;
        }
        let mut points = polyline.points().iter().map(|&p| to_pixel(p, dimensions));
        let Some(first) = points.next() else {
            continue;
        };
        let mut pb = PathBuilder::new();
        pb.move_to(first.x as f32, first.y as f32);
        for p in points {
            pb.line_to(p.x as f32, p.y as f32);
        }
        // A path that collapses to a point has no bounds.
        let Some(path) = pb.finish() else {
            continue;
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    Ok(to_rgba(&pixmap))
}

/// Convert a premultiplied pixmap to a straight-alpha image.
fn to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (pixel, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        pixel.0 = [c.red(), c.green(), c.blue(), c.alpha()];
    }
    img
}

/// Encode an image as PNG bytes.
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if the encoder fails.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}
