//! Optional sheet rectification ahead of the pipeline.
//!
//! A photographed sheet is rarely square to the camera. [`detect_sheet`]
//! looks for the bright quadrilateral of the paper; when that fails a
//! caller collects the corners by hand into a [`CornerSelection`]. Either
//! way [`rectify`] warps the quadrilateral onto an upright rectangle.

use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use serde::{Deserialize, Serialize};

use crate::contour::trace_contours;
use crate::dedup::{closed_perimeter, enclosed_area};
use crate::simplify::approximate_closed;
use crate::types::{PipelineError, Point};

/// Smallest contour area considered a sheet candidate (square pixels).
pub const MIN_SHEET_AREA: f64 = 1000.0;

/// Polygon approximation tolerance as a fraction of the contour
/// perimeter.
pub const SHEET_APPROX_FRACTION: f64 = 0.015;

/// Corner points picked one at a time, typically by clicking on a
/// preview. Holds at most four.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CornerSelection {
    points: Vec<Point>,
}

impl CornerSelection {
    /// An empty selection.
    #[must_use]
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Add a corner. Returns `Ok(true)` once four corners are held.
    ///
    /// # Errors
    ///
    /// Hands the point back when four corners are already selected.
    pub fn push(&mut self, point: Point) -> Result<bool, Point> {
        if self.is_complete() {
            return Err(point);
        }
        self.points.push(point);
        Ok(self.is_complete())
    }

    /// Corners selected so far.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Whether all four corners are selected.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.points.len() == 4
    }

    /// The four corners in selection order, once complete.
    #[must_use]
    pub fn corners(&self) -> Option<[Point; 4]> {
        self.points.as_slice().try_into().ok()
    }
}

/// Find the sheet of paper in a photograph.
///
/// Binarizes at Otsu's level, traces the bright regions and returns the
/// corners of the largest one (area above [`MIN_SHEET_AREA`]) whose
/// outline approximates to exactly four vertices. `None` when nothing
/// qualifies.
#[must_use]
pub fn detect_sheet(gray: &GrayImage) -> Option<[Point; 4]> {
    let level = imageproc::contrast::otsu_level(gray);
    let binary = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([if gray.get_pixel(x, y).0[0] > level { 255 } else { 0 }])
    });

    trace_contours(&binary).into_iter().find_map(|contour| {
        if enclosed_area(contour.points()) <= MIN_SHEET_AREA {
            return None;
        }
        let epsilon = SHEET_APPROX_FRACTION * closed_perimeter(contour.points());
        let quad = approximate_closed(&contour, epsilon);
        let corners: [Point; 4] = quad.points().try_into().ok()?;
        log::debug!("sheet detected at {corners:?}");
        Some(corners)
    })
}

/// Put four corners in top-left, top-right, bottom-right, bottom-left
/// order (image coordinates, +Y down).
#[must_use]
pub fn order_corners(corners: [Point; 4]) -> [Point; 4] {
    let sum = |p: &Point| p.x + p.y;
    let diff = |p: &Point| p.y - p.x;
    [
        extreme(&corners, sum, false),
        extreme(&corners, diff, false),
        extreme(&corners, sum, true),
        extreme(&corners, diff, true),
    ]
}

/// First corner with the smallest (or largest) `key`.
fn extreme(corners: &[Point; 4], key: impl Fn(&Point) -> f64, largest: bool) -> Point {
    let mut best = corners[0];
    for c in &corners[1..] {
        let better = if largest {
            key(c) > key(&best)
        } else {
            key(c) < key(&best)
        };
        if better {
            best = *c;
        }
    }
    best
}

/// Warp the quadrilateral `corners` onto an upright `width x height`
/// image. Corners may be given in any order.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for a zero output size and
/// [`PipelineError::InvalidImage`] when the corners are degenerate (three
/// of them collinear, or repeated).
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn rectify(
    gray: &GrayImage,
    corners: [Point; 4],
    width: u32,
    height: u32,
) -> Result<GrayImage, PipelineError> {
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidConfig(format!(
            "rectified size must be non-zero, got {width}x{height}"
        )));
    }

    let [tl, tr, br, bl] = order_corners(corners);
    if enclosed_area(&[tl, tr, br, bl]) < 1.0 {
        return Err(PipelineError::InvalidImage(format!(
            "degenerate sheet corners {corners:?}"
        )));
    }
    let from = [tl, tr, br, bl].map(|p| (p.x as f32, p.y as f32));
    let (w, h) = ((width - 1) as f32, (height - 1) as f32);
    let to = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];

    let projection = Projection::from_control_points(from, to).ok_or_else(|| {
        PipelineError::InvalidImage(format!("degenerate sheet corners {corners:?}"))
    })?;

    let mut out = GrayImage::new(width, height);
    warp_into(gray, &projection, Interpolation::Bilinear, Luma([255]), &mut out);
    Ok(out)
}
