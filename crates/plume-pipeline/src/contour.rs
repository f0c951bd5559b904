//! Contour tracing: extract boundaries from a binary edge map.
//!
//! Uses Suzuki-Abe border following via
//! [`imageproc::contours::find_contours`], which reports outer borders
//! and hole borders alike. A drawn line closed into a ring therefore
//! yields two nearly identical contours; [`crate::dedup`] removes the
//! second one.

use image::GrayImage;

use crate::dedup::enclosed_area;
use crate::types::{Point, Polyline};

/// Trace every border in `edges` and return them sorted by enclosed
/// area, largest first.
///
/// The sort is stable, so equal-area contours keep the tracer's
/// raster-scan order and the output is deterministic.
#[must_use = "returns the traced contours"]
pub fn trace_contours(edges: &GrayImage) -> Vec<Polyline> {
    let contours: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(edges);

    let mut traced: Vec<(f64, Polyline)> = contours
        .into_iter()
        .filter(|c| !c.points.is_empty())
        .map(|c| {
            let points: Vec<Point> = c
                .points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect();
            (enclosed_area(&points), Polyline::new(points))
        })
        .collect();

    traced.sort_by(|a, b| b.0.total_cmp(&a.0));
    log::debug!("traced {} contours", traced.len());
    traced.into_iter().map(|(_, polyline)| polyline).collect()
}
