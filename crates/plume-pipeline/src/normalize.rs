//! Pixel to center-origin coordinate transform.
//!
//! ```text
//! x' = x - floor(width / 2)
//! y' = floor(height / 2) - y
//! ```
//!
//! The Y axis is flipped so +Y points up, matching the robot's table
//! frame. Units stay pixels; scaling happens later in [`crate::paper`].
//! Export formats that need +Y down undo the flip at their boundary.

use crate::types::{Dimensions, Point, Polyline};

/// Pixel coordinates of the origin of the center-origin frame.
#[must_use]
pub fn origin(dimensions: Dimensions) -> Point {
    Point::new(
        f64::from(dimensions.width / 2),
        f64::from(dimensions.height / 2),
    )
}

/// Re-express pixel-space contours in the center-origin frame.
#[must_use]
pub fn normalize_contours(contours: Vec<Polyline>, dimensions: Dimensions) -> Vec<Polyline> {
    let o = origin(dimensions);
    contours
        .into_iter()
        .map(|polyline| {
            Polyline::new(
                polyline
                    .into_points()
                    .into_iter()
                    .map(|p| Point::new(p.x - o.x, o.y - p.y))
                    .collect(),
            )
        })
        .collect()
}

/// Inverse of [`normalize_contours`] for a single point.
#[must_use]
pub fn to_pixel(point: Point, dimensions: Dimensions) -> Point {
    let o = origin(dimensions);
    Point::new(point.x + o.x, o.y - point.y)
}
