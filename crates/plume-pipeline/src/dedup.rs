//! Shape measurement and near-duplicate removal.
//!
//! Border following reports both sides of every drawn line that closes
//! on itself, so a single pencil square arrives as an outer and an inner
//! contour a few pixels apart. Drawing both would trace the line twice.
//! Each reduced contour is measured (area, perimeter, centroid) and
//! dropped when it shares its centroid with an already accepted shape
//! and either matches it in area and perimeter or runs alongside it at
//! no more than a line's width (see [`border_gap`]).

use geo::{Area, Centroid, LineString, Polygon};

use crate::simplify::reduce_contour;
use crate::types::{DedupTolerance, PipelineConfig, Point, Polyline, Shape};

/// Shapes with fewer vertices are always kept, even when they overlap
/// an accepted shape: they are open strokes or dots, not double traces.
pub const MIN_DEDUP_VERTICES: usize = 4;

/// Reduce every contour and keep the ones that are not near-duplicates
/// of a larger shape already kept.
///
/// `contours` must be in area-descending order (as produced by
/// [`crate::contour::trace_contours`]); the first of two duplicates wins.
/// Accepted shapes are closed by repeating their first point. Contours
/// that reduce to nothing are skipped.
#[must_use = "returns the accepted shapes"]
pub fn deduplicate(contours: &[Polyline], config: &PipelineConfig) -> Vec<Shape> {
    let mut accepted: Vec<Shape> = Vec::new();

    for contour in contours {
        let reduced = reduce_contour(contour, config);
        if reduced.is_empty() {
            continue;
        }
        let candidate = measure(reduced);

        if config.dedup
            && candidate.vertex_count() >= MIN_DEDUP_VERTICES
            && accepted
                .iter()
                .any(|kept| is_duplicate(&candidate, kept, &config.dedup_tolerance))
        {
            log::trace!(
                "dropping duplicate shape with area {:.1} at ({:.1}, {:.1})",
                candidate.area,
                candidate.centroid.x,
                candidate.centroid.y
            );
            continue;
        }

        accepted.push(close(candidate));
    }

    log::debug!(
        "{} of {} contours accepted as shapes",
        accepted.len(),
        contours.len()
    );
    accepted
}

/// Whether `a` and `b` describe the same drawn line within `tolerance`.
#[must_use]
pub fn is_duplicate(a: &Shape, b: &Shape, tolerance: &DedupTolerance) -> bool {
    if a.centroid.distance(b.centroid) > tolerance.centroid_distance {
        return false;
    }
    let similar = relative_difference(a.area, b.area) <= tolerance.area
        && relative_difference(a.perimeter, b.perimeter) <= tolerance.perimeter;
    similar || border_gap(a, b) <= tolerance.band_width
}

/// Mean distance between two nested outlines: the area between them
/// spread over their average perimeter.
///
/// The closing step widens a thin line into a band a few pixels across,
/// so on small drawings its two borders differ in area by far more than
/// a fixed ratio while staying this close everywhere.
#[must_use]
pub fn border_gap(a: &Shape, b: &Shape) -> f64 {
    let mean_perimeter = (a.perimeter + b.perimeter) / 2.0;
    if mean_perimeter <= 0.0 {
        return f64::INFINITY;
    }
    (a.area - b.area).abs() / mean_perimeter
}

/// Measure an open polygon. The outline is stored as given.
#[must_use]
pub fn measure(outline: Polyline) -> Shape {
    let points = outline.points();
    let area = enclosed_area(points) + 1.0;
    let perimeter = closed_perimeter(points);
    let centroid = polygon(points)
        .centroid()
        .map_or_else(|| mean(points), |c| Point::new(c.x(), c.y()));
    Shape {
        outline,
        area,
        perimeter,
        centroid,
    }
}

/// Unsigned area enclosed by the polygon through `points`.
///
/// Fewer than three points enclose nothing.
#[must_use]
pub fn enclosed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    polygon(points).unsigned_area()
}

/// Length of the polygon boundary including the closing edge.
#[must_use]
pub fn closed_perimeter(points: &[Point]) -> f64 {
    let open: f64 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => open + last.distance(*first),
        _ => open,
    }
}

fn polygon(points: &[Point]) -> Polygon<f64> {
    let ring: LineString<f64> = points.iter().map(|p| (p.x, p.y)).collect();
    Polygon::new(ring, vec![])
}

#[allow(clippy::cast_precision_loss)]
fn mean(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::new(0.0, 0.0);
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point::new(sx / n, sy / n)
}

fn relative_difference(a: f64, b: f64) -> f64 {
    let largest = a.abs().max(b.abs());
    if largest == 0.0 {
        return 0.0;
    }
    (a - b).abs() / largest
}

fn close(mut shape: Shape) -> Shape {
    if let Some(&first) = shape.outline.first() {
        let mut points = shape.outline.into_points();
        points.push(first);
        shape.outline = Polyline::new(points);
    }
    shape
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(cx: f64, cy: f64, half: f64) -> Polyline {
        Polyline::new(vec![
            Point::new(cx - half, cy - half),
            Point::new(cx + half, cy - half),
            Point::new(cx + half, cy + half),
            Point::new(cx - half, cy + half),
        ])
    }

    fn exact() -> PipelineConfig {
        // Zero epsilon keeps the hand-built vertices intact.
        PipelineConfig {
            simplify_epsilon: 0.0,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn measure_square() {
        let shape = measure(square(0.0, 0.0, 5.0));
        assert!((shape.area - 101.0).abs() < 1e-9);
        assert!((shape.perimeter - 40.0).abs() < 1e-9);
        assert!(shape.centroid.distance(Point::new(0.0, 0.0)) < 1e-9);
    }

    #[test]
    fn degenerate_shape_area_is_offset() {
        let shape = measure(Polyline::new(vec![Point::new(2.0, 3.0)]));
        assert!((shape.area - 1.0).abs() < f64::EPSILON);
        assert!(shape.perimeter.abs() < f64::EPSILON);
        assert_eq!(shape.centroid, Point::new(2.0, 3.0));
    }

    #[test]
    fn concentric_squares_collapse_to_one() {
        // Outer and inner border of a 2 px wide line: area ratio > 0.9.
        let contours = vec![square(10.0, 10.0, 40.0), square(10.0, 10.0, 38.5)];
        let shapes = deduplicate(&contours, &exact());
        assert_eq!(shapes.len(), 1);
        assert!((shapes[0].area - (80.0 * 80.0 + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn accepted_shapes_are_closed() {
        let shapes = deduplicate(&[square(0.0, 0.0, 10.0)], &exact());
        let outline = &shapes[0].outline;
        assert_eq!(outline.len(), 5);
        assert_eq!(outline.first(), outline.last());
    }

    #[test]
    fn distant_squares_are_both_kept() {
        let contours = vec![square(0.0, 0.0, 10.0), square(100.0, 0.0, 10.0)];
        assert_eq!(deduplicate(&contours, &exact()).len(), 2);
    }

    #[test]
    fn band_borders_of_a_small_square_collapse_to_one() {
        // Both sides of a 5 px band: area ratio well below 0.9.
        let contours = vec![square(0.0, 0.0, 25.5), square(0.0, 0.0, 20.5)];
        let outer = measure(contours[0].clone());
        let inner = measure(contours[1].clone());
        assert!(inner.area / outer.area < 0.7);
        assert!((border_gap(&outer, &inner) - 5.0).abs() < 0.1);

        let shapes = deduplicate(&contours, &exact());
        assert_eq!(shapes.len(), 1);
        assert!((shapes[0].area - (51.0 * 51.0 + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn nested_squares_farther_than_a_band_are_kept() {
        let contours = vec![square(0.0, 0.0, 25.0), square(0.0, 0.0, 15.0)];
        assert_eq!(deduplicate(&contours, &exact()).len(), 2);
    }

    #[test]
    fn different_sizes_are_both_kept() {
        let contours = vec![square(0.0, 0.0, 20.0), square(0.0, 0.0, 10.0)];
        assert_eq!(deduplicate(&contours, &exact()).len(), 2);
    }

    #[test]
    fn triangles_are_never_duplicates() {
        let tri = Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(5.0, 8.0),
        ]);
        let shapes = deduplicate(&[tri.clone(), tri], &exact());
        assert_eq!(shapes.len(), 2);
    }

    #[test]
    fn disabled_dedup_keeps_every_contour() {
        let contours = vec![
            square(0.0, 0.0, 40.0),
            square(0.0, 0.0, 39.0),
            Polyline::new(vec![Point::new(1.0, 1.0)]),
        ];
        let config = PipelineConfig {
            dedup: false,
            ..exact()
        };
        let shapes = deduplicate(&contours, &config);
        assert_eq!(shapes.len(), 3);
        for shape in &shapes {
            assert_eq!(shape.outline.first(), shape.outline.last());
        }
    }

    #[test]
    fn dedup_is_deterministic() {
        let contours = vec![
            square(0.0, 0.0, 40.0),
            square(1.0, 0.0, 39.0),
            square(50.0, 50.0, 5.0),
            square(50.0, 50.0, 4.8),
        ];
        let first = deduplicate(&contours, &exact());
        let second = deduplicate(&contours, &exact());
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn relative_difference_of_zeros_is_zero() {
        assert!(relative_difference(0.0, 0.0).abs() < f64::EPSILON);
        assert!((relative_difference(90.0, 100.0) - 0.1).abs() < 1e-12);
    }
}
