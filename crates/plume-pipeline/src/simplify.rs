//! Contour reduction: polygon approximation or fixed-stride sampling.
//!
//! Traced contours are closed pixel chains with one point per border
//! pixel. [`approximate_closed`] collapses runs of nearly collinear
//! pixels with the Ramer-Douglas-Peucker algorithm, treating the chain
//! as a closed polygon. [`sample_stride`] is the cheaper alternative
//! that keeps every n-th pixel.

use crate::types::{PipelineConfig, Point, Polyline};

/// Reduce a traced contour according to `config`.
///
/// Uses [`sample_stride`] when `sample_stride` is set, otherwise
/// [`approximate_closed`] with `simplify_epsilon`.
#[must_use = "returns the reduced contour"]
pub fn reduce_contour(contour: &Polyline, config: &PipelineConfig) -> Polyline {
    match config.sample_stride {
        Some(stride) => sample_stride(contour, stride),
        None => approximate_closed(contour, config.simplify_epsilon),
    }
}

/// Approximate a closed contour by a polygon whose edges stay within
/// `epsilon` of every original point.
///
/// The chain is split at the point farthest from its first point and
/// each half is simplified as an open polyline, so the result does not
/// depend on the (arbitrary) pixel where tracing started more than the
/// algorithm inherently requires. The returned vertices are not closed:
/// the first point is not repeated at the end.
#[must_use = "returns the approximated polygon"]
pub fn approximate_closed(contour: &Polyline, epsilon: f64) -> Polyline {
    let points = contour.points();
    if points.len() < 3 {
        return contour.clone();
    }

    let anchor = points[0];
    let pivot = points
        .iter()
        .enumerate()
        .fold((0, 0.0), |(best, best_d), (i, p)| {
            let d = anchor.distance_squared(*p);
            if d > best_d { (i, d) } else { (best, best_d) }
        })
        .0;
    if pivot == 0 {
        // Every point coincides with the first one.
        return Polyline::new(vec![anchor]);
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[pivot] = true;
    rdp_recurse(points, 0, pivot, epsilon, &mut kept);

    // Second half wraps around to the anchor.
    let mut tail: Vec<Point> = points[pivot..].to_vec();
    tail.push(anchor);
    let mut tail_kept = vec![false; tail.len()];
    let last = tail.len() - 1;
    rdp_recurse(&tail, 0, last, epsilon, &mut tail_kept);
    for (offset, keep) in tail_kept.iter().enumerate().take(last).skip(1) {
        if *keep {
            kept[pivot + offset] = true;
        }
    }

    Polyline::new(
        points
            .iter()
            .zip(&kept)
            .filter(|&(_, k)| *k)
            .map(|(&p, _)| p)
            .collect(),
    )
}

/// Keep the points at 1-based positions `stride`, `2 * stride`, ...
///
/// A stride of 1 keeps every point. A contour shorter than `stride`
/// yields an empty polyline. A stride of 0 is treated as 1.
#[must_use = "returns the sampled contour"]
pub fn sample_stride(contour: &Polyline, stride: usize) -> Polyline {
    let stride = stride.max(1);
    Polyline::new(
        contour
            .points()
            .iter()
            .skip(stride - 1)
            .step_by(stride)
            .copied()
            .collect(),
    )
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Marks the point between `start` and `end` farthest from the segment
/// joining them when it lies beyond `epsilon`, then recurses on both
/// sides.
fn rdp_recurse(points: &[Point], start: usize, end: usize, epsilon: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let (max_idx, max_dist) = ((start + 1)..end)
        .map(|i| (i, perpendicular_distance(points[i], points[start], points[end])))
        .fold((start, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });

    if max_dist > epsilon {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, epsilon, kept);
        rdp_recurse(points, max_idx, end, epsilon, kept);
    }
}

/// Distance from `p` to the line through `a` and `b`, or to `a` when
/// the two coincide.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Border pixels of the axis-aligned square `[lo, hi]^2`, traced
    /// clockwise from the top-left corner.
    fn square_chain(lo: i32, hi: i32) -> Polyline {
        let mut pts = Vec::new();
        for x in lo..hi {
            pts.push(Point::new(f64::from(x), f64::from(lo)));
        }
        for y in lo..hi {
            pts.push(Point::new(f64::from(hi), f64::from(y)));
        }
        for x in ((lo + 1)..=hi).rev() {
            pts.push(Point::new(f64::from(x), f64::from(hi)));
        }
        for y in ((lo + 1)..=hi).rev() {
            pts.push(Point::new(f64::from(lo), f64::from(y)));
        }
        Polyline::new(pts)
    }

    #[test]
    fn short_contours_unchanged() {
        let pl = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
        assert_eq!(approximate_closed(&pl, 2.0), pl);
        assert!(approximate_closed(&Polyline::new(vec![]), 2.0).is_empty());
    }

    #[test]
    fn square_chain_collapses_to_corners() {
        let result = approximate_closed(&square_chain(10, 40), 2.0);
        assert_eq!(result.len(), 4);
        for corner in [(10.0, 10.0), (40.0, 10.0), (40.0, 40.0), (10.0, 40.0)] {
            assert!(
                result.points().contains(&Point::new(corner.0, corner.1)),
                "missing corner {corner:?} in {result:?}"
            );
        }
    }

    #[test]
    fn result_is_not_closed() {
        let result = approximate_closed(&square_chain(0, 20), 2.0);
        assert_ne!(result.first(), result.last());
    }

    #[test]
    fn zero_epsilon_keeps_turning_points() {
        let pl = Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.1),
            Point::new(2.0, 0.0),
            Point::new(1.0, -3.0),
        ]);
        assert_eq!(approximate_closed(&pl, 0.0).len(), 4);
    }

    #[test]
    fn coincident_points_collapse_to_one() {
        let pl = Polyline::new(vec![Point::new(3.0, 3.0); 5]);
        assert_eq!(approximate_closed(&pl, 2.0).len(), 1);
    }

    #[test]
    fn stride_one_keeps_every_point() {
        let chain = square_chain(0, 5);
        assert_eq!(sample_stride(&chain, 1), chain);
    }

    #[test]
    fn stride_uses_one_based_positions() {
        let pl = Polyline::new((0..7).map(|i| Point::new(f64::from(i), 0.0)).collect());
        let sampled = sample_stride(&pl, 3);
        assert_eq!(
            sampled.points(),
            &[Point::new(2.0, 0.0), Point::new(5.0, 0.0)]
        );
    }

    #[test]
    fn stride_longer_than_contour_is_empty() {
        let pl = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
        assert!(sample_stride(&pl, 5).is_empty());
    }

    #[test]
    fn reduce_contour_follows_config() {
        let chain = square_chain(0, 30);
        let approx = reduce_contour(&chain, &PipelineConfig::default());
        assert_eq!(approx.len(), 4);

        let config = PipelineConfig {
            sample_stride: Some(10),
            ..PipelineConfig::default()
        };
        assert_eq!(reduce_contour(&chain, &config).len(), chain.len() / 10);
    }

    #[test]
    fn perpendicular_distance_diagonal_segment() {
        let d = perpendicular_distance(
            Point::new(2.0, -1.0),
            Point::new(0.0, 0.0),
            Point::new(4.0, 2.0),
        );
        assert!((d - 8.0 / 20.0_f64.sqrt()).abs() < 1e-10);
    }
}
