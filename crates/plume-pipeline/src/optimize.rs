//! Stroke ordering: greedy nearest-successor with direction reversal.
//!
//! The first stroke stays first. Each following pick is the remaining
//! stroke with an endpoint closest to where the pen currently is; when
//! that endpoint is the stroke's end, the stroke is reversed so the pen
//! starts there. O(n^2) in the number of strokes, which stays in the
//! tens for a drawing.

use crate::types::{Point, Polyline};

/// Reorder and orient strokes to reduce pen-up travel.
///
/// Ties are broken by container order (first found wins), and a start
/// endpoint wins over an equally distant end endpoint, so identical
/// input always gives identical output. Empty strokes are dropped.
#[must_use = "returns the ordered strokes"]
pub fn order_strokes(strokes: Vec<Polyline>) -> Vec<Polyline> {
    let mut remaining: Vec<Polyline> = strokes.into_iter().filter(|s| !s.is_empty()).collect();
    if remaining.is_empty() {
        return remaining;
    }

    let mut ordered = Vec::with_capacity(remaining.len());
    ordered.push(remaining.remove(0));

    while let Some(pen) = ordered.last().and_then(Polyline::last).copied() {
        let Some((index, reverse)) = nearest(pen, &remaining) else {
            break;
        };
        let mut next = remaining.remove(index);
        if reverse {
            next.reverse();
        }
        ordered.push(next);
    }

    ordered
}

/// Total pen-up distance: from each stroke's last point to the next
/// stroke's first point.
#[must_use]
pub fn travel_distance(strokes: &[Polyline]) -> f64 {
    strokes
        .windows(2)
        .filter_map(|pair| Some(pair[0].last()?.distance(*pair[1].first()?)))
        .sum()
}

/// Index of the stroke with the endpoint nearest to `pen`, and whether
/// that endpoint is the stroke's end.
fn nearest(pen: Point, candidates: &[Polyline]) -> Option<(usize, bool)> {
    let mut best: Option<(usize, bool, f64)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let (Some(start), Some(end)) = (candidate.first(), candidate.last()) else {
            continue;
        };
        let to_start = pen.distance_squared(*start);
        let to_end = pen.distance_squared(*end);
        let (dist, reverse) = if to_end < to_start {
            (to_end, true)
        } else {
            (to_start, false)
        };
        if best.is_none_or(|(_, _, d)| dist < d) {
            best = Some((i, reverse, dist));
        }
    }
    best.map(|(i, reverse, _)| (i, reverse))
}
