//! Waypoint sequencing: robot-frame strokes to a pen trajectory.
//!
//! ```text
//! home
//! for each stroke:
//!     lift  @ first point
//!     draw  @ every point (first included)
//!     lift  @ last point
//! park
//! ```

use crate::types::{PaperConfig, Polyline, Trajectory, Waypoint};

/// Build the trajectory for strokes already mapped into the robot frame
/// (meters). Empty strokes contribute nothing.
#[must_use = "returns the trajectory"]
pub fn sequence(strokes: &[Polyline], paper: &PaperConfig) -> Trajectory {
    let interior: usize = strokes
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| s.len() + 2)
        .sum();
    let mut waypoints = Vec::with_capacity(interior + 2);

    waypoints.push(paper.home);
    for stroke in strokes {
        let (Some(first), Some(last)) = (stroke.first(), stroke.last()) else {
            continue;
        };
        waypoints.push(Waypoint::at(first.x, first.y, paper.z_lift_m));
        waypoints.extend(
            stroke
                .points()
                .iter()
                .map(|p| Waypoint::at(p.x, p.y, paper.z_draw_m)),
        );
        waypoints.push(Waypoint::at(last.x, last.y, paper.z_lift_m));
    }
    waypoints.push(paper.park);

    Trajectory::new(waypoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn stroke(n: u32) -> Polyline {
        Polyline::new((0..n).map(|i| Point::new(f64::from(i) * 0.01, 0.1)).collect())
    }

    #[test]
    fn no_strokes_gives_home_and_park() {
        let paper = PaperConfig::default();
        let trajectory = sequence(&[], &paper);
        assert_eq!(trajectory.waypoints(), &[paper.home, paper.park]);
    }

    #[test]
    fn each_stroke_adds_n_plus_two() {
        let paper = PaperConfig::default();
        for n in 1..6 {
            let trajectory = sequence(&[stroke(n)], &paper);
            assert_eq!(trajectory.len(), 2 + n as usize + 2, "stroke of {n} points");
        }
        let trajectory = sequence(&[stroke(3), stroke(1), stroke(4)], &paper);
        assert_eq!(trajectory.len(), 2 + 5 + 3 + 6);
    }

    #[test]
    fn pen_lifts_around_each_stroke() {
        let paper = PaperConfig::default();
        let s = stroke(3);
        let trajectory = sequence(std::slice::from_ref(&s), &paper);
        let wps = trajectory.waypoints();

        assert_eq!(wps[0], paper.home);
        assert_eq!(wps[1], Waypoint::at(0.0, 0.1, paper.z_lift_m));
        assert_eq!(wps[2], Waypoint::at(0.0, 0.1, paper.z_draw_m));
        assert_eq!(wps[4], Waypoint::at(0.02, 0.1, paper.z_draw_m));
        assert_eq!(wps[5], Waypoint::at(0.02, 0.1, paper.z_lift_m));
        assert_eq!(wps[6], paper.park);
    }

    #[test]
    fn orientation_stays_fixed() {
        let trajectory = sequence(&[stroke(4)], &PaperConfig::default());
        for wp in trajectory.waypoints() {
            assert_eq!((wp.rx, wp.ry, wp.rz), (0.0, 0.0, 0.0));
        }
    }

    #[test]
    fn empty_stroke_is_skipped() {
        let trajectory = sequence(&[Polyline::new(vec![])], &PaperConfig::default());
        assert_eq!(trajectory.len(), 2);
    }
}
