//! Paper fit: map ordered strokes onto the physical sheet and into the
//! robot's table frame.
//!
//! One affine transform is computed from the bounding box of all
//! strokes and applied to every point, so proportions survive exactly:
//!
//! 1. rotate the artwork a quarter turn when its orientation (portrait
//!    or landscape) differs from the sheet's, which is exactly when the
//!    turn gives the larger drawing,
//! 2. scale uniformly by `min(sheet_w / art_w, sheet_h / art_h)`,
//! 3. center the scaled box on the sheet (millimeters),
//! 4. convert to meters and add the sheet's robot-frame offset.

use serde::{Deserialize, Serialize};

use crate::types::{PaperConfig, PipelineError, Point, Polyline};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner.
    pub min: Point,
    /// Maximum corner.
    pub max: Point,
}

impl Bounds {
    /// Bounding box of every point of every polyline, or `None` when
    /// there are no points.
    #[must_use]
    pub fn of<'a>(polylines: impl IntoIterator<Item = &'a Polyline>) -> Option<Self> {
        polylines
            .into_iter()
            .flat_map(Polyline::points)
            .fold(None, |acc: Option<Self>, p| {
                Some(acc.map_or(Self { min: *p, max: *p }, |b| Self {
                    min: Point::new(b.min.x.min(p.x), b.min.y.min(p.y)),
                    max: Point::new(b.max.x.max(p.x), b.max.y.max(p.y)),
                }))
            })
    }

    /// Horizontal extent.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Vertical extent.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// The transform from the center-origin pixel frame to the robot frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaperFit {
    /// Whether the artwork is turned a quarter turn before scaling.
    pub rotated: bool,
    /// Millimeters per source unit.
    pub scale: f64,
    /// Bounding box of the (possibly rotated) artwork, source units.
    pub source_bounds: Bounds,
    /// Margin added on each axis to center the artwork (mm).
    pub margin_mm: Point,
    /// Robot-frame position of the sheet's origin corner (m).
    pub offset_m: Point,
}

impl PaperFit {
    /// Compute the fit of `strokes` onto `paper`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoStrokes`] when the strokes hold no
    /// points and [`PipelineError::InvalidConfig`] when the sheet has a
    /// non-positive dimension.
    pub fn compute(strokes: &[Polyline], paper: &PaperConfig) -> Result<Self, PipelineError> {
        paper.validate()?;
        let raw = Bounds::of(strokes).ok_or(PipelineError::NoStrokes)?;

        let art_landscape = raw.width() >= raw.height();
        let sheet_landscape = paper.width_mm >= paper.height_mm;
        let rotated = art_landscape != sheet_landscape;

        let source_bounds = if rotated {
            Bounds {
                min: rotate(Point::new(raw.max.x, raw.min.y)),
                max: rotate(Point::new(raw.min.x, raw.max.y)),
            }
        } else {
            raw
        };

        let scale = uniform_scale(
            source_bounds.width(),
            source_bounds.height(),
            paper.width_mm,
            paper.height_mm,
        );
        let margin_mm = Point::new(
            (paper.width_mm - source_bounds.width() * scale) / 2.0,
            (paper.height_mm - source_bounds.height() * scale) / 2.0,
        );

        log::debug!(
            "paper fit: scale {scale:.4} mm/px, rotated {rotated}, margins ({:.1}, {:.1}) mm",
            margin_mm.x,
            margin_mm.y
        );

        Ok(Self {
            rotated,
            scale,
            source_bounds,
            margin_mm,
            offset_m: Point::new(paper.offset_x_m, paper.offset_y_m),
        })
    }

    /// Position of `point` on the sheet, in millimeters from the
    /// sheet's origin corner.
    #[must_use]
    pub fn to_sheet_mm(&self, point: Point) -> Point {
        let p = if self.rotated { rotate(point) } else { point };
        Point::new(
            (p.x - self.source_bounds.min.x).mul_add(self.scale, self.margin_mm.x),
            (p.y - self.source_bounds.min.y).mul_add(self.scale, self.margin_mm.y),
        )
    }

    /// Position of `point` in the robot frame, in meters.
    #[must_use]
    pub fn to_robot(&self, point: Point) -> Point {
        let mm = self.to_sheet_mm(point);
        Point::new(
            mm.x / 1000.0 + self.offset_m.x,
            mm.y / 1000.0 + self.offset_m.y,
        )
    }

    /// Apply [`Self::to_robot`] to every point of every stroke.
    #[must_use]
    pub fn map_strokes(&self, strokes: &[Polyline]) -> Vec<Polyline> {
        strokes
            .iter()
            .map(|s| Polyline::new(s.points().iter().map(|&p| self.to_robot(p)).collect()))
            .collect()
    }
}

/// `min(sheet_w / art_w, sheet_h / art_h)`. A zero-extent axis does not
/// constrain the scale; a single point keeps scale 1.
#[must_use]
pub fn uniform_scale(art_w: f64, art_h: f64, sheet_w: f64, sheet_h: f64) -> f64 {
    let scale = (sheet_w / art_w).min(sheet_h / art_h);
    if scale.is_finite() { scale } else { 1.0 }
}

/// Quarter turn clockwise in a +Y-up frame.
const fn rotate(p: Point) -> Point {
    Point::new(p.y, -p.x)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn paper() -> PaperConfig {
        PaperConfig::default()
    }

    fn rect(w: f64, h: f64) -> Vec<Polyline> {
        vec![Polyline::new(vec![
            Point::new(-w / 2.0, -h / 2.0),
            Point::new(w / 2.0, -h / 2.0),
            Point::new(w / 2.0, h / 2.0),
            Point::new(-w / 2.0, h / 2.0),
        ])]
    }

    fn sheet_bounds(fit: &PaperFit, strokes: &[Polyline]) -> Bounds {
        let mm: Vec<Polyline> = strokes
            .iter()
            .map(|s| Polyline::new(s.points().iter().map(|&p| fit.to_sheet_mm(p)).collect()))
            .collect();
        Bounds::of(&mm).unwrap()
    }

    #[test]
    fn portrait_art_on_portrait_sheet_is_not_rotated() {
        // Narrower than the sheet, but turning it would shrink it.
        let fit = PaperFit::compute(&rect(50.0, 100.0), &paper()).unwrap();
        assert!(!fit.rotated);
        assert!((fit.scale - 2.673).abs() < 1e-12);
        assert!(fit.scale > uniform_scale(100.0, 50.0, 189.0, 267.3));
    }

    #[test]
    fn rotation_choice_gives_the_larger_drawing() {
        for (w, h) in [
            (50.0, 100.0),
            (70.0, 100.0),
            (71.0, 100.0),
            (100.0, 100.0),
            (101.0, 100.0),
            (200.0, 100.0),
            (1.0, 40.0),
        ] {
            let fit = PaperFit::compute(&rect(w, h), &paper()).unwrap();
            let upright = uniform_scale(w, h, 189.0, 267.3);
            let turned = uniform_scale(h, w, 189.0, 267.3);
            assert!((fit.scale - upright.max(turned)).abs() < 1e-12, "{w}x{h}");
            assert_eq!(fit.rotated, turned > upright, "{w}x{h}");
        }
    }

    #[test]
    fn landscape_sheet_turns_portrait_art() {
        let sheet = PaperConfig {
            width_mm: 267.3,
            height_mm: 189.0,
            ..paper()
        };
        let fit = PaperFit::compute(&rect(50.0, 100.0), &sheet).unwrap();
        assert!(fit.rotated);
        assert!((fit.scale - 2.673).abs() < 1e-12);
    }

    #[test]
    fn landscape_art_on_portrait_sheet_is_rotated() {
        let strokes = rect(200.0, 100.0);
        let fit = PaperFit::compute(&strokes, &paper()).unwrap();
        assert!(fit.rotated);
        // After the quarter turn the art is 100 wide and 200 tall.
        assert!((fit.scale - (189.0 / 100.0_f64).min(267.3 / 200.0)).abs() < 1e-12);
    }

    #[test]
    fn scale_is_min_of_axis_ratios() {
        for (w, h) in [(10.0, 40.0), (30.0, 31.0), (500.0, 900.0), (3.0, 300.0)] {
            let fit = PaperFit::compute(&rect(w, h), &paper()).unwrap();
            assert!(!fit.rotated);
            let expected = (189.0 / w).min(267.3 / h);
            assert!((fit.scale - expected).abs() < 1e-12, "{w}x{h}");
        }
    }

    #[test]
    fn fitted_art_is_centered_on_sheet() {
        let strokes = rect(60.0, 100.0);
        let fit = PaperFit::compute(&strokes, &paper()).unwrap();
        let b = sheet_bounds(&fit, &strokes);
        assert!((b.min.x - (189.0 - b.max.x)).abs() < 1e-9);
        assert!((b.min.y - (267.3 - b.max.y)).abs() < 1e-9);
        assert!(b.min.x >= -1e-9 && b.max.y <= 267.3 + 1e-9);
    }

    #[test]
    fn distance_ratios_are_preserved() {
        let strokes = vec![Polyline::new(vec![
            Point::new(-40.0, 3.0),
            Point::new(17.0, -60.0),
            Point::new(25.0, 80.0),
        ])];
        let fit = PaperFit::compute(&strokes, &paper()).unwrap();
        let pts = strokes[0].points();
        for (a, b) in [(0, 1), (1, 2), (0, 2)] {
            let before = pts[a].distance(pts[b]);
            let after = fit.to_sheet_mm(pts[a]).distance(fit.to_sheet_mm(pts[b]));
            assert!((after / before - fit.scale).abs() < 1e-9);
        }
    }

    #[test]
    fn robot_frame_adds_offset_in_meters() {
        let strokes = rect(189.0, 267.3);
        let fit = PaperFit::compute(&strokes, &paper()).unwrap();
        let corner = fit.to_robot(Point::new(-94.5, -133.65));
        assert!((corner.x - 0.240).abs() < 1e-9);
        assert!((corner.y + 0.170).abs() < 1e-9);
    }

    #[test]
    fn single_point_lands_in_sheet_center() {
        let strokes = vec![Polyline::new(vec![Point::new(7.0, -3.0)])];
        let fit = PaperFit::compute(&strokes, &paper()).unwrap();
        assert!((fit.scale - 1.0).abs() < f64::EPSILON);
        let p = fit.to_sheet_mm(Point::new(7.0, -3.0));
        assert!((p.x - 94.5).abs() < 1e-9 && (p.y - 133.65).abs() < 1e-9);
    }

    #[test]
    fn vertical_line_scales_by_height() {
        let strokes = vec![Polyline::new(vec![Point::new(0.0, 0.0), Point::new(0.0, 10.0)])];
        let fit = PaperFit::compute(&strokes, &paper()).unwrap();
        assert!((fit.scale - 26.73).abs() < 1e-9);
    }

    #[test]
    fn empty_strokes_rejected() {
        let result = PaperFit::compute(&[Polyline::new(vec![])], &paper());
        assert!(matches!(result, Err(PipelineError::NoStrokes)));
    }
}
