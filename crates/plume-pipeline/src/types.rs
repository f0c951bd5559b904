//! Shared types for the plume image-to-trajectory pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// A 2D point.
///
/// Straight out of contour tracing this is in image pixel coordinates
/// (+Y down). After normalization it is in the center-origin frame
/// (+Y up, still pixel units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// A sequence of connected points forming one pen path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Reverse the traversal direction in place.
    pub fn reverse(&mut self) {
        self.0.reverse();
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A simplified contour that survived deduplication.
///
/// The scalars are measured on the polygon *before* it is closed, with
/// one unit added to the area so later ratios never divide by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Simplified points. Closed (first point repeated at the end) once
    /// the shape has been accepted.
    pub outline: Polyline,
    /// Enclosed area plus one, in square pixels.
    pub area: f64,
    /// Closed perimeter in pixels.
    pub perimeter: f64,
    /// Area-weighted centroid.
    pub centroid: Point,
}

impl Shape {
    /// Number of vertices of the simplified polygon, not counting the
    /// closing point.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        let points = self.outline.points();
        match (points.first(), points.last()) {
            (Some(a), Some(b)) if points.len() > 1 && a == b => points.len() - 1,
            _ => points.len(),
        }
    }
}

/// A target pose for the robot: position in meters, orientation as a
/// rotation vector in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// X position (m).
    pub x: f64,
    /// Y position (m).
    pub y: f64,
    /// Z position (m).
    pub z: f64,
    /// Rotation vector X component (rad).
    pub rx: f64,
    /// Rotation vector Y component (rad).
    pub ry: f64,
    /// Rotation vector Z component (rad).
    pub rz: f64,
}

impl Waypoint {
    /// A pose at `(x, y, z)` with zero tool rotation.
    #[must_use]
    pub const fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            rx: 0.0,
            ry: 0.0,
            rz: 0.0,
        }
    }

    /// The six pose values in register order.
    #[must_use]
    pub const fn to_array(self) -> [f64; 6] {
        [self.x, self.y, self.z, self.rx, self.ry, self.rz]
    }
}

/// The full ordered waypoint sequence for one drawing.
///
/// Built once by [`crate::waypoint::sequence`] and never mutated; the
/// streaming controller only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory(Vec<Waypoint>);

impl Trajectory {
    pub(crate) const fn new(waypoints: Vec<Waypoint>) -> Self {
        Self(waypoints)
    }

    /// Number of waypoints, anchors included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no waypoints.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All waypoints in dispatch order.
    #[must_use]
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.0
    }

    /// Waypoint at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.0.get(index)
    }
}

/// Gradient operator used to build the edge map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMethod {
    /// Gaussian blur followed by Canny with hysteresis thresholds.
    #[default]
    Canny,
    /// 3x3 Sobel magnitude binarized at Otsu's level.
    Sobel,
    /// Gaussian blur followed by a 3x3 Laplacian binarized at Otsu's level.
    Laplacian,
}

/// Limits under which two shapes are considered the same drawn line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupTolerance {
    /// Maximum relative area difference.
    pub area: f64,
    /// Maximum relative perimeter difference.
    pub perimeter: f64,
    /// Maximum centroid distance in pixels.
    pub centroid_distance: f64,
    /// Maximum mean gap in pixels between two nested outlines traced
    /// from the two sides of one drawn line.
    pub band_width: f64,
}

impl Default for DedupTolerance {
    fn default() -> Self {
        Self {
            area: 0.1,
            perimeter: 0.1,
            centroid_distance: 10.0,
            band_width: 8.0,
        }
    }
}

/// Configuration for the image-to-strokes part of the pipeline.
///
/// # Canny threshold invariants
///
/// Both thresholds are clamped to at least [`crate::edge::MIN_THRESHOLD`]
/// and `canny_low` is clamped to at most `canny_high` inside
/// [`crate::edge::canny`], so out-of-range values degrade instead of
/// producing a saturated edge map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Which gradient operator builds the edge map.
    pub edge_method: EdgeMethod,

    /// Gaussian sigma applied before Canny and Laplacian. 0.8 matches a
    /// 3x3 kernel.
    pub blur_sigma: f32,

    /// Canny low (weak edge) threshold on the 8-bit scale.
    pub canny_low: f32,

    /// Canny high (strong edge) threshold on the 8-bit scale.
    pub canny_high: f32,

    /// Radius of the square structuring element used for morphological
    /// closing. 2 gives a 5x5 element; 0 disables closing.
    pub closing_radius: u8,

    /// Polygon approximation tolerance in pixels.
    pub simplify_epsilon: f64,

    /// Keep every n-th contour point instead of approximating polygons.
    pub sample_stride: Option<usize>,

    /// Whether near-duplicate shapes are discarded.
    pub dedup: bool,

    /// Similarity limits used when `dedup` is enabled.
    pub dedup_tolerance: DedupTolerance,
}

impl PipelineConfig {
    /// Default Gaussian sigma.
    pub const DEFAULT_BLUR_SIGMA: f32 = 0.8;
    /// Default Canny low threshold.
    pub const DEFAULT_CANNY_LOW: f32 = 50.0;
    /// Default Canny high threshold.
    pub const DEFAULT_CANNY_HIGH: f32 = 150.0;
    /// Default closing radius.
    pub const DEFAULT_CLOSING_RADIUS: u8 = 2;
    /// Default polygon approximation tolerance.
    pub const DEFAULT_SIMPLIFY_EPSILON: f64 = 2.0;

    /// Check values that cannot be clamped into something meaningful.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for a negative or
    /// non-finite `simplify_epsilon`, a zero `sample_stride`, or
    /// negative dedup tolerances.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.simplify_epsilon.is_finite() || self.simplify_epsilon < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "simplify_epsilon must be a finite value >= 0, got {}",
                self.simplify_epsilon
            )));
        }
        if self.sample_stride == Some(0) {
            return Err(PipelineError::InvalidConfig(
                "sample_stride must be at least 1".to_string(),
            ));
        }
        let tol = self.dedup_tolerance;
        if tol.area < 0.0
            || tol.perimeter < 0.0
            || tol.centroid_distance < 0.0
            || tol.band_width < 0.0
        {
            return Err(PipelineError::InvalidConfig(
                "dedup tolerances must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            edge_method: EdgeMethod::default(),
            blur_sigma: Self::DEFAULT_BLUR_SIGMA,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            closing_radius: Self::DEFAULT_CLOSING_RADIUS,
            simplify_epsilon: Self::DEFAULT_SIMPLIFY_EPSILON,
            sample_stride: None,
            dedup: true,
            dedup_tolerance: DedupTolerance::default(),
        }
    }
}

/// The physical sheet and the robot-frame constants the strokes are
/// mapped onto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    /// Drawable width in millimeters.
    pub width_mm: f64,
    /// Drawable height in millimeters.
    pub height_mm: f64,
    /// Robot-frame X of the drawable area's origin corner (m).
    pub offset_x_m: f64,
    /// Robot-frame Y of the drawable area's origin corner (m).
    pub offset_y_m: f64,
    /// Pen-on-paper height (m).
    pub z_draw_m: f64,
    /// Pen-raised height (m).
    pub z_lift_m: f64,
    /// First pose of every trajectory.
    pub home: Waypoint,
    /// Last pose of every trajectory, also re-sent when streaming ends.
    pub park: Waypoint,
}

impl PaperConfig {
    /// Check the sheet can hold a drawing.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if either sheet dimension
    /// is not a positive finite number.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if !ok(self.width_mm) || !ok(self.height_mm) {
            return Err(PipelineError::InvalidConfig(format!(
                "paper dimensions must be positive, got {}x{} mm",
                self.width_mm, self.height_mm
            )));
        }
        Ok(())
    }
}

impl Default for PaperConfig {
    fn default() -> Self {
        // 90% of an A4 sheet.
        Self {
            width_mm: 189.0,
            height_mm: 267.3,
            offset_x_m: 0.240,
            offset_y_m: -0.170,
            z_draw_m: 0.055,
            z_lift_m: 0.070,
            home: Waypoint::at(0.344, -0.144, 0.07),
            park: Waypoint::at(0.3, 0.0, 0.07),
        }
    }
}

/// Result of running the full pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Ordered strokes in the center-origin pixel frame.
    pub strokes: Vec<Polyline>,
    /// Transform that mapped the strokes onto the sheet.
    pub fit: crate::paper::PaperFit,
    /// Waypoints ready for the streaming controller.
    pub trajectory: Trajectory,
    /// Dimensions of the source image in pixels.
    pub dimensions: Dimensions,
}

/// Result of running the pipeline with every intermediate preserved.
///
/// Does not derive `PartialEq` or serde: `GrayImage` carries no serde
/// support and comparing raster data is never what callers want.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Decoded intensity image.
    pub grayscale: GrayImage,
    /// Binary edge map before closing.
    pub edges: GrayImage,
    /// Edge map after morphological closing.
    pub closed: GrayImage,
    /// Traced contours, area-descending, center-origin frame.
    pub contours: Vec<Polyline>,
    /// Shapes that survived simplification and deduplication.
    pub shapes: Vec<Shape>,
    /// Shapes in drawing order, possibly reversed.
    pub strokes: Vec<Polyline>,
    /// Transform that mapped the strokes onto the sheet.
    pub fit: crate::paper::PaperFit,
    /// Final waypoint sequence.
    pub trajectory: Trajectory,
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
}

impl StagedResult {
    /// Drop the raster intermediates.
    #[must_use]
    pub fn into_result(self) -> ProcessResult {
        ProcessResult {
            strokes: self.strokes,
            fit: self.fit,
            trajectory: self.trajectory,
            dimensions: self.dimensions,
        }
    }
}

/// Errors that can occur during pipeline processing.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The image decoded but cannot be processed (zero size, wrong
    /// channel count, truncated buffer).
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// Edge detection produced no contours.
    #[error("no contours found in the image")]
    NoContours,

    /// Every contour was simplified or deduplicated away.
    #[error("no drawable strokes remain after simplification")]
    NoStrokes,
}

/// Serde-compatible proxy for `PipelineError`.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    InvalidImage(String),
    InvalidConfig(String),
    NoContours,
    NoStrokes,
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::InvalidImage(s) => PipelineErrorProxy::InvalidImage(s.clone()),
            Self::InvalidConfig(s) => PipelineErrorProxy::InvalidConfig(s.clone()),
            Self::NoContours => PipelineErrorProxy::NoContours,
            Self::NoStrokes => PipelineErrorProxy::NoStrokes,
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            // The typed image error cannot be rebuilt; keep its message.
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::InvalidImage(format!("image decode error: {msg}"))
            }
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::InvalidImage(s) => Self::InvalidImage(s),
            PipelineErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
            PipelineErrorProxy::NoContours => Self::NoContours,
            PipelineErrorProxy::NoStrokes => Self::NoStrokes,
        })
    }
}
