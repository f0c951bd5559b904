//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! Every staged run goes through this module. Timing is taken from an
//! injected [`Clock`] so the crate stays free of platform time sources;
//! [`crate::process_staged`] uses a clock that always reports zero.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::paper::PaperFit;
use crate::types::{
    Dimensions, EdgeMethod, PaperConfig, PipelineConfig, PipelineError, Polyline, StagedResult,
};
use crate::{contour, dedup, edge, grayscale, normalize, optimize, waypoint};

/// Source of monotonic timestamps for stage timing.
pub trait Clock {
    /// Opaque timestamp.
    type Instant;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// A clock that never advances.
pub(crate) struct NoClock;

impl Clock for NoClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom("duration seconds must be finite and non-negative")
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Image decoding; `None` when the run started from an intensity grid.
    pub decode: Option<StageDiagnostics>,
    /// Blur plus gradient operator.
    pub edge_detection: StageDiagnostics,
    /// Morphological closing.
    pub closing: StageDiagnostics,
    /// Border following and normalization.
    pub contour_tracing: StageDiagnostics,
    /// Simplification plus near-duplicate removal.
    pub deduplication: StageDiagnostics,
    /// Stroke ordering.
    pub ordering: StageDiagnostics,
    /// Paper fit and robot-frame mapping.
    pub paper_fit: StageDiagnostics,
    /// Waypoint sequencing.
    pub sequencing: StageDiagnostics,
    /// Total wall-clock duration of the run.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding.
    Decode {
        /// Size of the encoded input.
        input_bytes: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
    },
    /// Edge map construction.
    EdgeDetection {
        /// Operator used.
        method: EdgeMethod,
        /// Edge pixels in the binary map.
        edge_pixel_count: usize,
        /// Total pixels, for density.
        total_pixel_count: usize,
    },
    /// Morphological closing.
    Closing {
        /// Structuring element radius.
        radius: u8,
        /// Edge pixels after closing.
        edge_pixel_count: usize,
    },
    /// Contour tracing.
    ContourTracing {
        /// Number of contours found.
        contour_count: usize,
        /// Total points across all contours.
        total_point_count: usize,
        /// Fewest points in one contour.
        min_contour_points: usize,
        /// Most points in one contour.
        max_contour_points: usize,
    },
    /// Simplification and deduplication.
    Deduplication {
        /// Whether near-duplicates were removed.
        enabled: bool,
        /// Shapes kept.
        shapes_accepted: usize,
        /// Contours dropped as duplicates or reduced to nothing.
        contours_discarded: usize,
        /// Points before reduction.
        points_before: usize,
        /// Points in accepted shapes, closing points included.
        points_after: usize,
    },
    /// Stroke ordering.
    Ordering {
        /// Strokes ordered.
        stroke_count: usize,
        /// Pen-up travel in input order (pixels).
        travel_before: f64,
        /// Pen-up travel after ordering (pixels).
        travel_after: f64,
    },
    /// Paper fit.
    PaperFit {
        /// Millimeters per pixel.
        scale: f64,
        /// Whether the artwork was turned a quarter turn.
        rotated: bool,
    },
    /// Waypoint sequencing.
    Sequencing {
        /// Waypoints emitted, anchors included.
        waypoint_count: usize,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Contours traced.
    pub contour_count: usize,
    /// Strokes drawn.
    pub stroke_count: usize,
    /// Waypoints in the trajectory.
    pub waypoint_count: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{}",
            self.summary.image_width, self.summary.image_height
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration)
        ));
        lines.push(String::new());
        lines.push(format!(
            "{:<18} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let mut stages: Vec<(&str, &StageDiagnostics)> = Vec::with_capacity(8);
        if let Some(ref decode) = self.decode {
            stages.push(("Decode", decode));
        }
        stages.extend([
            ("Edge Detection", &self.edge_detection),
            ("Closing", &self.closing),
            ("Contour Tracing", &self.contour_tracing),
            ("Deduplication", &self.deduplication),
            ("Ordering", &self.ordering),
            ("Paper Fit", &self.paper_fit),
            ("Sequencing", &self.sequencing),
        ]);

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<18} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Contours: {}  |  Strokes: {}  |  Waypoints: {}",
            self.summary.contour_count, self.summary.stroke_count, self.summary.waypoint_count,
        ));

        lines.join("\n")
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::EdgeDetection {
            method,
            edge_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!("{method:?} edges={edge_pixel_count} ({density:.1}%)")
        }
        StageMetrics::Closing {
            radius,
            edge_pixel_count,
        } => format!("r={radius} edges={edge_pixel_count}"),
        StageMetrics::ContourTracing {
            contour_count,
            total_point_count,
            min_contour_points,
            max_contour_points,
        } => format!(
            "{contour_count} contours, {total_point_count} pts (min={min_contour_points} max={max_contour_points})"
        ),
        StageMetrics::Deduplication {
            enabled,
            shapes_accepted,
            contours_discarded,
            points_before,
            points_after,
        } => format!(
            "dedup={enabled} kept={shapes_accepted} dropped={contours_discarded} {points_before}->{points_after} pts"
        ),
        StageMetrics::Ordering {
            stroke_count,
            travel_before,
            travel_after,
        } => format!("{stroke_count} strokes, travel {travel_before:.1}->{travel_after:.1} px"),
        StageMetrics::PaperFit { scale, rotated } => {
            format!("scale={scale:.4} mm/px rotated={rotated}")
        }
        StageMetrics::Sequencing { waypoint_count } => format!("{waypoint_count} waypoints"),
    }
}

fn total_points(polylines: &[Polyline]) -> usize {
    polylines.iter().map(Polyline::len).sum()
}

/// Run the pipeline on encoded image bytes, keeping every intermediate
/// and timing each stage with `clock`.
///
/// # Errors
///
/// Same as [`crate::process`].
pub fn process_staged_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &PipelineConfig,
    paper: &PaperConfig,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    config.validate()?;
    paper.validate()?;

    let start = clock.now();
    let gray = grayscale::decode_and_grayscale(image_bytes)?;
    let decode = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Decode {
            input_bytes: image_bytes.len(),
            width: gray.width(),
            height: gray.height(),
        },
    };

    let (staged, mut diagnostics) = run(gray, config, paper, clock)?;
    diagnostics.total_duration = clock.elapsed(&start);
    diagnostics.decode = Some(decode);
    Ok((staged, diagnostics))
}

/// Run the pipeline on an intensity grid (a raw or rectified frame),
/// keeping every intermediate and timing each stage with `clock`.
///
/// # Errors
///
/// Same as [`crate::process`], minus the decoding errors.
pub fn process_gray_with_diagnostics<C: Clock>(
    gray: GrayImage,
    config: &PipelineConfig,
    paper: &PaperConfig,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    config.validate()?;
    paper.validate()?;
    if gray.width() == 0 || gray.height() == 0 {
        return Err(PipelineError::InvalidImage(format!(
            "image has zero size ({}x{})",
            gray.width(),
            gray.height()
        )));
    }
    run(gray, config, paper, clock)
}

fn run<C: Clock>(
    gray: GrayImage,
    config: &PipelineConfig,
    paper: &PaperConfig,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let run_start = clock.now();
    let dimensions = Dimensions {
        width: gray.width(),
        height: gray.height(),
    };

    let t = clock.now();
    let edges = edge::detect_edges(&gray, config);
    let edge_detection = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::EdgeDetection {
            method: config.edge_method,
            edge_pixel_count: edge::edge_pixel_count(&edges),
            total_pixel_count: edges.len(),
        },
    };

    let t = clock.now();
    let closed = edge::close_edges(&edges, config.closing_radius);
    let closing = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Closing {
            radius: config.closing_radius,
            edge_pixel_count: edge::edge_pixel_count(&closed),
        },
    };

    let t = clock.now();
    let contours = normalize::normalize_contours(contour::trace_contours(&closed), dimensions);
    if contours.is_empty() {
        return Err(PipelineError::NoContours);
    }
    let contour_tracing = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::ContourTracing {
            contour_count: contours.len(),
            total_point_count: total_points(&contours),
            min_contour_points: contours.iter().map(Polyline::len).min().unwrap_or(0),
            max_contour_points: contours.iter().map(Polyline::len).max().unwrap_or(0),
        },
    };

    let t = clock.now();
    let shapes = dedup::deduplicate(&contours, config);
    if shapes.is_empty() {
        return Err(PipelineError::NoStrokes);
    }
    let deduplication = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Deduplication {
            enabled: config.dedup,
            shapes_accepted: shapes.len(),
            contours_discarded: contours.len() - shapes.len(),
            points_before: total_points(&contours),
            points_after: shapes.iter().map(|s| s.outline.len()).sum(),
        },
    };

    let t = clock.now();
    let outlines: Vec<Polyline> = shapes.iter().map(|s| s.outline.clone()).collect();
    let travel_before = optimize::travel_distance(&outlines);
    let strokes = optimize::order_strokes(outlines);
    let ordering = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Ordering {
            stroke_count: strokes.len(),
            travel_before,
            travel_after: optimize::travel_distance(&strokes),
        },
    };

    let t = clock.now();
    let fit = PaperFit::compute(&strokes, paper)?;
    let mapped = fit.map_strokes(&strokes);
    let paper_fit = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::PaperFit {
            scale: fit.scale,
            rotated: fit.rotated,
        },
    };

    let t = clock.now();
    let trajectory = waypoint::sequence(&mapped, paper);
    let sequencing = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Sequencing {
            waypoint_count: trajectory.len(),
        },
    };

    let summary = PipelineSummary {
        image_width: dimensions.width,
        image_height: dimensions.height,
        contour_count: contours.len(),
        stroke_count: strokes.len(),
        waypoint_count: trajectory.len(),
    };
    let diagnostics = PipelineDiagnostics {
        decode: None,
        edge_detection,
        closing,
        contour_tracing,
        deduplication,
        ordering,
        paper_fit,
        sequencing,
        total_duration: clock.elapsed(&run_start),
        summary,
    };

    let staged = StagedResult {
        grayscale: gray,
        edges,
        closed,
        contours,
        shapes,
        strokes,
        fit,
        trajectory,
        dimensions,
    };
    Ok((staged, diagnostics))
}
