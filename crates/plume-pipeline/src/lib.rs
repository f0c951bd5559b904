//! plume-pipeline: pure image-to-trajectory pipeline (sans-IO).
//!
//! Turns a picture of a line drawing into the waypoint sequence a pen
//! robot follows:
//! grayscale -> edges -> closing -> contours -> simplify + dedup ->
//! stroke ordering -> paper fit -> waypoints.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and images and returns structured data. Sockets live in
//! `plume-robot`, files in the `plume` binary.

pub mod blur;
pub mod contour;
pub mod dedup;
pub mod diagnostics;
pub mod edge;
pub mod grayscale;
pub mod normalize;
pub mod optimize;
pub mod paper;
pub mod sheet;
pub mod simplify;
pub mod types;
pub mod waypoint;

pub use paper::PaperFit;
pub use sheet::CornerSelection;
pub use types::{
    DedupTolerance, Dimensions, EdgeMethod, GrayImage, PaperConfig, PipelineConfig,
    PipelineError, Point, Polyline, ProcessResult, Shape, StagedResult, Trajectory, Waypoint,
};

/// Run the full pipeline on encoded image bytes.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty,
/// [`PipelineError::ImageDecode`] if the image cannot be decoded,
/// [`PipelineError::InvalidConfig`] for unusable configuration,
/// [`PipelineError::NoContours`] if edge detection finds nothing and
/// [`PipelineError::NoStrokes`] if every contour reduces away.
pub fn process(
    image_bytes: &[u8],
    config: &PipelineConfig,
    paper: &PaperConfig,
) -> Result<ProcessResult, PipelineError> {
    process_staged(image_bytes, config, paper).map(StagedResult::into_result)
}

/// Run the full pipeline, keeping every intermediate for previews.
///
/// # Errors
///
/// Same as [`process`].
pub fn process_staged(
    image_bytes: &[u8],
    config: &PipelineConfig,
    paper: &PaperConfig,
) -> Result<StagedResult, PipelineError> {
    diagnostics::process_staged_with_diagnostics(image_bytes, config, paper, &diagnostics::NoClock)
        .map(|(staged, _)| staged)
}

/// Run the pipeline on an intensity grid that is already decoded, for
/// example a raw camera frame or a rectified sheet.
///
/// # Errors
///
/// Same as [`process`], minus the decoding errors.
pub fn process_gray(
    gray: GrayImage,
    config: &PipelineConfig,
    paper: &PaperConfig,
) -> Result<StagedResult, PipelineError> {
    diagnostics::process_gray_with_diagnostics(gray, config, paper, &diagnostics::NoClock)
        .map(|(staged, _)| staged)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode(img: &image::GrayImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::L8,
        )
        .unwrap();
        buf
    }

    fn filled_square_png() -> Vec<u8> {
        encode(&image::GrayImage::from_fn(100, 100, |x, y| {
            let inside = (25..75).contains(&x) && (25..75).contains(&y);
            image::Luma([if inside { 0 } else { 255 }])
        }))
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], &PipelineConfig::default(), &PaperConfig::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process(
            &[0xFF, 0x00],
            &PipelineConfig::default(),
            &PaperConfig::default(),
        );
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn uniform_image_returns_no_contours() {
        let png = encode(&image::GrayImage::from_fn(20, 20, |_, _| image::Luma([128])));
        let result = process(&png, &PipelineConfig::default(), &PaperConfig::default());
        assert!(matches!(result, Err(PipelineError::NoContours)));
    }

    #[test]
    fn invalid_config_is_rejected_before_decoding() {
        let config = PipelineConfig {
            simplify_epsilon: -1.0,
            ..PipelineConfig::default()
        };
        let result = process(&filled_square_png(), &config, &PaperConfig::default());
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn trajectory_is_bracketed_by_anchors() {
        let paper = PaperConfig::default();
        let result = process(&filled_square_png(), &PipelineConfig::default(), &paper).unwrap();
        let wps = result.trajectory.waypoints();
        assert_eq!(wps.first(), Some(&paper.home));
        assert_eq!(wps.last(), Some(&paper.park));
        assert_eq!(
            result.dimensions,
            Dimensions {
                width: 100,
                height: 100
            }
        );
    }

    #[test]
    fn staged_and_plain_runs_agree() {
        let png = filled_square_png();
        let config = PipelineConfig::default();
        let paper = PaperConfig::default();
        let staged = process_staged(&png, &config, &paper).unwrap();
        let plain = process(&png, &config, &paper).unwrap();
        assert_eq!(staged.trajectory, plain.trajectory);
        assert_eq!(staged.strokes, plain.strokes);
        assert_eq!(staged.edges.dimensions(), (100, 100));
    }

    #[test]
    fn every_edge_method_draws_the_square() {
        for method in [EdgeMethod::Canny, EdgeMethod::Sobel, EdgeMethod::Laplacian] {
            let config = PipelineConfig {
                edge_method: method,
                ..PipelineConfig::default()
            };
            let result = process(&filled_square_png(), &config, &PaperConfig::default());
            assert!(result.is_ok(), "{method:?}: {result:?}");
        }
    }

    #[test]
    fn stride_sampling_runs_end_to_end() {
        let config = PipelineConfig {
            sample_stride: Some(5),
            ..PipelineConfig::default()
        };
        let result = process(&filled_square_png(), &config, &PaperConfig::default()).unwrap();
        assert!(result.trajectory.len() > 4);
    }

    #[test]
    fn interior_heights_are_draw_or_lift() {
        let paper = PaperConfig::default();
        let result = process(&filled_square_png(), &PipelineConfig::default(), &paper).unwrap();
        let wps = result.trajectory.waypoints();
        for wp in &wps[1..wps.len() - 1] {
            let on_level = |z: f64| (wp.z - z).abs() < 1e-12;
            assert!(on_level(paper.z_draw_m) || on_level(paper.z_lift_m));
        }
    }
}
