//! End-to-end runs on small synthetic drawings.

#![allow(clippy::unwrap_used)]

use image::{GrayImage, Luma};
use plume_pipeline::{
    PaperConfig, PipelineConfig, Point, Polyline, dedup, grayscale, optimize, process_gray,
    process_staged,
};

fn png(img: &GrayImage) -> Vec<u8> {
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

/// 100x100 white canvas with a black square outline `thickness` pixels
/// wide, drawn inward from the square spanning 25..75.
fn square_outline(thickness: u32) -> GrayImage {
    GrayImage::from_fn(100, 100, |x, y| {
        let inside = (25..75).contains(&x) && (25..75).contains(&y);
        let hole = (25 + thickness..75 - thickness).contains(&x)
            && (25 + thickness..75 - thickness).contains(&y);
        Luma([if inside && !hole { 0 } else { 255 }])
    })
}

#[test]
fn square_outline_yields_one_closed_shape() {
    for thickness in 1..=4 {
        let staged = process_staged(
            &png(&square_outline(thickness)),
            &PipelineConfig::default(),
            &PaperConfig::default(),
        )
        .unwrap();

        assert_eq!(
            staged.shapes.len(),
            1,
            "thickness {thickness}: {:?}",
            staged.shapes
        );
        let outline = &staged.shapes[0].outline;
        assert!(
            (5..=6).contains(&outline.len()),
            "thickness {thickness}: expected 4-5 vertices plus closing point, got {}",
            outline.len()
        );
        assert_eq!(outline.first(), outline.last());
        assert_eq!(staged.trajectory.len(), 2 + (outline.len() + 2));
    }
}

#[test]
fn outline_borders_are_traced_twice_before_dedup() {
    let staged = process_staged(
        &png(&square_outline(2)),
        &PipelineConfig {
            dedup: false,
            ..PipelineConfig::default()
        },
        &PaperConfig::default(),
    )
    .unwrap();
    assert_eq!(staged.shapes.len(), 2);
}

#[test]
fn square_is_centered_on_the_sheet() {
    let paper = PaperConfig::default();
    let staged = process_staged(&png(&square_outline(2)), &PipelineConfig::default(), &paper)
        .unwrap();

    let drawn: Vec<Point> = staged.trajectory.waypoints()[1..staged.trajectory.len() - 1]
        .iter()
        .map(|w| Point::new(w.x, w.y))
        .collect();
    let (min_x, max_x) = drawn
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
    let sheet_center_x = paper.offset_x_m + paper.width_mm / 2000.0;
    assert!(((min_x + max_x) / 2.0 - sheet_center_x).abs() < 1e-9);
    // A square fills the sheet's narrower side.
    assert!((max_x - min_x - paper.width_mm / 1000.0).abs() < 1e-9);
}

#[test]
fn raw_rgb_frame_matches_encoded_image() {
    let gray = square_outline(2);
    let rgb: Vec<u8> = gray.as_raw().iter().flat_map(|&v| [v, v, v]).collect();
    let frame = grayscale::grayscale_from_raw(100, 100, 3, &rgb).unwrap();

    let config = PipelineConfig::default();
    let paper = PaperConfig::default();
    let from_frame = process_gray(frame, &config, &paper).unwrap();
    let from_png = process_staged(&png(&gray), &config, &paper).unwrap();
    assert_eq!(from_frame.trajectory, from_png.trajectory);
}

#[test]
fn concentric_outline_traces_deduplicate_to_one_shape() {
    // Outer and inner border of a 3 px wide square line, as tracing
    // reports them: same centroid, area ratio above 0.9.
    let square = |lo: f64, hi: f64| {
        Polyline::new(vec![
            Point::new(lo, lo),
            Point::new(hi, lo),
            Point::new(hi, hi),
            Point::new(lo, hi),
        ])
    };
    let contours = vec![square(-40.0, 40.0), square(-37.0, 37.0)];
    let shapes = dedup::deduplicate(&contours, &PipelineConfig::default());
    assert_eq!(shapes.len(), 1);
    assert!(shapes[0].area > 6400.0);
}

#[test]
fn dedup_twice_gives_identical_shapes() {
    let staged = process_staged(
        &png(&square_outline(2)),
        &PipelineConfig::default(),
        &PaperConfig::default(),
    )
    .unwrap();
    let config = PipelineConfig::default();
    assert_eq!(
        dedup::deduplicate(&staged.contours, &config),
        dedup::deduplicate(&staged.contours, &config)
    );
}

#[test]
fn two_squares_are_ordered_without_extra_travel() {
    let img = GrayImage::from_fn(200, 100, |x, y| {
        let a = (10..60).contains(&x) && (20..70).contains(&y);
        let b = (120..190).contains(&x) && (15..85).contains(&y);
        Luma([if a || b { 0 } else { 255 }])
    });
    let staged =
        process_staged(&png(&img), &PipelineConfig::default(), &PaperConfig::default()).unwrap();
    assert_eq!(staged.shapes.len(), 2);
    let unordered: Vec<Polyline> = staged.shapes.iter().map(|s| s.outline.clone()).collect();
    assert!(
        optimize::travel_distance(&staged.strokes) <= optimize::travel_distance(&unordered) + 1e-9
    );
}
