//! SVG preview serializer.
//!
//! Converts strokes into an SVG string with one `<path>` per stroke,
//! using the [`svg`] crate for document construction, XML escaping and
//! path data formatting. Strokes arrive in the pipeline's center-origin
//! frame (+Y up) and are mapped back to image pixels (+Y down) so the
//! preview overlays the source image.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::Value;
use svg::node::element::path::Data;
use svg::node::element::{Description, Path, Title};
use svg::node::Text;

use plume_pipeline::normalize::to_pixel;
use plume_pipeline::{Dimensions, Point, Polyline};

/// Metadata to embed in the SVG document.
///
/// Text values are XML-escaped by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Emitted as `<title>`; typically the source image file stem.
    pub title: Option<&'a str>,

    /// Emitted as `<desc>`; typically the pipeline parameters.
    pub description: Option<&'a str>,
}

/// Build an SVG path `d` attribute from points already in document
/// coordinates.
///
/// Returns an empty string for fewer than 2 points.
///
/// # Examples
///
/// ```
/// use plume_pipeline::{Point, Polyline};
/// use plume_export::build_path_data;
///
/// let polyline = Polyline::new(vec![
///     Point::new(10.0, 20.0),
///     Point::new(30.0, 40.0),
/// ]);
/// assert_eq!(build_path_data(&polyline), "M10,20 L30,40");
/// ```
#[must_use]
pub fn build_path_data(polyline: &Polyline) -> String {
    path_data(polyline.points(), |p| p)
}

fn path_data(points: &[Point], map: impl Fn(Point) -> Point) -> String {
    let Some((first, rest)) = points.split_first() else {
        return String::new();
    };
    if rest.is_empty() {
        return String::new();
    }

    let first = map(*first);
    let mut data = Data::new().move_to((first.x, first.y));
    for p in rest {
        let p = map(*p);
        data = data.line_to((p.x, p.y));
    }
    String::from(Value::from(data))
}

/// Serialize center-origin strokes into an SVG document sized like the
/// source image.
#[must_use]
pub fn to_svg(strokes: &[Polyline], dimensions: Dimensions, metadata: &SvgMetadata<'_>) -> String {
    let (w, h) = (dimensions.width, dimensions.height);
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    for stroke in strokes {
        let d = path_data(stroke.points(), |p| to_pixel(p, dimensions));
        if d.is_empty() {
            continue;
        }
        doc = doc.add(
            Path::new()
                .set("d", d)
                .set("fill", "none")
                .set("stroke", "black")
                .set("stroke-width", 1),
        );
    }

    // The svg crate omits the XML declaration.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    fn no_meta() -> SvgMetadata<'static> {
        SvgMetadata::default()
    }

    #[test]
    fn build_path_data_degenerate() {
        assert_eq!(build_path_data(&Polyline::new(vec![])), "");
        assert_eq!(build_path_data(&Polyline::new(vec![Point::new(5.0, 5.0)])), "");
    }

    #[test]
    fn build_path_data_three_points() {
        let polyline = Polyline::new(vec![
            Point::new(10.0, 15.0),
            Point::new(12.5, 18.3),
            Point::new(14.0, 20.1),
        ]);
        assert_eq!(build_path_data(&polyline), "M10,15 L12.5,18.3 L14,20.1");
    }

    #[test]
    fn empty_strokes_produce_svg_without_paths() {
        let svg = to_svg(&[], dims(100, 50), &no_meta());
        assert!(svg.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(svg.contains(r#"viewBox="0 0 100 50""#));
        assert!(!svg.contains("<path"));
    }

    #[test]
    fn strokes_are_mapped_back_to_pixels() {
        // Center-origin (0, 0) is pixel (50, 50); +Y up becomes -Y down.
        let strokes = vec![Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 20.0),
        ])];
        let svg = to_svg(&strokes, dims(100, 100), &no_meta());
        assert!(svg.contains(r#"d="M50,50 L60,30""#), "{svg}");
        assert!(svg.contains(r#"fill="none""#));
    }

    #[test]
    fn one_path_per_drawable_stroke() {
        let strokes = vec![
            Polyline::new(vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]),
            Polyline::new(vec![Point::new(5.0, 6.0)]),
            Polyline::new(vec![Point::new(-5.0, 6.0), Point::new(-7.0, 8.0)]),
        ];
        let svg = to_svg(&strokes, dims(100, 100), &no_meta());
        assert_eq!(svg.matches("<path").count(), 2);
    }

    #[test]
    fn metadata_is_escaped() {
        let meta = SvgMetadata {
            title: Some("cat & dog"),
            description: Some("eps < 3"),
        };
        let svg = to_svg(&[], dims(10, 10), &meta);
        assert!(svg.contains("<title>cat &amp; dog</title>"));
        assert!(svg.contains("eps &lt; 3"));
    }
}
