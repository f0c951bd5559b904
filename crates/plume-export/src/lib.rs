//! plume-export: Pure preview serializers (sans-IO)
//!
//! Renders ordered strokes for inspection before they are sent to the
//! robot: an SVG document ([`to_svg`]) or an anti-aliased raster
//! ([`render_preview`], [`encode_png`]). Nothing here is needed to
//! drive the arm.

pub mod raster;
pub mod svg;

pub use raster::{ExportError, encode_png, render_preview};
pub use svg::{SvgMetadata, build_path_data, to_svg};
