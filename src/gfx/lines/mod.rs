//! # Lines
//!
//! Lines whose width is measured in screen pixels (or, optionally, world units)
//! instead of being fixed at one pixel by the rasterizer.
//!
//! - [`LineSegmentsGeometry`] / [`LineGeometry`] hold disjoint segments and
//!   connected polylines.
//! - [`LineMaterial`] holds width, color, dashing and the render resolution.
//! - [`LineSegments2`] pairs the two and implements bounds and picking.
//! - [`Line2`] is the polyline node built on top of it.

pub mod kind;
pub mod line;
pub mod line_geometry;
pub mod line_material;
pub mod line_segments;
pub mod segments_geometry;

pub use kind::NodeKind;
pub use line::{Line2, SharedLineGeometry};
pub use line_geometry::LineGeometry;
pub use line_material::{
    hex_to_rgb, random_color, LineMaterial, LineMaterialParameters, LineUniform, MAX_COLOR,
};
pub use line_segments::{shared, LineSegments2, Shared, SharedLineMaterial, TransformUniform};
pub use segments_geometry::{LineSegmentsGeometry, SegmentGeometry, SegmentInstance};
