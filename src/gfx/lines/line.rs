use std::ops::{Deref, DerefMut};

use super::kind::NodeKind;
use super::line_geometry::LineGeometry;
use super::line_material::{LineMaterial, LineMaterialParameters};
use super::line_segments::{shared, LineSegments2, Shared, SharedLineMaterial};

pub type SharedLineGeometry = Shared<LineGeometry>;

/// A connected polyline drawn with a constant screen-space width.
///
/// Everything a line renderable does (bounds, picking, GPU upload) comes from
/// the embedded [`LineSegments2`], reachable through `Deref`. `Line2` only
/// changes the reported [`NodeKind`].
///
/// ```
/// use thickline::prelude::*;
///
/// let line = Line2::new();
/// assert_eq!(line.kind().as_str(), "Line2");
/// assert!(line.is_thick_line());
/// ```
pub struct Line2 {
    base: LineSegments2<LineGeometry>,
}

impl Line2 {
    /// Empty geometry and a material with a random color.
    pub fn new() -> Self {
        Self::from_parts(None, None)
    }

    /// Uses the given handles as-is and fills in whichever is missing.
    ///
    /// A missing geometry becomes an empty [`LineGeometry`]; a missing material
    /// gets a color drawn uniformly from `0..=0xFFFFFF`.
    pub fn from_parts(
        geometry: Option<SharedLineGeometry>,
        material: Option<SharedLineMaterial>,
    ) -> Self {
        let geometry = geometry.unwrap_or_else(|| shared(LineGeometry::new()));
        let material = material.unwrap_or_else(|| {
            shared(LineMaterial::new(LineMaterialParameters::with_random_color()))
        });

        Self {
            base: LineSegments2::new(geometry, material),
        }
    }

    pub fn with_geometry(geometry: SharedLineGeometry) -> Self {
        Self::from_parts(Some(geometry), None)
    }

    pub fn with_material(material: SharedLineMaterial) -> Self {
        Self::from_parts(None, Some(material))
    }

    pub fn kind(&self) -> NodeKind {
        NodeKind::Line2
    }

    pub fn is_thick_line(&self) -> bool {
        self.kind().is_thick_line()
    }

    pub fn into_inner(self) -> LineSegments2<LineGeometry> {
        self.base
    }
}

impl Default for Line2 {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Line2 {
    type Target = LineSegments2<LineGeometry>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl DerefMut for Line2 {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::lines::MAX_COLOR;
    use cgmath::Vector3;
    use std::rc::Rc;

    #[test]
    fn test_default_construction() {
        let line = Line2::new();
        assert_eq!(line.kind(), NodeKind::Line2);
        assert_eq!(line.kind().as_str(), "Line2");
        assert!(line.is_thick_line());
        assert!(line.geometry().borrow().is_empty());
        assert!(line.material().borrow().color() <= MAX_COLOR);
    }

    #[test]
    fn test_supplied_geometry_is_kept() {
        let geometry = shared(LineGeometry::from_points(&[
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
        ]));
        let line = Line2::with_geometry(geometry.clone());

        assert!(Rc::ptr_eq(line.geometry(), &geometry));
        assert_eq!(Rc::strong_count(line.material()), 1);
    }

    #[test]
    fn test_supplied_material_is_kept() {
        let material = shared(LineMaterial::new(
            LineMaterialParameters::default().with_color(0x00FF00),
        ));
        let line = Line2::with_material(material.clone());

        assert!(Rc::ptr_eq(line.material(), &material));
        assert_eq!(line.material().borrow().color(), 0x00FF00);
        assert!(line.geometry().borrow().is_empty());
        assert_eq!(Rc::strong_count(line.geometry()), 1);
    }

    #[test]
    fn test_both_parts_kept_unmodified() {
        let geometry = shared(LineGeometry::new());
        let material = shared(LineMaterial::default());
        let version = material.borrow().version();

        let line = Line2::from_parts(Some(geometry.clone()), Some(material.clone()));

        assert!(Rc::ptr_eq(line.geometry(), &geometry));
        assert!(Rc::ptr_eq(line.material(), &material));
        assert_eq!(material.borrow().version(), version);
        assert_eq!(material.borrow().color(), 0xFFFFFF);
    }

    #[test]
    fn test_kind_survives_mutation() {
        let mut line = Line2::new();
        line.geometry()
            .borrow_mut()
            .set_positions(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0])
            .unwrap();
        line.material().borrow_mut().set_linewidth(5.0);
        line.set_material(shared(LineMaterial::default()));
        line.compute_line_distances();

        assert_eq!(line.kind(), NodeKind::Line2);
        assert!(line.is_thick_line());
    }

    #[test]
    fn test_fresh_defaults_per_construction() {
        let a = Line2::new();
        let b = Line2::default();

        assert!(!Rc::ptr_eq(a.geometry(), b.geometry()));
        assert!(!Rc::ptr_eq(a.material(), b.material()));
        assert!(a.is_thick_line() && b.is_thick_line());
    }

    #[test]
    fn test_random_colors_stay_in_range() {
        for _ in 0..256 {
            let line = Line2::new();
            assert!(line.material().borrow().color() <= MAX_COLOR);
        }
    }

    #[test]
    fn test_into_inner_reports_base_kind() {
        let line = Line2::new();
        let geometry = line.geometry().clone();
        let base = line.into_inner();

        assert_eq!(base.kind(), NodeKind::LineSegments2);
        assert!(Rc::ptr_eq(base.geometry(), &geometry));
    }
}
