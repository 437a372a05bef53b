use std::fmt;

/// Type tag of a line scene node.
///
/// Renderers and pickers branch on this instead of inspecting concrete types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Disjoint screen-space segments
    LineSegments2,
    /// Connected screen-space polyline
    Line2,
}

impl NodeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeKind::LineSegments2 => "LineSegments2",
            NodeKind::Line2 => "Line2",
        }
    }

    /// Every line node is drawn by the segment renderer.
    pub const fn is_line_segments(self) -> bool {
        true
    }

    /// Capability flag for connected thick polylines.
    pub const fn is_thick_line(self) -> bool {
        matches!(self, NodeKind::Line2)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
