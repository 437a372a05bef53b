use crate::gfx::lines::{Line2, LineSegments2, NodeKind, SharedLineMaterial};
use crate::gfx::picking::{LineIntersection, Raycaster, AABB};

/// A line node held by the [`Scene`].
///
/// Renderers and pickers match on the variant (or on [`SceneNode::kind`])
/// instead of probing concrete types.
pub enum SceneNode {
    Line2(Line2),
    LineSegments2(LineSegments2),
}

impl SceneNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            SceneNode::Line2(line) => line.kind(),
            SceneNode::LineSegments2(lines) => lines.kind(),
        }
    }

    pub fn is_thick_line(&self) -> bool {
        self.kind().is_thick_line()
    }

    pub fn visible(&self) -> bool {
        match self {
            SceneNode::Line2(line) => line.visible,
            SceneNode::LineSegments2(lines) => lines.visible,
        }
    }

    pub fn raycast(&self, raycaster: &Raycaster) -> Vec<LineIntersection> {
        match self {
            SceneNode::Line2(line) => line.raycast(raycaster),
            SceneNode::LineSegments2(lines) => lines.raycast(raycaster),
        }
    }

    pub fn world_bounding_box(&self) -> Option<AABB> {
        match self {
            SceneNode::Line2(line) => line.world_bounding_box(),
            SceneNode::LineSegments2(lines) => lines.world_bounding_box(),
        }
    }

    pub fn as_line2(&self) -> Option<&Line2> {
        match self {
            SceneNode::Line2(line) => Some(line),
            SceneNode::LineSegments2(_) => None,
        }
    }

    pub fn material(&self) -> &SharedLineMaterial {
        match self {
            SceneNode::Line2(line) => line.material(),
            SceneNode::LineSegments2(lines) => lines.material(),
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.material().borrow().transparent()
    }

    /// Resizes the node's material. Shared materials are resized for every user.
    pub fn set_resolution(&self, width: f32, height: f32) {
        self.material().borrow_mut().set_resolution(width, height);
    }
}

impl From<Line2> for SceneNode {
    fn from(line: Line2) -> Self {
        SceneNode::Line2(line)
    }
}

impl From<LineSegments2> for SceneNode {
    fn from(lines: LineSegments2) -> Self {
        SceneNode::LineSegments2(lines)
    }
}

/// Nearest hit found by [`Scene::pick`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickResult {
    pub node_index: usize,
    pub intersection: LineIntersection,
}

/// Flat list of line nodes
#[derive(Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its index
    pub fn add(&mut self, node: impl Into<SceneNode>) -> usize {
        let node = node.into();
        log::debug!("Adding {} node #{}", node.kind(), self.nodes.len());
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [SceneNode] {
        &mut self.nodes
    }

    pub fn get(&self, index: usize) -> Option<&SceneNode> {
        self.nodes.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut SceneNode> {
        self.nodes.get_mut(index)
    }

    /// Nodes flagged as thick lines, with their indices.
    pub fn thick_lines(&self) -> impl Iterator<Item = (usize, &Line2)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_thick_line())
            .filter_map(|(index, node)| node.as_line2().map(|line| (index, line)))
    }

    /// Node indices in draw order: opaque nodes first, then transparent ones,
    /// each group in insertion order.
    pub fn draw_order(&self) -> impl Iterator<Item = usize> + '_ {
        let opaque = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.is_transparent())
            .map(|(index, _)| index);
        let transparent = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_transparent())
            .map(|(index, _)| index);
        opaque.chain(transparent)
    }

    /// Keeps every material in step with the render target size.
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        for node in &self.nodes {
            node.set_resolution(width as f32, height as f32);
        }
    }

    /// Nearest intersection over all visible nodes
    pub fn pick(&self, raycaster: &Raycaster) -> Option<PickResult> {
        let mut best: Option<PickResult> = None;

        for (node_index, node) in self.nodes.iter().enumerate() {
            if !node.visible() {
                continue;
            }
            // raycast results are sorted, the first hit is the nearest
            if let Some(intersection) = node.raycast(raycaster).into_iter().next() {
                let closer = best
                    .as_ref()
                    .map_or(true, |b| intersection.distance < b.intersection.distance);
                if closer {
                    best = Some(PickResult {
                        node_index,
                        intersection,
                    });
                }
            }
        }

        if let Some(hit) = &best {
            log::trace!(
                "Picked node #{} segment {} at distance {}",
                hit.node_index,
                hit.intersection.segment_index,
                hit.intersection.distance
            );
        }
        best
    }

    /// World bounds of every visible node with geometry
    pub fn bounding_box(&self) -> Option<AABB> {
        self.nodes
            .iter()
            .filter(|node| node.visible())
            .filter_map(SceneNode::world_bounding_box)
            .reduce(|a, b| a.union(&b))
    }

    pub fn get_statistics(&self) -> SceneStatistics {
        let segment_count = |node: &SceneNode| match node {
            SceneNode::Line2(line) => line.geometry().borrow().segment_count(),
            SceneNode::LineSegments2(lines) => lines.geometry().borrow().segment_count(),
        };

        SceneStatistics {
            node_count: self.nodes.len(),
            thick_line_count: self.nodes.iter().filter(|n| n.is_thick_line()).count(),
            total_segments: self.nodes.iter().map(segment_count).sum(),
        }
    }
}

/// Scene statistics for debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneStatistics {
    pub node_count: usize,
    pub thick_line_count: usize,
    pub total_segments: usize,
}
