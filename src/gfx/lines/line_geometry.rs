use std::ops::Deref;

use cgmath::{Matrix4, Vector3};
use wgpu::Device;

use super::segments_geometry::{LineSegmentsGeometry, SegmentGeometry};
use crate::error::{LineError, LineResult};

/// Connected polyline geometry.
///
/// `N` points are stored as `N - 1` segments where each segment starts at the
/// previous segment's end. Read access to bounds, instances and GPU buffers
/// goes through `Deref` to [`LineSegmentsGeometry`]; only mutations that keep
/// the polyline connected are forwarded.
#[derive(Debug, Default)]
pub struct LineGeometry {
    segments: LineSegmentsGeometry,
    point_count: usize,
}

impl LineGeometry {
    /// Creates an empty polyline
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: &[Vector3<f32>]) -> Self {
        let mut geometry = Self::new();
        geometry.set_points(points);
        geometry
    }

    /// Replaces the polyline from flat `[x0, y0, z0, x1, y1, z1, ...]` points.
    ///
    /// Fewer than two points leave the geometry without segments.
    pub fn set_positions(&mut self, positions: &[f32]) -> LineResult<()> {
        if positions.len() % 3 != 0 {
            return Err(LineError::InvalidPolylineData {
                len: positions.len(),
            });
        }

        let pairs = pair_up(positions);
        self.segments.set_positions(&pairs)?;
        self.point_count = positions.len() / 3;
        Ok(())
    }

    pub fn set_points(&mut self, points: &[Vector3<f32>]) {
        let segments: Vec<[[f32; 3]; 2]> = points
            .windows(2)
            .map(|pair| [pair[0].into(), pair[1].into()])
            .collect();
        self.segments.set_segments(&segments);
        self.point_count = points.len();
    }

    /// Sets flat per-point RGB colors: 3 floats per point.
    pub fn set_colors(&mut self, colors: &[f32]) -> LineResult<()> {
        let expected = self.point_count * 3;
        if colors.len() != expected {
            return Err(LineError::ColorCountMismatch {
                expected,
                actual: colors.len(),
            });
        }

        self.segments.set_colors(&pair_up(colors))
    }

    /// Number of polyline points (segments + 1, or 0/1 without segments).
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    pub fn compute_line_distances(&mut self) {
        self.segments.compute_line_distances();
    }

    /// Transforms every point in place. The point count is unchanged.
    pub fn apply_matrix4(&mut self, matrix: &Matrix4<f32>) {
        self.segments.apply_matrix4(matrix);
    }

    /// The polyline points, rebuilt from the segment endpoints.
    pub fn points(&self) -> Vec<Vector3<f32>> {
        let instances = self.segments.instances();
        let mut points: Vec<Vector3<f32>> = instances.iter().map(|i| i.start_point()).collect();
        if let Some(last) = instances.last() {
            points.push(last.end_point());
        }
        points
    }
}

/// Duplicates interior xyz triples so consecutive points become segment pairs.
fn pair_up(values: &[f32]) -> Vec<f32> {
    if values.len() < 6 {
        return Vec::new();
    }

    let mut pairs = Vec::with_capacity((values.len() - 3) * 2);
    for window in values.chunks_exact(3).collect::<Vec<_>>().windows(2) {
        pairs.extend_from_slice(window[0]);
        pairs.extend_from_slice(window[1]);
    }
    pairs
}

impl Deref for LineGeometry {
    type Target = LineSegmentsGeometry;

    fn deref(&self) -> &Self::Target {
        &self.segments
    }
}

impl SegmentGeometry for LineGeometry {
    fn segments(&self) -> &LineSegmentsGeometry {
        &self.segments
    }

    fn compute_line_distances(&mut self) {
        LineGeometry::compute_line_distances(self);
    }

    fn update_gpu_resources(&mut self, device: &Device) {
        self.segments.update_gpu_resources(device);
    }
}
