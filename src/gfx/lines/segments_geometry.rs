//! # Segment Geometry
//!
//! Disjoint line segments stored as one GPU instance per segment. The renderer
//! expands every instance into a screen-space quad, so the CPU side only keeps
//! endpoints, endpoint colors and endpoint line distances.

use cgmath::{InnerSpace, Matrix4, Point3, Transform, Vector3};
use wgpu::Device;

use crate::error::{LineError, LineResult};
use crate::gfx::picking::{BoundingSphere, AABB};

const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

/// Per-segment instance data uploaded to the GPU.
///
/// # Memory Layout
///
/// `#[repr(C)]` with only `f32` fields, so the struct is `Pod` and its bytes
/// can be copied straight into a vertex buffer stepped per instance.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SegmentInstance {
    pub start: [f32; 3],
    pub end: [f32; 3],
    pub start_color: [f32; 3],
    pub end_color: [f32; 3],
    /// Distance along the line at `start`, used for dashing
    pub start_distance: f32,
    /// Distance along the line at `end`
    pub end_distance: f32,
}

impl SegmentInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        2 => Float32x3,
        3 => Float32x3,
        4 => Float32x3,
        5 => Float32x3,
        6 => Float32,
        7 => Float32,
    ];

    pub fn new(start: [f32; 3], end: [f32; 3]) -> Self {
        Self {
            start,
            end,
            start_color: WHITE,
            end_color: WHITE,
            start_distance: 0.0,
            end_distance: 0.0,
        }
    }

    pub fn start_point(&self) -> Vector3<f32> {
        Vector3::from(self.start)
    }

    pub fn end_point(&self) -> Vector3<f32> {
        Vector3::from(self.end)
    }

    pub fn length(&self) -> f32 {
        (self.end_point() - self.start_point()).magnitude()
    }

    /// Returns the instance buffer layout for wgpu rendering.
    ///
    /// Locations 0 and 1 belong to the shared quad, so instance attributes
    /// start at location 2.
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SegmentInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Instance buffer mirrored from a [`LineSegmentsGeometry`].
#[derive(Debug)]
pub struct SegmentGpuResources {
    pub instance_buffer: wgpu::Buffer,
    pub instance_count: u32,
    uploaded_version: u64,
}

/// Disjoint line segments.
#[derive(Debug, Default)]
pub struct LineSegmentsGeometry {
    instances: Vec<SegmentInstance>,
    has_colors: bool,
    has_line_distances: bool,
    bounding_box: Option<AABB>,
    bounding_sphere: Option<BoundingSphere>,
    version: u64,
    gpu_resources: Option<SegmentGpuResources>,
}

/// What a line renderable needs from its geometry.
///
/// Implemented by [`LineSegmentsGeometry`] itself and by geometries that feed it,
/// such as [`LineGeometry`](super::LineGeometry). Mutation is limited to
/// operations that keep the segment layout intact, so a wrapping geometry's own
/// bookkeeping cannot fall out of step.
pub trait SegmentGeometry {
    fn segments(&self) -> &LineSegmentsGeometry;
    fn compute_line_distances(&mut self);
    fn update_gpu_resources(&mut self, device: &Device);
}

impl SegmentGeometry for LineSegmentsGeometry {
    fn segments(&self) -> &LineSegmentsGeometry {
        self
    }

    fn compute_line_distances(&mut self) {
        LineSegmentsGeometry::compute_line_distances(self);
    }

    fn update_gpu_resources(&mut self, device: &Device) {
        LineSegmentsGeometry::update_gpu_resources(self, device);
    }
}

impl LineSegmentsGeometry {
    /// Creates an empty geometry
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all segments from flat `[x0, y0, z0, x1, y1, z1, ...]` data.
    ///
    /// Colors and line distances are reset.
    pub fn set_positions(&mut self, positions: &[f32]) -> LineResult<()> {
        if positions.len() % 6 != 0 {
            return Err(LineError::InvalidSegmentData {
                len: positions.len(),
            });
        }

        let segments = positions.chunks_exact(6).map(|p| {
            SegmentInstance::new([p[0], p[1], p[2]], [p[3], p[4], p[5]])
        });
        self.replace_instances(segments.collect());
        Ok(())
    }

    /// Replaces all segments from `[start, end]` pairs.
    pub fn set_segments(&mut self, segments: &[[[f32; 3]; 2]]) {
        let segments = segments
            .iter()
            .map(|[start, end]| SegmentInstance::new(*start, *end));
        self.replace_instances(segments.collect());
    }

    /// Sets flat per-endpoint RGB colors: 6 floats per segment.
    pub fn set_colors(&mut self, colors: &[f32]) -> LineResult<()> {
        let expected = self.instances.len() * 6;
        if colors.len() != expected {
            return Err(LineError::ColorCountMismatch {
                expected,
                actual: colors.len(),
            });
        }

        for (instance, c) in self.instances.iter_mut().zip(colors.chunks_exact(6)) {
            instance.start_color = [c[0], c[1], c[2]];
            instance.end_color = [c[3], c[4], c[5]];
        }
        self.has_colors = true;
        self.touch();
        Ok(())
    }

    /// Fills the per-endpoint line distances used for dashing.
    ///
    /// Distances accumulate over segment lengths in segment order, starting at 0,
    /// whether or not consecutive segments share endpoints.
    pub fn compute_line_distances(&mut self) {
        let mut travelled = 0.0;
        for instance in &mut self.instances {
            instance.start_distance = travelled;
            travelled += instance.length();
            instance.end_distance = travelled;
        }
        self.has_line_distances = true;
        self.touch();
    }

    /// Transforms every endpoint and refreshes the bounding volumes.
    ///
    /// Line distances are left untouched; recompute them if the matrix scales.
    pub fn apply_matrix4(&mut self, matrix: &Matrix4<f32>) {
        for instance in &mut self.instances {
            instance.start = matrix
                .transform_point(Point3::from(instance.start))
                .into();
            instance.end = matrix.transform_point(Point3::from(instance.end)).into();
        }
        self.compute_bounding_box();
        self.compute_bounding_sphere();
        self.touch();
    }

    pub fn compute_bounding_box(&mut self) {
        self.bounding_box = AABB::from_points(self.endpoints());
    }

    /// Sphere centered on the bounding box, just large enough for every endpoint.
    pub fn compute_bounding_sphere(&mut self) {
        if self.bounding_box.is_none() {
            self.compute_bounding_box();
        }
        self.bounding_sphere = self
            .bounding_box
            .map(|aabb| BoundingSphere::enclosing(aabb.center(), self.endpoints()));
    }

    pub fn bounding_box(&self) -> Option<AABB> {
        self.bounding_box
    }

    pub fn bounding_sphere(&self) -> Option<BoundingSphere> {
        self.bounding_sphere
    }

    pub fn segment_count(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Endpoints of segment `index`.
    pub fn segment(&self, index: usize) -> Option<(Vector3<f32>, Vector3<f32>)> {
        self.instances
            .get(index)
            .map(|instance| (instance.start_point(), instance.end_point()))
    }

    pub fn instances(&self) -> &[SegmentInstance] {
        &self.instances
    }

    pub fn has_colors(&self) -> bool {
        self.has_colors
    }

    pub fn has_line_distances(&self) -> bool {
        self.has_line_distances
    }

    /// Bumped on every change, so GPU mirrors know when to re-upload.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Uploads the instances when the GPU copy is missing or stale.
    pub fn update_gpu_resources(&mut self, device: &Device) {
        let up_to_date = self
            .gpu_resources
            .as_ref()
            .is_some_and(|gpu| gpu.uploaded_version == self.version);
        if up_to_date {
            return;
        }

        if self.instances.is_empty() {
            self.gpu_resources = None;
            return;
        }

        log::debug!(
            "Uploading {} line segments ({} bytes)",
            self.instances.len(),
            self.instances.len() * std::mem::size_of::<SegmentInstance>()
        );

        let instance_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Line Segment Instance Buffer"),
                contents: bytemuck::cast_slice(&self.instances),
                usage: wgpu::BufferUsages::VERTEX,
            },
        );

        self.gpu_resources = Some(SegmentGpuResources {
            instance_buffer,
            instance_count: self.instances.len() as u32,
            uploaded_version: self.version,
        });
    }

    pub fn gpu_resources(&self) -> Option<&SegmentGpuResources> {
        self.gpu_resources.as_ref()
    }

    /// Whether the uploaded buffer matches the CPU data.
    pub fn is_gpu_current(&self) -> bool {
        match &self.gpu_resources {
            Some(gpu) => gpu.uploaded_version == self.version,
            None => self.instances.is_empty(),
        }
    }

    fn replace_instances(&mut self, instances: Vec<SegmentInstance>) {
        self.instances = instances;
        self.has_colors = false;
        self.has_line_distances = false;
        self.compute_bounding_box();
        self.compute_bounding_sphere();
        self.touch();
    }

    fn endpoints(&self) -> impl Iterator<Item = Vector3<f32>> + '_ {
        self.instances
            .iter()
            .flat_map(|instance| [instance.start_point(), instance.end_point()])
    }

    fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_segments() -> LineSegmentsGeometry {
        let mut geometry = LineSegmentsGeometry::new();
        geometry
            .set_positions(&[0.0, 0.0, 0.0, 3.0, 4.0, 0.0, 10.0, 0.0, 0.0, 10.0, 0.0, 2.0])
            .unwrap();
        geometry
    }

    #[test]
    fn test_positions_become_segments() {
        let geometry = two_segments();
        assert_eq!(geometry.segment_count(), 2);
        assert_eq!(
            geometry.segment(1),
            Some((Vector3::new(10.0, 0.0, 0.0), Vector3::new(10.0, 0.0, 2.0)))
        );
        assert!(!geometry.has_colors());
        assert_eq!(geometry.instances()[0].start_color, WHITE);
    }

    #[test]
    fn test_partial_segment_is_rejected() {
        let mut geometry = LineSegmentsGeometry::new();
        let err = geometry.set_positions(&[0.0; 7]).unwrap_err();
        assert_eq!(err, LineError::InvalidSegmentData { len: 7 });
        assert!(geometry.is_empty());
    }

    #[test]
    fn test_colors_must_match_segments() {
        let mut geometry = two_segments();
        assert_eq!(
            geometry.set_colors(&[1.0; 6]),
            Err(LineError::ColorCountMismatch {
                expected: 12,
                actual: 6
            })
        );

        let colors: Vec<f32> = (0..12).map(|i| i as f32 / 12.0).collect();
        geometry.set_colors(&colors).unwrap();
        assert!(geometry.has_colors());
        assert_eq!(geometry.instances()[1].start_color, [0.5, 7.0 / 12.0, 8.0 / 12.0]);
    }

    #[test]
    fn test_line_distances_accumulate() {
        let mut geometry = two_segments();
        geometry.compute_line_distances();

        let instances = geometry.instances();
        assert_eq!(instances[0].start_distance, 0.0);
        assert!((instances[0].end_distance - 5.0).abs() < 1e-6);
        assert!((instances[1].start_distance - 5.0).abs() < 1e-6);
        assert!((instances[1].end_distance - 7.0).abs() < 1e-6);
        assert!(geometry.has_line_distances());
    }

    #[test]
    fn test_bounds_enclose_endpoints() {
        let geometry = two_segments();
        let aabb = geometry.bounding_box().unwrap();
        assert_eq!(aabb.min, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vector3::new(10.0, 4.0, 2.0));

        let sphere = geometry.bounding_sphere().unwrap();
        for i in 0..geometry.segment_count() {
            let (start, end) = geometry.segment(i).unwrap();
            assert!((start - sphere.center).magnitude() <= sphere.radius + 1e-5);
            assert!((end - sphere.center).magnitude() <= sphere.radius + 1e-5);
        }
    }

    #[test]
    fn test_empty_geometry_has_no_bounds() {
        let geometry = LineSegmentsGeometry::new();
        assert!(geometry.bounding_box().is_none());
        assert!(geometry.bounding_sphere().is_none());
        assert!(geometry.is_gpu_current());
    }

    #[test]
    fn test_apply_matrix_moves_bounds() {
        let mut geometry = two_segments();
        geometry.apply_matrix4(&Matrix4::from_translation(Vector3::new(0.0, 0.0, -5.0)));

        let aabb = geometry.bounding_box().unwrap();
        assert_eq!(aabb.min.z, -5.0);
        assert_eq!(aabb.max.z, -3.0);
    }

    #[test]
    fn test_every_change_bumps_version() {
        let mut geometry = two_segments();
        let v0 = geometry.version();
        geometry.compute_line_distances();
        let v1 = geometry.version();
        geometry.set_colors(&[0.0; 12]).unwrap();
        assert!(v1 > v0);
        assert!(geometry.version() > v1);
        assert!(!geometry.is_gpu_current());
    }

    #[test]
    fn test_instance_layout_matches_struct() {
        let layout = SegmentInstance::desc();
        assert_eq!(layout.array_stride, 56);
        assert_eq!(layout.step_mode, wgpu::VertexStepMode::Instance);
        assert_eq!(layout.attributes.last().unwrap().offset, 52);
    }
}
