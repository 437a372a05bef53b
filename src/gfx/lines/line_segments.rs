use std::cell::RefCell;
use std::rc::Rc;

use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector2, Vector3, Vector4, VectorSpace};
use wgpu::Device;

use super::kind::NodeKind;
use super::line_material::LineMaterial;
use super::segments_geometry::{LineSegmentsGeometry, SegmentGeometry};
use crate::gfx::camera::camera_utils::convert_matrix4_to_array;
use crate::gfx::picking::{BoundingSphere, LineIntersection, RaycastCamera, Raycaster, AABB};
use crate::wgpu_utils::{BindGroupBuilder, BindGroupLayoutWithDesc, UniformBuffer};

/// Geometry or material handle that several nodes may hold at once.
pub type Shared<T> = Rc<RefCell<T>>;
pub type SharedLineMaterial = Shared<LineMaterial>;

pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformUniform {
    pub model: [[f32; 4]; 4],
}

// GPU resources struct to hold the per-node transform
pub struct LineGpuResources {
    transform_ubo: UniformBuffer<TransformUniform>,
    pub transform_bind_group: wgpu::BindGroup,
}

/// Screen-space-width line segments: the base line renderable.
///
/// Owns shared handles to a segment geometry and a [`LineMaterial`] and
/// implements what every line node needs: line distances, bounding volumes
/// in world space and ray picking against the on-screen width.
pub struct LineSegments2<G: SegmentGeometry = LineSegmentsGeometry> {
    geometry: Shared<G>,
    material: SharedLineMaterial,
    pub transform: Matrix4<f32>, // cgmath 4x4 world matrix
    pub visible: bool,
    gpu_resources: Option<LineGpuResources>, // None until update_gpu_resources called
}

impl<G: SegmentGeometry> LineSegments2<G> {
    pub fn new(geometry: Shared<G>, material: SharedLineMaterial) -> Self {
        Self {
            geometry,
            material,
            transform: Matrix4::identity(),
            visible: true,
            gpu_resources: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        NodeKind::LineSegments2
    }

    pub fn is_thick_line(&self) -> bool {
        self.kind().is_thick_line()
    }

    pub fn geometry(&self) -> &Shared<G> {
        &self.geometry
    }

    pub fn material(&self) -> &SharedLineMaterial {
        &self.material
    }

    pub fn set_geometry(&mut self, geometry: Shared<G>) {
        self.geometry = geometry;
    }

    pub fn set_material(&mut self, material: SharedLineMaterial) {
        self.material = material;
    }

    /// Set translation
    pub fn set_translation(&mut self, translation: Vector3<f32>) {
        self.transform = Matrix4::from_translation(translation);
    }

    /// Fills per-segment line distances on the geometry (needed for dashing).
    pub fn compute_line_distances(&self) -> &Self {
        self.geometry.borrow_mut().compute_line_distances();
        self
    }

    pub fn world_bounding_box(&self) -> Option<AABB> {
        let geometry = self.geometry.borrow();
        geometry
            .segments()
            .bounding_box()
            .map(|aabb| aabb.transform(&self.transform))
    }

    pub fn world_bounding_sphere(&self) -> Option<BoundingSphere> {
        let geometry = self.geometry.borrow();
        geometry
            .segments()
            .bounding_sphere()
            .map(|sphere| sphere.transform(&self.transform))
    }

    /// Intersects the ray with every segment, nearest hit first.
    ///
    /// Pixel-width materials are tested in screen space: the ray and each
    /// segment are projected, and a segment is hit when the projected ray lies
    /// within half the line width (plus the raycaster's threshold) of it.
    /// World-unit materials compare world-space distances instead.
    pub fn raycast(&self, raycaster: &Raycaster) -> Vec<LineIntersection> {
        let material = self.material.borrow();
        let geometry = self.geometry.borrow();
        let segments = geometry.segments();

        if segments.is_empty() {
            return Vec::new();
        }

        let line_width = material.linewidth() + raycaster.line_threshold;
        let resolution = material.resolution();

        if let Some(sphere) = self.world_bounding_sphere() {
            let margin = if material.world_units() {
                Some(line_width * 0.5)
            } else {
                let distance = (sphere.center - raycaster.ray.origin).magnitude();
                raycaster
                    .camera
                    .world_space_half_width(distance, line_width, resolution)
            };
            let margin = margin.unwrap_or(0.0);
            if !raycaster.ray.intersects_sphere(&sphere.expanded(margin)) {
                log::trace!("Line bounding sphere missed");
                return Vec::new();
            }
        }

        let mut hits = if material.world_units() {
            self.raycast_world_units(raycaster, segments, line_width)
        } else {
            self.raycast_screen_space(raycaster, segments, line_width, resolution)
        };

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn raycast_world_units(
        &self,
        raycaster: &Raycaster,
        segments: &LineSegmentsGeometry,
        line_width: f32,
    ) -> Vec<LineIntersection> {
        let ray = &raycaster.ray;
        let half_width_sq = (line_width * 0.5) * (line_width * 0.5);

        segments
            .instances()
            .iter()
            .enumerate()
            .filter_map(|(segment_index, instance)| {
                let start = self.to_world(instance.start);
                let end = self.to_world(instance.end);
                let approach = ray.distance_sq_to_segment(start, end);

                (approach.distance_sq < half_width_sq).then(|| LineIntersection {
                    point: approach.point_on_ray,
                    point_on_line: approach.point_on_segment,
                    distance: (approach.point_on_ray - ray.origin).magnitude(),
                    segment_index,
                })
            })
            .collect()
    }

    fn raycast_screen_space(
        &self,
        raycaster: &Raycaster,
        segments: &LineSegmentsGeometry,
        line_width: f32,
        resolution: Vector2<f32>,
    ) -> Vec<LineIntersection> {
        let ray = &raycaster.ray;
        let camera = &raycaster.camera;
        let half_resolution = resolution * 0.5;
        // view space looks down -z, so the near plane sits at -near
        let near = -camera.near;

        // Use a point one unit out along the ray, the origin may sit on the camera
        let ss_origin = camera.projection * camera.view * ray.point_at(1.0).extend(1.0);
        let ss_origin = Vector2::new(
            ss_origin.x / ss_origin.w * half_resolution.x,
            ss_origin.y / ss_origin.w * half_resolution.y,
        );

        let model_view = camera.view * self.transform;
        let mut hits = Vec::new();

        for (segment_index, instance) in segments.instances().iter().enumerate() {
            let mut start = model_view * Vector3::from(instance.start).extend(1.0);
            let mut end = model_view * Vector3::from(instance.end).extend(1.0);

            // skip the segment if it's entirely behind the camera
            if start.z > near && end.z > near {
                continue;
            }

            // trim the segment if it extends behind the camera
            if start.z > near {
                let t = (start.z - near) / (start.z - end.z);
                start = start.lerp(end, t);
            } else if end.z > near {
                let t = (end.z - near) / (end.z - start.z);
                end = end.lerp(start, t);
            }

            let start = to_screen(camera, start, half_resolution);
            let end = to_screen(camera, end, half_resolution);

            let param = closest_point_parameter(ss_origin, start.truncate(), end.truncate());
            let closest = start.truncate().lerp(end.truncate(), param);
            let depth = start.z + (end.z - start.z) * param;

            let in_clip_space = (-1.0..=1.0).contains(&depth);
            let inside = (ss_origin - closest).magnitude() < line_width * 0.5;

            if in_clip_space && inside {
                let approach = ray.distance_sq_to_segment(
                    self.to_world(instance.start),
                    self.to_world(instance.end),
                );
                hits.push(LineIntersection {
                    point: approach.point_on_ray,
                    point_on_line: approach.point_on_segment,
                    distance: (approach.point_on_ray - ray.origin).magnitude(),
                    segment_index,
                });
            }
        }

        hits
    }

    fn to_world(&self, point: [f32; 3]) -> Vector3<f32> {
        (self.transform * Vector3::from(point).extend(1.0)).truncate()
    }

    /// Creates or refreshes the transform uniform for this node.
    pub fn update_gpu_resources(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        layout: &BindGroupLayoutWithDesc,
    ) {
        let uniform = TransformUniform {
            model: convert_matrix4_to_array(self.transform),
        };

        if let Some(resources) = &mut self.gpu_resources {
            resources.transform_ubo.update_content(queue, uniform);
            return;
        }

        log::debug!("Creating {} transform resources", self.kind());
        let transform_ubo = UniformBuffer::new_with_data(device, &uniform);
        let transform_bind_group = BindGroupBuilder::new(layout)
            .resource(transform_ubo.binding_resource())
            .create(device, "Line Transform Bind Group");
        self.gpu_resources = Some(LineGpuResources {
            transform_ubo,
            transform_bind_group,
        });
    }

    /// Get the transform bind group for rendering
    pub fn transform_bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.gpu_resources
            .as_ref()
            .map(|res| &res.transform_bind_group)
    }
}

/// Clip space to pixel offsets from the viewport center; z keeps the NDC depth.
fn to_screen(
    camera: &RaycastCamera,
    view: Vector4<f32>,
    half_resolution: Vector2<f32>,
) -> Vector3<f32> {
    let clip = camera.projection * view;
    let ndc = clip / clip.w;
    Vector3::new(ndc.x * half_resolution.x, ndc.y * half_resolution.y, ndc.z)
}

/// Parameter in `[0, 1]` of the point on `start..end` closest to `point`.
fn closest_point_parameter(point: Vector2<f32>, start: Vector2<f32>, end: Vector2<f32>) -> f32 {
    let delta = end - start;
    let length_sq = delta.magnitude2();
    if length_sq <= f32::EPSILON {
        return 0.0;
    }
    ((point - start).dot(delta) / length_sq).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::OrbitCamera;
    use crate::gfx::lines::LineMaterialParameters;
    use crate::gfx::picking::Ray;
    use cgmath::Zero;

    fn horizontal_segment(linewidth: f32, world_units: bool) -> LineSegments2 {
        let mut geometry = LineSegmentsGeometry::new();
        geometry
            .set_positions(&[-1.0, 0.0, 0.0, 1.0, 0.0, 0.0])
            .unwrap();
        let material = LineMaterial::new(
            LineMaterialParameters::default()
                .with_linewidth(linewidth)
                .with_resolution(800.0, 800.0)
                .with_world_units(world_units),
        );
        LineSegments2::new(shared(geometry), shared(material))
    }

    fn camera() -> RaycastCamera {
        RaycastCamera::from_camera(&OrbitCamera::new(10.0, 0.0, 0.0, Vector3::zero(), 1.0))
    }

    fn ray_towards(target: Vector3<f32>) -> Raycaster {
        let eye = Vector3::new(0.0, 0.0, 10.0);
        Raycaster::new(Ray::new(eye, target - eye), camera())
    }

    #[test]
    fn test_kind_is_line_segments() {
        let lines = horizontal_segment(1.0, false);
        assert_eq!(lines.kind(), NodeKind::LineSegments2);
        assert!(!lines.is_thick_line());
        assert!(lines.kind().is_line_segments());
    }

    #[test]
    fn test_screen_space_hit_through_center() {
        let lines = horizontal_segment(4.0, false);
        let hits = lines.raycast(&ray_towards(Vector3::new(0.3, 0.0, 0.0)));

        assert_eq!(hits.len(), 1);
        let hit = hits[0];
        assert_eq!(hit.segment_index, 0);
        assert!((hit.point_on_line - Vector3::new(0.3, 0.0, 0.0)).magnitude() < 1e-3);
        assert!((hit.distance - (0.09f32 + 100.0).sqrt()).abs() < 1e-3);
    }

    #[test]
    fn test_screen_space_tolerance_is_half_the_width() {
        // at distance 10 a 0.005 offset is roughly half a pixel, 0.05 about five
        let lines = horizontal_segment(4.0, false);
        assert_eq!(lines.raycast(&ray_towards(Vector3::new(0.0, 0.005, 0.0))).len(), 1);
        assert!(lines.raycast(&ray_towards(Vector3::new(0.0, 0.05, 0.0))).is_empty());

        // a threshold widens the pick area
        let wide = ray_towards(Vector3::new(0.0, 0.05, 0.0)).with_line_threshold(8.0);
        assert_eq!(lines.raycast(&wide).len(), 1);
    }

    #[test]
    fn test_segment_behind_camera_is_skipped() {
        let mut geometry = LineSegmentsGeometry::new();
        geometry
            .set_positions(&[-1.0, 0.0, 12.0, 1.0, 0.0, 12.0])
            .unwrap();
        let material = LineMaterial::new(
            LineMaterialParameters::default()
                .with_linewidth(1000.0)
                .with_resolution(800.0, 800.0),
        );
        let lines = LineSegments2::new(shared(geometry), shared(material));

        let raycaster = Raycaster::new(
            Ray::new(Vector3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0)),
            camera(),
        );
        assert!(lines.raycast(&raycaster).is_empty());
    }

    #[test]
    fn test_segment_crossing_near_plane_is_trimmed() {
        // starts behind the eye at z = 10, ends in front of it
        let mut geometry = LineSegmentsGeometry::new();
        geometry
            .set_positions(&[-1.0, 0.0, 15.0, 1.0, 0.0, 0.0])
            .unwrap();
        let material = LineMaterial::new(
            LineMaterialParameters::default()
                .with_linewidth(4.0)
                .with_resolution(800.0, 800.0),
        );
        let lines = LineSegments2::new(shared(geometry), shared(material));

        let hits = lines.raycast(&ray_towards(Vector3::new(0.6, 0.0, 3.0)));
        assert_eq!(hits.len(), 1);
        let on_line = hits[0].point_on_line;
        assert!((on_line - Vector3::new(0.6, 0.0, 3.0)).magnitude() < 1e-3);
        assert!((hits[0].distance - 7.0f32.hypot(0.6)).abs() < 1e-3);
    }

    #[test]
    fn test_world_units_use_world_distance() {
        let lines = horizontal_segment(0.5, true);
        assert_eq!(lines.raycast(&ray_towards(Vector3::new(0.0, 0.2, 0.0))).len(), 1);
        assert!(lines.raycast(&ray_towards(Vector3::new(0.0, 0.3, 0.0))).is_empty());
    }

    #[test]
    fn test_hits_sorted_by_distance() {
        let mut geometry = LineSegmentsGeometry::new();
        geometry
            .set_positions(&[
                -1.0, 0.0, -5.0, 1.0, 0.0, -5.0, // far
                -1.0, 0.0, 0.0, 1.0, 0.0, 0.0, // near
            ])
            .unwrap();
        let material = LineMaterial::new(
            LineMaterialParameters::default()
                .with_linewidth(4.0)
                .with_resolution(800.0, 800.0),
        );
        let lines = LineSegments2::new(shared(geometry), shared(material));

        let hits = lines.raycast(&ray_towards(Vector3::zero()));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].segment_index, 1);
        assert_eq!(hits[1].segment_index, 0);
        assert!(hits[0].distance < hits[1].distance);
    }

    #[test]
    fn test_transform_moves_pick_target() {
        let mut lines = horizontal_segment(4.0, false);
        lines.set_translation(Vector3::new(0.0, 2.0, 0.0));

        assert!(lines.raycast(&ray_towards(Vector3::zero())).is_empty());
        let hits = lines.raycast(&ray_towards(Vector3::new(0.0, 2.0, 0.0)));
        assert_eq!(hits.len(), 1);
        assert!((hits[0].point_on_line.y - 2.0).abs() < 1e-4);

        let aabb = lines.world_bounding_box().unwrap();
        assert_eq!(aabb.min.y, 2.0);
    }

    #[test]
    fn test_empty_geometry_never_hits() {
        let lines: LineSegments2 =
            LineSegments2::new(shared(LineSegmentsGeometry::new()), shared(LineMaterial::default()));
        assert!(lines.raycast(&ray_towards(Vector3::zero())).is_empty());
        assert!(lines.world_bounding_box().is_none());
    }

    #[test]
    fn test_line_distances_through_shared_geometry() {
        let lines = horizontal_segment(1.0, false);
        lines.compute_line_distances();
        let geometry = lines.geometry().borrow();
        assert!(geometry.has_line_distances());
        assert!((geometry.instances()[0].end_distance - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_closest_point_parameter_clamps() {
        let start = Vector2::new(0.0, 0.0);
        let end = Vector2::new(10.0, 0.0);
        assert_eq!(closest_point_parameter(Vector2::new(-5.0, 1.0), start, end), 0.0);
        assert_eq!(closest_point_parameter(Vector2::new(15.0, 1.0), start, end), 1.0);
        assert!((closest_point_parameter(Vector2::new(2.5, 3.0), start, end) - 0.25).abs() < 1e-6);
        assert_eq!(closest_point_parameter(Vector2::new(1.0, 1.0), start, start), 0.0);
    }
}
