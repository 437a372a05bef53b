//! # Line Picking Primitives
//!
//! Rays, bounding volumes and the [`Raycaster`] consumed by
//! [`LineSegments2::raycast`](crate::gfx::lines::LineSegments2::raycast).
//!
//! ## How it works
//!
//! 1. **Mouse to Ray**: [`Raycaster::from_screen`] unprojects a pixel into a world-space ray
//! 2. **Bounding pre-test**: the ray is tested against the line's bounding sphere,
//!    enlarged by half the line width
//! 3. **Segment test**: each segment is compared with the ray in screen space
//!    (pixel widths) or in world space (world-unit widths)
//!
//! ## Usage
//!
//! ```no_run
//! use thickline::gfx::camera::OrbitCamera;
//! use thickline::gfx::picking::Raycaster;
//!
//! let camera = OrbitCamera::new(10.0, 0.0, 0.0, cgmath::Vector3::new(0.0, 0.0, 0.0), 1.0);
//! let raycaster = Raycaster::from_screen((400.0, 300.0), (800.0, 600.0), &camera);
//! ```

use cgmath::{
    EuclideanSpace, InnerSpace, Matrix4, Point3, SquareMatrix, Transform, Vector3, Vector4, Zero,
};

use crate::gfx::camera::Camera;

/// A 3D ray for intersection testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Ray origin point in world space
    pub origin: Vector3<f32>,
    /// Ray direction (normalized)
    pub direction: Vector3<f32>,
}

/// Closest approach between a ray and a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentApproach {
    /// Squared distance between the two closest points
    pub distance_sq: f32,
    /// Closest point on the ray
    pub point_on_ray: Vector3<f32>,
    /// Closest point on the segment
    pub point_on_segment: Vector3<f32>,
}

impl Ray {
    /// Create a new ray
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }

    /// Squared distance from `point` to the closest point of the ray.
    pub fn distance_sq_to_point(&self, point: Vector3<f32>) -> f32 {
        let t = (point - self.origin).dot(self.direction);
        if t < 0.0 {
            return (point - self.origin).magnitude2();
        }
        (self.point_at(t) - point).magnitude2()
    }

    /// Closest approach between the ray and the segment `v0..v1`.
    ///
    /// Works in the segment's center/extent frame so that both parameters can be
    /// clamped independently (ray `s0 >= 0`, segment `|s1| <= extent`).
    pub fn distance_sq_to_segment(&self, v0: Vector3<f32>, v1: Vector3<f32>) -> SegmentApproach {
        let seg_center = (v0 + v1) * 0.5;
        let seg_extent = (v1 - v0).magnitude() * 0.5;

        if seg_extent <= f32::EPSILON {
            let t = (seg_center - self.origin).dot(self.direction).max(0.0);
            let point_on_ray = self.point_at(t);
            return SegmentApproach {
                distance_sq: (point_on_ray - seg_center).magnitude2(),
                point_on_ray,
                point_on_segment: seg_center,
            };
        }

        let seg_dir = (v1 - v0).normalize();
        let diff = self.origin - seg_center;

        let a01 = -self.direction.dot(seg_dir);
        let b0 = diff.dot(self.direction);
        let b1 = -diff.dot(seg_dir);
        let c = diff.magnitude2();
        let det = (1.0 - a01 * a01).abs();

        let s0;
        let s1;
        let distance_sq;

        if det > 0.0 {
            let mut t0 = a01 * b1 - b0;
            let mut t1 = a01 * b0 - b1;
            let ext_det = seg_extent * det;

            if t0 >= 0.0 {
                if t1 >= -ext_det {
                    if t1 <= ext_det {
                        // interior of both
                        let inv_det = 1.0 / det;
                        t0 *= inv_det;
                        t1 *= inv_det;
                        s0 = t0;
                        s1 = t1;
                        distance_sq = t0 * (t0 + a01 * t1 + 2.0 * b0)
                            + t1 * (a01 * t0 + t1 + 2.0 * b1)
                            + c;
                    } else {
                        s1 = seg_extent;
                        s0 = (-(a01 * s1 + b0)).max(0.0);
                        distance_sq = -s0 * s0 + s1 * (s1 + 2.0 * b1) + c;
                    }
                } else {
                    s1 = -seg_extent;
                    s0 = (-(a01 * s1 + b0)).max(0.0);
                    distance_sq = -s0 * s0 + s1 * (s1 + 2.0 * b1) + c;
                }
            } else if t1 <= -ext_det {
                s0 = (-(-a01 * seg_extent + b0)).max(0.0);
                s1 = if s0 > 0.0 {
                    -seg_extent
                } else {
                    (-b1).clamp(-seg_extent, seg_extent)
                };
                distance_sq = -s0 * s0 + s1 * (s1 + 2.0 * b1) + c;
            } else if t1 <= ext_det {
                s0 = 0.0;
                s1 = (-b1).clamp(-seg_extent, seg_extent);
                distance_sq = s1 * (s1 + 2.0 * b1) + c;
            } else {
                s0 = (-(a01 * seg_extent + b0)).max(0.0);
                s1 = if s0 > 0.0 {
                    seg_extent
                } else {
                    (-b1).clamp(-seg_extent, seg_extent)
                };
                distance_sq = -s0 * s0 + s1 * (s1 + 2.0 * b1) + c;
            }
        } else {
            // parallel
            s1 = if a01 > 0.0 { -seg_extent } else { seg_extent };
            s0 = (-(a01 * s1 + b0)).max(0.0);
            distance_sq = -s0 * s0 + s1 * (s1 + 2.0 * b1) + c;
        }

        SegmentApproach {
            distance_sq: distance_sq.max(0.0),
            point_on_ray: self.point_at(s0),
            point_on_segment: seg_center + seg_dir * s1,
        }
    }

    /// Test against a bounding sphere.
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.distance_sq_to_point(sphere.center) <= sphere.radius * sphere.radius
    }
}

/// Axis-aligned bounding box for intersection testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vector3<f32>,
    /// Maximum corner of the bounding box
    pub max: Vector3<f32>,
}

impl AABB {
    /// Create a new AABB
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Create AABB from a set of points, `None` when there are none
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vector3<f32>>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut aabb = Self::new(first, first);
        for point in points {
            aabb.expand_by_point(point);
        }
        Some(aabb)
    }

    pub fn expand_by_point(&mut self, v: Vector3<f32>) {
        self.min.x = self.min.x.min(v.x);
        self.min.y = self.min.y.min(v.y);
        self.min.z = self.min.z.min(v.z);
        self.max.x = self.max.x.max(v.x);
        self.max.y = self.max.y.max(v.y);
        self.max.z = self.max.z.max(v.z);
    }

    pub fn union(&self, other: &AABB) -> AABB {
        let mut merged = *self;
        merged.expand_by_point(other.min);
        merged.expand_by_point(other.max);
        merged
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    /// Apply a transformation matrix to the AABB
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        // Transform all 8 corners of the AABB and compute new bounds
        let corners = [
            Vector3::new(self.min.x, self.min.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.min.z),
            Vector3::new(self.min.x, self.max.y, self.min.z),
            Vector3::new(self.min.x, self.min.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.max.z),
            Vector3::new(self.min.x, self.max.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.max.z),
        ];

        let transformed = corners.iter().map(|corner| {
            let h = matrix * corner.extend(1.0);
            Vector3::new(h.x / h.w, h.y / h.w, h.z / h.w)
        });

        Self::from_points(transformed).unwrap_or(*self)
    }
}

/// Bounding sphere used for the cheap raycast rejection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vector3<f32>,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vector3<f32>, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Smallest sphere around `center` enclosing every point.
    pub fn enclosing<I>(center: Vector3<f32>, points: I) -> Self
    where
        I: IntoIterator<Item = Vector3<f32>>,
    {
        let max_sq = points
            .into_iter()
            .map(|p| (p - center).magnitude2())
            .fold(0.0f32, f32::max);
        Self::new(center, max_sq.sqrt())
    }

    pub fn expanded(&self, margin: f32) -> Self {
        Self::new(self.center, self.radius + margin)
    }

    /// Transform the sphere; the radius grows with the largest axis scale.
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        let center = matrix.transform_point(Point3::from_vec(self.center)).to_vec();
        let scale = [matrix.x, matrix.y, matrix.z]
            .iter()
            .map(|axis| axis.truncate().magnitude())
            .fold(0.0f32, f32::max);
        Self::new(center, self.radius * scale)
    }
}

/// Camera state needed to test lines in screen space.
///
/// `projection` follows the OpenGL clip convention (depth in `[-1, 1]`), which is
/// what the in-clip-space check of the screen-space line test expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastCamera {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub near: f32,
}

impl RaycastCamera {
    pub fn new(view: Matrix4<f32>, projection: Matrix4<f32>, near: f32) -> Self {
        Self {
            view,
            projection,
            near,
        }
    }

    pub fn from_camera<C: Camera>(camera: &C) -> Self {
        Self::new(camera.view_matrix(), camera.projection_matrix(), camera.near())
    }

    /// World-space half width of a line `line_width` pixels wide, seen at
    /// `distance` in front of the camera.
    pub fn world_space_half_width(
        &self,
        distance: f32,
        line_width: f32,
        resolution: cgmath::Vector2<f32>,
    ) -> Option<f32> {
        let clip = self.projection * Vector4::new(0.0, 0.0, -distance, 1.0);
        let ndc = clip / clip.w;
        let ndc = Vector4::new(
            line_width / resolution.x,
            line_width / resolution.y,
            ndc.z,
            1.0,
        );
        let view = self.projection.invert()? * ndc;
        let view = view / view.w;
        Some(view.x.max(view.y).abs())
    }
}

/// A ray plus the camera it was cast from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Raycaster {
    pub ray: Ray,
    pub camera: RaycastCamera,
    /// Extra pick tolerance added to the line width (pixels, or world units
    /// for world-unit materials)
    pub line_threshold: f32,
}

impl Raycaster {
    pub fn new(ray: Ray, camera: RaycastCamera) -> Self {
        Self {
            ray,
            camera,
            line_threshold: 0.0,
        }
    }

    pub fn with_line_threshold(mut self, threshold: f32) -> Self {
        self.line_threshold = threshold.max(0.0);
        self
    }

    /// Convert screen coordinates to a world-space ray
    pub fn from_screen<C: Camera>(
        screen_pos: (f32, f32),
        screen_size: (f32, f32),
        camera: &C,
    ) -> Self {
        let camera = RaycastCamera::from_camera(camera);
        let (mouse_x, mouse_y) = screen_pos;
        let (screen_width, screen_height) = screen_size;

        // Convert screen coordinates to normalized device coordinates (-1 to 1)
        let ndc_x = (2.0 * mouse_x) / screen_width - 1.0;
        let ndc_y = 1.0 - (2.0 * mouse_y) / screen_height; // Flip Y axis

        let view_proj = camera.projection * camera.view;
        let inv_view_proj = view_proj.invert().unwrap_or(Matrix4::from_scale(1.0));

        let unproject = |z: f32| {
            let world = inv_view_proj * Vector4::new(ndc_x, ndc_y, z, 1.0);
            Vector3::new(world.x / world.w, world.y / world.w, world.z / world.w)
        };
        let near_3d = unproject(-1.0);
        let far_3d = unproject(1.0);

        let direction = far_3d - near_3d;
        let direction = if direction.is_zero() {
            -Vector3::unit_z()
        } else {
            direction
        };
        Self::new(Ray::new(near_3d, direction), camera)
    }
}

/// A ray hit on one segment of a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineIntersection {
    /// Closest point on the ray, in world space
    pub point: Vector3<f32>,
    /// Closest point on the hit segment, in world space
    pub point_on_line: Vector3<f32>,
    /// Distance from the ray origin to `point`
    pub distance: f32,
    /// Index of the hit segment within its geometry
    pub segment_index: usize,
}
