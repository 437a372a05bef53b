use cgmath::{Matrix4, SquareMatrix};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// A camera the line renderer and the line picker can both consume.
///
/// `projection_matrix` uses the OpenGL clip convention (depth in `[-1, 1]`);
/// the GPU path applies [`OPENGL_TO_WGPU_MATRIX`] on top of it.
pub trait Camera {
    fn view_matrix(&self) -> Matrix4<f32>;

    fn projection_matrix(&self) -> Matrix4<f32>;

    /// Distance to the near clipping plane.
    fn near(&self) -> f32;
}

/// Camera block of the line shader (bind group 0).
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct CameraUniform {
    /// World to view space.
    pub view: [[f32; 4]; 4],

    /// View to clip space, already in wgpu depth convention.
    pub projection: [[f32; 4]; 4],
}

impl Default for CameraUniform {
    /// Creates a default [CameraUniform].
    fn default() -> Self {
        Self {
            view: convert_matrix4_to_array(Matrix4::identity()),
            projection: convert_matrix4_to_array(Matrix4::identity()),
        }
    }
}

impl CameraUniform {
    pub fn from_camera<C: Camera>(camera: &C) -> Self {
        Self {
            view: convert_matrix4_to_array(camera.view_matrix()),
            projection: convert_matrix4_to_array(
                OPENGL_TO_WGPU_MATRIX * camera.projection_matrix(),
            ),
        }
    }
}

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    let mut result = [[0.0; 4]; 4];

    for i in 0..4 {
        for j in 0..4 {
            result[i][j] = matrix4[i][j];
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_conversion_is_column_major() {
        let m = Matrix4::from_translation(cgmath::Vector3::new(1.0, 2.0, 3.0));
        let a = convert_matrix4_to_array(m);
        assert_eq!(a[3], [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_wgpu_matrix_maps_depth_range() {
        // GL near plane (z = -1) lands on wgpu depth 0, far plane (z = 1) on 1
        let near = OPENGL_TO_WGPU_MATRIX * cgmath::Vector4::new(0.0, 0.0, -1.0, 1.0);
        let far = OPENGL_TO_WGPU_MATRIX * cgmath::Vector4::new(0.0, 0.0, 1.0, 1.0);
        assert!((near.z - 0.0).abs() < 1e-6);
        assert!((far.z - 1.0).abs() < 1e-6);
    }
}
