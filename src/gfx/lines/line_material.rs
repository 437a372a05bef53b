//! Line material: color, screen-space width, dashing and the viewport
//! resolution the width is measured against.
//!
//! The CPU-side parameters pack into a single [`LineUniform`] shared by the
//! vertex stage (width, resolution) and the fragment stage (color, dashes).

use cgmath::Vector2;
use rand::Rng;
use wgpu::Device;

use crate::error::{LineError, LineResult};
use crate::wgpu_utils::{BindGroupBuilder, BindGroupLayoutWithDesc, UniformBuffer};

/// Largest packed 24-bit RGB value.
pub const MAX_COLOR: u32 = 0xFF_FF_FF;

/// `LineUniform::flags` bits
pub const FLAG_DASHED: u32 = 1 << 0;
pub const FLAG_WORLD_UNITS: u32 = 1 << 1;
pub const FLAG_VERTEX_COLORS: u32 = 1 << 2;
pub const FLAG_ALPHA_TO_COVERAGE: u32 = 1 << 3;

/// Uniformly random opaque color over the whole 24-bit RGB space.
pub fn random_color() -> u32 {
    rand::rng().random_range(0..=MAX_COLOR)
}

/// Unpacks `0xRRGGBB` into normalized `[r, g, b]`.
pub fn hex_to_rgb(hex: u32) -> [f32; 3] {
    let hex = hex & MAX_COLOR;
    [
        ((hex >> 16) & 0xFF) as f32 / 255.0,
        ((hex >> 8) & 0xFF) as f32 / 255.0,
        (hex & 0xFF) as f32 / 255.0,
    ]
}

/// GPU uniform data for line materials
///
/// 48 bytes, laid out to match the WGSL `LineUniform` struct without
/// implicit padding.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineUniform {
    /// rgb color + opacity
    pub diffuse: [f32; 4],
    pub resolution: [f32; 2],
    pub linewidth: f32,
    pub dash_scale: f32,
    pub dash_size: f32,
    pub gap_size: f32,
    pub dash_offset: f32,
    pub flags: u32,
}

type LineUBO = UniformBuffer<LineUniform>;

/// Construction options for [`LineMaterial`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMaterialParameters {
    /// Packed `0xRRGGBB` color
    pub color: u32,
    /// Width in pixels, or in world units when `world_units` is set
    pub linewidth: f32,
    pub opacity: f32,
    /// Transparent lines are drawn after opaque ones and do not write depth
    pub transparent: bool,
    /// Multiply the material color by per-endpoint geometry colors
    pub vertex_colors: bool,
    pub dashed: bool,
    pub dash_scale: f32,
    pub dash_size: f32,
    pub gap_size: f32,
    pub dash_offset: f32,
    /// Viewport size in pixels that `linewidth` is measured against
    pub resolution: Vector2<f32>,
    pub world_units: bool,
    pub alpha_to_coverage: bool,
}

impl Default for LineMaterialParameters {
    fn default() -> Self {
        Self {
            color: MAX_COLOR,
            linewidth: 1.0,
            opacity: 1.0,
            transparent: false,
            vertex_colors: false,
            dashed: false,
            dash_scale: 1.0,
            dash_size: 1.0,
            gap_size: 1.0,
            dash_offset: 0.0,
            resolution: Vector2::new(1.0, 1.0),
            world_units: false,
            alpha_to_coverage: false,
        }
    }
}

impl LineMaterialParameters {
    /// Default parameters with a [`random_color`].
    pub fn with_random_color() -> Self {
        Self {
            color: random_color(),
            ..Default::default()
        }
    }

    /// Builder pattern: Set packed RGB color
    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color & MAX_COLOR;
        self
    }

    /// Builder pattern: Set line width
    pub fn with_linewidth(mut self, linewidth: f32) -> Self {
        self.linewidth = linewidth.max(0.0);
        self
    }

    /// Builder pattern: Set opacity, marking the material transparent below 1
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self.transparent = self.opacity < 1.0;
        self
    }

    /// Builder pattern: Enable dashing with the given dash and gap lengths
    pub fn with_dashes(mut self, dash_size: f32, gap_size: f32) -> Self {
        self.dashed = true;
        self.dash_size = dash_size;
        self.gap_size = gap_size;
        self
    }

    pub fn with_dash_scale(mut self, dash_scale: f32) -> Self {
        self.dash_scale = dash_scale;
        self
    }

    pub fn with_dash_offset(mut self, dash_offset: f32) -> Self {
        self.dash_offset = dash_offset;
        self
    }

    /// Builder pattern: Set the viewport size, clamped to at least 1x1
    pub fn with_resolution(mut self, width: f32, height: f32) -> Self {
        self.resolution = clamp_resolution(width, height);
        self
    }

    pub fn with_world_units(mut self, world_units: bool) -> Self {
        self.world_units = world_units;
        self
    }

    pub fn with_vertex_colors(mut self, vertex_colors: bool) -> Self {
        self.vertex_colors = vertex_colors;
        self
    }

    pub fn with_alpha_to_coverage(mut self, alpha_to_coverage: bool) -> Self {
        self.alpha_to_coverage = alpha_to_coverage;
        self
    }
}

/// Line material definition
///
/// Every setter bumps [`LineMaterial::version`]; GPU data is refreshed by
/// [`LineMaterial::update_gpu_resources`].
pub struct LineMaterial {
    params: LineMaterialParameters,
    version: u64,

    // GPU resources - shared by all lines using this material
    material_ubo: Option<LineUBO>,
    bind_group: Option<wgpu::BindGroup>,
}

impl Default for LineMaterial {
    fn default() -> Self {
        Self::new(LineMaterialParameters::default())
    }
}

impl std::fmt::Debug for LineMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineMaterial")
            .field("params", &self.params)
            .field("version", &self.version)
            .field("gpu_ready", &self.bind_group.is_some())
            .finish()
    }
}

impl LineMaterial {
    pub fn new(params: LineMaterialParameters) -> Self {
        Self {
            params: LineMaterialParameters {
                color: params.color & MAX_COLOR,
                resolution: clamp_resolution(params.resolution.x, params.resolution.y),
                ..params
            },
            version: 0,
            material_ubo: None,
            bind_group: None,
        }
    }

    pub fn parameters(&self) -> &LineMaterialParameters {
        &self.params
    }

    pub fn color(&self) -> u32 {
        self.params.color
    }

    /// Sets the packed RGB color; bits above 24 are dropped.
    pub fn set_color(&mut self, color: u32) {
        self.params.color = color & MAX_COLOR;
        self.touch();
    }

    pub fn color_rgb(&self) -> [f32; 3] {
        hex_to_rgb(self.params.color)
    }

    pub fn linewidth(&self) -> f32 {
        self.params.linewidth
    }

    pub fn set_linewidth(&mut self, linewidth: f32) {
        self.params.linewidth = linewidth.max(0.0);
        self.touch();
    }

    pub fn opacity(&self) -> f32 {
        self.params.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.params.opacity = opacity.clamp(0.0, 1.0);
        self.touch();
    }

    pub fn transparent(&self) -> bool {
        self.params.transparent
    }

    pub fn set_transparent(&mut self, transparent: bool) {
        self.params.transparent = transparent;
        self.touch();
    }

    pub fn vertex_colors(&self) -> bool {
        self.params.vertex_colors
    }

    pub fn set_vertex_colors(&mut self, vertex_colors: bool) {
        self.params.vertex_colors = vertex_colors;
        self.touch();
    }

    pub fn dashed(&self) -> bool {
        self.params.dashed
    }

    pub fn set_dashed(&mut self, dashed: bool) {
        self.params.dashed = dashed;
        self.touch();
    }

    pub fn set_dash_pattern(&mut self, dash_size: f32, gap_size: f32) {
        self.params.dash_size = dash_size;
        self.params.gap_size = gap_size;
        self.touch();
    }

    pub fn set_dash_scale(&mut self, dash_scale: f32) {
        self.params.dash_scale = dash_scale;
        self.touch();
    }

    pub fn set_dash_offset(&mut self, dash_offset: f32) {
        self.params.dash_offset = dash_offset;
        self.touch();
    }

    pub fn resolution(&self) -> Vector2<f32> {
        self.params.resolution
    }

    /// Must follow the render target size, otherwise pixel widths are off.
    pub fn set_resolution(&mut self, width: f32, height: f32) {
        self.params.resolution = clamp_resolution(width, height);
        self.touch();
    }

    pub fn world_units(&self) -> bool {
        self.params.world_units
    }

    pub fn set_world_units(&mut self, world_units: bool) {
        self.params.world_units = world_units;
        self.touch();
    }

    pub fn alpha_to_coverage(&self) -> bool {
        self.params.alpha_to_coverage
    }

    pub fn set_alpha_to_coverage(&mut self, alpha_to_coverage: bool) {
        self.params.alpha_to_coverage = alpha_to_coverage;
        self.touch();
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn uniform(&self) -> LineUniform {
        let p = &self.params;
        let [r, g, b] = self.color_rgb();

        let mut flags = 0;
        if p.dashed {
            flags |= FLAG_DASHED;
        }
        if p.world_units {
            flags |= FLAG_WORLD_UNITS;
        }
        if p.vertex_colors {
            flags |= FLAG_VERTEX_COLORS;
        }
        if p.alpha_to_coverage {
            flags |= FLAG_ALPHA_TO_COVERAGE;
        }

        LineUniform {
            diffuse: [r, g, b, p.opacity],
            resolution: [p.resolution.x, p.resolution.y],
            linewidth: p.linewidth,
            dash_scale: p.dash_scale,
            dash_size: p.dash_size,
            gap_size: p.gap_size,
            dash_offset: p.dash_offset,
            flags,
        }
    }

    /// Updates GPU resources for this material
    ///
    /// `layout` is the renderer's material layout, so the bind group is
    /// compatible with its pipeline.
    pub fn update_gpu_resources(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        layout: &BindGroupLayoutWithDesc,
    ) {
        if self.material_ubo.is_none() {
            log::debug!("Creating line material uniform buffer");
            self.material_ubo = Some(LineUBO::new(device));
        }

        let uniform = self.uniform();
        if let Some(ubo) = &mut self.material_ubo {
            ubo.update_content(queue, uniform);

            if self.bind_group.is_none() {
                self.bind_group = Some(
                    BindGroupBuilder::new(layout)
                        .resource(ubo.binding_resource())
                        .create(device, "Line Material Bind Group"),
                );
            }
        }
    }

    /// Gets the bind group for rendering
    pub fn bind_group(&self) -> LineResult<&wgpu::BindGroup> {
        self.bind_group
            .as_ref()
            .ok_or(LineError::MissingGpuResources("line material"))
    }

    fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

/// A zero-sized viewport would collapse every pixel width to nothing.
fn clamp_resolution(width: f32, height: f32) -> Vector2<f32> {
    if !(width >= 1.0 && height >= 1.0) {
        log::warn!("Line resolution {}x{} clamped to at least 1x1", width, height);
    }
    Vector2::new(width.max(1.0), height.max(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_material_is_white_one_pixel() {
        let material = LineMaterial::default();
        assert_eq!(material.color(), 0xFFFFFF);
        assert_eq!(material.linewidth(), 1.0);
        assert!(!material.dashed());
        assert_eq!(material.resolution(), Vector2::new(1.0, 1.0));
    }

    #[test]
    fn test_hex_unpacking() {
        assert_eq!(hex_to_rgb(0xFF0000), [1.0, 0.0, 0.0]);
        assert_eq!(hex_to_rgb(0x00FF00), [0.0, 1.0, 0.0]);
        assert_eq!(hex_to_rgb(0x0000FF), [0.0, 0.0, 1.0]);
        assert_eq!(hex_to_rgb(0xAB000000), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_random_colors_stay_in_24_bits() {
        for _ in 0..1000 {
            assert!(random_color() <= MAX_COLOR);
            assert!(LineMaterialParameters::with_random_color().color <= MAX_COLOR);
        }
    }

    #[test]
    fn test_color_setter_masks_high_bits() {
        let mut material = LineMaterial::new(LineMaterialParameters::default());
        material.set_color(0x7F12_3456);
        assert_eq!(material.color(), 0x123456);

        let material = LineMaterial::new(LineMaterialParameters {
            color: 0xFF00_0001,
            ..Default::default()
        });
        assert_eq!(material.color(), 0x000001);
    }

    #[test]
    fn test_uniform_packs_parameters() {
        let params = LineMaterialParameters::default()
            .with_color(0x00FF00)
            .with_linewidth(5.0)
            .with_dashes(3.0, 1.0)
            .with_dash_offset(0.5)
            .with_resolution(800.0, 600.0)
            .with_vertex_colors(true)
            .with_opacity(0.5);
        let uniform = LineMaterial::new(params).uniform();

        assert_eq!(uniform.diffuse, [0.0, 1.0, 0.0, 0.5]);
        assert_eq!(uniform.resolution, [800.0, 600.0]);
        assert_eq!(uniform.linewidth, 5.0);
        assert_eq!(uniform.dash_size, 3.0);
        assert_eq!(uniform.gap_size, 1.0);
        assert_eq!(uniform.dash_offset, 0.5);
        assert_eq!(uniform.flags, FLAG_DASHED | FLAG_VERTEX_COLORS);
        assert!(params.transparent);
    }

    #[test]
    fn test_resolution_is_at_least_one_pixel() {
        let params = LineMaterialParameters::default().with_resolution(0.0, 0.0);
        assert_eq!(params.resolution, Vector2::new(1.0, 1.0));

        let material = LineMaterial::new(LineMaterialParameters {
            resolution: Vector2::new(640.0, -3.0),
            ..Default::default()
        });
        assert_eq!(material.resolution(), Vector2::new(640.0, 1.0));

        let mut material = LineMaterial::default();
        material.set_resolution(0.5, 720.0);
        assert_eq!(material.resolution(), Vector2::new(1.0, 720.0));
    }

    #[test]
    fn test_uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<LineUniform>(), 48);
        assert_eq!(std::mem::size_of::<LineUniform>() % 16, 0);
    }

    #[test]
    fn test_setters_bump_version() {
        let mut material = LineMaterial::default();
        let before = material.version();
        material.set_linewidth(3.0);
        material.set_resolution(1024.0, 768.0);
        material.set_dashed(true);
        assert_eq!(material.version(), before + 3);
        assert_eq!(material.uniform().flags & FLAG_DASHED, FLAG_DASHED);
    }

    #[test]
    fn test_bind_group_requires_gpu_upload() {
        let material = LineMaterial::default();
        assert_eq!(
            material.bind_group().unwrap_err(),
            LineError::MissingGpuResources("line material")
        );
    }
}
