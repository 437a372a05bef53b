//! Line rendering pipeline
//!
//! One pipeline draws every line node: a shared 8 vertex quad is instanced once
//! per segment and widened in the vertex shader. Bind groups:
//!
//! | group | contents                    | owner            |
//! |-------|-----------------------------|------------------|
//! | 0     | camera view and projection  | [`LineRenderer`] |
//! | 1     | node transform              | line node        |
//! | 2     | [`LineUniform`] of material | line material    |
//!
//! [`LineUniform`]: crate::gfx::lines::LineUniform

use wgpu::util::DeviceExt;
use wgpu::{Device, Queue, RenderPass};

use super::shaders::LINE_SHADER;
use crate::error::{LineError, LineResult};
use crate::gfx::camera::{Camera, CameraUniform};
use crate::gfx::lines::{
    LineSegments2, LineUniform, SegmentGeometry, SegmentInstance, TransformUniform,
};
use crate::gfx::scene::{Scene, SceneNode};
use crate::wgpu_utils::{
    binding_types, BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc,
    UniformBuffer,
};

/// Pipeline configuration for [`LineRenderer`]
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub label: String,
    pub surface_format: wgpu::TextureFormat,
    /// `None` renders without depth testing.
    pub depth_format: Option<wgpu::TextureFormat>,
    pub sample_count: u32,
    /// Only takes effect with `sample_count > 1`.
    pub alpha_to_coverage: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            label: "Line Pipeline".to_string(),
            surface_format: wgpu::TextureFormat::Bgra8UnormSrgb,
            depth_format: Some(wgpu::TextureFormat::Depth32Float),
            sample_count: 1,
            alpha_to_coverage: false,
        }
    }
}

impl RendererConfig {
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_surface_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.surface_format = format;
        self
    }

    pub fn with_depth_format(mut self, format: Option<wgpu::TextureFormat>) -> Self {
        self.depth_format = format;
        self
    }

    /// Sets the MSAA sample count (builder pattern)
    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count.max(1);
        self
    }

    pub fn with_alpha_to_coverage(mut self, enabled: bool) -> Self {
        self.alpha_to_coverage = enabled;
        self
    }

    /// Transparent lines are depth tested but leave the depth buffer untouched,
    /// so lines drawn behind them later still show through.
    fn depth_stencil(&self, transparent: bool) -> Option<wgpu::DepthStencilState> {
        self.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: !transparent,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        })
    }

    fn multisample(&self) -> wgpu::MultisampleState {
        wgpu::MultisampleState {
            count: self.sample_count,
            mask: !0,
            alpha_to_coverage_enabled: self.alpha_to_coverage && self.sample_count > 1,
        }
    }
}

/// Corner of the instanced line quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl QuadVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

// y: -1 start cap, 0 start, 1 end, 2 end cap
#[rustfmt::skip]
const QUAD_VERTICES: [QuadVertex; 8] = [
    QuadVertex { position: [-1.0,  2.0, 0.0], uv: [-1.0,  2.0] },
    QuadVertex { position: [ 1.0,  2.0, 0.0], uv: [ 1.0,  2.0] },
    QuadVertex { position: [-1.0,  1.0, 0.0], uv: [-1.0,  1.0] },
    QuadVertex { position: [ 1.0,  1.0, 0.0], uv: [ 1.0,  1.0] },
    QuadVertex { position: [-1.0,  0.0, 0.0], uv: [-1.0, -1.0] },
    QuadVertex { position: [ 1.0,  0.0, 0.0], uv: [ 1.0, -1.0] },
    QuadVertex { position: [-1.0, -1.0, 0.0], uv: [-1.0, -2.0] },
    QuadVertex { position: [ 1.0, -1.0, 0.0], uv: [ 1.0, -2.0] },
];

#[rustfmt::skip]
const QUAD_INDICES: [u16; 18] = [
    0, 2, 1,  2, 3, 1,
    2, 4, 3,  4, 5, 3,
    4, 6, 5,  6, 7, 5,
];

/// Shared quad mesh every segment instance expands from
pub struct LineQuad {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl LineQuad {
    pub fn new(device: &Device) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Line Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Line Quad Index Buffer"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: QUAD_INDICES.len() as u32,
        }
    }
}

/// Draws [`LineSegments2`] nodes (and everything built on them).
pub struct LineRenderer {
    pipeline: wgpu::RenderPipeline,
    transparent_pipeline: wgpu::RenderPipeline,
    quad: LineQuad,
    camera_ubo: UniformBuffer<CameraUniform>,
    camera_bind_group: wgpu::BindGroup,
    transform_layout: BindGroupLayoutWithDesc,
    material_layout: BindGroupLayoutWithDesc,
    config: RendererConfig,
}

impl LineRenderer {
    pub fn new(device: &Device, config: &RendererConfig) -> Self {
        let camera_layout = BindGroupLayoutBuilder::new()
            .next_binding_vertex(binding_types::uniform())
            .create(device, "Line Camera Bind Group Layout");
        let transform_layout = BindGroupLayoutBuilder::new()
            .next_binding_vertex(binding_types::uniform_sized::<TransformUniform>())
            .create(device, "Line Transform Bind Group Layout");
        let material_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform_sized::<LineUniform>())
            .create(device, "Line Material Bind Group Layout");

        let camera_ubo = UniformBuffer::new_with_data(device, &CameraUniform::default());
        let camera_bind_group = BindGroupBuilder::new(&camera_layout)
            .resource(camera_ubo.binding_resource())
            .create(device, "Line Camera Bind Group");

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Line Shader"),
            source: wgpu::ShaderSource::Wgsl(LINE_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Layout", config.label)),
            bind_group_layouts: &[
                &camera_layout.layout,
                &transform_layout.layout,
                &material_layout.layout,
            ],
            push_constant_ranges: &[],
        });

        let pipeline = create_line_pipeline(device, &pipeline_layout, &shader, config, false);
        let transparent_pipeline =
            create_line_pipeline(device, &pipeline_layout, &shader, config, true);

        log::debug!(
            "Created line pipeline '{}' ({:?}, depth {:?}, {}x MSAA)",
            config.label,
            config.surface_format,
            config.depth_format,
            config.sample_count
        );

        Self {
            pipeline,
            transparent_pipeline,
            quad: LineQuad::new(device),
            camera_ubo,
            camera_bind_group,
            transform_layout,
            material_layout,
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn transform_layout(&self) -> &BindGroupLayoutWithDesc {
        &self.transform_layout
    }

    pub fn material_layout(&self) -> &BindGroupLayoutWithDesc {
        &self.material_layout
    }

    /// Uploads the camera matrices used by every line drawn afterwards.
    pub fn update_camera<C: Camera>(&mut self, queue: &Queue, camera: &C) {
        self.camera_ubo
            .update_content(queue, CameraUniform::from_camera(camera));
    }

    /// Brings the node's geometry, material and transform up to date on the GPU.
    pub fn prepare<G: SegmentGeometry>(
        &self,
        device: &Device,
        queue: &Queue,
        lines: &mut LineSegments2<G>,
    ) {
        lines.geometry().borrow_mut().update_gpu_resources(device);
        lines
            .material()
            .borrow_mut()
            .update_gpu_resources(device, queue, &self.material_layout);
        lines.update_gpu_resources(device, queue, &self.transform_layout);
    }

    pub fn prepare_scene(&self, device: &Device, queue: &Queue, scene: &mut Scene) {
        for node in scene.nodes_mut() {
            match node {
                SceneNode::Line2(line) => self.prepare(device, queue, &mut **line),
                SceneNode::LineSegments2(lines) => self.prepare(device, queue, lines),
            }
        }
    }
}

fn create_line_pipeline(
    device: &Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    config: &RendererConfig,
    transparent: bool,
) -> wgpu::RenderPipeline {
    let label = if transparent {
        format!("{} (transparent)", config.label)
    } else {
        config.label.clone()
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[QuadVertex::desc(), SegmentInstance::desc()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: config.surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // the quad flips winding whenever the segment points left
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: config.depth_stencil(transparent),
        multisample: config.multisample(),
        multiview: None,
        cache: None,
    })
}

pub trait DrawLines {
    /// Draws one line node; nodes without segments or hidden nodes are skipped.
    fn draw_lines<G: SegmentGeometry>(
        &mut self,
        renderer: &LineRenderer,
        lines: &LineSegments2<G>,
    ) -> LineResult<()>;

    /// Draws every node, opaque materials before transparent ones.
    fn draw_scene(&mut self, renderer: &LineRenderer, scene: &Scene) -> LineResult<()>;
}

impl DrawLines for RenderPass<'_> {
    fn draw_lines<G: SegmentGeometry>(
        &mut self,
        renderer: &LineRenderer,
        lines: &LineSegments2<G>,
    ) -> LineResult<()> {
        if !lines.visible {
            return Ok(());
        }

        let geometry = lines.geometry().borrow();
        let segments = geometry.segments();
        let gpu = match segments.gpu_resources() {
            Some(gpu) if segments.is_gpu_current() => gpu,
            _ if segments.is_empty() => return Ok(()),
            _ => return Err(LineError::MissingGpuResources("line geometry")),
        };
        let transform_bind_group = lines
            .transform_bind_group()
            .ok_or(LineError::MissingGpuResources("line transform"))?;
        let material = lines.material().borrow();
        let pipeline = if material.transparent() {
            &renderer.transparent_pipeline
        } else {
            &renderer.pipeline
        };

        self.set_pipeline(pipeline);
        self.set_bind_group(0, &renderer.camera_bind_group, &[]);
        self.set_bind_group(1, transform_bind_group, &[]);
        self.set_bind_group(2, material.bind_group()?, &[]);

        self.set_vertex_buffer(0, renderer.quad.vertex_buffer.slice(..));
        self.set_vertex_buffer(1, gpu.instance_buffer.slice(..));
        self.set_index_buffer(
            renderer.quad.index_buffer.slice(..),
            wgpu::IndexFormat::Uint16,
        );
        self.draw_indexed(0..renderer.quad.index_count, 0, 0..gpu.instance_count);
        Ok(())
    }

    fn draw_scene(&mut self, renderer: &LineRenderer, scene: &Scene) -> LineResult<()> {
        for node in scene.draw_order().filter_map(|index| scene.get(index)) {
            match node {
                SceneNode::Line2(line) => self.draw_lines(renderer, &**line)?,
                SceneNode::LineSegments2(lines) => self.draw_lines(renderer, lines)?,
            }
        }
        Ok(())
    }
}
