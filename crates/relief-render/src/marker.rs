//! Light marker: a small bipyramid drawn at the light position

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use relief_core::Result;

use crate::bindings::{AttributeStream, BLOCK_BINDING, MODEL_BLOCK, MODEL_UNIFORMS, SCENE_BLOCK, SCENE_UNIFORMS};
use crate::context::RenderError;
use crate::pass::FramePass;
use crate::renderer::Drawable;
use crate::resource::{uniform_block_group, uniform_block_layout, GpuBindGroup, GpuBuffer, VertexStreams};
use crate::scene::{LightTarget, SceneBlock};
use crate::shader::{BindingRule, PipelineTarget, ProgramDesc, ShaderPart, ShaderProgram, ShaderSource, ShaderStage};

pub const MARKER_SHADER: &str = include_str!("marker.wgsl");
pub const MARKER_RADIUS: f32 = 10.0;

/// Six vertices on the coordinate axes
pub const MARKER_VERTICES: [[f32; 3]; 6] = [
    [MARKER_RADIUS, 0.0, 0.0],
    [-MARKER_RADIUS, 0.0, 0.0],
    [0.0, MARKER_RADIUS, 0.0],
    [0.0, -MARKER_RADIUS, 0.0],
    [0.0, 0.0, MARKER_RADIUS],
    [0.0, 0.0, -MARKER_RADIUS],
];

/// Eight faces, counter-clockwise seen from outside
pub const MARKER_TRIANGLES: [[u32; 3]; 8] = [
    [0, 2, 4],
    [2, 1, 4],
    [1, 3, 4],
    [3, 0, 4],
    [2, 0, 5],
    [1, 2, 5],
    [3, 1, 5],
    [0, 3, 5],
];

/// Layout of the WGSL `ModelData` struct
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ModelUniforms {
    pub model: [[f32; 4]; 4],
    pub model_inverse: [[f32; 4]; 4],
}

impl ModelUniforms {
    pub fn translation(center: Vec3) -> Self {
        let model = Mat4::from_translation(center);
        Self {
            model: model.to_cols_array_2d(),
            model_inverse: model.inverse().to_cols_array_2d(),
        }
    }
}

/// CPU side of the marker: where it is and whether the GPU copy is stale
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerPlacement {
    pub center: Vec3,
    pub uniforms: ModelUniforms,
    pub dirty: bool,
}

impl Default for MarkerPlacement {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            uniforms: ModelUniforms::translation(Vec3::ZERO),
            dirty: true,
        }
    }
}

impl LightTarget for MarkerPlacement {
    fn update_position(&mut self, center: Vec3) {
        self.center = center;
        self.uniforms = ModelUniforms::translation(center);
        self.dirty = true;
    }
}

pub fn program_desc(shader_dir: Option<&std::path::Path>, target: PipelineTarget) -> ProgramDesc {
    let source = ShaderSource::resolve(shader_dir, "marker.wgsl", MARKER_SHADER);
    ProgramDesc {
        label: "marker".into(),
        parts: vec![
            ShaderPart::new(ShaderStage::Vertex, source.clone(), "vs_main"),
            ShaderPart::new(ShaderStage::Fragment, source, "fs_main"),
        ],
        rules: vec![
            BindingRule::new(SCENE_BLOCK, SCENE_UNIFORMS, BLOCK_BINDING),
            BindingRule::new(MODEL_BLOCK, MODEL_UNIFORMS, BLOCK_BINDING),
        ],
        streams: vec![AttributeStream::Position],
        target,
    }
}

pub struct Marker {
    pub placement: MarkerPlacement,
    program: ShaderProgram,
    streams: VertexStreams,
    index_buffer: GpuBuffer,
    model_buffer: GpuBuffer,
    model_layout: wgpu::BindGroupLayout,
    model_group: GpuBindGroup,
}

impl Marker {
    pub fn new(
        device: &wgpu::Device,
        scene: &SceneBlock,
        placement: MarkerPlacement,
        shader_dir: Option<&std::path::Path>,
        target: PipelineTarget,
    ) -> Result<Self> {
        let model_layout = uniform_block_layout(device, "Model Bind Group Layout");
        let program = ShaderProgram::build(
            device,
            program_desc(shader_dir, target),
            &[scene.layout(), &model_layout],
        )?;

        let mut streams = VertexStreams::new();
        streams.insert(device, AttributeStream::Position, &MARKER_VERTICES);
        let index_buffer = GpuBuffer::with_data(
            device,
            "Marker Index Buffer",
            MARKER_TRIANGLES.as_flattened(),
            wgpu::BufferUsages::INDEX,
        );

        let model_buffer = GpuBuffer::uniform(device, "Marker Model Buffer", &placement.uniforms);
        let model_group = uniform_block_group(device, "Marker Model Bind Group", &model_layout, &model_buffer);

        Ok(Self {
            placement,
            program,
            streams,
            index_buffer,
            model_buffer,
            model_layout,
            model_group,
        })
    }

    pub fn center(&self) -> Vec3 {
        self.placement.center
    }
}

impl LightTarget for Marker {
    fn update_position(&mut self, center: Vec3) {
        self.placement.update_position(center);
    }
}

impl Drawable for Marker {
    fn name(&self) -> &str {
        "marker"
    }

    fn reload_shaders(&mut self, device: &wgpu::Device, scene: &SceneBlock) -> Result<()> {
        self.program.reload(device, &[scene.layout(), &self.model_layout])
    }

    fn shader_files(&self) -> Vec<std::path::PathBuf> {
        self.program.source_files()
    }

    fn upload(&mut self, queue: &wgpu::Queue) {
        if self.placement.dirty {
            self.model_buffer.write(queue, &self.placement.uniforms);
            self.placement.dirty = false;
        }
    }

    fn draw(&self, frame: &mut FramePass<'_>) -> std::result::Result<(), RenderError> {
        let mut scope = frame.object();
        scope.use_program(&self.program);
        scope.bind_group(MODEL_UNIFORMS, &self.model_group)?;
        scope.bind_vertex_streams(&self.program, &self.streams)?;
        scope.bind_index_buffer(&self.index_buffer);
        scope.draw_indexed(0..self.index_buffer.len)
    }
}
