//! Terrain drawable: mesh streams, surface textures and the terrain program

use std::path::{Path, PathBuf};

use glam::Vec3;
use relief_core::{Result, TerrainSettings};
use relief_terrain::{grid_size_for, Heightmap, TerrainMesh};

use crate::bindings::{
    AttributeStream, TextureSlot, BLOCK_BINDING, MODEL_UNIFORMS, SCENE_BLOCK, SCENE_UNIFORMS,
    SURFACE_TEXTURES,
};
use crate::context::RenderError;
use crate::pass::FramePass;
use crate::renderer::Drawable;
use crate::resource::{GpuBindGroup, GpuBuffer, VertexStreams};
use crate::scene::SceneBlock;
use crate::shader::{
    BindingRule, PipelineTarget, ProgramDesc, ShaderPart, ShaderProgram, ShaderSource, ShaderStage,
};
use crate::texture::{load_rgba, SurfaceImages, SurfacePaths, SurfaceTextures};

pub const TERRAIN_SHADER: &str = include_str!("terrain.wgsl");

/// Input files for one terrain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainPaths {
    pub height: PathBuf,
    pub surface: SurfacePaths,
}

impl TerrainPaths {
    /// `height.png`, `albedo.png`, `normal.png` and `gloss.png` inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            height: dir.join("height.png"),
            surface: SurfacePaths {
                color: dir.join("albedo.png"),
                normal: dir.join("normal.png"),
                gloss: dir.join("gloss.png"),
            },
        }
    }
}

pub fn program_desc(shader_dir: Option<&Path>, target: PipelineTarget) -> ProgramDesc {
    let source = ShaderSource::resolve(shader_dir, "terrain.wgsl", TERRAIN_SHADER);

    let mut rules = vec![BindingRule::new(SCENE_BLOCK, SCENE_UNIFORMS, BLOCK_BINDING)];
    for slot in TextureSlot::ALL {
        rules.push(BindingRule::new(slot.texture_name(), SURFACE_TEXTURES, slot.texture_binding()));
        rules.push(BindingRule::new(slot.sampler_name(), SURFACE_TEXTURES, slot.sampler_binding()));
    }

    ProgramDesc {
        label: "terrain".into(),
        parts: vec![
            ShaderPart::new(ShaderStage::Vertex, source.clone(), "vs_main"),
            ShaderPart::new(ShaderStage::Fragment, source, "fs_main"),
        ],
        rules,
        streams: AttributeStream::ALL.to_vec(),
        target,
    }
}

/// Build the mesh for the heightmap at `path` using the configured scale
pub fn load_mesh(path: &Path, settings: &TerrainSettings) -> Result<TerrainMesh> {
    let heightmap = Heightmap::load(path)?;
    let grid_size = grid_size_for(&heightmap, settings.max_elevation);
    TerrainMesh::build(&heightmap, grid_size, Vec3::from_array(settings.map_size))
}

pub struct Terrain {
    program: ShaderProgram,
    streams: VertexStreams,
    index_buffer: GpuBuffer,
    textures: SurfaceTextures,
    texture_layout: wgpu::BindGroupLayout,
    // terrain has no model block; group 1 holds an empty placeholder
    placeholder_layout: wgpu::BindGroupLayout,
    placeholder_group: GpuBindGroup,
    surface_paths: Option<SurfacePaths>,
    vertex_count: usize,
    triangle_count: usize,
}

impl Terrain {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        mesh: &TerrainMesh,
        images: &SurfaceImages,
        scene: &SceneBlock,
        shader_dir: Option<&Path>,
        target: PipelineTarget,
    ) -> Result<Self> {
        let placeholder_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Terrain Placeholder Layout"),
            entries: &[],
        });
        let placeholder_group = GpuBindGroup::new(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Terrain Placeholder Bind Group"),
            layout: &placeholder_layout,
            entries: &[],
        }));
        let texture_layout = SurfaceTextures::layout(device);

        let program = ShaderProgram::build(
            device,
            program_desc(shader_dir, target),
            &[scene.layout(), &placeholder_layout, &texture_layout],
        )?;

        let mut streams = VertexStreams::new();
        streams.insert(device, AttributeStream::Position, &mesh.positions);
        streams.insert(device, AttributeStream::Tangent, &mesh.tangents);
        streams.insert(device, AttributeStream::Bitangent, &mesh.bitangents);
        streams.insert(device, AttributeStream::Normal, &mesh.normals);
        streams.insert(device, AttributeStream::Uv, &mesh.uvs);

        let index_buffer = GpuBuffer::with_data(
            device,
            "Terrain Index Buffer",
            mesh.triangles.as_flattened(),
            wgpu::BufferUsages::INDEX,
        );

        let textures = SurfaceTextures::new(device, queue, &texture_layout, images);

        log::info!(
            "Terrain ready: {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.triangle_count()
        );

        Ok(Self {
            program,
            streams,
            index_buffer,
            textures,
            texture_layout,
            placeholder_layout,
            placeholder_group,
            surface_paths: None,
            vertex_count: mesh.vertex_count(),
            triangle_count: mesh.triangle_count(),
        })
    }

    /// Load heightmap and textures from disk; nothing is created unless all of them load
    pub fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        paths: &TerrainPaths,
        settings: &TerrainSettings,
        scene: &SceneBlock,
        target: PipelineTarget,
    ) -> Result<Self> {
        let mesh = load_mesh(&paths.height, settings)?;
        let images = SurfaceImages::load(&paths.surface)?;
        let mut terrain = Self::new(
            device,
            queue,
            &mesh,
            &images,
            scene,
            settings.shader_dir.as_deref(),
            target,
        )?;
        terrain.surface_paths = Some(paths.surface.clone());
        Ok(terrain)
    }

    /// Replace one texture from a file; on failure the current texture stays bound
    pub fn update_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        slot: TextureSlot,
        path: &Path,
    ) -> Result<()> {
        let image = load_rgba(path)?;
        self.textures
            .replace(device, queue, &self.texture_layout, slot, &image);
        if let Some(paths) = self.surface_paths.as_mut() {
            match slot {
                TextureSlot::Color => paths.color = path.to_path_buf(),
                TextureSlot::Normal => paths.normal = path.to_path_buf(),
                TextureSlot::Gloss => paths.gloss = path.to_path_buf(),
            }
        }
        Ok(())
    }

    /// Re-read all three textures from their files; all or nothing
    pub fn reload_textures(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<()> {
        let Some(paths) = &self.surface_paths else {
            return Ok(());
        };
        let images = SurfaceImages::load(paths)?;
        self.textures = SurfaceTextures::new(device, queue, &self.texture_layout, &images);
        log::info!("Reloaded terrain textures");
        Ok(())
    }

    pub fn texture_files(&self) -> Vec<PathBuf> {
        self.surface_paths
            .as_ref()
            .map(|p| TextureSlot::ALL.map(|slot| p.get(slot).to_path_buf()).to_vec())
            .unwrap_or_default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }
}

impl Drawable for Terrain {
    fn name(&self) -> &str {
        "terrain"
    }

    fn reload_shaders(&mut self, device: &wgpu::Device, scene: &SceneBlock) -> Result<()> {
        self.program.reload(
            device,
            &[scene.layout(), &self.placeholder_layout, &self.texture_layout],
        )
    }

    fn shader_files(&self) -> Vec<PathBuf> {
        self.program.source_files()
    }

    fn draw(&self, frame: &mut FramePass<'_>) -> std::result::Result<(), RenderError> {
        let mut scope = frame.object();
        scope.use_program(&self.program);
        scope.bind_group(MODEL_UNIFORMS, &self.placeholder_group)?;
        scope.bind_group(SURFACE_TEXTURES, self.textures.group())?;
        scope.bind_vertex_streams(&self.program, &self.streams)?;
        scope.bind_index_buffer(&self.index_buffer);
        scope.draw_indexed(0..self.index_buffer.len)
    }
}
