//! Frame sequencing: scene upload, object uploads, one pass of draws

use std::path::PathBuf;

use relief_core::{ReliefError, Result};

use crate::context::RenderError;
use crate::pass::{BindingState, FramePass};
use crate::scene::{SceneBlock, SceneState};

/// Matches the fog color so the horizon blends when fog is on
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.6,
    g: 0.65,
    b: 0.7,
    a: 1.0,
};

/// An object that owns its GPU resources and draws itself
pub trait Drawable {
    fn name(&self) -> &str;

    /// Rebuild shader programs from source; the old program stays on failure
    fn reload_shaders(&mut self, device: &wgpu::Device, scene: &SceneBlock) -> Result<()>;

    /// Shader files on disk worth watching
    fn shader_files(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Write per-object uniforms; runs before the pass begins
    fn upload(&mut self, _queue: &wgpu::Queue) {}

    fn draw(&self, frame: &mut FramePass<'_>) -> std::result::Result<(), RenderError>;
}

pub struct FrameTargets<'a> {
    pub color: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
}

#[derive(Debug, Clone)]
pub struct FrameReport {
    pub draws: usize,
    /// Bindings left on the pass after the last object's scope closed
    pub final_state: BindingState,
}

/// Render one frame.
///
/// The scene block is written before anything else and bound once for the
/// whole pass. Each drawable uploads its own uniforms before the pass, so
/// every draw reads data written this frame.
pub fn render_frame(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    targets: &FrameTargets<'_>,
    scene: &SceneState,
    block: &SceneBlock,
    drawables: &mut [&mut dyn Drawable],
) -> std::result::Result<FrameReport, RenderError> {
    scene.upload_frame(block, queue);
    for drawable in drawables.iter_mut() {
        drawable.upload(queue);
    }

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Frame Encoder"),
    });

    let report = {
        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: targets.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: targets.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let mut frame = FramePass::new(pass);
        block.bind(&mut frame);

        for drawable in drawables.iter() {
            drawable.draw(&mut frame)?;
        }

        let draws = frame.draw_count();
        FrameReport {
            draws,
            final_state: frame.finish(),
        }
    };

    queue.submit(std::iter::once(encoder.finish()));
    Ok(report)
}

/// Reload shaders for every drawable, collecting failures by drawable name
pub fn reload_shaders(
    device: &wgpu::Device,
    block: &SceneBlock,
    drawables: &mut [&mut dyn Drawable],
) -> Vec<(String, ReliefError)> {
    let mut failures = Vec::new();
    for drawable in drawables.iter_mut() {
        if let Err(e) = drawable.reload_shaders(device, block) {
            log::error!("Shader reload failed for {}: {}", drawable.name(), e);
            failures.push((drawable.name().to_string(), e));
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::{TextureSlot, MODEL_UNIFORMS, SCENE_UNIFORMS};
    use crate::headless::HeadlessContext;
    use crate::marker::{self, Marker, MarkerPlacement};
    use crate::resource::uniform_block_layout;
    use crate::shader::ShaderProgram;
    use crate::terrain::Terrain;
    use crate::texture::SurfaceImages;
    use glam::Vec3;
    use relief_core::{CameraState, Spherical};
    use relief_terrain::{grid_size_for, Heightmap, TerrainMesh};

    const SIZE: u32 = 64;

    fn headless() -> Option<HeadlessContext> {
        match pollster::block_on(HeadlessContext::new(SIZE, SIZE)) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                eprintln!("Skipping GPU test: {e}");
                None
            }
        }
    }

    struct Scene {
        state: SceneState,
        block: SceneBlock,
        terrain: Terrain,
        marker: Marker,
    }

    fn overhead_scene(ctx: &HeadlessContext) -> Scene {
        let camera = CameraState {
            view: Spherical::new(0.0, 0.0, 500.0),
            light: Spherical::new(0.0, 1.2, 300.0),
        };
        let mut placement = MarkerPlacement::default();
        let state = SceneState::new(camera, SIZE, SIZE, false, &mut placement);
        let block = SceneBlock::new(&ctx.device);

        let hm = Heightmap::from_fn(16, 16, |x, y| 100.0 + 20.0 * ((x + y) as f32 * 0.4).sin());
        let mesh = TerrainMesh::build(&hm, grid_size_for(&hm, 255.0), Vec3::new(512.0, 512.0, 50.0))
            .unwrap();
        let terrain = Terrain::new(
            &ctx.device,
            &ctx.queue,
            &mesh,
            &SurfaceImages::flat(),
            &block,
            None,
            ctx.target(),
        )
        .unwrap();
        let marker = Marker::new(&ctx.device, &block, placement, None, ctx.target()).unwrap();

        Scene {
            state,
            block,
            terrain,
            marker,
        }
    }

    fn targets(ctx: &HeadlessContext) -> FrameTargets<'_> {
        FrameTargets {
            color: &ctx.color_view,
            depth: &ctx.depth_view,
        }
    }

    #[test]
    fn frame_draws_every_object_and_restores_bindings() {
        let Some(ctx) = headless() else { return };
        let mut scene = overhead_scene(&ctx);

        let report = render_frame(
            &ctx.device,
            &ctx.queue,
            &targets(&ctx),
            &scene.state,
            &scene.block,
            &mut [&mut scene.terrain as &mut dyn Drawable, &mut scene.marker],
        )
        .unwrap();

        assert_eq!(report.draws, 2);
        // only the scene group outlives the object scopes
        let state = report.final_state;
        assert!(state.groups[SCENE_UNIFORMS as usize].is_some());
        assert!(state.groups[MODEL_UNIFORMS as usize].is_none());
        assert!(state.program.is_none());
        assert!(state.index_buffer.is_none());
        assert!(state.vertex_slots.iter().all(Option::is_none));
    }

    #[test]
    fn terrain_covers_view_from_overhead() {
        let Some(ctx) = headless() else { return };
        let mut scene = overhead_scene(&ctx);
        let center = |img: &image::RgbaImage| *img.get_pixel(SIZE / 2, SIZE / 2);

        render_frame(&ctx.device, &ctx.queue, &targets(&ctx), &scene.state, &scene.block, &mut [])
            .unwrap();
        let empty = pollster::block_on(ctx.read_image()).unwrap();

        render_frame(
            &ctx.device,
            &ctx.queue,
            &targets(&ctx),
            &scene.state,
            &scene.block,
            &mut [&mut scene.terrain as &mut dyn Drawable],
        )
        .unwrap();
        let drawn = pollster::block_on(ctx.read_image()).unwrap();

        assert_eq!(drawn.dimensions(), (SIZE, SIZE));
        assert_ne!(center(&empty), center(&drawn));
    }

    /// Uses the marker program but binds nothing itself
    struct Freeloader {
        program: ShaderProgram,
    }

    impl Drawable for Freeloader {
        fn name(&self) -> &str {
            "freeloader"
        }

        fn reload_shaders(&mut self, _device: &wgpu::Device, _scene: &SceneBlock) -> Result<()> {
            Ok(())
        }

        fn draw(&self, frame: &mut FramePass<'_>) -> std::result::Result<(), RenderError> {
            let mut scope = frame.object();
            scope.use_program(&self.program);
            scope.draw_indexed(0..24)
        }
    }

    #[test]
    fn bindings_from_previous_object_are_not_reused() {
        let Some(ctx) = headless() else { return };
        let mut scene = overhead_scene(&ctx);

        let model_layout = uniform_block_layout(&ctx.device, "test model layout");
        let program = ShaderProgram::build(
            &ctx.device,
            marker::program_desc(None, ctx.target()),
            &[scene.block.layout(), &model_layout],
        )
        .unwrap();
        let mut freeloader = Freeloader { program };

        let err = render_frame(
            &ctx.device,
            &ctx.queue,
            &targets(&ctx),
            &scene.state,
            &scene.block,
            &mut [&mut scene.marker as &mut dyn Drawable, &mut freeloader],
        )
        .unwrap_err();

        match err {
            RenderError::UnboundResource(what) => assert_eq!(what, "bind group 1"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn missing_texture_file_keeps_previous_texture() {
        let Some(ctx) = headless() else { return };
        let mut scene = overhead_scene(&ctx);
        let draw = |scene: &mut Scene| {
            render_frame(
                &ctx.device,
                &ctx.queue,
                &targets(&ctx),
                &scene.state,
                &scene.block,
                &mut [&mut scene.terrain as &mut dyn Drawable],
            )
            .unwrap();
            pollster::block_on(ctx.read_image()).unwrap()
        };

        let before = draw(&mut scene);
        let err = scene
            .terrain
            .update_texture(
                &ctx.device,
                &ctx.queue,
                TextureSlot::Color,
                std::path::Path::new("no/such/albedo.png"),
            )
            .unwrap_err();
        assert!(matches!(err, ReliefError::ResourceLoad { .. }));

        let after = draw(&mut scene);
        assert_eq!(before, after);
    }

    #[test]
    fn failed_shader_reload_keeps_rendering() {
        let Some(ctx) = headless() else { return };
        let dir = std::env::temp_dir().join(format!("relief-reload-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("marker.wgsl");
        std::fs::write(&path, marker::MARKER_SHADER).unwrap();

        let mut scene = overhead_scene(&ctx);
        let mut marker = Marker::new(
            &ctx.device,
            &scene.block,
            MarkerPlacement::default(),
            Some(&dir),
            ctx.target(),
        )
        .unwrap();
        assert_eq!(marker.shader_files(), vec![path.clone()]);

        std::fs::write(&path, "@vertex fn vs_main(").unwrap();
        let failures = reload_shaders(&ctx.device, &scene.block, &mut [&mut marker as &mut dyn Drawable]);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].1.is_recoverable());

        let report = render_frame(
            &ctx.device,
            &ctx.queue,
            &targets(&ctx),
            &scene.state,
            &scene.block,
            &mut [&mut scene.terrain as &mut dyn Drawable, &mut marker],
        )
        .unwrap();
        assert_eq!(report.draws, 2);

        std::fs::write(&path, marker::MARKER_SHADER).unwrap();
        assert!(marker.reload_shaders(&ctx.device, &scene.block).is_ok());

        std::fs::remove_dir_all(&dir).ok();
    }
}
