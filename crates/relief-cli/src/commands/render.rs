//! Headless terrain-to-PNG render command

use anyhow::{Context, Result};
use relief_core::Spherical;
use relief_render::{
    render_frame, Drawable, FrameTargets, HeadlessContext, Marker, MarkerPlacement, SceneBlock,
    SceneState, Terrain, TerrainPaths,
};
use std::path::PathBuf;

pub struct RenderArgs {
    pub paths: TerrainPaths,
    pub output: PathBuf,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub view: Option<[f32; 3]>,
    pub light: Option<[f32; 3]>,
    pub fog: bool,
    pub config: Option<PathBuf>,
}

pub fn run(args: RenderArgs) -> Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let width = args.width.unwrap_or(config.window.width).max(1);
    let height = args.height.unwrap_or(config.window.height).max(1);

    let mut camera = config.camera.camera_state();
    if let Some(view) = args.view {
        camera.view = Spherical::from_array(view);
    }
    if let Some(light) = args.light {
        camera.light = Spherical::from_array(light);
    }

    let ctx = pollster::block_on(HeadlessContext::new(width, height))
        .context("Failed to create headless render context")?;

    let mut placement = MarkerPlacement::default();
    let scene = SceneState::new(
        camera,
        width,
        height,
        args.fog || config.camera.fog,
        &mut placement,
    );
    let block = SceneBlock::new(&ctx.device);

    let mut terrain = Terrain::load(
        &ctx.device,
        &ctx.queue,
        &args.paths,
        &config.terrain,
        &block,
        ctx.target(),
    )
    .context("Failed to load terrain")?;
    let mut marker = Marker::new(
        &ctx.device,
        &block,
        placement,
        config.terrain.shader_dir.as_deref(),
        ctx.target(),
    )
    .context("Failed to build light marker")?;

    let targets = FrameTargets {
        color: &ctx.color_view,
        depth: &ctx.depth_view,
    };
    let report = render_frame(
        &ctx.device,
        &ctx.queue,
        &targets,
        &scene,
        &block,
        &mut [&mut terrain as &mut dyn Drawable, &mut marker],
    )
    .context("Failed to render frame")?;
    log::debug!("Frame issued {} draws", report.draws);

    let img = pollster::block_on(ctx.read_image()).context("Failed to read rendered pixels")?;
    img.save_with_format(&args.output, image::ImageFormat::Png)
        .with_context(|| format!("Failed to save image to {}", args.output.display()))?;

    println!(
        "Rendered {}x{} image to {}",
        width,
        height,
        args.output.display()
    );

    Ok(())
}
