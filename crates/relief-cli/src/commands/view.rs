//! Interactive terrain viewer with hot-reload

use super::watch::{self, ReloadRequest, WatchSet};
use anyhow::{Context, Result};
use notify::RecommendedWatcher;
use notify_debouncer_mini::Debouncer;
use relief_core::ReliefConfig;
use relief_render::{
    reload_shaders, render_frame, Drawable, FrameTargets, Marker, MarkerPlacement, RenderContext,
    RenderError, SceneBlock, SceneState, Terrain, TerrainPaths,
};
use relief_runtime::{CameraChange, DragButton, FrameClock, InputAction, OrbitInput};
use std::path::PathBuf;
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

pub struct ViewArgs {
    pub paths: TerrainPaths,
    pub config: Option<PathBuf>,
    pub watch: bool,
}

pub fn run(args: ViewArgs) -> Result<()> {
    let config = super::load_config(args.config.as_deref())?;

    let event_loop = EventLoop::<ReloadRequest>::with_user_event().build()?;
    // redraws are requested only when something changed
    event_loop.set_control_flow(ControlFlow::Wait);
    let proxy = args.watch.then(|| event_loop.create_proxy());

    let mut app = ViewerApp::new(config, args.paths, proxy);
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Everything that exists once the window is up
struct Viewer {
    window: Arc<Window>,
    ctx: RenderContext,
    scene: SceneState,
    block: SceneBlock,
    terrain: Terrain,
    marker: Marker,
    input: OrbitInput,
    clock: FrameClock,
}

impl Viewer {
    fn new(event_loop: &ActiveEventLoop, config: &ReliefConfig, paths: &TerrainPaths) -> Result<Self> {
        let window_attrs = Window::default_attributes()
            .with_title(config.window.title.clone())
            .with_inner_size(PhysicalSize::new(config.window.width, config.window.height));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("Failed to create window")?,
        );

        let ctx = pollster::block_on(RenderContext::new(window.clone()))
            .context("Failed to create render context")?;

        let mut placement = MarkerPlacement::default();
        let scene = SceneState::new(
            config.camera.camera_state(),
            ctx.config.width,
            ctx.config.height,
            config.camera.fog,
            &mut placement,
        );
        let block = SceneBlock::new(&ctx.device);

        let terrain = Terrain::load(
            &ctx.device,
            &ctx.queue,
            paths,
            &config.terrain,
            &block,
            ctx.target(),
        )
        .context("Failed to load terrain")?;
        let marker = Marker::new(
            &ctx.device,
            &block,
            placement,
            config.terrain.shader_dir.as_deref(),
            ctx.target(),
        )
        .context("Failed to build light marker")?;

        Ok(Self {
            window,
            ctx,
            scene,
            block,
            terrain,
            marker,
            input: OrbitInput::new(config.input.clone()),
            clock: FrameClock::new(),
        })
    }

    fn watch_set(&self) -> WatchSet {
        let mut shaders = self.terrain.shader_files();
        shaders.extend(self.marker.shader_files());
        WatchSet::new(shaders, self.terrain.texture_files())
    }

    fn apply(&mut self, change: CameraChange) {
        if change.view {
            self.scene.update_view();
        }
        if change.light {
            self.scene.update_light(&mut self.marker);
        }
    }

    fn reload_shaders(&mut self) {
        let failures = reload_shaders(
            &self.ctx.device,
            &self.block,
            &mut [&mut self.terrain as &mut dyn Drawable, &mut self.marker],
        );
        if failures.is_empty() {
            log::info!("Shaders reloaded");
        } else {
            log::warn!("{} shader program(s) kept their previous build", failures.len());
        }
        self.window.request_redraw();
    }

    fn reload_textures(&mut self) {
        if let Err(e) = self.terrain.reload_textures(&self.ctx.device, &self.ctx.queue) {
            log::error!("Texture reload failed, keeping previous textures: {}", e);
        }
        self.window.request_redraw();
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.ctx.resize(size);
        self.scene.resize(size.width, size.height);
        self.window.request_redraw();
    }

    fn render(&mut self) -> Result<(), RenderError> {
        if self.input.is_animating() {
            let dt = self.clock.tick() as f32;
            let change = self.input.key_update(&mut self.scene.camera, dt);
            self.apply(change);
        }

        let frame = match self.ctx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.ctx.reconfigure();
                self.window.request_redraw();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timed out; skipping frame");
                return Ok(());
            }
            Err(e) => return Err(RenderError::SurfaceError(e.to_string())),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let targets = FrameTargets {
            color: &view,
            depth: &self.ctx.depth_view,
        };
        render_frame(
            &self.ctx.device,
            &self.ctx.queue,
            &targets,
            &self.scene,
            &self.block,
            &mut [&mut self.terrain as &mut dyn Drawable, &mut self.marker],
        )?;

        self.window.pre_present_notify();
        frame.present();
        Ok(())
    }
}

struct ViewerApp {
    config: ReliefConfig,
    paths: TerrainPaths,
    proxy: Option<EventLoopProxy<ReloadRequest>>,
    viewer: Option<Viewer>,
    _watcher: Option<Debouncer<RecommendedWatcher>>,
    failure: Option<anyhow::Error>,
}

impl ViewerApp {
    fn new(config: ReliefConfig, paths: TerrainPaths, proxy: Option<EventLoopProxy<ReloadRequest>>) -> Self {
        Self {
            config,
            paths,
            proxy,
            viewer: None,
            _watcher: None,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.failure = Some(error);
        event_loop.exit();
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let viewer = Viewer::new(event_loop, &self.config, &self.paths)?;
        log::info!(
            "Terrain: {} vertices, {} triangles",
            viewer.terrain.vertex_count(),
            viewer.terrain.triangle_count()
        );

        if let Some(proxy) = self.proxy.take() {
            let set = viewer.watch_set();
            if set.is_empty() {
                log::warn!("Nothing to watch");
            } else {
                self._watcher = Some(watch::spawn(set, proxy)?);
            }
            if self.config.terrain.shader_dir.is_none() {
                log::info!("Shaders are embedded; set terrain.shader_dir to hot-reload them");
            }
        }

        println!("Controls:");
        println!("  left drag     orbit camera");
        println!("  right drag    zoom");
        println!("  middle drag   move light");
        println!("  arrow keys    orbit camera");
        println!("  F             toggle fog");
        println!("  R / T         reload shaders / textures");
        println!("  Esc / Q       quit");

        self.viewer = Some(viewer);
        Ok(())
    }
}

fn drag_button(button: MouseButton) -> Option<DragButton> {
    match button {
        MouseButton::Left => Some(DragButton::Left),
        MouseButton::Right => Some(DragButton::Right),
        MouseButton::Middle => Some(DragButton::Middle),
        _ => None,
    }
}

/// Convert a wheel delta to lines; a pixel delta of 20 counts as one line
fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
    }
}

impl ApplicationHandler<ReloadRequest> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_none() && self.failure.is_none() {
            if let Err(e) = self.initialize(event_loop) {
                // no frame is drawn for a scene that failed to load
                self.fail(event_loop, e);
            }
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, request: ReloadRequest) {
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        if request.shaders {
            viewer.reload_shaders();
        }
        if request.textures {
            viewer.reload_textures();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                viewer.resize(new_size);
            }

            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                match event.state {
                    ElementState::Pressed if !event.repeat => match viewer.input.key_press(code) {
                        Some(InputAction::ToggleFog) => {
                            let on = viewer.scene.toggle_fog();
                            log::info!("Fog: {}", if on { "ON" } else { "OFF" });
                        }
                        Some(InputAction::ReloadShaders) => viewer.reload_shaders(),
                        Some(InputAction::ReloadTextures) => viewer.reload_textures(),
                        Some(InputAction::Quit) => event_loop.exit(),
                        None => {}
                    },
                    ElementState::Pressed => {}
                    ElementState::Released => {
                        viewer.input.key_release(code);
                        if !viewer.input.is_animating() {
                            viewer.clock.reset();
                        }
                    }
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = drag_button(button) {
                    match state {
                        ElementState::Pressed => viewer.input.mouse_press(button),
                        ElementState::Released => viewer.input.mouse_release(button),
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                let change = viewer
                    .input
                    .cursor_moved(&mut viewer.scene.camera, position.x, position.y);
                viewer.apply(change);
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let change = viewer.input.scroll(&mut viewer.scene.camera, scroll_lines(delta));
                viewer.apply(change);
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = viewer.render() {
                    self.fail(event_loop, anyhow::Error::new(e).context("Render failed"));
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(viewer) = self.viewer.as_mut() {
            if viewer.input.take_redraw() || viewer.input.is_animating() {
                viewer.window.request_redraw();
            }
        }
    }
}
