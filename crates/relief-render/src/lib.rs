//! Relief Render - wgpu renderer for heightfield terrain scenes
//!
//! Every drawable owns its GPU resources (vertex streams, index buffer,
//! uniform buffers, textures, shader program) and draws itself inside a
//! scoped pass that forgets its bindings afterwards. The only state shared
//! between programs is the scene uniform block, written once per frame and
//! bound once per pass at a fixed binding point.

pub mod bindings;
mod context;
mod headless;
pub mod marker;
pub mod pass;
mod renderer;
pub mod resource;
pub mod scene;
pub mod shader;
pub mod terrain;
pub mod texture;

pub use bindings::{AttributeStream, TextureSlot};
pub use context::{RenderContext, RenderError, DEPTH_FORMAT};
pub use headless::HeadlessContext;
pub use marker::{Marker, MarkerPlacement, ModelUniforms};
pub use pass::{BindingState, DrawScope, FramePass};
pub use renderer::{reload_shaders, render_frame, Drawable, FrameReport, FrameTargets, CLEAR_COLOR};
pub use scene::{LightTarget, SceneBlock, SceneState, SceneUniforms};
pub use shader::{PipelineTarget, ProgramBindings, ShaderProgram, ShaderSource};
pub use terrain::{Terrain, TerrainPaths};
pub use texture::{SurfaceImages, SurfacePaths};

#[cfg(test)]
mod tests {
    #[test]
    fn terrain_wgsl_parses() {
        let source = include_str!("terrain.wgsl");
        naga::front::wgsl::parse_str(source).expect("terrain.wgsl failed to parse");
    }

    #[test]
    fn marker_wgsl_parses() {
        let source = include_str!("marker.wgsl");
        naga::front::wgsl::parse_str(source).expect("marker.wgsl failed to parse");
    }
}
