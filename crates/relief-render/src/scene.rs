//! Per-frame camera and light state, and the scene uniform block

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use relief_core::CameraState;

use crate::bindings::SCENE_UNIFORMS;
use crate::pass::FramePass;
use crate::resource::{uniform_block_group, uniform_block_layout, GpuBindGroup, GpuBuffer};

pub const FIELD_OF_VIEW_DEGREES: f32 = 45.0;
pub const NEAR_PLANE: f32 = 1.0;
pub const FAR_PLANE: f32 = 10000.0;

/// Layout of the WGSL `SceneData` struct
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SceneUniforms {
    pub view: [[f32; 4]; 4],
    pub view_inverse: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub projection_inverse: [[f32; 4]; 4],
    /// World-space light position
    pub light_position: [f32; 3],
    pub fog: i32,
}

impl Default for SceneUniforms {
    fn default() -> Self {
        let identity = Mat4::IDENTITY.to_cols_array_2d();
        Self {
            view: identity,
            view_inverse: identity,
            projection: identity,
            projection_inverse: identity,
            light_position: [0.0; 3],
            fog: 0,
        }
    }
}

/// Anything that follows the light around
pub trait LightTarget {
    fn update_position(&mut self, center: Vec3);
}

/// Camera/light parameters and the matrices derived from them
#[derive(Debug, Clone)]
pub struct SceneState {
    pub camera: CameraState,
    uniforms: SceneUniforms,
    width: u32,
    height: u32,
}

impl SceneState {
    pub fn new(
        camera: CameraState,
        width: u32,
        height: u32,
        fog: bool,
        light_target: &mut impl LightTarget,
    ) -> Self {
        let mut state = Self {
            camera,
            uniforms: SceneUniforms {
                fog: fog as i32,
                ..Default::default()
            },
            width: 1,
            height: 1,
        };
        // a minimised window still gets a usable projection
        state.resize(width.max(1), height.max(1));
        state.update_view();
        state.update_light(light_target);
        state
    }

    /// Recompute the projection for a new viewport; zero sizes are ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;

        let aspect = width as f32 / height as f32;
        let projection = Mat4::perspective_rh(
            FIELD_OF_VIEW_DEGREES.to_radians(),
            aspect,
            NEAR_PLANE,
            FAR_PLANE,
        );
        self.uniforms.projection = projection.to_cols_array_2d();
        self.uniforms.projection_inverse = projection.inverse().to_cols_array_2d();
    }

    /// Rebuild the view matrix from the orbit coordinates
    pub fn update_view(&mut self) {
        let orbit = self.camera.view;
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -orbit.distance))
            * Mat4::from_rotation_x(orbit.elevation)
            * Mat4::from_rotation_z(orbit.azimuth);
        self.uniforms.view = view.to_cols_array_2d();
        self.uniforms.view_inverse = view.inverse().to_cols_array_2d();
    }

    /// Place the light and move `target` to it
    pub fn update_light(&mut self, target: &mut impl LightTarget) {
        let position = self.camera.light.to_cartesian();
        self.uniforms.light_position = position.to_array();
        target.update_position(position);
    }

    pub fn fog(&self) -> bool {
        self.uniforms.fog != 0
    }

    pub fn set_fog(&mut self, on: bool) {
        self.uniforms.fog = on as i32;
    }

    pub fn toggle_fog(&mut self) -> bool {
        self.set_fog(!self.fog());
        self.fog()
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.uniforms.view)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.uniforms.projection)
    }

    pub fn light_position(&self) -> Vec3 {
        Vec3::from_array(self.uniforms.light_position)
    }

    pub fn uniforms(&self) -> &SceneUniforms {
        &self.uniforms
    }

    /// Write this frame's uniforms; must happen before any draw that reads them
    pub fn upload_frame(&self, block: &SceneBlock, queue: &wgpu::Queue) {
        block.buffer.write(queue, &self.uniforms);
    }
}

/// GPU side of the scene-wide uniform block
pub struct SceneBlock {
    buffer: GpuBuffer,
    layout: wgpu::BindGroupLayout,
    group: GpuBindGroup,
}

impl SceneBlock {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = GpuBuffer::uniform(device, "Scene Uniform Buffer", &SceneUniforms::default());
        let layout = uniform_block_layout(device, "Scene Bind Group Layout");
        let group = uniform_block_group(device, "Scene Bind Group", &layout, &buffer);
        Self {
            buffer,
            layout,
            group,
        }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Bind once for the entire pass; every program reads the same group
    pub fn bind(&self, frame: &mut FramePass<'_>) {
        frame.bind_frame_group(SCENE_UNIFORMS, &self.group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_core::Spherical;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    #[derive(Default)]
    struct Follower(Option<Vec3>);

    impl LightTarget for Follower {
        fn update_position(&mut self, center: Vec3) {
            self.0 = Some(center);
        }
    }

    fn state(camera: CameraState) -> (SceneState, Follower) {
        let mut follower = Follower::default();
        let scene = SceneState::new(camera, 1280, 720, false, &mut follower);
        (scene, follower)
    }

    #[test]
    fn zero_viewport_still_gets_perspective() {
        let mut follower = Follower::default();
        let scene = SceneState::new(CameraState::default(), 0, 0, false, &mut follower);

        assert_ne!(scene.projection_matrix(), Mat4::IDENTITY);
        assert_eq!(scene.viewport(), (1, 1));
        assert_eq!(scene.projection_matrix(), state_sized(1, 1).projection_matrix());
    }

    fn state_sized(width: u32, height: u32) -> SceneState {
        SceneState::new(CameraState::default(), width, height, false, &mut Follower::default())
    }

    #[test]
    fn uniforms_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 4 * 64 + 16);
    }

    #[test]
    fn straight_view_is_pure_translation() {
        let camera = CameraState {
            view: Spherical::new(0.0, 0.0, 500.0),
            ..Default::default()
        };
        let (scene, _) = state(camera);
        let view = scene.view_matrix();

        let origin = view.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(0.0, 0.0, -500.0)).length() < 1e-4);
        assert!(view.abs_diff_eq(Mat4::from_translation(Vec3::new(0.0, 0.0, -500.0)), 1e-6));
    }

    #[test]
    fn view_inverse_round_trips() {
        let camera = CameraState {
            view: Spherical::new(0.7, -1.1, 320.0),
            ..Default::default()
        };
        let (scene, _) = state(camera);
        let view = scene.view_matrix();
        let inverse = Mat4::from_cols_array_2d(&scene.uniforms().view_inverse);
        assert!((view * inverse).abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn elevation_applies_after_azimuth() {
        let camera = CameraState {
            view: Spherical::new(FRAC_PI_2, FRAC_PI_2, 10.0),
            ..Default::default()
        };
        let (scene, _) = state(camera);
        // +X world: azimuth turns it to +Y, elevation turns +Y to +Z
        let p = scene.view_matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(0.0, 0.0, -9.0)).length() < 1e-4);
    }

    #[test]
    fn light_is_placed_and_pushed_to_target() {
        let camera = CameraState {
            light: Spherical::new(FRAC_PI_2, FRAC_PI_4, 300.0),
            ..Default::default()
        };
        let (scene, follower) = state(camera);
        let expected = Vec3::new(0.0, 212.13, 212.13);

        assert!((scene.light_position() - expected).length() < 1e-2);
        assert!((follower.0.unwrap() - expected).length() < 1e-2);
    }

    #[test]
    fn projection_uses_fixed_fov() {
        let (mut scene, _) = state(CameraState::default());
        scene.resize(800, 400);
        let expected = Mat4::perspective_rh(45f32.to_radians(), 2.0, 1.0, 10000.0);
        assert!(scene.projection_matrix().abs_diff_eq(expected, 1e-6));

        // minimized windows keep the last projection
        scene.resize(0, 0);
        assert_eq!(scene.viewport(), (800, 400));
        assert!(scene.projection_matrix().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn fog_toggles() {
        let (mut scene, _) = state(CameraState::default());
        assert!(!scene.fog());
        assert!(scene.toggle_fog());
        assert_eq!(scene.uniforms().fog, 1);
        assert!(!scene.toggle_fog());
    }
}
