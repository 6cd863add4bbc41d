//! Orbit input: mouse drags, scroll and arrow keys onto camera coordinates

use relief_core::{CameraState, InputConfig};
use winit::keyboard::KeyCode;

/// Mouse button driving the current drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragButton {
    /// View azimuth/elevation
    Left,
    /// View distance
    Right,
    /// Light azimuth/elevation
    Middle,
}

/// Discrete commands triggered by a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    ToggleFog,
    ReloadShaders,
    ReloadTextures,
    Quit,
}

/// Which spherical coordinates an event changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraChange {
    pub view: bool,
    pub light: bool,
}

impl CameraChange {
    pub fn any(&self) -> bool {
        self.view || self.light
    }
}

/// Input state machine for the orbit viewer
pub struct OrbitInput {
    settings: InputConfig,
    button: Option<DragButton>,
    last_cursor: Option<(f64, f64)>,
    /// Held-key orbit rates in radians/second
    pan_rate: f32,
    tilt_rate: f32,
    /// True when the scene needs drawing again
    pub redraw: bool,
}

impl OrbitInput {
    pub fn new(settings: InputConfig) -> Self {
        Self {
            settings,
            button: None,
            last_cursor: None,
            pan_rate: 0.0,
            tilt_rate: 0.0,
            redraw: true,
        }
    }

    pub fn mouse_press(&mut self, button: DragButton) {
        self.button = Some(button);
    }

    pub fn mouse_release(&mut self, button: DragButton) {
        if self.button == Some(button) {
            self.button = None;
        }
    }

    /// Apply the drag since the previous cursor position
    pub fn cursor_moved(&mut self, camera: &mut CameraState, x: f64, y: f64) -> CameraChange {
        let previous = self.last_cursor.replace((x, y));
        let (Some(button), Some((old_x, old_y))) = (self.button, previous) else {
            return CameraChange::default();
        };

        let dx = (x - old_x) as f32;
        let dy = (y - old_y) as f32;
        if dx == 0.0 && dy == 0.0 {
            return CameraChange::default();
        }

        let rate = self.settings.drag_radians_per_pixel;
        let change = match button {
            DragButton::Left => {
                camera.view.orbit(dx * rate, dy * rate);
                CameraChange {
                    view: true,
                    light: false,
                }
            }
            DragButton::Right => {
                camera.view.zoom(dy * self.settings.zoom_per_pixel);
                CameraChange {
                    view: true,
                    light: false,
                }
            }
            DragButton::Middle => {
                camera.light.orbit(dx * rate, -dy * rate);
                CameraChange {
                    view: false,
                    light: true,
                }
            }
        };
        self.redraw = true;
        change
    }

    /// Scroll wheel zoom; positive `lines` moves closer
    pub fn scroll(&mut self, camera: &mut CameraState, lines: f32) -> CameraChange {
        if lines == 0.0 {
            return CameraChange::default();
        }
        // one wheel line is worth twenty pixels of drag
        camera.view.zoom(-lines * 20.0 * self.settings.zoom_per_pixel);
        self.redraw = true;
        CameraChange {
            view: true,
            light: false,
        }
    }

    pub fn key_press(&mut self, key: KeyCode) -> Option<InputAction> {
        let rate = self.settings.key_orbit_rate;
        let action = match key {
            KeyCode::ArrowLeft => {
                self.pan_rate = -rate;
                None
            }
            KeyCode::ArrowRight => {
                self.pan_rate = rate;
                None
            }
            KeyCode::ArrowUp => {
                self.tilt_rate = -rate;
                None
            }
            KeyCode::ArrowDown => {
                self.tilt_rate = rate;
                None
            }
            KeyCode::KeyF => Some(InputAction::ToggleFog),
            KeyCode::KeyR => Some(InputAction::ReloadShaders),
            KeyCode::KeyT => Some(InputAction::ReloadTextures),
            KeyCode::Escape | KeyCode::KeyQ => Some(InputAction::Quit),
            _ => None,
        };
        if let Some(action) = action {
            log::debug!("Key {:?} -> {:?}", key, action);
        }
        self.redraw = true;
        action
    }

    pub fn key_release(&mut self, key: KeyCode) {
        match key {
            KeyCode::ArrowLeft | KeyCode::ArrowRight => self.pan_rate = 0.0,
            KeyCode::ArrowUp | KeyCode::ArrowDown => self.tilt_rate = 0.0,
            _ => {}
        }
    }

    /// Integrate held-key orbit rates over `dt` seconds
    pub fn key_update(&mut self, camera: &mut CameraState, dt: f32) -> CameraChange {
        if !self.is_animating() || dt <= 0.0 {
            return CameraChange::default();
        }
        camera.view.orbit(self.pan_rate * dt, self.tilt_rate * dt);
        self.redraw = true;
        CameraChange {
            view: true,
            light: false,
        }
    }

    /// True while an orbit key is held
    pub fn is_animating(&self) -> bool {
        self.pan_rate != 0.0 || self.tilt_rate != 0.0
    }

    /// Consume the redraw flag
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_core::Spherical;

    fn input() -> OrbitInput {
        OrbitInput::new(InputConfig::default())
    }

    fn camera() -> CameraState {
        CameraState {
            view: Spherical::new(0.0, 0.0, 500.0),
            light: Spherical::new(0.0, 0.5, 300.0),
        }
    }

    #[test]
    fn starts_wanting_a_redraw() {
        let mut input = input();
        assert!(input.take_redraw());
        assert!(!input.take_redraw());
    }

    #[test]
    fn motion_without_button_does_nothing() {
        let mut input = input();
        let mut cam = camera();
        input.take_redraw();

        input.cursor_moved(&mut cam, 10.0, 10.0);
        let change = input.cursor_moved(&mut cam, 50.0, 10.0);
        assert!(!change.any());
        assert_eq!(cam, camera());
        assert!(!input.redraw);
    }

    #[test]
    fn left_drag_orbits_view() {
        let mut input = input();
        let mut cam = camera();
        input.cursor_moved(&mut cam, 100.0, 100.0);
        input.mouse_press(DragButton::Left);

        let change = input.cursor_moved(&mut cam, 140.0, 80.0);
        assert_eq!(
            change,
            CameraChange {
                view: true,
                light: false
            }
        );
        assert!((cam.view.azimuth - 40.0 * 0.005).abs() < 1e-6);
        assert!((cam.view.elevation + 20.0 * 0.005).abs() < 1e-6);
        assert_eq!(cam.light, camera().light);
    }

    #[test]
    fn right_drag_zooms_and_keeps_distance_positive() {
        let mut input = input();
        let mut cam = camera();
        input.cursor_moved(&mut cam, 0.0, 0.0);
        input.mouse_press(DragButton::Right);

        input.cursor_moved(&mut cam, 0.0, -100.0);
        assert!(cam.view.distance < 500.0);

        input.cursor_moved(&mut cam, 0.0, -1.0e6);
        assert!(cam.view.distance > 0.0);
    }

    #[test]
    fn middle_drag_moves_light() {
        let mut input = input();
        let mut cam = camera();
        input.cursor_moved(&mut cam, 0.0, 0.0);
        input.mouse_press(DragButton::Middle);

        let change = input.cursor_moved(&mut cam, 20.0, 0.0);
        assert!(change.light && !change.view);
        assert!((cam.light.azimuth - 0.1).abs() < 1e-6);

        input.mouse_release(DragButton::Middle);
        assert!(!input.cursor_moved(&mut cam, 40.0, 0.0).any());
    }

    #[test]
    fn held_keys_integrate_over_time() {
        let mut input = input();
        let mut cam = camera();

        assert_eq!(input.key_press(KeyCode::ArrowRight), None);
        assert!(input.is_animating());
        input.key_update(&mut cam, 0.5);
        input.key_update(&mut cam, 0.25);
        assert!((cam.view.azimuth - 0.75).abs() < 1e-6);

        input.key_release(KeyCode::ArrowRight);
        assert!(!input.is_animating());
        input.take_redraw();
        assert!(!input.key_update(&mut cam, 1.0).any());
        assert!(!input.redraw);
    }

    #[test]
    fn action_keys() {
        let mut input = input();
        assert_eq!(input.key_press(KeyCode::KeyF), Some(InputAction::ToggleFog));
        assert_eq!(input.key_press(KeyCode::KeyR), Some(InputAction::ReloadShaders));
        assert_eq!(input.key_press(KeyCode::KeyT), Some(InputAction::ReloadTextures));
        assert_eq!(input.key_press(KeyCode::Escape), Some(InputAction::Quit));
        assert_eq!(input.key_press(KeyCode::KeyZ), None);
    }

    #[test]
    fn scroll_zooms_in() {
        let mut input = input();
        let mut cam = camera();
        assert!(input.scroll(&mut cam, 1.0).view);
        assert!(cam.view.distance < 500.0);
        assert!(!input.scroll(&mut cam, 0.0).any());
    }
}
