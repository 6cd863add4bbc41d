//! Relief Runtime - Viewer loop building blocks
//!
//! - `OrbitInput` - maps mouse and keyboard events onto camera/light orbits
//!   and tracks whether a redraw is needed
//! - `FrameClock` - elapsed time between frames for key-driven orbiting

mod clock;
mod input;

pub use clock::FrameClock;
pub use input::{CameraChange, DragButton, InputAction, OrbitInput};
