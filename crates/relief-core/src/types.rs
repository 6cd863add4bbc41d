//! Spherical camera and light placement

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Smallest orbit distance any mutator will produce
pub const MIN_DISTANCE: f32 = 1.0e-3;

/// A point on a sphere around the origin.
///
/// Angles are unconstrained and wrap naturally through the trigonometric
/// functions. `distance` stays strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spherical {
    /// Rotation about the world Z axis, in radians
    pub azimuth: f32,
    /// Rotation above the XY plane, in radians
    pub elevation: f32,
    /// Distance from the origin in world units
    pub distance: f32,
}

impl Spherical {
    pub const fn new(azimuth: f32, elevation: f32, distance: f32) -> Self {
        Self {
            azimuth,
            elevation,
            distance,
        }
    }

    pub fn from_array(arr: [f32; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.azimuth, self.elevation, self.distance]
    }

    /// World-space position: `distance * (cos az cos el, sin az cos el, sin el)`
    pub fn to_cartesian(&self) -> Vec3 {
        let (sa, ca) = self.azimuth.sin_cos();
        let (se, ce) = self.elevation.sin_cos();
        self.distance * Vec3::new(ca * ce, sa * ce, se)
    }

    /// Rotate by the given angle deltas
    pub fn orbit(&mut self, d_azimuth: f32, d_elevation: f32) {
        self.azimuth += d_azimuth;
        self.elevation += d_elevation;
    }

    /// Scale distance by `exp(amount)`; positive amounts move away
    pub fn zoom(&mut self, amount: f32) {
        self.set_distance(self.distance * amount.exp());
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = if distance.is_finite() {
            distance.max(MIN_DISTANCE)
        } else {
            MIN_DISTANCE
        };
    }
}

/// View orbit and light placement, mutated only by input handling
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub view: Spherical,
    pub light: Spherical,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            view: Spherical::new(0.0, -80.5, 500.0),
            light: Spherical::new(
                std::f32::consts::FRAC_PI_2,
                std::f32::consts::FRAC_PI_4,
                300.0,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn cartesian_on_axes() {
        let p = Spherical::new(0.0, 0.0, 10.0).to_cartesian();
        assert!((p - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-5);

        let up = Spherical::new(0.0, FRAC_PI_2, 4.0).to_cartesian();
        assert!((up - Vec3::new(0.0, 0.0, 4.0)).length() < 1e-5);
    }

    #[test]
    fn default_light_position() {
        let p = CameraState::default().light.to_cartesian();
        let expected = Vec3::new(0.0, 300.0 * FRAC_PI_4.cos(), 300.0 * FRAC_PI_4.sin());
        assert!((p - expected).length() < 1e-2);
    }

    #[test]
    fn zoom_never_reaches_zero() {
        let mut s = Spherical::new(0.0, 0.0, 1.0);
        for _ in 0..1000 {
            s.zoom(-5.0);
        }
        assert!(s.distance > 0.0);

        s.set_distance(-3.0);
        assert_eq!(s.distance, MIN_DISTANCE);
        s.set_distance(f32::NAN);
        assert_eq!(s.distance, MIN_DISTANCE);
    }

    #[test]
    fn orbit_accumulates_unbounded() {
        let mut s = Spherical::new(0.0, 0.0, 1.0);
        s.orbit(10.0, -20.0);
        s.orbit(1.0, 1.0);
        assert_eq!(s.azimuth, 11.0);
        assert_eq!(s.elevation, -19.0);
    }
}
