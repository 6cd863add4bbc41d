//! Viewer configuration
//!
//! Every field has a default, so an absent or partial `relief.toml` is
//! valid. `RELIEF_SHADER_DIR` overrides `terrain.shader_dir` after the
//! file is read.

use crate::error::{ReliefError, Result};
use crate::types::{CameraState, Spherical};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Terrain placement in world space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// World-space extent of the terrain along X, Y and Z
    pub map_size: [f32; 3],
    /// Elevation sample value that maps to the top of `map_size.z`
    pub max_elevation: f32,
    /// Directory holding `terrain.wgsl` and `marker.wgsl`; embedded shaders are used when unset
    pub shader_dir: Option<PathBuf>,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            map_size: [512.0, 512.0, 50.0],
            max_elevation: 255.0,
            shader_dir: None,
        }
    }
}

/// Initial view and light placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// View orbit as [azimuth, elevation, distance]
    pub view: [f32; 3],
    /// Light position as [azimuth, elevation, distance]
    pub light: [f32; 3],
    pub fog: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let state = CameraState::default();
        Self {
            view: state.view.to_array(),
            light: state.light.to_array(),
            fog: false,
        }
    }
}

impl CameraConfig {
    pub fn camera_state(&self) -> CameraState {
        CameraState {
            view: Spherical::from_array(self.view),
            light: Spherical::from_array(self.light),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Relief".to_string(),
        }
    }
}

/// Mouse and keyboard rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Orbit angle change per pixel of mouse drag
    pub drag_radians_per_pixel: f32,
    /// Log-distance change per pixel of zoom drag
    pub zoom_per_pixel: f32,
    /// Orbit rate while an arrow key is held, in radians per second
    pub key_orbit_rate: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            drag_radians_per_pixel: 0.005,
            zoom_per_pixel: 0.005,
            key_orbit_rate: 1.0,
        }
    }
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliefConfig {
    pub terrain: TerrainSettings,
    pub camera: CameraConfig,
    pub window: WindowConfig,
    pub input: InputConfig,
}

impl ReliefConfig {
    /// Load config from a file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReliefError::Config(format!("{}: {}", path.display(), e)))?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise start from defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let mut config = Self::default();
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }

    /// Parse without environment overrides (for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("RELIEF_SHADER_DIR") {
            if !dir.is_empty() {
                self.terrain.shader_dir = Some(PathBuf::from(dir));
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.terrain.map_size.iter().any(|v| !(*v > 0.0)) {
            return Err(ReliefError::Config(format!(
                "terrain.map_size must be positive, got {:?}",
                self.terrain.map_size
            )));
        }
        if !(self.terrain.max_elevation > 0.0) {
            return Err(ReliefError::Config(format!(
                "terrain.max_elevation must be positive, got {}",
                self.terrain.max_elevation
            )));
        }
        if !(self.camera.view[2] > 0.0) || !(self.camera.light[2] > 0.0) {
            return Err(ReliefError::Config(
                "camera distances must be positive".to_string(),
            ));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ReliefError::Config(
                "window dimensions must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
