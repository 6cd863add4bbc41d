//! CLI command implementations

pub mod generate;
pub mod mesh;
pub mod render;
pub mod view;
mod watch;

use anyhow::{Context, Result};
use relief_core::ReliefConfig;
use relief_render::{SurfacePaths, TerrainPaths};
use std::path::{Path, PathBuf};

pub fn terrain_paths(height: PathBuf, color: PathBuf, normal: PathBuf, gloss: PathBuf) -> TerrainPaths {
    TerrainPaths {
        height,
        surface: SurfacePaths {
            color,
            normal,
            gloss,
        },
    }
}

/// Load `relief.toml` from `path`, or defaults when no path was given
pub fn load_config(path: Option<&Path>) -> Result<ReliefConfig> {
    let config = ReliefConfig::load_or_default(path).with_context(|| match path {
        Some(p) => format!("Failed to load config {}", p.display()),
        None => "Invalid default config".to_string(),
    })?;
    if let Some(dir) = &config.terrain.shader_dir {
        log::info!("Shaders from {}", dir.display());
    }
    Ok(config)
}
