//! Relief Core - Foundational types for the Relief terrain viewer
//!
//! This crate provides the types that all other Relief crates depend on:
//! - `Spherical`, `CameraState` - orbit camera and light placement
//! - `ReliefConfig` - TOML configuration with defaults for every field
//! - Error types and Result alias

mod config;
mod error;
mod types;

pub use config::{CameraConfig, InputConfig, ReliefConfig, TerrainSettings, WindowConfig};
pub use error::{ReliefError, Result, ShaderFailure};
pub use types::{CameraState, Spherical, MIN_DISTANCE};
