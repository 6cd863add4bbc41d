//! Error types for Relief

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which half of a shader build failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderFailure {
    /// The source did not parse
    Compile,
    /// The module parsed but could not be validated or bound into a program
    Link,
}

impl fmt::Display for ShaderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile => f.write_str("compile"),
            Self::Link => f.write_str("link"),
        }
    }
}

/// The main error type for Relief operations
#[derive(Debug, Error)]
pub enum ReliefError {
    #[error("Failed to load '{}': {reason}", path.display())]
    ResourceLoad { path: PathBuf, reason: String },

    #[error("Shader {kind} error in {file}: {reason}")]
    ShaderBuild {
        file: String,
        kind: ShaderFailure,
        reason: String,
    },

    #[error("Height grid is {width}x{height}; both dimensions must be at least 2")]
    DegenerateInput { width: u32, height: u32 },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReliefError {
    pub fn resource_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ResourceLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn shader(file: impl Into<String>, kind: ShaderFailure, reason: impl ToString) -> Self {
        Self::ShaderBuild {
            file: file.into(),
            kind,
            reason: reason.to_string(),
        }
    }

    /// True for failures a hot-reload can recover from by keeping the old resource
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ResourceLoad { .. } | Self::ShaderBuild { .. })
    }
}

/// Result type alias for Relief operations
pub type Result<T> = std::result::Result<T, ReliefError>;

impl From<toml::de::Error> for ReliefError {
    fn from(err: toml::de::Error) -> Self {
        ReliefError::Config(err.to_string())
    }
}
