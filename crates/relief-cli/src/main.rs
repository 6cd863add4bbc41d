//! Relief CLI - terrain viewer and asset tools

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{generate, mesh, render, view};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "relief")]
#[command(about = "Heightfield terrain viewer with hot-reloadable shaders and textures", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open an interactive window on a terrain
    View {
        /// Heightmap image (elevation in the red channel)
        heightmap: PathBuf,

        /// Albedo texture
        color: PathBuf,

        /// Tangent-space normal map
        normal: PathBuf,

        /// Gloss map
        gloss: PathBuf,

        /// Path to relief.toml
        #[arg(long)]
        config: Option<PathBuf>,

        /// Reload shaders and textures when their files change
        #[arg(long)]
        watch: bool,
    },

    /// Render a single frame to a PNG without opening a window
    Render {
        /// Heightmap image (elevation in the red channel)
        heightmap: PathBuf,

        /// Albedo texture
        color: PathBuf,

        /// Tangent-space normal map
        normal: PathBuf,

        /// Gloss map
        gloss: PathBuf,

        /// Output PNG path
        #[arg(long, short, default_value = "relief.png")]
        output: PathBuf,

        /// Image width in pixels (defaults to window.width)
        #[arg(long)]
        width: Option<u32>,

        /// Image height in pixels (defaults to window.height)
        #[arg(long)]
        height: Option<u32>,

        /// View as azimuth,elevation,distance (radians, radians, units)
        #[arg(long, value_parser = parse_vec3)]
        view: Option<[f32; 3]>,

        /// Light as azimuth,elevation,distance (radians, radians, units)
        #[arg(long, value_parser = parse_vec3)]
        light: Option<[f32; 3]>,

        /// Enable distance fog
        #[arg(long)]
        fog: bool,

        /// Path to relief.toml
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print statistics for the mesh built from a heightmap
    Mesh {
        /// Heightmap image (elevation in the red channel)
        heightmap: PathBuf,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,

        /// Path to relief.toml
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write a synthetic tileable terrain dataset
    Generate {
        /// Output directory
        dir: PathBuf,

        /// Image size in pixels
        #[arg(long, default_value = "256")]
        size: u32,

        /// Noise octaves
        #[arg(long, default_value = "5")]
        octaves: u32,

        /// Noise seed
        #[arg(long, default_value = "7")]
        seed: u32,
    },
}

fn parse_vec3(s: &str) -> Result<[f32; 3], String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("expected 3 comma-separated values, got {}", parts.len()));
    }
    let mut out = [0.0; 3];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse()
            .map_err(|e| format!("invalid value '{}': {}", part.trim(), e))?;
    }
    Ok(out)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::View {
            heightmap,
            color,
            normal,
            gloss,
            config,
            watch,
        } => view::run(view::ViewArgs {
            paths: commands::terrain_paths(heightmap, color, normal, gloss),
            config,
            watch,
        }),
        Commands::Render {
            heightmap,
            color,
            normal,
            gloss,
            output,
            width,
            height,
            view,
            light,
            fog,
            config,
        } => render::run(render::RenderArgs {
            paths: commands::terrain_paths(heightmap, color, normal, gloss),
            output,
            width,
            height,
            view,
            light,
            fog,
            config,
        }),
        Commands::Mesh {
            heightmap,
            format,
            config,
        } => mesh::run(&heightmap, &format, config.as_deref()),
        Commands::Generate {
            dir,
            size,
            octaves,
            seed,
        } => generate::run(&dir, size, octaves, seed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vec3() {
        assert_eq!(parse_vec3("1, -2.5,300").unwrap(), [1.0, -2.5, 300.0]);
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("1,x,3").is_err());
    }

    #[test]
    fn view_takes_four_images() {
        let cli = Cli::try_parse_from(["relief", "view", "h.png", "c.png", "n.png", "g.png", "--watch"])
            .unwrap();
        match cli.command {
            Commands::View { heightmap, gloss, watch, config, .. } => {
                assert_eq!(heightmap, PathBuf::from("h.png"));
                assert_eq!(gloss, PathBuf::from("g.png"));
                assert!(watch);
                assert!(config.is_none());
            }
            _ => panic!("expected view"),
        }
        assert!(Cli::try_parse_from(["relief", "view", "h.png", "c.png"]).is_err());
    }
}
