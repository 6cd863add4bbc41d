//! Mesh statistics for a heightmap

use anyhow::{bail, Context, Result};
use relief_core::TerrainSettings;
use relief_render::terrain::load_mesh;
use relief_terrain::TerrainMesh;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct MeshStats {
    pub grid: [u32; 2],
    pub vertices: usize,
    pub triangles: usize,
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
    pub map_size: [f32; 3],
}

impl MeshStats {
    pub fn of(mesh: &TerrainMesh, settings: &TerrainSettings) -> Self {
        let (min, max) = mesh.bounds();
        Self {
            grid: [mesh.grid_width, mesh.grid_height],
            vertices: mesh.vertex_count(),
            triangles: mesh.triangle_count(),
            bounds_min: min.to_array(),
            bounds_max: max.to_array(),
            map_size: settings.map_size,
        }
    }
}

pub fn run(heightmap: &Path, format: &str, config: Option<&Path>) -> Result<()> {
    if format != "text" && format != "json" {
        bail!("Unknown format '{}'. Use 'text' or 'json'.", format);
    }

    let config = super::load_config(config)?;
    let mesh = load_mesh(heightmap, &config.terrain)
        .with_context(|| format!("Failed to build mesh from {}", heightmap.display()))?;
    let stats = MeshStats::of(&mesh, &config.terrain);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&stats)?),
        _ => {
            println!("Heightmap: {}", heightmap.display());
            println!("  grid:      {}x{}", stats.grid[0], stats.grid[1]);
            println!("  vertices:  {}", stats.vertices);
            println!("  triangles: {}", stats.triangles);
            println!(
                "  bounds:    ({:.1}, {:.1}, {:.1}) .. ({:.1}, {:.1}, {:.1})",
                stats.bounds_min[0],
                stats.bounds_min[1],
                stats.bounds_min[2],
                stats.bounds_max[0],
                stats.bounds_max[1],
                stats.bounds_max[2]
            );
        }
    }

    Ok(())
}
