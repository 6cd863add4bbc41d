//! Synthetic dataset generation

use anyhow::{ensure, Context, Result};
use relief_terrain::synth::{self, SynthParams};
use std::path::Path;

pub fn run(dir: &Path, size: u32, octaves: u32, seed: u32) -> Result<()> {
    let defaults = SynthParams::default();
    ensure!(
        size >= 2 && size % defaults.base_cells == 0,
        "size must be a multiple of {} (got {})",
        defaults.base_cells,
        size
    );

    let params = SynthParams {
        size,
        octaves,
        seed,
        ..defaults
    };
    let terrain = synth::generate(&params).context("Failed to generate terrain")?;
    let paths = terrain
        .save(dir)
        .with_context(|| format!("Failed to write dataset to {}", dir.display()))?;

    println!("Generated {}x{} terrain:", size, size);
    println!("  height: {}", paths.height.display());
    println!("  albedo: {}", paths.albedo.display());
    println!("  normal: {}", paths.normal.display());
    println!("  gloss:  {}", paths.gloss.display());
    println!();
    println!(
        "View with: relief view {} {} {} {}",
        paths.height.display(),
        paths.albedo.display(),
        paths.normal.display(),
        paths.gloss.display()
    );

    Ok(())
}
