//! Synthetic tileable terrain data
//!
//! Produces a heightfield whose right/bottom neighbours wrap to the
//! left/top edge, plus albedo, normal and gloss images derived from it.
//! Useful as a demo dataset and in tests.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use relief_core::{ReliefError, Result};

use crate::heightmap::{HeightSampler, Heightmap};

/// Parameters for [`generate`]
#[derive(Debug, Clone, Copy)]
pub struct SynthParams {
    /// Width and height of every generated image
    pub size: u32,
    /// Lattice cells across the base octave; must divide `size` for exact tiling
    pub base_cells: u32,
    pub octaves: u32,
    pub seed: u32,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            size: 256,
            base_cells: 4,
            octaves: 5,
            seed: 7,
        }
    }
}

/// A generated dataset held in memory
pub struct SynthTerrain {
    pub heightmap: Heightmap,
    pub albedo: RgbImage,
    pub normal: RgbImage,
    pub gloss: RgbImage,
}

/// Paths written by [`SynthTerrain::save`]
#[derive(Debug, Clone)]
pub struct SynthPaths {
    pub height: PathBuf,
    pub albedo: PathBuf,
    pub normal: PathBuf,
    pub gloss: PathBuf,
}

/// Simple pseudo-random hash for deterministic noise
fn hash(x: u32, y: u32, seed: u32) -> f32 {
    let n = x
        .wrapping_mul(374761393)
        .wrapping_add(y.wrapping_mul(668265263))
        .wrapping_add(seed.wrapping_mul(1274126177));
    let n = (n ^ (n >> 13)).wrapping_mul(1103515245);
    let n = n ^ (n >> 16);
    (n & 0x7FFFFFFF) as f32 / 0x7FFFFFFF as f32
}

/// Value noise on a lattice that repeats every `period` cells
fn tiled_noise(x: f32, y: f32, period: u32, seed: u32) -> f32 {
    let ix = x.floor() as u32;
    let iy = y.floor() as u32;
    let fx = x - x.floor();
    let fy = y - y.floor();

    // Smoothstep
    let fx = fx * fx * (3.0 - 2.0 * fx);
    let fy = fy * fy * (3.0 - 2.0 * fy);

    let x0 = ix % period;
    let y0 = iy % period;
    let x1 = (ix + 1) % period;
    let y1 = (iy + 1) % period;

    let n00 = hash(x0, y0, seed);
    let n10 = hash(x1, y0, seed);
    let n01 = hash(x0, y1, seed);
    let n11 = hash(x1, y1, seed);

    let nx0 = n00 + (n10 - n00) * fx;
    let nx1 = n01 + (n11 - n01) * fx;
    nx0 + (nx1 - nx0) * fy
}

/// Multi-octave fractal noise in [0..1), tiling over the unit square
fn tiled_fbm(u: f32, v: f32, params: &SynthParams) -> f32 {
    let mut value = 0.0;
    let mut amplitude = 0.5;
    let mut norm = 0.0;
    let mut cells = params.base_cells.max(1);
    for i in 0..params.octaves.max(1) {
        value += amplitude * tiled_noise(u * cells as f32, v * cells as f32, cells, params.seed + i * 7);
        norm += amplitude;
        amplitude *= 0.5;
        cells *= 2;
    }
    value / norm
}

/// Generate a tileable heightfield and its surface textures
pub fn generate(params: &SynthParams) -> Result<SynthTerrain> {
    let size = params.size;
    if size < 2 {
        return Err(ReliefError::DegenerateInput {
            width: size,
            height: size,
        });
    }

    let heightmap = Heightmap::from_fn(size, size, |x, y| {
        let u = x as f32 / size as f32;
        let v = y as f32 / size as f32;
        (tiled_fbm(u, v, params) * 255.0).round().clamp(0.0, 255.0)
    });

    let mut albedo = RgbImage::new(size, size);
    let mut normal = RgbImage::new(size, size);
    let mut gloss = RgbImage::new(size, size);

    for y in 0..size {
        for x in 0..size {
            let h = heightmap.elevation(x, y) / 255.0;
            let detail = hash(x, y, params.seed ^ 0x5bd1) * 0.08;

            // grass low, rock mid, snow high
            let color = if h < 0.45 {
                [0.25 + detail, 0.45 + detail, 0.18]
            } else if h < 0.7 {
                [0.45 + detail, 0.40 + detail, 0.35 + detail]
            } else {
                [0.90 + detail * 0.5, 0.92 + detail * 0.5, 0.95]
            };
            albedo.put_pixel(x, y, Rgb(color.map(to_byte)));

            let du = (heightmap.wrapped(x + 1, y) - heightmap.wrapped(x + size - 1, y)) / 255.0;
            let dv = (heightmap.wrapped(x, y + 1) - heightmap.wrapped(x, y + size - 1)) / 255.0;
            let n = glam::Vec3::new(-du * 4.0, -dv * 4.0, 1.0).normalize();
            normal.put_pixel(x, y, Rgb((n * 0.5 + 0.5).to_array().map(to_byte)));

            let g = if h > 0.7 { 0.8 } else { 0.15 + detail };
            gloss.put_pixel(x, y, Rgb([to_byte(g); 3]));
        }
    }

    Ok(SynthTerrain {
        heightmap,
        albedo,
        normal,
        gloss,
    })
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl SynthTerrain {
    /// Write `height.png`, `albedo.png`, `normal.png` and `gloss.png` into `dir`
    pub fn save(&self, dir: &Path) -> Result<SynthPaths> {
        std::fs::create_dir_all(dir)?;

        let paths = SynthPaths {
            height: dir.join("height.png"),
            albedo: dir.join("albedo.png"),
            normal: dir.join("normal.png"),
            gloss: dir.join("gloss.png"),
        };

        let size = self.heightmap.width();
        let mut height = RgbImage::new(size, self.heightmap.height());
        for (x, y, px) in height.enumerate_pixels_mut() {
            let e = self.heightmap.elevation(x, y) as u8;
            *px = Rgb([e, e, e]);
        }

        let save = |img: &RgbImage, path: &Path| {
            img.save(path)
                .map_err(|e| ReliefError::resource_load(path, e))
        };
        save(&height, &paths.height)?;
        save(&self.albedo, &paths.albedo)?;
        save(&self.normal, &paths.normal)?;
        save(&self.gloss, &paths.gloss)?;

        log::info!("Wrote synthetic terrain to {}", dir.display());
        Ok(paths)
    }
}
