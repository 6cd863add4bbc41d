//! Terrain mesh synthesis from a height grid

use glam::{Vec2, Vec3};
use relief_core::{ReliefError, Result};

use crate::heightmap::HeightSampler;

/// One vertex of a terrain mesh, gathered from the per-stream arrays
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// A heightfield mesh stored as one array per attribute stream.
///
/// A W×H sample grid yields (W+1)×(H+1) vertices: the last row and column
/// sample the wrapped-around elevation but sit at unwrapped positions, so
/// the edge only looks seamless when the heightfield tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMesh {
    /// Sample grid width (vertices per row = width + 1)
    pub grid_width: u32,
    /// Sample grid height (vertex rows = height + 1)
    pub grid_height: u32,
    pub positions: Vec<[f32; 3]>,
    /// Unit-length surface derivative along grid X
    pub tangents: Vec<[f32; 3]>,
    /// Unit-length surface derivative along grid Y
    pub bitangents: Vec<[f32; 3]>,
    /// `normalize(tangent × bitangent)`
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    /// Triangle indices (CCW seen from the normal side)
    pub triangles: Vec<[u32; 3]>,
}

/// Grid-to-world scale for a sampler: (width, height, max_elevation)
pub fn grid_size_for<S: HeightSampler + ?Sized>(sampler: &S, max_elevation: f32) -> Vec3 {
    Vec3::new(sampler.width() as f32, sampler.height() as f32, max_elevation)
}

impl TerrainMesh {
    /// Build the mesh for `sampler`.
    ///
    /// `position(x, y) = ((x, y, elevation) / grid_size - 0.5) * map_size`.
    /// Tangents come from central differences on the sample grid with
    /// toroidal wraparound, so `x = W - 1` uses column 0 as its right
    /// neighbour.
    pub fn build<S: HeightSampler + ?Sized>(
        sampler: &S,
        grid_size: Vec3,
        map_size: Vec3,
    ) -> Result<Self> {
        let w = sampler.width();
        let h = sampler.height();
        if w < 2 || h < 2 {
            return Err(ReliefError::DegenerateInput {
                width: w,
                height: h,
            });
        }
        if !scale_is_usable(grid_size) || !scale_is_usable(map_size) {
            return Err(ReliefError::Config(format!(
                "terrain scale must be positive and finite (grid {grid_size}, map {map_size})"
            )));
        }

        let vert_count = (w as usize + 1) * (h as usize + 1);
        let mut positions = Vec::with_capacity(vert_count);
        let mut tangents = Vec::with_capacity(vert_count);
        let mut bitangents = Vec::with_capacity(vert_count);
        let mut normals = Vec::with_capacity(vert_count);
        let mut uvs = Vec::with_capacity(vert_count);

        // world units per grid step
        let step_x = map_size.x / grid_size.x;
        let step_y = map_size.y / grid_size.y;
        let step_z = map_size.z / grid_size.z;

        for y in 0..=h {
            for x in 0..=w {
                let elevation = sampler.wrapped(x, y);
                let position =
                    (Vec3::new(x as f32, y as f32, elevation) / grid_size - 0.5) * map_size;

                let sx = x % w;
                let sy = y % h;
                let du = (sampler.elevation((sx + 1) % w, sy)
                    - sampler.elevation((sx + w - 1) % w, sy))
                    * 0.5
                    * step_z;
                let dv = (sampler.elevation(sx, (sy + 1) % h)
                    - sampler.elevation(sx, (sy + h - 1) % h))
                    * 0.5
                    * step_z;

                let tangent = Vec3::new(step_x, 0.0, du).normalize();
                let bitangent = Vec3::new(0.0, step_y, dv).normalize();
                let normal = tangent.cross(bitangent).normalize();

                let uv = Vec2::new(x as f32, y as f32) / grid_size.truncate();

                positions.push(position.to_array());
                tangents.push(tangent.to_array());
                bitangents.push(bitangent.to_array());
                normals.push(normal.to_array());
                uvs.push(uv.to_array());
            }
        }

        // two triangles per grid cell
        let row = w + 1;
        let mut triangles = Vec::with_capacity(2 * w as usize * h as usize);
        for y in 0..h {
            for x in 0..w {
                let p = y * row + x;
                triangles.push([p, p + 1, p + row + 1]);
                triangles.push([p, p + row + 1, p + row]);
            }
        }

        Ok(Self {
            grid_width: w,
            grid_height: h,
            positions,
            tangents,
            bitangents,
            normals,
            uvs,
            triangles,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Linear vertex index of grid point (x, y)
    pub fn index_of(&self, x: u32, y: u32) -> u32 {
        y * (self.grid_width + 1) + x
    }

    pub fn vertex(&self, index: usize) -> Vertex {
        Vertex {
            position: self.positions[index],
            tangent: self.tangents[index],
            bitangent: self.bitangents[index],
            normal: self.normals[index],
            uv: self.uvs[index],
        }
    }

    pub fn vertices(&self) -> impl Iterator<Item = Vertex> + '_ {
        (0..self.vertex_count()).map(|i| self.vertex(i))
    }

    /// Axis-aligned bounds of all vertex positions
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.positions.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), p| {
                let p = Vec3::from_array(*p);
                (min.min(p), max.max(p))
            },
        )
    }
}

fn scale_is_usable(v: Vec3) -> bool {
    v.is_finite() && v.cmpgt(Vec3::ZERO).all()
}
