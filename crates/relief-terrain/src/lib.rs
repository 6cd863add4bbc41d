//! Relief Terrain - Heightfield terrain mesh synthesis
//!
//! Provides heightmap loading, the `HeightSampler` abstraction, and the
//! single-resolution mesh builder. Does not depend on relief-render: it
//! outputs raw per-stream vertex data (positions, tangent frames, UVs,
//! triangle indices) for the renderer to upload.

pub mod heightmap;
pub mod mesh;
pub mod synth;

pub use heightmap::{HeightSampler, Heightmap};
pub use mesh::{grid_size_for, TerrainMesh, Vertex};
pub use synth::{SynthParams, SynthPaths, SynthTerrain};

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use relief_core::ReliefError;

    const MAP_SIZE: Vec3 = Vec3::new(512.0, 512.0, 50.0);

    fn bumpy(width: u32, height: u32) -> Heightmap {
        Heightmap::from_fn(width, height, |x, y| {
            128.0 + 100.0 * (x as f32 * 0.9).sin() * (y as f32 * 0.6).cos()
        })
    }

    fn build(hm: &Heightmap) -> TerrainMesh {
        TerrainMesh::build(hm, grid_size_for(hm, 255.0), MAP_SIZE).unwrap()
    }

    #[test]
    fn vertex_and_triangle_counts() {
        for (w, h) in [(2, 2), (3, 5), (8, 4), (16, 16)] {
            let mesh = build(&bumpy(w, h));
            let numvert = ((w + 1) * (h + 1)) as usize;
            assert_eq!(mesh.vertex_count(), numvert);
            assert_eq!(mesh.tangents.len(), numvert);
            assert_eq!(mesh.bitangents.len(), numvert);
            assert_eq!(mesh.normals.len(), numvert);
            assert_eq!(mesh.uvs.len(), numvert);
            assert_eq!(mesh.triangle_count(), (2 * w * h) as usize);

            for tri in &mesh.triangles {
                for &i in tri {
                    assert!((i as usize) < numvert);
                }
            }
        }
    }

    #[test]
    fn degenerate_grids_are_rejected() {
        for (w, h) in [(1, 4), (4, 1), (1, 1), (0, 3)] {
            let hm = Heightmap::from_fn(w, h, |_, _| 0.0);
            let err = TerrainMesh::build(&hm, Vec3::new(4.0, 4.0, 255.0), MAP_SIZE).unwrap_err();
            assert!(matches!(err, ReliefError::DegenerateInput { .. }));
        }
    }

    #[test]
    fn zero_scale_is_rejected() {
        let hm = bumpy(4, 4);
        let err = TerrainMesh::build(&hm, Vec3::new(4.0, 4.0, 0.0), MAP_SIZE).unwrap_err();
        assert!(matches!(err, ReliefError::Config(_)));
    }

    #[test]
    fn normals_are_unit_cross_of_own_frame() {
        let mesh = build(&bumpy(9, 7));
        for v in mesh.vertices() {
            let t = Vec3::from_array(v.tangent);
            let b = Vec3::from_array(v.bitangent);
            let n = Vec3::from_array(v.normal);

            assert!((n.length() - 1.0).abs() < 1e-4);
            assert!((t.length() - 1.0).abs() < 1e-4);
            assert!((b.length() - 1.0).abs() < 1e-4);
            assert_eq!(n, t.cross(b).normalize());
        }
    }

    #[test]
    fn triangles_wind_counter_clockwise_about_normal() {
        let mesh = build(&bumpy(10, 6));
        for tri in &mesh.triangles {
            let [p0, p1, p2] = (*tri).map(|i| Vec3::from_array(mesh.positions[i as usize]));
            let face = (p1 - p0).cross(p2 - p0);
            let avg = tri
                .iter()
                .map(|&i| Vec3::from_array(mesh.normals[i as usize]))
                .sum::<Vec3>()
                / 3.0;
            assert!(face.dot(avg) >= 0.0, "triangle {:?} winds clockwise", tri);
        }
    }

    #[test]
    fn cell_triangulation_covers_quad() {
        let mesh = build(&bumpy(3, 3));
        let row = 4;
        // cell (1, 2)
        let p = 2 * row + 1;
        let cell = (2 * 3 + 1) * 2;
        assert_eq!(mesh.triangles[cell], [p, p + 1, p + row + 1]);
        assert_eq!(mesh.triangles[cell + 1], [p, p + row + 1, p + row]);
    }

    #[test]
    fn build_is_deterministic() {
        let hm = bumpy(12, 9);
        let a = build(&hm);
        let b = build(&hm);

        let bits = |m: &TerrainMesh| -> Vec<u32> {
            m.positions
                .iter()
                .chain(&m.tangents)
                .chain(&m.bitangents)
                .chain(&m.normals)
                .flatten()
                .chain(m.uvs.iter().flatten())
                .map(|f| f.to_bits())
                .collect()
        };
        assert_eq!(bits(&a), bits(&b));
        assert_eq!(a.triangles, b.triangles);
    }

    #[test]
    fn seam_uses_wrapped_neighbour() {
        // only column 0 is raised; the right edge must see it as its +x neighbour
        let w = 4;
        let h = 3;
        let hm = Heightmap::from_fn(w, h, |x, _| if x == 0 { 100.0 } else { 0.0 });
        let mesh = build(&hm);

        let grid = grid_size_for(&hm, 255.0);
        let expected_du = (100.0 - 0.0) * 0.5 * MAP_SIZE.z / grid.z;
        let step_x = MAP_SIZE.x / grid.x;
        let expected = Vec3::new(step_x, 0.0, expected_du).normalize();

        for y in 0..h {
            let t = Vec3::from_array(mesh.tangents[mesh.index_of(w - 1, y) as usize]);
            assert!((t - expected).length() < 1e-6);

            // x = W duplicates column 0's frame at an unwrapped position
            let edge = mesh.index_of(w, y) as usize;
            let first = mesh.index_of(0, y) as usize;
            assert_eq!(mesh.tangents[edge], mesh.tangents[first]);
            assert_eq!(mesh.normals[edge], mesh.normals[first]);
            assert_eq!(mesh.positions[edge][2], mesh.positions[first][2]);
            assert!(mesh.positions[edge][0] > mesh.positions[first][0]);
        }
    }

    #[test]
    fn positions_and_uvs_span_map() {
        let hm = Heightmap::from_fn(4, 4, |_, _| 255.0);
        let mesh = build(&hm);
        let (min, max) = mesh.bounds();

        assert!((min - Vec3::new(-256.0, -256.0, 25.0)).length() < 1e-4);
        assert!((max - Vec3::new(256.0, 256.0, 25.0)).length() < 1e-4);

        let last = mesh.vertex_count() - 1;
        assert_eq!(mesh.uvs[0], [0.0, 0.0]);
        assert_eq!(mesh.uvs[last], [1.0, 1.0]);
    }

    #[test]
    fn flat_terrain_points_up() {
        let hm = Heightmap::from_fn(5, 5, |_, _| 128.0);
        let mesh = build(&hm);
        for n in &mesh.normals {
            assert_eq!(*n, [0.0, 0.0, 1.0]);
        }
    }
}
