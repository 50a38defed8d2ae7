//! Mesh builders shared by the benchmarks.

#![allow(dead_code)]

use flipout::prelude::*;

const PHI: f64 = 1.618_033_988_749_895;

fn icosahedron_buffers() -> (Vec<f64>, Vec<u32>) {
    let raw: [[f64; 3]; 12] = [
        [-1.0, PHI, 0.0],
        [1.0, PHI, 0.0],
        [-1.0, -PHI, 0.0],
        [1.0, -PHI, 0.0],
        [0.0, -1.0, PHI],
        [0.0, 1.0, PHI],
        [0.0, -1.0, -PHI],
        [0.0, 1.0, -PHI],
        [PHI, 0.0, -1.0],
        [PHI, 0.0, 1.0],
        [-PHI, 0.0, -1.0],
        [-PHI, 0.0, 1.0],
    ];
    let mut positions = Vec::with_capacity(36);
    for [x, y, z] in raw {
        let norm = (x * x + y * y + z * z).sqrt();
        positions.extend_from_slice(&[x / norm, y / norm, z / norm]);
    }
    let indices = vec![
        0, 11, 5, 0, 5, 1, 0, 1, 7, 0, 7, 10, 0, 10, 11, //
        1, 5, 9, 5, 11, 4, 11, 10, 2, 10, 7, 6, 7, 1, 8, //
        3, 9, 4, 3, 4, 2, 3, 2, 6, 3, 6, 8, 3, 8, 9, //
        4, 9, 5, 2, 4, 11, 6, 2, 10, 8, 6, 7, 9, 8, 1,
    ];
    (positions, indices)
}

/// A unit icosphere with `subdivisions` refinement levels.
#[must_use]
pub fn icosphere(subdivisions: u32) -> SurfaceMesh {
    let (mut positions, mut indices) = icosahedron_buffers();

    for _ in 0..subdivisions {
        let mut cache: std::collections::HashMap<(u32, u32), u32> =
            std::collections::HashMap::new();
        let mut next_indices = Vec::with_capacity(indices.len() * 4);
        let mut midpoint = |a: u32, b: u32, positions: &mut Vec<f64>| -> u32 {
            let key = (a.min(b), a.max(b));
            if let Some(&existing) = cache.get(&key) {
                return existing;
            }
            let (ia, ib) = (3 * a as usize, 3 * b as usize);
            let mid = [
                (positions[ia] + positions[ib]) / 2.0,
                (positions[ia + 1] + positions[ib + 1]) / 2.0,
                (positions[ia + 2] + positions[ib + 2]) / 2.0,
            ];
            let norm = (mid[0] * mid[0] + mid[1] * mid[1] + mid[2] * mid[2]).sqrt();
            let index = u32::try_from(positions.len() / 3).unwrap();
            positions.extend_from_slice(&[mid[0] / norm, mid[1] / norm, mid[2] / norm]);
            cache.insert(key, index);
            index
        };
        for corner in indices.chunks_exact(3) {
            let [a, b, c] = [corner[0], corner[1], corner[2]];
            let ab = midpoint(a, b, &mut positions);
            let bc = midpoint(b, c, &mut positions);
            let ca = midpoint(c, a, &mut positions);
            next_indices.extend_from_slice(&[a, ab, ca]);
            next_indices.extend_from_slice(&[b, bc, ab]);
            next_indices.extend_from_slice(&[c, ca, bc]);
            next_indices.extend_from_slice(&[ab, bc, ca]);
        }
        indices = next_indices;
    }

    SurfaceMesh::from_raw_buffers(&positions, &indices).unwrap()
}

/// The vertex closest to the antipode of buffer vertex `origin`.
#[must_use]
pub fn antipodal_vertex(mesh: &SurfaceMesh, origin: usize) -> VertexKey {
    let p = mesh.position(mesh.vertex_key(origin).unwrap());
    let antipode = Point3::new(-p.x(), -p.y(), -p.z());
    mesh.vertex_keys()
        .min_by(|&a, &b| {
            mesh.position(a)
                .distance(&antipode)
                .total_cmp(&mesh.position(b).distance(&antipode))
        })
        .unwrap()
}
