//! Shared mesh builders for the integration tests.
//!
//! All builders return closed, consistently wound triangle meshes so the
//! invariants checked by `SurfaceMesh::is_valid` hold on construction.

// Each integration test binary compiles its own copy of this module and
// uses a different subset of the builders.
#![allow(dead_code)]

use flipout::prelude::*;

/// Golden ratio, used by the icosahedron layout.
const PHI: f64 = 1.618_033_988_749_895;

/// The twelve unit-sphere vertices of a regular icosahedron.
#[must_use]
pub fn icosahedron_positions() -> Vec<f64> {
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
    positions
}

/// The twenty CCW faces of a regular icosahedron.
#[must_use]
pub fn icosahedron_indices() -> Vec<u32> {
    vec![
        0, 11, 5, 0, 5, 1, 0, 1, 7, 0, 7, 10, 0, 10, 11, //
        1, 5, 9, 5, 11, 4, 11, 10, 2, 10, 7, 6, 7, 1, 8, //
        3, 9, 4, 3, 4, 2, 3, 2, 6, 3, 6, 8, 3, 8, 9, //
        4, 9, 5, 2, 4, 11, 6, 2, 10, 8, 6, 7, 9, 8, 1,
    ]
}

/// A unit icosahedron mesh (12 vertices, 30 edges, 20 faces).
#[must_use]
pub fn icosahedron() -> SurfaceMesh {
    SurfaceMesh::from_raw_buffers(&icosahedron_positions(), &icosahedron_indices()).unwrap()
}

/// A unit icosphere: the icosahedron subdivided `subdivisions` times, every
/// vertex projected back onto the unit sphere.
///
/// Counts: `10 · 4^s + 2` vertices and `20 · 4^s` faces (s = 2 gives the
/// 162-vertex, 320-face sphere used by the antipodal scenario).
#[must_use]
pub fn icosphere(subdivisions: u32) -> SurfaceMesh {
    let mut positions = icosahedron_positions();
    let mut indices = icosahedron_indices();

    for _ in 0..subdivisions {
        let mut midpoint_cache: std::collections::HashMap<(u32, u32), u32> =
            std::collections::HashMap::new();
        let mut next_indices = Vec::with_capacity(indices.len() * 4);

        let mut midpoint = |a: u32, b: u32, positions: &mut Vec<f64>| -> u32 {
            let key = (a.min(b), a.max(b));
            if let Some(&existing) = midpoint_cache.get(&key) {
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
            midpoint_cache.insert(key, index);
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

/// The vertex of `mesh` whose position is closest to the antipode of the
/// vertex at buffer index `origin`.
#[must_use]
pub fn antipodal_vertex(mesh: &SurfaceMesh, origin: usize) -> VertexKey {
    let origin_key = mesh.vertex_key(origin).unwrap();
    let p = mesh.position(origin_key);
    let antipode = Point3::new(-p.x(), -p.y(), -p.z());
    mesh.vertex_keys()
        .min_by(|&a, &b| {
            mesh.position(a)
                .distance(&antipode)
                .total_cmp(&mesh.position(b).distance(&antipode))
        })
        .unwrap()
}

/// A closed torus with `tubular` segments around the main ring and
/// `radial` segments around the tube.
///
/// Counts: `tubular · radial` vertices and `2 · tubular · radial` faces.
#[must_use]
pub fn torus(radial: u32, tubular: u32, ring_radius: f64, tube_radius: f64) -> SurfaceMesh {
    let mut positions = Vec::with_capacity((3 * radial * tubular) as usize);
    for i in 0..tubular {
        let theta = f64::from(i) / f64::from(tubular) * std::f64::consts::TAU;
        for j in 0..radial {
            let phi = f64::from(j) / f64::from(radial) * std::f64::consts::TAU;
            let rim = ring_radius + tube_radius * phi.cos();
            positions.extend_from_slice(&[
                rim * theta.cos(),
                rim * theta.sin(),
                tube_radius * phi.sin(),
            ]);
        }
    }

    let vertex = |i: u32, j: u32| (i % tubular) * radial + (j % radial);
    let mut indices = Vec::with_capacity((6 * radial * tubular) as usize);
    for i in 0..tubular {
        for j in 0..radial {
            let a = vertex(i, j);
            let b = vertex(i + 1, j);
            let c = vertex(i + 1, j + 1);
            let d = vertex(i, j + 1);
            indices.extend_from_slice(&[a, b, c]);
            indices.extend_from_slice(&[a, c, d]);
        }
    }

    SurfaceMesh::from_raw_buffers(&positions, &indices).unwrap()
}

/// Two coplanar triangles forming a unit square split along its diagonal.
#[must_use]
pub fn unit_square() -> SurfaceMesh {
    let positions = [
        0.0_f64, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        1.0, 1.0, 0.0, //
        0.0, 1.0, 0.0,
    ];
    SurfaceMesh::from_raw_buffers(&positions, &[0, 1, 2, 0, 2, 3]).unwrap()
}

/// Two triangles with no shared vertices (a disconnected mesh).
#[must_use]
pub fn disjoint_triangles() -> SurfaceMesh {
    let positions = [
        0.0_f64, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, //
        5.0, 0.0, 0.0, //
        6.0, 0.0, 0.0, //
        5.0, 1.0, 0.0,
    ];
    SurfaceMesh::from_raw_buffers(&positions, &[0, 1, 2, 3, 4, 5]).unwrap()
}
