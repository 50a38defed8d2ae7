//! Deterministic integration tests for the mesh structure and edge flips.
//!
//! ## Test Coverage
//!
//! - Build invariants on closed and bounded meshes
//! - Euler characteristic preservation under flip sequences
//! - The flat-quad flip and its exact length reversibility
//! - Boundary behaviour of single triangles
//! - `make_delaunay` termination and idempotence
//! - Raw-buffer export / re-ingest round trips
//!
//! For property-based coverage with random flip sequences, see
//! `proptest_surface.rs`.

mod helpers;

use approx::assert_relative_eq;
use flipout::prelude::*;
use helpers::{disjoint_triangles, icosahedron, icosphere, unit_square};

// =============================================================================
// BUILD INVARIANTS
// =============================================================================

#[test]
fn icosahedron_counts_and_validity() {
    let mesh = icosahedron();
    assert_eq!(mesh.number_of_vertices(), 12);
    assert_eq!(mesh.number_of_edges(), 30);
    assert_eq!(mesh.number_of_faces(), 20);
    assert_eq!(mesh.number_of_halfedges(), 60);
    assert_eq!(mesh.euler_characteristic(), 2);
    assert!(mesh.is_valid().is_ok());

    // A closed mesh has no boundary edges and degree-5 vertices.
    assert_eq!(mesh.interior_edges().count(), 30);
    for vertex in mesh.vertex_keys() {
        assert_eq!(mesh.vertex_degree(vertex), 5);
        assert!(!mesh.is_boundary_vertex(vertex));
    }
}

#[test]
fn icosphere_subdivision_counts() {
    let mesh = icosphere(2);
    assert_eq!(mesh.number_of_vertices(), 162);
    assert_eq!(mesh.number_of_faces(), 320);
    assert_eq!(mesh.number_of_edges(), 480);
    assert_eq!(mesh.euler_characteristic(), 2);
    assert!(mesh.is_valid().is_ok());
}

#[test]
fn every_face_satisfies_strict_triangle_inequality() {
    let mesh = icosphere(1);
    for face in mesh.face_keys() {
        let [a, b, c] = mesh.face_edge_lengths(face);
        assert!(a + b > c && b + c > a && c + a > b);
        assert!(mesh.face_area(face).unwrap() > 0.0);
    }
}

#[test]
fn disconnected_meshes_build_fine() {
    let mesh = disjoint_triangles();
    assert_eq!(mesh.number_of_vertices(), 6);
    assert_eq!(mesh.number_of_faces(), 2);
    assert!(mesh.is_valid().is_ok());
    assert_eq!(mesh.euler_characteristic(), 2);
}

// =============================================================================
// FLIP SEQUENCES
// =============================================================================

#[test]
fn flip_sequences_preserve_euler_characteristic() {
    let mut mesh = icosphere(1);
    let chi = mesh.euler_characteristic();
    let edges: Vec<EdgeKey> = mesh.edge_keys().collect();

    let mut flipped = 0;
    for &edge in edges.iter().step_by(3) {
        if mesh.flip_edge(edge) {
            flipped += 1;
            assert_eq!(mesh.euler_characteristic(), chi);
        }
    }
    assert!(flipped > 0);
    assert!(mesh.is_valid().is_ok());
}

#[test]
fn flat_quad_flip_has_sqrt_two_diagonal() {
    let mut mesh = unit_square();
    let diagonal = mesh.interior_edges().next().unwrap();
    assert_relative_eq!(
        mesh.edge_length(diagonal),
        std::f64::consts::SQRT_2,
        epsilon = 1e-12
    );

    // The other diagonal of the unit square has the same length.
    assert!(mesh.flip_edge(diagonal));
    assert_relative_eq!(
        mesh.edge_length(diagonal),
        std::f64::consts::SQRT_2,
        epsilon = 1e-12
    );
    assert!(mesh.is_valid().is_ok());

    // Flipping twice restores the original endpoints and length exactly.
    let before = mesh.edge_length(diagonal);
    assert!(mesh.flip_edge(diagonal));
    assert!(mesh.flip_edge(diagonal));
    assert_relative_eq!(mesh.edge_length(diagonal), before);
}

#[test]
fn single_triangle_is_all_boundary() {
    let positions = [0.0_f64, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let mut mesh = SurfaceMesh::from_raw_buffers(&positions, &[0, 1, 2]).unwrap();
    assert_eq!(mesh.interior_edges().count(), 0);

    let edges: Vec<EdgeKey> = mesh.edge_keys().collect();
    for edge in edges {
        assert!(mesh.is_boundary_edge(edge));
        assert!(!mesh.flip_edge(edge));
    }
    assert_eq!(mesh.make_delaunay(), 0);
}

// =============================================================================
// DELAUNAY UTILITY
// =============================================================================

#[test]
fn make_delaunay_is_idempotent_after_scrambling() {
    let mut mesh = icosphere(1);
    // Scramble the triangulation with a deterministic flip sequence.
    let edges: Vec<EdgeKey> = mesh.edge_keys().collect();
    for &edge in edges.iter().step_by(2) {
        mesh.flip_edge(edge);
    }
    assert!(mesh.is_valid().is_ok());

    let first_pass = mesh.make_delaunay();
    assert!(mesh.edge_keys().all(|e| mesh.is_delaunay(e)));
    assert!(mesh.is_valid().is_ok());

    let second_pass = mesh.make_delaunay();
    assert_eq!(second_pass, 0);
    // The scrambled mesh needed work; the fixed point is genuine.
    assert!(first_pass > 0);
}

// =============================================================================
// EXPORT ROUND TRIP
// =============================================================================

#[test]
fn export_reingest_preserves_counts() {
    let mesh = icosphere(1);
    let (positions, indices) = mesh.to_raw_buffers();
    assert_eq!(positions.len(), 3 * mesh.number_of_vertices());
    assert_eq!(indices.len(), 3 * mesh.number_of_faces());

    let rebuilt = SurfaceMesh::from_raw_buffers(&positions, &indices).unwrap();
    assert_eq!(rebuilt.number_of_vertices(), mesh.number_of_vertices());
    assert_eq!(rebuilt.number_of_edges(), mesh.number_of_edges());
    assert_eq!(rebuilt.number_of_faces(), mesh.number_of_faces());
    assert!(rebuilt.is_valid().is_ok());
}

#[test]
fn f32_buffers_are_accepted() {
    let positions: Vec<f32> = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let mesh = SurfaceMesh::from_raw_buffers(&positions, &[0, 1, 2]).unwrap();
    assert_eq!(mesh.number_of_vertices(), 3);
    let edge = mesh.edge_key(0).unwrap();
    assert!(mesh.edge_length(edge) > 0.0);
}
