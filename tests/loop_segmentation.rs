//! End-to-end scenarios for waypoint loops and face segmentation.
//!
//! ## Test Coverage
//!
//! - Geodesic loop through waypoint edges on a torus
//! - Loop closure of the exported polyline
//! - Segmentation totals and positive region areas
//! - Skip accounting (`require_all_edges`, `max_skipped_edges`)

mod helpers;

use flipout::prelude::*;
use helpers::torus;

fn torus_mesh() -> SurfaceMesh {
    torus(16, 32, 1.0, 0.4)
}

#[test]
fn torus_counts() {
    let mesh = torus_mesh();
    assert_eq!(mesh.number_of_vertices(), 512);
    assert_eq!(mesh.number_of_faces(), 1024);
    assert_eq!(mesh.number_of_edges(), 1536);
    assert_eq!(mesh.euler_characteristic(), 0);
    assert!(mesh.is_valid().is_ok());
}

#[test]
fn torus_waypoint_loop_segments_the_surface() {
    let mesh = torus_mesh();
    let edge_count = mesh.number_of_edges();
    let waypoints = [
        0,
        edge_count / 4,
        edge_count / 2,
        3 * edge_count / 4,
    ];

    let mut network =
        LoopNetwork::from_edge_waypoints(mesh, &waypoints, LoopOptions::default()).unwrap();
    assert!(network.geodesic_loop().edges().len() >= 3);

    let initial = network.total_length();
    let result = network.compute();

    // Shortening never lengthens the loop.
    assert!(result.report.final_length <= initial + 1e-10);
    assert!(result.stats.final_length <= result.stats.initial_length + 1e-10);
    assert_eq!(result.stats.waypoint_edges, 4);
    assert!(network.mesh().is_valid().is_ok());

    // Every face is classified exactly once.
    let counted = result.segmentation.count(FaceRegion::Inside)
        + result.segmentation.count(FaceRegion::Outside)
        + result.segmentation.count(FaceRegion::Boundary);
    assert_eq!(counted, network.mesh().number_of_faces());

    // Both sides of the loop carry real area.
    assert!(result.segmentation.area(FaceRegion::Inside) > 0.0);
    assert!(result.segmentation.area(FaceRegion::Outside) > 0.0);

    // Region iterators agree with the counts.
    assert_eq!(
        result.segmentation.faces_in(FaceRegion::Inside).count(),
        result.segmentation.count(FaceRegion::Inside)
    );
}

#[test]
fn loop_polyline_closes() {
    let mesh = torus_mesh();
    let edge_count = mesh.number_of_edges();
    let waypoints = [0, edge_count / 4, edge_count / 2, 3 * edge_count / 4];

    let mut network =
        LoopNetwork::from_edge_waypoints(mesh, &waypoints, LoopOptions::default()).unwrap();
    network.compute();

    let polyline = network.loop_polyline_3d();
    assert!(polyline.len() >= 4);
    let first = polyline.first().unwrap();
    let last = polyline.last().unwrap();
    assert!(first.distance(last) < 1e-5);
}

/// Waypoint indices where two edges share vertex 0 (tripping the
/// conservative crossing guard) and a third sits far away.
fn waypoints_with_one_unplaceable(mesh: &SurfaceMesh) -> Vec<usize> {
    let shared = mesh.vertex_key(0).unwrap();
    let incident = mesh.neighbors(shared);
    let first = incident[0].1;
    let second = incident[1].1;
    let far_index = mesh.number_of_edges() / 2;
    let index_of = |target: EdgeKey| mesh.edge_keys().position(|e| e == target).unwrap();
    vec![index_of(first), index_of(second), far_index]
}

#[test]
fn require_all_edges_rejects_skips() {
    let mesh = torus_mesh();
    let indices = waypoints_with_one_unplaceable(&mesh);

    let strict = LoopOptionsBuilder::default()
        .require_all_edges(true)
        .build()
        .unwrap();
    let result = LoopNetwork::from_edge_waypoints(torus_mesh(), &indices, strict);
    assert!(matches!(
        result,
        Err(NetworkError::TooManySkippedEdges {
            skipped: 1,
            allowed: 0
        })
    ));

    // The permissive default drops the unplaceable edge and proceeds.
    let permissive =
        LoopNetwork::from_edge_waypoints(torus_mesh(), &indices, LoopOptions::default()).unwrap();
    assert_eq!(permissive.skipped_edges().len(), 1);
    assert!(permissive.geodesic_loop().edges().len() >= 3);
}

#[test]
fn max_skipped_edges_bounds_the_drop() {
    let mesh = torus_mesh();
    let indices = waypoints_with_one_unplaceable(&mesh);

    let bounded = LoopOptionsBuilder::default()
        .max_skipped_edges(Some(0_u32))
        .build()
        .unwrap();
    let result = LoopNetwork::from_edge_waypoints(torus_mesh(), &indices, bounded);
    assert!(matches!(
        result,
        Err(NetworkError::TooManySkippedEdges { .. })
    ));

    // A bound of one admits the single skip.
    let relaxed = LoopOptionsBuilder::default()
        .max_skipped_edges(Some(1_u32))
        .build()
        .unwrap();
    assert!(LoopNetwork::from_edge_waypoints(torus_mesh(), &indices, relaxed).is_ok());
}

#[test]
fn out_of_range_waypoint_edge_is_rejected() {
    let mesh = torus_mesh();
    let count = mesh.number_of_edges();
    let result = LoopNetwork::from_edge_waypoints(mesh, &[0, count], LoopOptions::default());
    assert!(matches!(
        result,
        Err(NetworkError::EdgeIndexOutOfRange { index, count: c }) if index == count && c == count
    ));
}
