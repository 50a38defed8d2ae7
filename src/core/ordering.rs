//! Cyclic ordering of waypoint edges for loop construction.
//!
//! A geodesic loop must traverse a set of waypoint edges whose cyclic order
//! is not given. FlipOut can only *shorten* a loop, so a poor initial order
//! is never repaired later; this module picks a good one up front with a
//! TSP-style heuristic: greedy nearest-neighbour construction over the
//! waypoint-edge endpoints, followed by a bounded 2-opt improvement pass.
//!
//! The self-crossing guard is deliberately conservative: a candidate
//! orientation is rejected when either endpoint already appears in the
//! partial ordering. Edges that cannot be placed under that rule are
//! collected as skipped; the caller decides whether that is fatal.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::collections::{FastHashMap, FastHashSet};
use crate::core::dijkstra::Dijkstra;
use crate::core::mesh::{EdgeKey, SurfaceMesh, VertexKey};

/// Default bound on 2-opt improvement sweeps.
pub const DEFAULT_MAX_2OPT_ITERATIONS: u32 = 100;

/// Options for the waypoint-edge ordering heuristic.
///
/// Build with [`OrderingOptionsBuilder`] or take [`OrderingOptions::default`].
///
/// # Examples
///
/// ```rust
/// use flipout::core::ordering::{OrderingOptions, OrderingOptionsBuilder};
///
/// let defaults = OrderingOptions::default();
/// assert!(defaults.use_nearest_neighbor);
/// assert_eq!(defaults.max_2opt_iterations, 100);
///
/// let custom = OrderingOptionsBuilder::default()
///     .use_2opt(false)
///     .build()
///     .unwrap();
/// assert!(!custom.use_2opt);
/// assert!(custom.use_nearest_neighbor);
/// ```
#[derive(Builder, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingOptions {
    /// Run greedy nearest-neighbour construction (otherwise the given order
    /// is kept).
    #[builder(default = "true")]
    pub use_nearest_neighbor: bool,
    /// Run the 2-opt improvement pass.
    #[builder(default = "true")]
    pub use_2opt: bool,
    /// Bound on 2-opt improvement sweeps.
    #[builder(default = "DEFAULT_MAX_2OPT_ITERATIONS")]
    pub max_2opt_iterations: u32,
    /// Reject candidates whose endpoints already appear in the ordering.
    #[builder(default = "true")]
    pub skip_crossing_edges: bool,
}

impl Default for OrderingOptions {
    fn default() -> Self {
        Self {
            use_nearest_neighbor: true,
            use_2opt: true,
            max_2opt_iterations: DEFAULT_MAX_2OPT_ITERATIONS,
            skip_crossing_edges: true,
        }
    }
}

/// A waypoint edge with the orientation the tour traverses it in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrientedWaypoint {
    /// The waypoint edge.
    pub edge: EdgeKey,
    /// The endpoint the tour enters through.
    pub entry: VertexKey,
    /// The endpoint the tour leaves through.
    pub exit: VertexKey,
}

/// The result of ordering a set of waypoint edges into a cyclic tour.
#[derive(Clone, Debug, Default)]
pub struct EdgeOrdering {
    /// The ordered waypoint edges with their traversal orientations.
    pub edges: Vec<OrientedWaypoint>,
    /// The tour as a flat vertex list (`entry, exit` per edge) with the
    /// first vertex repeated at the end to close the loop. Empty when no
    /// edge could be placed.
    pub vertices: Vec<VertexKey>,
    /// Waypoint edges the self-crossing guard could not place.
    pub skipped_edges: Vec<EdgeKey>,
    /// Estimated tour length: waypoint edge lengths plus Dijkstra connector
    /// distances.
    pub estimated_length: f64,
}

/// Orders waypoint edges into a short cyclic tour.
///
/// Builds a Dijkstra distance matrix between all waypoint endpoints, then
/// applies the configured construction and improvement passes. Unreachable
/// connectors make a candidate ineligible during construction and show up
/// as an infinite estimate if they survive into the final tour.
#[must_use]
pub fn order_edge_waypoints(
    mesh: &SurfaceMesh,
    edges: &[EdgeKey],
    options: &OrderingOptions,
) -> EdgeOrdering {
    if edges.is_empty() {
        return EdgeOrdering::default();
    }

    let matrix = DistanceMatrix::new(mesh, edges);

    let (mut ordered, skipped_edges) = if options.use_nearest_neighbor && edges.len() > 1 {
        nearest_neighbor_tour(mesh, edges, options, &matrix)
    } else {
        let tour = edges
            .iter()
            .map(|&edge| {
                let (entry, exit) = mesh.edge_endpoints(edge);
                OrientedWaypoint { edge, entry, exit }
            })
            .collect();
        (tour, Vec::new())
    };

    if options.use_2opt && ordered.len() > 2 {
        two_opt(mesh, &mut ordered, options.max_2opt_iterations, &matrix);
    }

    let estimated_length = tour_cost(mesh, &ordered, &matrix);
    let mut vertices = Vec::with_capacity(2 * ordered.len() + 1);
    for waypoint in &ordered {
        vertices.push(waypoint.entry);
        vertices.push(waypoint.exit);
    }
    if let Some(&first) = vertices.first() {
        vertices.push(first);
    }

    EdgeOrdering {
        edges: ordered,
        vertices,
        skipped_edges,
        estimated_length,
    }
}

// =============================================================================
// DISTANCE MATRIX
// =============================================================================

struct DistanceMatrix {
    distances: FastHashMap<(VertexKey, VertexKey), f64>,
}

impl DistanceMatrix {
    fn new(mesh: &SurfaceMesh, edges: &[EdgeKey]) -> Self {
        let mut candidates: Vec<VertexKey> = Vec::with_capacity(2 * edges.len());
        for &edge in edges {
            let (a, b) = mesh.edge_endpoints(edge);
            for vertex in [a, b] {
                if !candidates.contains(&vertex) {
                    candidates.push(vertex);
                }
            }
        }
        let dijkstra = Dijkstra::new(mesh);
        let mut distances = FastHashMap::default();
        for &source in &candidates {
            let tree = dijkstra.compute_shortest_path_tree(&[source], None);
            for &target in &candidates {
                if let Some(&distance) = tree.distances.get(target) {
                    distances.insert((source, target), distance);
                }
            }
        }
        Self { distances }
    }

    fn get(&self, from: VertexKey, to: VertexKey) -> Option<f64> {
        self.distances.get(&(from, to)).copied()
    }
}

// =============================================================================
// CONSTRUCTION AND IMPROVEMENT
// =============================================================================

fn nearest_neighbor_tour(
    mesh: &SurfaceMesh,
    edges: &[EdgeKey],
    options: &OrderingOptions,
    matrix: &DistanceMatrix,
) -> (Vec<OrientedWaypoint>, Vec<EdgeKey>) {
    let first = edges[0];
    let (entry, exit) = mesh.edge_endpoints(first);
    let mut ordered = vec![OrientedWaypoint {
        edge: first,
        entry,
        exit,
    }];
    let mut used: FastHashSet<VertexKey> = FastHashSet::default();
    used.insert(entry);
    used.insert(exit);

    let mut remaining: Vec<EdgeKey> = edges[1..].to_vec();
    let mut skipped = Vec::new();

    while !remaining.is_empty() {
        let cursor = ordered
            .last()
            .map(|waypoint| waypoint.exit)
            .unwrap_or(entry);
        let mut best: Option<(usize, VertexKey, VertexKey, f64)> = None;
        for (slot, &edge) in remaining.iter().enumerate() {
            let (a, b) = mesh.edge_endpoints(edge);
            for (candidate_entry, candidate_exit) in [(a, b), (b, a)] {
                if options.skip_crossing_edges
                    && (used.contains(&candidate_entry) || used.contains(&candidate_exit))
                {
                    continue;
                }
                let Some(cost) = matrix.get(cursor, candidate_entry) else {
                    continue;
                };
                let better = best
                    .map_or(true, |(_, _, _, incumbent)| {
                        OrderedFloat(cost) < OrderedFloat(incumbent)
                    });
                if better {
                    best = Some((slot, candidate_entry, candidate_exit, cost));
                }
            }
        }
        match best {
            Some((slot, candidate_entry, candidate_exit, _)) => {
                let edge = remaining.remove(slot);
                ordered.push(OrientedWaypoint {
                    edge,
                    entry: candidate_entry,
                    exit: candidate_exit,
                });
                used.insert(candidate_entry);
                used.insert(candidate_exit);
            }
            None => {
                // Nothing placeable is left; everything remaining is skipped.
                skipped.append(&mut remaining);
            }
        }
    }
    (ordered, skipped)
}

fn tour_cost(mesh: &SurfaceMesh, tour: &[OrientedWaypoint], matrix: &DistanceMatrix) -> f64 {
    let mut total = 0.0;
    for (index, waypoint) in tour.iter().enumerate() {
        total += mesh.edge_length(waypoint.edge);
        let next = &tour[(index + 1) % tour.len()];
        if next.entry != waypoint.exit {
            total += matrix
                .get(waypoint.exit, next.entry)
                .unwrap_or(f64::INFINITY);
        }
    }
    total
}

/// Reverses tour segments (flipping orientations) while that strictly
/// shortens the tour, bounded by `max_iterations` sweeps.
fn two_opt(
    mesh: &SurfaceMesh,
    tour: &mut Vec<OrientedWaypoint>,
    max_iterations: u32,
    matrix: &DistanceMatrix,
) {
    let mut best_cost = tour_cost(mesh, tour, matrix);
    for _ in 0..max_iterations {
        let mut improved = false;
        for from in 1..tour.len() {
            for to in from..tour.len() {
                let mut candidate = tour.clone();
                candidate[from..=to].reverse();
                for waypoint in &mut candidate[from..=to] {
                    std::mem::swap(&mut waypoint.entry, &mut waypoint.exit);
                }
                let cost = tour_cost(mesh, &candidate, matrix);
                if cost + 1e-12 < best_cost {
                    *tour = candidate;
                    best_cost = cost;
                    improved = true;
                }
            }
        }
        if !improved {
            break;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// A flat strip of unit squares: vertices in two rows, squares split
    /// along one diagonal each.
    fn strip(columns: u32) -> SurfaceMesh {
        let mut positions = Vec::new();
        for x in 0..=columns {
            positions.extend_from_slice(&[f64::from(x), 0.0, 0.0]);
            positions.extend_from_slice(&[f64::from(x), 1.0, 0.0]);
        }
        let mut indices = Vec::new();
        for x in 0..columns {
            let base = 2 * x;
            // Lower-left, lower-right, upper-right / lower-left, upper-right,
            // upper-left.
            indices.extend_from_slice(&[base, base + 2, base + 3]);
            indices.extend_from_slice(&[base, base + 3, base + 1]);
        }
        SurfaceMesh::from_raw_buffers(&positions, &indices).unwrap()
    }

    #[test]
    fn single_edge_tour_is_trivial() {
        let mesh = strip(3);
        let edge = mesh.edge_key(0).unwrap();
        let ordering = order_edge_waypoints(&mesh, &[edge], &OrderingOptions::default());
        assert_eq!(ordering.edges.len(), 1);
        assert!(ordering.skipped_edges.is_empty());
        assert_eq!(ordering.vertices.len(), 3);
        assert_eq!(ordering.vertices[0], *ordering.vertices.last().unwrap());
    }

    #[test]
    fn nearest_neighbor_prefers_close_edges() {
        let mesh = strip(6);
        let v = |i: usize| mesh.vertex_key(i).unwrap();
        // Vertical rungs at columns 0, 3, and 6.
        let rung0 = mesh.find_edge(v(0), v(1)).unwrap();
        let rung3 = mesh.find_edge(v(6), v(7)).unwrap();
        let rung6 = mesh.find_edge(v(12), v(13)).unwrap();

        let ordering = order_edge_waypoints(
            &mesh,
            &[rung0, rung6, rung3],
            &OrderingOptions::default(),
        );
        assert!(ordering.skipped_edges.is_empty());
        assert_eq!(ordering.edges.len(), 3);
        // The middle rung must be visited between the outer two.
        let tour_edges: Vec<EdgeKey> = ordering.edges.iter().map(|w| w.edge).collect();
        assert_eq!(tour_edges[0], rung0);
        assert_eq!(tour_edges[1], rung3);
        assert_eq!(tour_edges[2], rung6);
        assert!(ordering.estimated_length.is_finite());
    }

    #[test]
    fn two_opt_untangles_a_bad_given_order() {
        let mesh = strip(6);
        let v = |i: usize| mesh.vertex_key(i).unwrap();
        let rung0 = mesh.find_edge(v(0), v(1)).unwrap();
        let rung3 = mesh.find_edge(v(6), v(7)).unwrap();
        let rung6 = mesh.find_edge(v(12), v(13)).unwrap();

        let keep_order = OrderingOptionsBuilder::default()
            .use_nearest_neighbor(false)
            .use_2opt(false)
            .build()
            .unwrap();
        let naive = order_edge_waypoints(&mesh, &[rung0, rung6, rung3], &keep_order);

        let improved_options = OrderingOptionsBuilder::default()
            .use_nearest_neighbor(false)
            .build()
            .unwrap();
        let improved = order_edge_waypoints(&mesh, &[rung0, rung6, rung3], &improved_options);

        assert!(improved.estimated_length <= naive.estimated_length + 1e-9);
    }

    #[test]
    fn crossing_guard_skips_shared_endpoint_edges() {
        let mesh = strip(3);
        let v = |i: usize| mesh.vertex_key(i).unwrap();
        // Two edges sharing vertex 0: the guard cannot place the second.
        let rung = mesh.find_edge(v(0), v(1)).unwrap();
        let bottom = mesh.find_edge(v(0), v(2)).unwrap();
        let ordering =
            order_edge_waypoints(&mesh, &[rung, bottom], &OrderingOptions::default());
        assert_eq!(ordering.edges.len(), 1);
        assert_eq!(ordering.skipped_edges, vec![bottom]);

        // With the guard off both edges are placed.
        let permissive = OrderingOptionsBuilder::default()
            .skip_crossing_edges(false)
            .build()
            .unwrap();
        let ordering = order_edge_waypoints(&mesh, &[rung, bottom], &permissive);
        assert_eq!(ordering.edges.len(), 2);
        assert!(ordering.skipped_edges.is_empty());
    }

    #[test]
    fn estimated_length_counts_edges_and_connectors() {
        let mesh = strip(2);
        let v = |i: usize| mesh.vertex_key(i).unwrap();
        let rung0 = mesh.find_edge(v(0), v(1)).unwrap();
        let rung2 = mesh.find_edge(v(4), v(5)).unwrap();
        let ordering =
            order_edge_waypoints(&mesh, &[rung0, rung2], &OrderingOptions::default());
        // Two unit rungs plus two unit-2 connectors along the strip.
        assert_relative_eq!(ordering.estimated_length, 6.0, epsilon = 1e-9);
    }
}
