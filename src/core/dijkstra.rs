//! Shortest-path bootstrap over the vertex graph.
//!
//! FlipOut only ever *shortens* a path, so it needs an initial edge path to
//! start from. [`Dijkstra`] provides that bootstrap: a standard binary-heap
//! sweep over the vertex graph with the intrinsic edge lengths as weights,
//! supporting multi-source initialisation and early termination at a target.
//!
//! Unreachability is an expected outcome, not an error:
//! [`compute_path`](Dijkstra::compute_path) returns `None` so callers can
//! compose multi-segment searches.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use slotmap::SecondaryMap;

use crate::core::mesh::{EdgeKey, SurfaceMesh, VertexKey};
use crate::core::path::{GeodesicPath, PathError};

/// A predecessor link in a shortest-path tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParentLink {
    /// The vertex this one was reached from.
    pub vertex: VertexKey,
    /// The edge traversed from the parent.
    pub edge: EdgeKey,
}

/// The result of a shortest-path sweep.
///
/// Distances and parents are populated for every vertex settled before the
/// sweep terminated; source vertices have distance zero and no parent.
#[derive(Clone, Debug, Default)]
pub struct ShortestPathTree {
    /// Shortest known distance per settled vertex.
    pub distances: SecondaryMap<VertexKey, f64>,
    /// Predecessor link per settled non-source vertex.
    pub parents: SecondaryMap<VertexKey, ParentLink>,
    /// Whether the optional target was settled before termination.
    pub target_reached: bool,
}

/// Dijkstra shortest paths over a mesh's vertex graph.
///
/// Borrows the mesh immutably; run the bootstrap before handing the mesh to
/// a shortening network.
///
/// # Examples
///
/// ```rust
/// use flipout::core::dijkstra::Dijkstra;
/// use flipout::core::mesh::SurfaceMesh;
///
/// let positions = [
///     0.0_f64, 0.0, 0.0, //
///     1.0, 0.0, 0.0, //
///     1.0, 1.0, 0.0, //
///     0.0, 1.0, 0.0,
/// ];
/// let mesh = SurfaceMesh::from_raw_buffers(&positions, &[0, 1, 2, 0, 2, 3]).unwrap();
/// let dijkstra = Dijkstra::new(&mesh);
///
/// let v1 = mesh.vertex_key(1).unwrap();
/// let v3 = mesh.vertex_key(3).unwrap();
///
/// // Vertices 1 and 3 are not adjacent; the path detours over a corner.
/// let path = dijkstra.compute_path(v1, v3).unwrap();
/// assert_eq!(path.edges().len(), 2);
/// assert!((path.length() - 2.0).abs() < 1e-12);
///
/// // Identical endpoints yield no path.
/// assert!(dijkstra.compute_path(v1, v1).is_none());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Dijkstra<'m> {
    mesh: &'m SurfaceMesh,
}

impl<'m> Dijkstra<'m> {
    /// Creates a bootstrap bound to a mesh.
    #[must_use]
    pub const fn new(mesh: &'m SurfaceMesh) -> Self {
        Self { mesh }
    }

    /// Runs a multi-source sweep, optionally terminating early at `target`.
    ///
    /// All `sources` start at distance zero. When `target` is given the
    /// sweep stops as soon as the target is settled and
    /// [`ShortestPathTree::target_reached`] reports the outcome; otherwise
    /// the full tree over the reachable component is computed.
    #[must_use]
    pub fn compute_shortest_path_tree(
        &self,
        sources: &[VertexKey],
        target: Option<VertexKey>,
    ) -> ShortestPathTree {
        let mut tree = ShortestPathTree::default();
        let mut settled: SecondaryMap<VertexKey, ()> = SecondaryMap::new();
        let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, VertexKey)>> = BinaryHeap::new();

        for &source in sources {
            tree.distances.insert(source, 0.0);
            heap.push(Reverse((OrderedFloat(0.0), source)));
        }

        while let Some(Reverse((OrderedFloat(distance), vertex))) = heap.pop() {
            if settled.contains_key(vertex) {
                continue;
            }
            settled.insert(vertex, ());
            if target == Some(vertex) {
                tree.target_reached = true;
                break;
            }
            for (neighbor, edge) in self.mesh.neighbors(vertex) {
                if settled.contains_key(neighbor) {
                    continue;
                }
                let candidate = distance + self.mesh.edge_length(edge);
                let improves = tree
                    .distances
                    .get(neighbor)
                    .map_or(true, |&known| candidate < known);
                if improves {
                    tree.distances.insert(neighbor, candidate);
                    tree.parents.insert(neighbor, ParentLink { vertex, edge });
                    heap.push(Reverse((OrderedFloat(candidate), neighbor)));
                }
            }
        }
        tree
    }

    /// Computes the shortest edge path between two vertices.
    ///
    /// Returns `None` when the target is unreachable or when
    /// `source == target` (a trivial empty path is rejected).
    #[must_use]
    pub fn compute_path(&self, source: VertexKey, target: VertexKey) -> Option<GeodesicPath> {
        if source == target {
            return None;
        }
        let tree = self.compute_shortest_path_tree(&[source], Some(target));
        if !tree.target_reached {
            return None;
        }

        let mut edges = Vec::new();
        let mut cursor = target;
        while cursor != source {
            let link = tree.parents.get(cursor)?;
            edges.push(link.edge);
            cursor = link.vertex;
        }
        edges.reverse();
        GeodesicPath::new(self.mesh, source, target, edges).ok()
    }

    /// Computes a piecewise path visiting the waypoints in order.
    ///
    /// Consecutive duplicate waypoints are rejected the same way
    /// [`compute_path`](Self::compute_path) rejects equal endpoints: the
    /// segment is unreachable as a non-trivial path, so the whole result is
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::TooFewWaypoints`] when fewer than two waypoints
    /// are given. Unreachable segments are *not* an error; they lift the
    /// whole result to `Ok(None)`.
    pub fn compute_piecewise_path(
        &self,
        waypoints: &[VertexKey],
    ) -> Result<Option<Vec<GeodesicPath>>, PathError> {
        if waypoints.len() < 2 {
            return Err(PathError::TooFewWaypoints {
                count: waypoints.len(),
            });
        }
        let mut segments = Vec::with_capacity(waypoints.len() - 1);
        for pair in waypoints.windows(2) {
            match self.compute_path(pair[0], pair[1]) {
                Some(path) => segments.push(path),
                None => return Ok(None),
            }
        }
        Ok(Some(segments))
    }
}

// =============================================================================
// TESTS
// =============================================================================
