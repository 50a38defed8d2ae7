//! Geodesic path and loop containers.
//!
//! A [`GeodesicPath`] is an ordered, edge-connected sequence of mesh edges
//! with designated endpoints; a [`GeodesicLoop`] is its cyclic counterpart
//! with a *base vertex* that is simultaneously start and end. Both hold
//! non-owning keys into the mesh; keys stay valid across flips because the
//! mesh never deletes entities.
//!
//! The containers cache their total length; callers must invoke
//! [`update_length`](GeodesicPath::update_length) after any mutation of the
//! underlying edge lengths.
//!
//! The wedge angle at an interior vertex is defined through the signpost
//! index: the CCW angle from the *reversed incoming* halfedge to the
//! *outgoing* halfedge along the path. A path is geodesic at a vertex when
//! that angle is at least π on both sides; since the two sides sum to the
//! vertex's total fan angle, the canonical side alone is tested.

use thiserror::Error;

use crate::core::mesh::{EdgeKey, SurfaceMesh, VertexKey};
use crate::core::signpost::SignpostIndex;

/// Errors raised when constructing or mutating paths and loops.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// A path needs at least one edge.
    #[error("Path has no edges")]
    EmptyPath,
    /// A loop needs at least three edges.
    #[error("Loop has {count} edges but needs at least 3")]
    TooFewLoopEdges {
        /// Number of edges supplied.
        count: usize,
    },
    /// Consecutive edges do not share a vertex.
    #[error("Edges {index} and {later} do not share a vertex", later = .index + 1)]
    DisconnectedEdges {
        /// Position of the first edge of the broken pair.
        index: usize,
    },
    /// The edge walk does not start or end at the declared endpoint.
    #[error("Edge sequence does not match the declared endpoints")]
    EndpointMismatch,
    /// A piecewise computation needs at least two waypoints.
    #[error("Piecewise path has {count} waypoints but needs at least 2")]
    TooFewWaypoints {
        /// Number of waypoints supplied.
        count: usize,
    },
}

// =============================================================================
// OPEN PATHS
// =============================================================================

/// An ordered, edge-connected path between two mesh vertices.
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
/// let v1 = mesh.vertex_key(1).unwrap();
/// let v3 = mesh.vertex_key(3).unwrap();
///
/// let path = Dijkstra::new(&mesh).compute_path(v1, v3).unwrap();
/// let vertices = path.vertices(&mesh);
/// assert_eq!(vertices.len(), path.edges().len() + 1);
/// assert_eq!(vertices[0], v1);
/// assert_eq!(*vertices.last().unwrap(), v3);
/// assert_eq!(path.interior_vertices(&mesh).len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct GeodesicPath {
    edges: Vec<EdgeKey>,
    start: VertexKey,
    end: VertexKey,
    length: f64,
}

impl GeodesicPath {
    /// Creates a path after validating edge connectivity and endpoints.
    ///
    /// # Errors
    ///
    /// Returns a [`PathError`] when the edge list is empty, consecutive
    /// edges do not share a vertex, or the walk does not connect `start` to
    /// `end`.
    pub fn new(
        mesh: &SurfaceMesh,
        start: VertexKey,
        end: VertexKey,
        edges: Vec<EdgeKey>,
    ) -> Result<Self, PathError> {
        if edges.is_empty() {
            return Err(PathError::EmptyPath);
        }
        let mut cursor = start;
        for (index, &edge) in edges.iter().enumerate() {
            match mesh.edge_other_endpoint(edge, cursor) {
                Some(next) => cursor = next,
                None => {
                    return Err(if index == 0 {
                        PathError::EndpointMismatch
                    } else {
                        PathError::DisconnectedEdges { index: index - 1 }
                    });
                }
            }
        }
        if cursor != end {
            return Err(PathError::EndpointMismatch);
        }
        let mut path = Self {
            edges,
            start,
            end,
            length: 0.0,
        };
        path.update_length(mesh);
        Ok(path)
    }

    /// The edge sequence.
    #[must_use]
    pub fn edges(&self) -> &[EdgeKey] {
        &self.edges
    }

    pub(crate) fn edges_mut(&mut self) -> &mut Vec<EdgeKey> {
        &mut self.edges
    }

    /// The start vertex.
    #[inline]
    #[must_use]
    pub const fn start(&self) -> VertexKey {
        self.start
    }

    /// The end vertex.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> VertexKey {
        self.end
    }

    /// The cached total length.
    #[inline]
    #[must_use]
    pub const fn length(&self) -> f64 {
        self.length
    }

    /// Recomputes and caches the total length from the current edge metric.
    pub fn update_length(&mut self, mesh: &SurfaceMesh) -> f64 {
        self.length = self.edges.iter().map(|&edge| mesh.edge_length(edge)).sum();
        self.length
    }

    /// The vertex sequence, reconstructed by walking across each edge.
    ///
    /// Has exactly `edges().len() + 1` entries, starting at
    /// [`start`](Self::start) and ending at [`end`](Self::end).
    #[must_use]
    pub fn vertices(&self, mesh: &SurfaceMesh) -> Vec<VertexKey> {
        let mut result = Vec::with_capacity(self.edges.len() + 1);
        let mut cursor = self.start;
        result.push(cursor);
        for &edge in &self.edges {
            // Connectivity was validated at construction and preserved by
            // every splice.
            if let Some(next) = mesh.edge_other_endpoint(edge, cursor) {
                cursor = next;
                result.push(cursor);
            }
        }
        result
    }

    /// The interior vertices (everything but start and end).
    #[must_use]
    pub fn interior_vertices(&self, mesh: &SurfaceMesh) -> Vec<VertexKey> {
        let vertices = self.vertices(mesh);
        if vertices.len() <= 2 {
            return Vec::new();
        }
        vertices[1..vertices.len() - 1].to_vec()
    }

    /// Whether the path visits the given vertex.
    #[must_use]
    pub fn contains_vertex(&self, mesh: &SurfaceMesh, vertex: VertexKey) -> bool {
        self.vertices(mesh).contains(&vertex)
    }

    /// Whether the path uses the given edge.
    #[must_use]
    pub fn contains_edge(&self, edge: EdgeKey) -> bool {
        self.edges.contains(&edge)
    }

    /// The position of the first visit to `vertex` in the vertex sequence.
    #[must_use]
    pub fn vertex_index(&self, mesh: &SurfaceMesh, vertex: VertexKey) -> Option<usize> {
        self.vertices(mesh).iter().position(|&v| v == vertex)
    }

    /// The wedge angle at the interior vertex of corner `index`.
    ///
    /// Corner `index` sits between `edges()[index - 1]` and
    /// `edges()[index]`, so valid indices are `1..edges().len()`. The angle
    /// is the signpost CCW difference from the reversed incoming halfedge
    /// to the outgoing halfedge; `None` when either direction does not
    /// exist (boundary edge without the needed halfedge).
    #[must_use]
    pub fn wedge_angle_at_corner(
        &self,
        mesh: &SurfaceMesh,
        signpost: &SignpostIndex,
        index: usize,
    ) -> Option<f64> {
        if index == 0 || index >= self.edges.len() {
            return None;
        }
        let vertex = self.vertices(mesh)[index];
        corner_wedge_angle(
            mesh,
            signpost,
            self.edges[index - 1],
            self.edges[index],
            vertex,
        )
    }

    /// The wedge angle at an interior vertex, if the vertex is interior and
    /// both path directions exist there.
    #[must_use]
    pub fn angle_at_interior_vertex(
        &self,
        mesh: &SurfaceMesh,
        signpost: &SignpostIndex,
        vertex: VertexKey,
    ) -> Option<f64> {
        let index = self.vertex_index(mesh, vertex)?;
        self.wedge_angle_at_corner(mesh, signpost, index)
    }
}

// =============================================================================
// CLOSED LOOPS
// =============================================================================

/// A cyclic, edge-connected loop with a base vertex.
///
/// Every vertex of a loop is interior, the base vertex included: the
/// "incoming" edge at the base is the last edge of the loop and the
/// "outgoing" edge is the first.
#[derive(Clone, Debug, PartialEq)]
pub struct GeodesicLoop {
    edges: Vec<EdgeKey>,
    base: VertexKey,
    length: f64,
}

impl GeodesicLoop {
    /// Creates a loop after validating cyclic connectivity.
    ///
    /// # Errors
    ///
    /// Returns a [`PathError`] when fewer than three edges are given,
    /// consecutive edges do not share a vertex, or the walk from the base
    /// vertex does not return to it.
    pub fn new(
        mesh: &SurfaceMesh,
        base: VertexKey,
        edges: Vec<EdgeKey>,
    ) -> Result<Self, PathError> {
        if edges.len() < 3 {
            return Err(PathError::TooFewLoopEdges { count: edges.len() });
        }
        let mut cursor = base;
        for (index, &edge) in edges.iter().enumerate() {
            match mesh.edge_other_endpoint(edge, cursor) {
                Some(next) => cursor = next,
                None => {
                    return Err(if index == 0 {
                        PathError::EndpointMismatch
                    } else {
                        PathError::DisconnectedEdges { index: index - 1 }
                    });
                }
            }
        }
        if cursor != base {
            return Err(PathError::EndpointMismatch);
        }
        let mut cycle = Self {
            edges,
            base,
            length: 0.0,
        };
        cycle.update_length(mesh);
        Ok(cycle)
    }

    /// The cyclic edge sequence.
    #[must_use]
    pub fn edges(&self) -> &[EdgeKey] {
        &self.edges
    }

    pub(crate) fn edges_mut(&mut self) -> &mut Vec<EdgeKey> {
        &mut self.edges
    }

    pub(crate) fn set_base(&mut self, base: VertexKey) {
        self.base = base;
    }

    /// The base vertex (simultaneously start and end).
    #[inline]
    #[must_use]
    pub const fn base_vertex(&self) -> VertexKey {
        self.base
    }

    /// The cached total length.
    #[inline]
    #[must_use]
    pub const fn length(&self) -> f64 {
        self.length
    }

    /// Recomputes and caches the total length from the current edge metric.
    pub fn update_length(&mut self, mesh: &SurfaceMesh) -> f64 {
        self.length = self.edges.iter().map(|&edge| mesh.edge_length(edge)).sum();
        self.length
    }

    /// The vertex cycle, starting at the base vertex.
    ///
    /// Has exactly `edges().len()` entries; the closing copy of the base
    /// vertex is not repeated.
    #[must_use]
    pub fn vertices(&self, mesh: &SurfaceMesh) -> Vec<VertexKey> {
        let mut result = Vec::with_capacity(self.edges.len());
        let mut cursor = self.base;
        result.push(cursor);
        for &edge in &self.edges[..self.edges.len() - 1] {
            if let Some(next) = mesh.edge_other_endpoint(edge, cursor) {
                cursor = next;
                result.push(cursor);
            }
        }
        result
    }

    /// The interior vertices — for a loop, every vertex.
    #[must_use]
    pub fn interior_vertices(&self, mesh: &SurfaceMesh) -> Vec<VertexKey> {
        self.vertices(mesh)
    }

    /// Whether the loop visits the given vertex.
    #[must_use]
    pub fn contains_vertex(&self, mesh: &SurfaceMesh, vertex: VertexKey) -> bool {
        self.vertices(mesh).contains(&vertex)
    }

    /// Whether the loop uses the given edge.
    #[must_use]
    pub fn contains_edge(&self, edge: EdgeKey) -> bool {
        self.edges.contains(&edge)
    }

    /// The incoming and outgoing edges at cyclic corner `index`.
    ///
    /// Corner `0` is the base vertex, between the last and first edges.
    #[must_use]
    pub fn corner_edges(&self, index: usize) -> (EdgeKey, EdgeKey) {
        let count = self.edges.len();
        let incoming = self.edges[(index + count - 1) % count];
        let outgoing = self.edges[index % count];
        (incoming, outgoing)
    }

    /// The wedge angle at cyclic corner `index`; see
    /// [`GeodesicPath::wedge_angle_at_corner`].
    #[must_use]
    pub fn wedge_angle_at_corner(
        &self,
        mesh: &SurfaceMesh,
        signpost: &SignpostIndex,
        index: usize,
    ) -> Option<f64> {
        if index >= self.edges.len() {
            return None;
        }
        let vertex = self.vertices(mesh)[index];
        let (incoming, outgoing) = self.corner_edges(index);
        corner_wedge_angle(mesh, signpost, incoming, outgoing, vertex)
    }
}

// =============================================================================
// SHARED WEDGE GEOMETRY
// =============================================================================

/// The signpost wedge angle at `vertex` between an incoming and an outgoing
/// path edge: CCW from the reversed incoming halfedge to the outgoing one.
///
/// `None` when a needed halfedge direction does not exist (boundary edges
/// store a single halfedge) or when an edge is not incident to the vertex.
#[must_use]
pub fn corner_wedge_angle(
    mesh: &SurfaceMesh,
    signpost: &SignpostIndex,
    incoming: EdgeKey,
    outgoing: EdgeKey,
    vertex: VertexKey,
) -> Option<f64> {
    let arriving = mesh.halfedge_into(incoming, vertex)?;
    let reversed = mesh.halfedge(arriving).twin()?;
    let departing = mesh.halfedge_from(outgoing, vertex)?;
    Some(signpost.angle_between(reversed, departing))
}

// =============================================================================
// TESTS
// =============================================================================
