//! The halfedge mesh with intrinsic edge lengths.
//!
//! A [`SurfaceMesh`] is an *intrinsic triangulation*: halfedge connectivity
//! plus a positive length per edge. The extrinsic embedding (one [`Point3`]
//! per vertex) is fixed at construction; edge flips later mutate the
//! connectivity and the lengths but never the embedding.
//!
//! Entities live in four [`SlotMap`] arenas and are addressed by opaque,
//! copyable keys. The mesh never deletes entities, so every key stays valid
//! for the mesh's entire lifetime — paths, loops, and the signpost index hold
//! plain keys with no ownership concerns.
//!
//! # Examples
//!
//! ```rust
//! use flipout::core::mesh::SurfaceMesh;
//!
//! // Two triangles sharing the edge (0, 2).
//! let positions = [
//!     0.0_f64, 0.0, 0.0, //
//!     1.0, 0.0, 0.0, //
//!     1.0, 1.0, 0.0, //
//!     0.0, 1.0, 0.0,
//! ];
//! let indices = [0_u32, 1, 2, 0, 2, 3];
//! let mesh = SurfaceMesh::from_raw_buffers(&positions, &indices).unwrap();
//!
//! assert_eq!(mesh.number_of_vertices(), 4);
//! assert_eq!(mesh.number_of_halfedges(), 6);
//! assert_eq!(mesh.euler_characteristic(), 1);
//! ```

use num_traits::Float;
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;

use crate::core::collections::{Entry, FastHashMap, SmallBuffer};
use crate::geometry::point::Point3;
use crate::geometry::primitives::{TriangleError, area_from_lengths, corner_angle_from_lengths};

/// Iteration guard for fan and cycle walks.
///
/// Halfedge structures are linked lists; a malformed mesh could otherwise
/// send a walk into an unbounded loop. No valid vertex fan or face cycle
/// comes anywhere near this bound.
pub(crate) const MAX_FAN_ITERATIONS: usize = 8192;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised while building a mesh from raw buffers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MeshBuildError {
    /// The position buffer is empty.
    #[error("Position buffer is empty")]
    EmptyPositions,
    /// The position buffer length is not a multiple of 3.
    #[error("Position count {count} is not a multiple of 3")]
    PositionCountNotThreeDimensional {
        /// Number of scalars in the position buffer.
        count: usize,
    },
    /// A position has a NaN or infinite coordinate.
    #[error("Position {index} has a non-finite coordinate")]
    NonFiniteCoordinate {
        /// Index of the offending position.
        index: usize,
    },
    /// The index buffer is empty; non-indexed meshes are rejected.
    #[error("Index buffer is empty")]
    EmptyIndices,
    /// The index buffer length is not a multiple of 3.
    #[error("Index count {count} is not a multiple of 3")]
    IndexCountNotTriangular {
        /// Number of entries in the index buffer.
        count: usize,
    },
    /// A triangle corner references a vertex that does not exist.
    #[error("Triangle corner references vertex {index} but only {count} vertices exist")]
    VertexIndexOutOfRange {
        /// The out-of-range index.
        index: u32,
        /// Number of vertices in the position buffer.
        count: usize,
    },
    /// A triangle uses the same vertex twice.
    #[error("Triangle {face_index} repeats a corner vertex")]
    RepeatedTriangleCorner {
        /// Position of the triangle in the index buffer.
        face_index: usize,
    },
    /// More than two halfedges share one vertex pair, or two faces traverse
    /// the pair in the same direction (inconsistent winding).
    #[error("Edge between vertices {v0} and {v1} is non-manifold")]
    NonManifoldEdge {
        /// First endpoint (buffer index).
        v0: u32,
        /// Second endpoint (buffer index).
        v1: u32,
    },
}

/// Errors raised by [`SurfaceMesh::is_valid`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MeshValidationError {
    /// A twin link is not involutive or pairs halfedges of different edges.
    #[error("Halfedge {halfedge:?} has a broken twin link")]
    BrokenTwinLink {
        /// The offending halfedge.
        halfedge: HalfedgeKey,
    },
    /// `next` applied three times does not return to the starting halfedge.
    #[error("Halfedge {halfedge:?} is not part of a triangular face cycle")]
    BrokenFaceCycle {
        /// The offending halfedge.
        halfedge: HalfedgeKey,
    },
    /// An edge has a non-positive intrinsic length.
    #[error("Edge {edge:?} has non-positive length {length}")]
    NonPositiveEdgeLength {
        /// The offending edge.
        edge: EdgeKey,
        /// Its stored length.
        length: f64,
    },
    /// A face's three lengths violate the strict triangle inequality.
    #[error("Face {face:?} has an invalid metric: {source}")]
    InvalidFaceMetric {
        /// The offending face.
        face: FaceKey,
        /// The underlying triangle error.
        source: TriangleError,
    },
    /// A vertex's representative halfedge does not originate at the vertex.
    #[error("Vertex {vertex:?} has a non-incident representative halfedge")]
    VertexRepresentativeNotIncident {
        /// The offending vertex.
        vertex: VertexKey,
    },
    /// An edge's representative halfedge belongs to a different edge.
    #[error("Edge {edge:?} has a non-incident representative halfedge")]
    EdgeRepresentativeNotIncident {
        /// The offending edge.
        edge: EdgeKey,
    },
    /// A face's representative halfedge belongs to a different face.
    #[error("Face {face:?} has a non-incident representative halfedge")]
    FaceRepresentativeNotIncident {
        /// The offending face.
        face: FaceKey,
    },
}

// =============================================================================
// KEYS
// =============================================================================

new_key_type! {
    /// Key type for accessing vertices in the mesh arena.
    ///
    /// Keys are opaque, copyable, and stable: the mesh never deletes
    /// vertices, so a key obtained at build time stays valid across any
    /// number of edge flips.
    pub struct VertexKey;
}

new_key_type! {
    /// Key type for accessing halfedges in the mesh arena.
    pub struct HalfedgeKey;
}

new_key_type! {
    /// Key type for accessing (undirected) edges in the mesh arena.
    ///
    /// An edge keeps its key across a flip; only its endpoints and intrinsic
    /// length change.
    pub struct EdgeKey;
}

new_key_type! {
    /// Key type for accessing triangular faces in the mesh arena.
    pub struct FaceKey;
}

// =============================================================================
// ENTITY RECORDS
// =============================================================================

/// A mesh vertex: fixed extrinsic position plus mutable connectivity hooks.
#[derive(Clone, Debug)]
pub struct Vertex {
    pub(crate) position: Point3,
    /// Representative *outgoing* halfedge; a walk starting point only.
    /// For boundary vertices this is kept at the fan start so that angular
    /// walks enumerate the whole fan.
    pub(crate) halfedge: Option<HalfedgeKey>,
    /// Caller-controlled pin flag; marked vertices are never selected as
    /// flexible joints during shortening.
    pub(crate) marked: bool,
}

impl Vertex {
    /// The extrinsic position.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> Point3 {
        self.position
    }

    /// The representative outgoing halfedge, if the vertex has any.
    #[inline]
    #[must_use]
    pub const fn halfedge(&self) -> Option<HalfedgeKey> {
        self.halfedge
    }

    /// Whether the vertex is pinned.
    #[inline]
    #[must_use]
    pub const fn is_marked(&self) -> bool {
        self.marked
    }
}

/// A directed edge in a face cycle.
#[derive(Clone, Debug)]
pub struct Halfedge {
    pub(crate) target: VertexKey,
    pub(crate) edge: EdgeKey,
    pub(crate) twin: Option<HalfedgeKey>,
    pub(crate) next: HalfedgeKey,
    pub(crate) prev: HalfedgeKey,
    pub(crate) face: Option<FaceKey>,
}

impl Halfedge {
    /// The vertex this halfedge points at.
    #[inline]
    #[must_use]
    pub const fn target(&self) -> VertexKey {
        self.target
    }

    /// The parent undirected edge.
    #[inline]
    #[must_use]
    pub const fn edge(&self) -> EdgeKey {
        self.edge
    }

    /// The oppositely directed halfedge of the same edge; `None` on the
    /// boundary.
    #[inline]
    #[must_use]
    pub const fn twin(&self) -> Option<HalfedgeKey> {
        self.twin
    }

    /// The next halfedge in the same face cycle.
    #[inline]
    #[must_use]
    pub const fn next(&self) -> HalfedgeKey {
        self.next
    }

    /// The previous halfedge in the same face cycle.
    #[inline]
    #[must_use]
    pub const fn prev(&self) -> HalfedgeKey {
        self.prev
    }

    /// The owning face.
    #[inline]
    #[must_use]
    pub const fn face(&self) -> Option<FaceKey> {
        self.face
    }
}

/// An undirected edge carrying the intrinsic metric.
#[derive(Clone, Debug)]
pub struct Edge {
    pub(crate) halfedge: HalfedgeKey,
    pub(crate) length: f64,
    /// Maintained by the owning path network; see
    /// [`SurfaceMesh::set_edge_in_path`].
    pub(crate) in_path: bool,
}

impl Edge {
    /// One of the two halfedges of this edge (the other is its twin).
    #[inline]
    #[must_use]
    pub const fn halfedge(&self) -> HalfedgeKey {
        self.halfedge
    }

    /// The intrinsic length ℓ(E) > 0.
    #[inline]
    #[must_use]
    pub const fn length(&self) -> f64 {
        self.length
    }

    /// Whether a path network currently claims this edge.
    #[inline]
    #[must_use]
    pub const fn in_path(&self) -> bool {
        self.in_path
    }
}

/// A triangular face.
#[derive(Clone, Debug)]
pub struct Face {
    pub(crate) halfedge: HalfedgeKey,
}

impl Face {
    /// The representative halfedge of the face cycle.
    #[inline]
    #[must_use]
    pub const fn halfedge(&self) -> HalfedgeKey {
        self.halfedge
    }
}

// =============================================================================
// MESH
// =============================================================================

/// An intrinsic triangulation of a 2-manifold (with optional boundary).
///
/// Built once from an extrinsic position/index buffer; afterwards the only
/// mutating operations are [`flip_edge`](SurfaceMesh::flip_edge) (and the
/// flag setters used by path networks). See the
/// [crate-level documentation](crate) for the invariants.
#[derive(Clone, Debug, Default)]
pub struct SurfaceMesh {
    pub(crate) vertices: SlotMap<VertexKey, Vertex>,
    pub(crate) halfedges: SlotMap<HalfedgeKey, Halfedge>,
    pub(crate) edges: SlotMap<EdgeKey, Edge>,
    pub(crate) faces: SlotMap<FaceKey, Face>,
    // Creation-order key vectors for deterministic index-based lookup.
    vertex_order: Vec<VertexKey>,
    edge_order: Vec<EdgeKey>,
    face_order: Vec<FaceKey>,
}

/// Packs an unordered pair of buffer indices into one canonical map key.
#[inline]
fn pair_key(a: u32, b: u32) -> u64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    (u64::from(lo) << 32) | u64::from(hi)
}

impl SurfaceMesh {
    // -------------------------------------------------------------------------
    // CONSTRUCTION
    // -------------------------------------------------------------------------

    /// Builds a mesh from a flat position buffer and a triangle index buffer.
    ///
    /// `positions` holds `3·N` scalars (`f32` or `f64`), `indices` holds
    /// `3·M` per-triangle CCW vertex indices. Creates `N` vertices, `M`
    /// faces, and `3·M` halfedges; edges are canonicalised by unordered
    /// vertex pair and each gets its extrinsic endpoint distance as the
    /// initial intrinsic length. Halfedges are twinned in a second pass:
    /// pairs become interior edges, singletons become boundary halfedges,
    /// anything else is rejected as non-manifold.
    ///
    /// # Errors
    ///
    /// Returns a [`MeshBuildError`] for empty or mis-sized buffers,
    /// non-finite coordinates, out-of-range or repeated indices, and
    /// non-manifold edges (including inconsistent winding).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flipout::core::mesh::{MeshBuildError, SurfaceMesh};
    ///
    /// let positions = [0.0_f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    /// let mesh = SurfaceMesh::from_raw_buffers(&positions, &[0, 1, 2]).unwrap();
    /// assert_eq!(mesh.number_of_faces(), 1);
    ///
    /// let missing = SurfaceMesh::from_raw_buffers(&positions, &[]);
    /// assert_eq!(missing.unwrap_err(), MeshBuildError::EmptyIndices);
    /// ```
    pub fn from_raw_buffers<T: Float>(
        positions: &[T],
        indices: &[u32],
    ) -> Result<Self, MeshBuildError> {
        if positions.is_empty() {
            return Err(MeshBuildError::EmptyPositions);
        }
        if positions.len() % 3 != 0 {
            return Err(MeshBuildError::PositionCountNotThreeDimensional {
                count: positions.len(),
            });
        }
        if indices.is_empty() {
            return Err(MeshBuildError::EmptyIndices);
        }
        if indices.len() % 3 != 0 {
            return Err(MeshBuildError::IndexCountNotTriangular {
                count: indices.len(),
            });
        }

        let vertex_count = positions.len() / 3;
        let mut mesh = Self::default();
        mesh.vertex_order.reserve(vertex_count);
        for i in 0..vertex_count {
            let point =
                Point3::from_scalars(positions[3 * i], positions[3 * i + 1], positions[3 * i + 2])
                    .ok_or(MeshBuildError::NonFiniteCoordinate { index: i })?;
            let key = mesh.vertices.insert(Vertex {
                position: point,
                halfedge: None,
                marked: false,
            });
            mesh.vertex_order.push(key);
        }

        let mut edge_lookup: FastHashMap<u64, EdgeKey> = FastHashMap::default();
        for (face_index, corner) in indices.chunks_exact(3).enumerate() {
            for &i in corner {
                if i as usize >= vertex_count {
                    return Err(MeshBuildError::VertexIndexOutOfRange {
                        index: i,
                        count: vertex_count,
                    });
                }
            }
            if corner[0] == corner[1] || corner[1] == corner[2] || corner[2] == corner[0] {
                return Err(MeshBuildError::RepeatedTriangleCorner { face_index });
            }

            let corner_keys = [
                mesh.vertex_order[corner[0] as usize],
                mesh.vertex_order[corner[1] as usize],
                mesh.vertex_order[corner[2] as usize],
            ];
            let face = mesh.faces.insert(Face {
                halfedge: HalfedgeKey::default(),
            });
            mesh.face_order.push(face);

            let mut cycle = [HalfedgeKey::default(); 3];
            for k in 0..3 {
                cycle[k] = mesh.halfedges.insert(Halfedge {
                    target: corner_keys[(k + 1) % 3],
                    edge: EdgeKey::default(),
                    twin: None,
                    next: HalfedgeKey::default(),
                    prev: HalfedgeKey::default(),
                    face: Some(face),
                });
            }
            for k in 0..3 {
                mesh.halfedges[cycle[k]].next = cycle[(k + 1) % 3];
                mesh.halfedges[cycle[k]].prev = cycle[(k + 2) % 3];
            }
            mesh.faces[face].halfedge = cycle[0];

            for k in 0..3 {
                let halfedge = cycle[k];
                let (src_index, dst_index) = (corner[k], corner[(k + 1) % 3]);
                let src = corner_keys[k];
                let dst = corner_keys[(k + 1) % 3];

                if mesh.vertices[src].halfedge.is_none() {
                    mesh.vertices[src].halfedge = Some(halfedge);
                }

                match edge_lookup.entry(pair_key(src_index, dst_index)) {
                    Entry::Vacant(slot) => {
                        let length =
                            mesh.vertices[src].position.distance(&mesh.vertices[dst].position);
                        let edge = mesh.edges.insert(Edge {
                            halfedge,
                            length,
                            in_path: false,
                        });
                        mesh.edge_order.push(edge);
                        slot.insert(edge);
                        mesh.halfedges[halfedge].edge = edge;
                    }
                    Entry::Occupied(slot) => {
                        let edge = *slot.get();
                        let partner = mesh.edges[edge].halfedge;
                        let non_manifold = MeshBuildError::NonManifoldEdge {
                            v0: src_index.min(dst_index),
                            v1: src_index.max(dst_index),
                        };
                        if mesh.halfedges[partner].twin.is_some() {
                            return Err(non_manifold);
                        }
                        // Same direction twice means the two faces disagree on
                        // winding across this edge.
                        if mesh.halfedges[partner].target == dst {
                            return Err(non_manifold);
                        }
                        mesh.halfedges[partner].twin = Some(halfedge);
                        mesh.halfedges[halfedge].twin = Some(partner);
                        mesh.halfedges[halfedge].edge = edge;
                    }
                }
            }
        }

        mesh.rewind_boundary_representatives();
        Ok(mesh)
    }

    /// Moves every boundary vertex's representative halfedge to its fan
    /// start, so outgoing-halfedge walks cover the whole fan.
    fn rewind_boundary_representatives(&mut self) {
        for i in 0..self.vertex_order.len() {
            let vertex = self.vertex_order[i];
            let Some(start) = self.vertices[vertex].halfedge else {
                continue;
            };
            let mut current = start;
            for _ in 0..MAX_FAN_ITERATIONS {
                let prev = self.halfedges[current].prev;
                match self.halfedges[prev].twin {
                    Some(before) => {
                        current = before;
                        if current == start {
                            break; // interior fan; keep the original pick
                        }
                    }
                    None => {
                        self.vertices[vertex].halfedge = Some(current);
                        break;
                    }
                }
            }
        }
    }

    /// Exports the mesh back into a position/index buffer pair.
    ///
    /// Vertices appear in creation order; faces keep their cycle winding.
    /// Re-ingesting the result reproduces a mesh with identical vertex,
    /// edge, and face counts.
    #[must_use]
    pub fn to_raw_buffers(&self) -> (Vec<f64>, Vec<u32>) {
        let mut index_of: FastHashMap<VertexKey, u32> = FastHashMap::default();
        let mut positions = Vec::with_capacity(3 * self.vertex_order.len());
        for (i, &vertex) in self.vertex_order.iter().enumerate() {
            index_of.insert(vertex, u32::try_from(i).unwrap_or(u32::MAX));
            positions.extend_from_slice(&self.vertices[vertex].position.coords());
        }
        let mut indices = Vec::with_capacity(3 * self.face_order.len());
        for &face in &self.face_order {
            for vertex in self.face_vertices(face) {
                indices.push(index_of[&vertex]);
            }
        }
        (positions, indices)
    }

    // -------------------------------------------------------------------------
    // COUNTS AND INDEXED LOOKUP
    // -------------------------------------------------------------------------

    /// Number of vertices.
    #[must_use]
    pub fn number_of_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of undirected edges.
    #[must_use]
    pub fn number_of_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of halfedges.
    #[must_use]
    pub fn number_of_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Number of faces.
    #[must_use]
    pub fn number_of_faces(&self) -> usize {
        self.faces.len()
    }

    /// The Euler characteristic `|V| − |E| + |F|`.
    ///
    /// Preserved exactly by edge flips.
    #[must_use]
    pub fn euler_characteristic(&self) -> i64 {
        let v = self.vertices.len() as i64;
        let e = self.edges.len() as i64;
        let f = self.faces.len() as i64;
        v - e + f
    }

    /// The key of the `i`-th vertex in buffer order.
    #[must_use]
    pub fn vertex_key(&self, i: usize) -> Option<VertexKey> {
        self.vertex_order.get(i).copied()
    }

    /// The key of the `i`-th edge in creation order.
    #[must_use]
    pub fn edge_key(&self, i: usize) -> Option<EdgeKey> {
        self.edge_order.get(i).copied()
    }

    /// The key of the `i`-th face in buffer order.
    #[must_use]
    pub fn face_key(&self, i: usize) -> Option<FaceKey> {
        self.face_order.get(i).copied()
    }

    // -------------------------------------------------------------------------
    // ENTITY ITERATION
    // -------------------------------------------------------------------------

    /// Iterates over all vertices in creation order.
    pub fn vertex_keys(&self) -> impl Iterator<Item = VertexKey> + '_ {
        self.vertex_order.iter().copied()
    }

    /// Iterates over all edges in creation order.
    pub fn edge_keys(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edge_order.iter().copied()
    }

    /// Iterates over all faces in creation order.
    pub fn face_keys(&self) -> impl Iterator<Item = FaceKey> + '_ {
        self.face_order.iter().copied()
    }

    /// Iterates over the interior (twinned) edges in creation order.
    pub fn interior_edges(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edge_order
            .iter()
            .copied()
            .filter(move |&edge| !self.is_boundary_edge(edge))
    }

    // -------------------------------------------------------------------------
    // VERTEX QUERIES
    // -------------------------------------------------------------------------

    /// The extrinsic position of a vertex.
    ///
    /// # Panics
    ///
    /// Panics if `vertex` is not a key of this mesh.
    #[must_use]
    pub fn position(&self, vertex: VertexKey) -> Point3 {
        self.vertices[vertex].position
    }

    /// The representative outgoing halfedge of a vertex.
    #[must_use]
    pub fn vertex_halfedge(&self, vertex: VertexKey) -> Option<HalfedgeKey> {
        self.vertices[vertex].halfedge
    }

    /// Whether the vertex is pinned against shortening.
    #[must_use]
    pub fn is_vertex_marked(&self, vertex: VertexKey) -> bool {
        self.vertices[vertex].marked
    }

    /// Pins or unpins a vertex. Marked vertices are never selected as
    /// flexible joints.
    pub fn set_vertex_marked(&mut self, vertex: VertexKey, marked: bool) {
        self.vertices[vertex].marked = marked;
    }

    /// Iterates over the outgoing halfedges of a vertex in fan order.
    ///
    /// Starting at the representative halfedge, the walk advances through
    /// `twin(h).next` and terminates when it returns to the start (interior
    /// vertex) or hits a missing twin (boundary vertex).
    #[must_use]
    pub fn outgoing_halfedges(&self, vertex: VertexKey) -> OutgoingHalfedges<'_> {
        let start = self.vertices[vertex].halfedge;
        OutgoingHalfedges {
            mesh: self,
            start,
            current: start,
            steps: 0,
        }
    }

    /// Collects the neighbouring vertices of `vertex` with the connecting
    /// edges.
    ///
    /// Unlike [`outgoing_halfedges`](Self::outgoing_halfedges) this also
    /// covers the one boundary edge that has no outgoing halfedge at a
    /// boundary vertex, so it enumerates every incident edge exactly once.
    #[must_use]
    pub fn neighbors(&self, vertex: VertexKey) -> SmallBuffer<(VertexKey, EdgeKey), 16> {
        let mut result = SmallBuffer::new();
        let mut last = None;
        for halfedge in self.outgoing_halfedges(vertex) {
            let record = &self.halfedges[halfedge];
            result.push((record.target, record.edge));
            last = Some(halfedge);
        }
        if let Some(last) = last {
            if self.halfedges[last].twin.is_none() {
                // Boundary fan: the incoming boundary halfedge at the fan
                // start has no outgoing counterpart.
                if let Some(start) = self.vertices[vertex].halfedge {
                    let incoming = self.halfedges[start].prev;
                    let other = self.halfedge_source(incoming);
                    result.push((other, self.halfedges[incoming].edge));
                }
            }
        }
        result
    }

    /// Number of edges incident to `vertex`.
    #[must_use]
    pub fn vertex_degree(&self, vertex: VertexKey) -> usize {
        self.neighbors(vertex).len()
    }

    /// Whether the vertex lies on the mesh boundary.
    #[must_use]
    pub fn is_boundary_vertex(&self, vertex: VertexKey) -> bool {
        self.outgoing_halfedges(vertex)
            .last()
            .is_some_and(|h| self.halfedges[h].twin.is_none())
    }

    // -------------------------------------------------------------------------
    // HALFEDGE QUERIES
    // -------------------------------------------------------------------------

    /// Read access to a halfedge record.
    ///
    /// # Panics
    ///
    /// Panics if `halfedge` is not a key of this mesh.
    #[must_use]
    pub fn halfedge(&self, halfedge: HalfedgeKey) -> &Halfedge {
        &self.halfedges[halfedge]
    }

    /// The source vertex of a halfedge, derived from its face cycle.
    #[must_use]
    pub fn halfedge_source(&self, halfedge: HalfedgeKey) -> VertexKey {
        self.halfedges[self.halfedges[halfedge].prev].target
    }

    /// The intrinsic length of the halfedge's parent edge.
    #[must_use]
    pub fn halfedge_length(&self, halfedge: HalfedgeKey) -> f64 {
        self.edges[self.halfedges[halfedge].edge].length
    }

    /// The interior angle at the source of `halfedge`, inside its face,
    /// between this halfedge and the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`TriangleError::Degenerate`] when the face metric is broken.
    pub fn corner_angle_at(&self, halfedge: HalfedgeKey) -> Result<f64, TriangleError> {
        let record = &self.halfedges[halfedge];
        let adjacent_a = self.edges[record.edge].length;
        let adjacent_b = self.edges[self.halfedges[record.prev].edge].length;
        let opposite = self.edges[self.halfedges[record.next].edge].length;
        corner_angle_from_lengths(adjacent_a, adjacent_b, opposite)
    }

    // -------------------------------------------------------------------------
    // EDGE QUERIES
    // -------------------------------------------------------------------------

    /// Read access to an edge record.
    ///
    /// # Panics
    ///
    /// Panics if `edge` is not a key of this mesh.
    #[must_use]
    pub fn edge(&self, edge: EdgeKey) -> &Edge {
        &self.edges[edge]
    }

    /// The intrinsic length ℓ(E).
    #[must_use]
    pub fn edge_length(&self, edge: EdgeKey) -> f64 {
        self.edges[edge].length
    }

    /// The two endpoints of an edge, in the direction of its representative
    /// halfedge.
    #[must_use]
    pub fn edge_endpoints(&self, edge: EdgeKey) -> (VertexKey, VertexKey) {
        let halfedge = self.edges[edge].halfedge;
        (self.halfedge_source(halfedge), self.halfedges[halfedge].target)
    }

    /// The endpoint of `edge` that is not `vertex`, or `None` when `vertex`
    /// is not an endpoint.
    #[must_use]
    pub fn edge_other_endpoint(&self, edge: EdgeKey, vertex: VertexKey) -> Option<VertexKey> {
        let (a, b) = self.edge_endpoints(edge);
        if vertex == a {
            Some(b)
        } else if vertex == b {
            Some(a)
        } else {
            None
        }
    }

    /// The halfedge of `edge` whose source is `vertex`, if any.
    ///
    /// A boundary edge stores only one halfedge, so the requested direction
    /// may not exist even when `vertex` is an endpoint.
    #[must_use]
    pub fn halfedge_from(&self, edge: EdgeKey, vertex: VertexKey) -> Option<HalfedgeKey> {
        let halfedge = self.edges[edge].halfedge;
        if self.halfedge_source(halfedge) == vertex {
            Some(halfedge)
        } else {
            self.halfedges[halfedge]
                .twin
                .filter(|&twin| self.halfedge_source(twin) == vertex)
        }
    }

    /// The halfedge of `edge` whose target is `vertex`, if any.
    #[must_use]
    pub fn halfedge_into(&self, edge: EdgeKey, vertex: VertexKey) -> Option<HalfedgeKey> {
        let halfedge = self.edges[edge].halfedge;
        if self.halfedges[halfedge].target == vertex {
            Some(halfedge)
        } else {
            self.halfedges[halfedge]
                .twin
                .filter(|&twin| self.halfedges[twin].target == vertex)
        }
    }

    /// Looks up the edge connecting two vertices, if one exists.
    #[must_use]
    pub fn find_edge(&self, a: VertexKey, b: VertexKey) -> Option<EdgeKey> {
        self.neighbors(a)
            .iter()
            .find(|(other, _)| *other == b)
            .map(|&(_, edge)| edge)
    }

    /// Whether the edge lies on the mesh boundary (has a single halfedge).
    #[must_use]
    pub fn is_boundary_edge(&self, edge: EdgeKey) -> bool {
        self.halfedges[self.edges[edge].halfedge].twin.is_none()
    }

    /// Whether a path network currently claims this edge.
    #[must_use]
    pub fn edge_in_path(&self, edge: EdgeKey) -> bool {
        self.edges[edge].in_path
    }

    /// Sets the path-membership flag of an edge.
    pub fn set_edge_in_path(&mut self, edge: EdgeKey, in_path: bool) {
        self.edges[edge].in_path = in_path;
    }

    /// Clears the path-membership flag of every edge.
    pub fn clear_path_flags(&mut self) {
        for (_, edge) in &mut self.edges {
            edge.in_path = false;
        }
    }

    // -------------------------------------------------------------------------
    // FACE QUERIES
    // -------------------------------------------------------------------------

    /// Read access to a face record.
    ///
    /// # Panics
    ///
    /// Panics if `face` is not a key of this mesh.
    #[must_use]
    pub fn face(&self, face: FaceKey) -> &Face {
        &self.faces[face]
    }

    /// The three halfedges of a face in cycle order.
    #[must_use]
    pub fn face_halfedges(&self, face: FaceKey) -> [HalfedgeKey; 3] {
        let first = self.faces[face].halfedge;
        let second = self.halfedges[first].next;
        let third = self.halfedges[second].next;
        [first, second, third]
    }

    /// The three corner vertices of a face in cycle order.
    #[must_use]
    pub fn face_vertices(&self, face: FaceKey) -> [VertexKey; 3] {
        let [first, second, third] = self.face_halfedges(face);
        [
            self.halfedges[third].target,
            self.halfedges[first].target,
            self.halfedges[second].target,
        ]
    }

    /// The three intrinsic edge lengths of a face in cycle order.
    #[must_use]
    pub fn face_edge_lengths(&self, face: FaceKey) -> [f64; 3] {
        let halfedges = self.face_halfedges(face);
        halfedges.map(|h| self.edges[self.halfedges[h].edge].length)
    }

    /// The interior angle of `face` at `vertex` (law of cosines).
    ///
    /// # Errors
    ///
    /// Returns [`TriangleError::Degenerate`] when the face metric is broken.
    ///
    /// # Panics
    ///
    /// Panics if `vertex` is not a corner of `face`.
    pub fn face_corner_angle(&self, face: FaceKey, vertex: VertexKey) -> Result<f64, TriangleError> {
        let halfedge = self
            .face_halfedges(face)
            .into_iter()
            .find(|&h| self.halfedge_source(h) == vertex)
            .expect("vertex must be a corner of the face");
        self.corner_angle_at(halfedge)
    }

    /// The area of a face from its intrinsic lengths (Heron's formula).
    ///
    /// # Errors
    ///
    /// Returns [`TriangleError::Degenerate`] when the face metric is broken.
    pub fn face_area(&self, face: FaceKey) -> Result<f64, TriangleError> {
        let [a, b, c] = self.face_edge_lengths(face);
        area_from_lengths(a, b, c)
    }

    /// The halfedge of `face` that neither starts nor ends at `vertex`.
    #[must_use]
    pub fn halfedge_opposite_vertex(&self, face: FaceKey, vertex: VertexKey) -> Option<HalfedgeKey> {
        self.face_halfedges(face).into_iter().find(|&h| {
            self.halfedges[h].target != vertex && self.halfedge_source(h) != vertex
        })
    }

    // -------------------------------------------------------------------------
    // VALIDATION
    // -------------------------------------------------------------------------

    /// Checks the structural invariants of the mesh.
    ///
    /// Validates twin involution, triangular face cycles, positive edge
    /// lengths, the strict triangle inequality per face, and the incidence
    /// of every stored representative halfedge. Returns the first failure.
    ///
    /// # Errors
    ///
    /// Returns a [`MeshValidationError`] describing the first violated
    /// invariant.
    pub fn is_valid(&self) -> Result<(), MeshValidationError> {
        for (key, halfedge) in &self.halfedges {
            if let Some(twin) = halfedge.twin {
                let back = &self.halfedges[twin];
                if back.twin != Some(key) || back.edge != halfedge.edge {
                    return Err(MeshValidationError::BrokenTwinLink { halfedge: key });
                }
            }
            let cycled = self.halfedges[self.halfedges[halfedge.next].next].next;
            if cycled != key || self.halfedges[halfedge.next].prev != key {
                return Err(MeshValidationError::BrokenFaceCycle { halfedge: key });
            }
        }
        for (key, edge) in &self.edges {
            if !(edge.length > 0.0) {
                return Err(MeshValidationError::NonPositiveEdgeLength {
                    edge: key,
                    length: edge.length,
                });
            }
            if self.halfedges[edge.halfedge].edge != key {
                return Err(MeshValidationError::EdgeRepresentativeNotIncident { edge: key });
            }
        }
        for (key, face) in &self.faces {
            if self.halfedges[face.halfedge].face != Some(key) {
                return Err(MeshValidationError::FaceRepresentativeNotIncident { face: key });
            }
            let [a, b, c] = self.face_edge_lengths(key);
            if let Err(source) = area_from_lengths(a, b, c) {
                return Err(MeshValidationError::InvalidFaceMetric { face: key, source });
            }
        }
        for (key, vertex) in &self.vertices {
            if let Some(representative) = vertex.halfedge {
                if self.halfedge_source(representative) != key {
                    return Err(MeshValidationError::VertexRepresentativeNotIncident {
                        vertex: key,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Iterator over the outgoing halfedges of one vertex in fan order.
///
/// Returned by [`SurfaceMesh::outgoing_halfedges`]. The iterator borrows the
/// mesh immutably; results must not be cached across a subsequent flip.
pub struct OutgoingHalfedges<'m> {
    mesh: &'m SurfaceMesh,
    start: Option<HalfedgeKey>,
    current: Option<HalfedgeKey>,
    steps: usize,
}

impl Iterator for OutgoingHalfedges<'_> {
    type Item = HalfedgeKey;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.steps += 1;
        if self.steps > MAX_FAN_ITERATIONS {
            self.current = None;
            return None;
        }
        let successor = self.mesh.halfedges[current]
            .twin
            .map(|twin| self.mesh.halfedges[twin].next)
            .filter(|&next| Some(next) != self.start);
        self.current = successor;
        Some(current)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad() -> SurfaceMesh {
        let positions = [
            0.0_f64, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0,
        ];
        SurfaceMesh::from_raw_buffers(&positions, &[0, 1, 2, 0, 2, 3]).unwrap()
    }

    #[test]
    fn quad_counts_and_euler() {
        let mesh = quad();
        assert_eq!(mesh.number_of_vertices(), 4);
        assert_eq!(mesh.number_of_edges(), 5);
        assert_eq!(mesh.number_of_faces(), 2);
        assert_eq!(mesh.number_of_halfedges(), 6);
        assert_eq!(mesh.euler_characteristic(), 1);
        assert!(mesh.is_valid().is_ok());
    }

    #[test]
    fn quad_has_one_interior_edge() {
        let mesh = quad();
        let interior: Vec<_> = mesh.interior_edges().collect();
        assert_eq!(interior.len(), 1);
        let (a, b) = mesh.edge_endpoints(interior[0]);
        let ends = [mesh.vertex_key(0).unwrap(), mesh.vertex_key(2).unwrap()];
        assert!(ends.contains(&a) && ends.contains(&b));
        assert_relative_eq!(
            mesh.edge_length(interior[0]),
            std::f64::consts::SQRT_2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn neighbors_cover_boundary_edges() {
        let mesh = quad();
        // Corner vertex 1 touches two edges: (0,1) and (1,2), both boundary.
        let v1 = mesh.vertex_key(1).unwrap();
        assert_eq!(mesh.vertex_degree(v1), 2);
        // Diagonal vertex 0 touches three: (0,1), (0,2), (0,3).
        let v0 = mesh.vertex_key(0).unwrap();
        assert_eq!(mesh.vertex_degree(v0), 3);
        assert!(mesh.is_boundary_vertex(v0));
    }

    #[test]
    fn find_edge_is_symmetric() {
        let mesh = quad();
        let v0 = mesh.vertex_key(0).unwrap();
        let v2 = mesh.vertex_key(2).unwrap();
        let v1 = mesh.vertex_key(1).unwrap();
        let v3 = mesh.vertex_key(3).unwrap();
        assert_eq!(mesh.find_edge(v0, v2), mesh.find_edge(v2, v0));
        assert!(mesh.find_edge(v0, v2).is_some());
        assert_eq!(mesh.find_edge(v1, v3), None);
    }

    #[test]
    fn corner_angles_sum_per_face() {
        let mesh = quad();
        for face in mesh.face_keys() {
            let total: f64 = mesh
                .face_vertices(face)
                .into_iter()
                .map(|v| mesh.face_corner_angle(face, v).unwrap())
                .sum();
            assert_relative_eq!(total, std::f64::consts::PI, epsilon = 1e-12);
        }
    }

    #[test]
    fn face_areas_match_embedding() {
        let mesh = quad();
        let total: f64 = mesh.face_keys().map(|f| mesh.face_area(f).unwrap()).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn raw_buffer_round_trip_preserves_counts() {
        let mesh = quad();
        let (positions, indices) = mesh.to_raw_buffers();
        let rebuilt = SurfaceMesh::from_raw_buffers(&positions, &indices).unwrap();
        assert_eq!(rebuilt.number_of_vertices(), mesh.number_of_vertices());
        assert_eq!(rebuilt.number_of_edges(), mesh.number_of_edges());
        assert_eq!(rebuilt.number_of_faces(), mesh.number_of_faces());
    }

    #[test]
    fn rejects_malformed_buffers() {
        let positions = [0.0_f64, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        assert_eq!(
            SurfaceMesh::from_raw_buffers::<f64>(&[], &[0, 1, 2]).unwrap_err(),
            MeshBuildError::EmptyPositions
        );
        assert_eq!(
            SurfaceMesh::from_raw_buffers(&positions, &[]).unwrap_err(),
            MeshBuildError::EmptyIndices
        );
        assert_eq!(
            SurfaceMesh::from_raw_buffers(&positions, &[0, 1]).unwrap_err(),
            MeshBuildError::IndexCountNotTriangular { count: 2 }
        );
        assert_eq!(
            SurfaceMesh::from_raw_buffers(&positions, &[0, 1, 7]).unwrap_err(),
            MeshBuildError::VertexIndexOutOfRange { index: 7, count: 3 }
        );
        assert_eq!(
            SurfaceMesh::from_raw_buffers(&positions, &[0, 1, 1]).unwrap_err(),
            MeshBuildError::RepeatedTriangleCorner { face_index: 0 }
        );
        assert_eq!(
            SurfaceMesh::from_raw_buffers(&[0.0_f64, 0.0], &[0, 1, 2]).unwrap_err(),
            MeshBuildError::PositionCountNotThreeDimensional { count: 2 }
        );
    }

    #[test]
    fn rejects_non_finite_positions() {
        let positions = [0.0_f64, 0.0, f64::NAN, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        assert_eq!(
            SurfaceMesh::from_raw_buffers(&positions, &[0, 1, 2]).unwrap_err(),
            MeshBuildError::NonFiniteCoordinate { index: 0 }
        );
    }

    #[test]
    fn rejects_non_manifold_edge() {
        // Three triangles hanging off the edge (0, 1).
        let positions = [
            0.0_f64, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.5, 1.0, 0.0, //
            0.5, -1.0, 0.0, //
            0.5, 0.0, 1.0,
        ];
        let indices = [0_u32, 1, 2, 1, 0, 3, 0, 1, 4];
        assert_eq!(
            SurfaceMesh::from_raw_buffers(&positions, &indices).unwrap_err(),
            MeshBuildError::NonManifoldEdge { v0: 0, v1: 1 }
        );
    }

    #[test]
    fn rejects_inconsistent_winding() {
        // Both faces traverse (0, 1) in the same direction.
        let positions = [
            0.0_f64, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.5, 1.0, 0.0, //
            0.5, -1.0, 0.0,
        ];
        let indices = [0_u32, 1, 2, 0, 1, 3];
        assert_eq!(
            SurfaceMesh::from_raw_buffers(&positions, &indices).unwrap_err(),
            MeshBuildError::NonManifoldEdge { v0: 0, v1: 1 }
        );
    }

    #[test]
    fn marks_are_per_vertex() {
        let mut mesh = quad();
        let v0 = mesh.vertex_key(0).unwrap();
        assert!(!mesh.is_vertex_marked(v0));
        mesh.set_vertex_marked(v0, true);
        assert!(mesh.is_vertex_marked(v0));
        mesh.set_vertex_marked(v0, false);
        assert!(!mesh.is_vertex_marked(v0));
    }

    #[test]
    fn path_flags_clear_in_bulk() {
        let mut mesh = quad();
        let edges: Vec<_> = mesh.edge_keys().collect();
        for &edge in &edges {
            mesh.set_edge_in_path(edge, true);
        }
        assert!(edges.iter().all(|&e| mesh.edge_in_path(e)));
        mesh.clear_path_flags();
        assert!(edges.iter().all(|&e| !mesh.edge_in_path(e)));
    }
}
