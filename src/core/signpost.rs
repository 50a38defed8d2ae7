//! Per-vertex CCW angular coordinates for outgoing halfedges.
//!
//! The [`SignpostIndex`] labels every outgoing halfedge of every vertex with
//! an angle in `[0, 2π)`, measured counter-clockwise from a per-vertex
//! reference halfedge. The wedge between two path edges at a vertex then has
//! an exact angular meaning that never touches the 3-D embedding.
//!
//! Angles are accumulated by walking the fan of faces around each vertex and
//! summing interior face angles, then stored modulo 2π. The total fan angle
//! is recorded separately and is *not* renormalised to 2π: its deviation
//! from 2π is the angle defect of the vertex.
//!
//! After a [`flip_edge`](crate::core::mesh::SurfaceMesh::flip_edge) the
//! caller must invoke [`SignpostIndex::update_after_flip`], which re-walks
//! exactly the four vertices of the flipped quadrilateral.

use slotmap::SecondaryMap;
use slotmap::Key;

use crate::core::collections::SmallBuffer;
use crate::core::mesh::{EdgeKey, HalfedgeKey, MAX_FAN_ITERATIONS, SurfaceMesh, VertexKey};
use crate::geometry::util::{TAU, ccw_difference, normalize_angle};

/// Per-vertex CCW angular index over outgoing halfedges.
///
/// # Examples
///
/// ```rust
/// use flipout::core::mesh::SurfaceMesh;
/// use flipout::core::signpost::SignpostIndex;
/// use std::f64::consts::PI;
///
/// let positions = [
///     0.0_f64, 0.0, 0.0, //
///     1.0, 0.0, 0.0, //
///     1.0, 1.0, 0.0, //
///     0.0, 1.0, 0.0,
/// ];
/// let mesh = SurfaceMesh::from_raw_buffers(&positions, &[0, 1, 2, 0, 2, 3]).unwrap();
/// let signpost = SignpostIndex::new(&mesh);
///
/// // The flat quad corner at vertex 0 spans 90 degrees.
/// let v0 = mesh.vertex_key(0).unwrap();
/// assert!((signpost.fan_angle(v0) - PI / 2.0).abs() < 1e-12);
///
/// // The reference halfedge sits at angle zero.
/// let reference = signpost.reference_halfedge(v0).unwrap();
/// assert_eq!(signpost.angle(reference), 0.0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SignpostIndex {
    angles: SecondaryMap<HalfedgeKey, f64>,
    reference: SecondaryMap<VertexKey, HalfedgeKey>,
    fan_total: SecondaryMap<VertexKey, f64>,
}

impl SignpostIndex {
    /// Builds the index for every vertex of the mesh.
    #[must_use]
    pub fn new(mesh: &SurfaceMesh) -> Self {
        let mut index = Self::default();
        for vertex in mesh.vertex_keys() {
            index.rebuild_vertex(mesh, vertex);
        }
        index
    }

    /// Re-walks the fan of one vertex, overwriting its stored angles.
    fn rebuild_vertex(&mut self, mesh: &SurfaceMesh, vertex: VertexKey) {
        let Some(start) = mesh.vertex_halfedge(vertex) else {
            return;
        };
        self.reference.insert(vertex, start);

        let mut theta = 0.0_f64;
        let mut current = start;
        for _ in 0..MAX_FAN_ITERATIONS {
            self.angles.insert(current, normalize_angle(theta));
            match mesh.halfedge(current).twin() {
                Some(twin) => {
                    // Crossing into the face of the twin adds its interior
                    // angle at this vertex; a degenerate corner contributes
                    // nothing rather than poisoning the whole fan.
                    let next = mesh.halfedge(twin).next();
                    theta += mesh.corner_angle_at(next).unwrap_or(0.0);
                    if next == start {
                        break;
                    }
                    current = next;
                }
                None => {
                    // Boundary fan: every step added the corner of the face
                    // it crossed into, so the start halfedge's own face is
                    // the one still missing from the total.
                    theta += mesh.corner_angle_at(start).unwrap_or(0.0);
                    break;
                }
            }
        }
        self.fan_total.insert(vertex, theta);
    }

    /// Rebuilds the four vertices touching the two faces of a just-flipped
    /// edge. No other signpost entries change.
    pub fn update_after_flip(&mut self, mesh: &SurfaceMesh, edge: EdgeKey) {
        let halfedge = mesh.edge(edge).halfedge();
        let mut touched: SmallBuffer<VertexKey, 4> = SmallBuffer::new();
        let mut push = |v: VertexKey, touched: &mut SmallBuffer<VertexKey, 4>| {
            if !touched.contains(&v) {
                touched.push(v);
            }
        };
        if let Some(face) = mesh.halfedge(halfedge).face() {
            for v in mesh.face_vertices(face) {
                push(v, &mut touched);
            }
        }
        if let Some(twin) = mesh.halfedge(halfedge).twin() {
            if let Some(face) = mesh.halfedge(twin).face() {
                for v in mesh.face_vertices(face) {
                    push(v, &mut touched);
                }
            }
        }
        for vertex in touched {
            self.rebuild_vertex(mesh, vertex);
        }
    }

    /// The angle of an outgoing halfedge, in `[0, 2π)` from its vertex's
    /// reference direction.
    ///
    /// # Panics
    ///
    /// Panics if the halfedge was never recorded. The mesh never drops
    /// halfedges, so this only happens on a key from a different mesh.
    #[must_use]
    pub fn angle(&self, halfedge: HalfedgeKey) -> f64 {
        self.angles[halfedge]
    }

    /// The per-vertex reference halfedge (angle zero).
    #[must_use]
    pub fn reference_halfedge(&self, vertex: VertexKey) -> Option<HalfedgeKey> {
        self.reference.get(vertex).copied()
    }

    /// The total fan angle of a vertex (sum of its face corners).
    ///
    /// For interior vertices of a non-flat surface this differs from 2π by
    /// the angle defect; it is reported as accumulated, never renormalised.
    ///
    /// # Panics
    ///
    /// Panics if the vertex was never recorded.
    #[must_use]
    pub fn fan_angle(&self, vertex: VertexKey) -> f64 {
        self.fan_total[vertex]
    }

    /// CCW angle from `from` to `to`, in `[0, 2π)`.
    ///
    /// Both halfedges must originate at the same vertex.
    ///
    /// # Panics
    ///
    /// Panics if either halfedge was never recorded.
    #[must_use]
    pub fn angle_between(&self, from: HalfedgeKey, to: HalfedgeKey) -> f64 {
        ccw_difference(self.angles[from], self.angles[to])
    }

    /// Whether `theta` lies in the half-open CCW interval
    /// `[theta_start, theta_end)`.
    ///
    /// All inputs are normalised into `[0, 2π)` first, so negative angles
    /// and wraparound intervals are handled. An interval with equal
    /// endpoints is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flipout::core::signpost::SignpostIndex;
    /// use std::f64::consts::PI;
    ///
    /// assert!(SignpostIndex::is_angle_between(0.5, 0.0, 1.0));
    /// assert!(SignpostIndex::is_angle_between(-0.1, 1.5 * PI, 0.5 * PI));
    /// assert!(!SignpostIndex::is_angle_between(1.0, 1.0, 1.0));
    /// ```
    #[must_use]
    pub fn is_angle_between(theta: f64, theta_start: f64, theta_end: f64) -> bool {
        let theta = normalize_angle(theta);
        let start = normalize_angle(theta_start);
        let end = normalize_angle(theta_end);
        if start <= end {
            (start..end).contains(&theta)
        } else {
            theta >= start || theta < end
        }
    }

    /// All outgoing halfedges of a vertex, sorted CCW by angle.
    ///
    /// Halfedges that coincide in angle keep a stable order (tie-break by
    /// halfedge identity).
    #[must_use]
    pub fn outgoing_sorted_ccw(
        &self,
        mesh: &SurfaceMesh,
        vertex: VertexKey,
    ) -> Vec<HalfedgeKey> {
        let mut outgoing: Vec<HalfedgeKey> = mesh.outgoing_halfedges(vertex).collect();
        outgoing.sort_by(|&a, &b| {
            let ordering = self.angles[a].total_cmp(&self.angles[b]);
            ordering.then_with(|| a.data().as_ffi().cmp(&b.data().as_ffi()))
        });
        outgoing
    }

    /// Checks whether consecutive fan angles are recorded monotonically CCW
    /// for the given vertex (modulo 2π). Used by validation and tests.
    #[must_use]
    pub fn is_fan_consistent(&self, mesh: &SurfaceMesh, vertex: VertexKey) -> bool {
        let outgoing: Vec<HalfedgeKey> = mesh.outgoing_halfedges(vertex).collect();
        if outgoing.len() < 2 {
            return true;
        }
        let reference = self.angles[outgoing[0]];
        let mut previous = 0.0;
        for &halfedge in &outgoing[1..] {
            let unrolled = ccw_difference(reference, self.angles[halfedge]);
            let drop = previous - unrolled;
            // A drop close to a full turn is the modulo wrap of a fan whose
            // total exceeds 2π; anything else breaks monotonicity.
            if drop > 1e-9 && drop < TAU - 1e-9 {
                return false;
            }
            previous = unrolled;
        }
        true
    }
}

// =============================================================================
// TESTS
// =============================================================================
