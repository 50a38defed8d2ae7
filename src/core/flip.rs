//! Edge flips and the Delaunay utility pass.
//!
//! [`SurfaceMesh::flip_edge`] is the single mutating operation of the
//! intrinsic triangulation: it replaces an interior edge by the other
//! diagonal of the quadrilateral formed by its two incident triangles. The
//! edge keeps its key; only its endpoints and intrinsic length change, and
//! no entity is created or deleted, so the Euler characteristic is
//! preserved exactly.
//!
//! The new length follows the extrinsic embedding: it is the 3-D distance
//! between the two far vertices of the pre-flip quadrilateral, not an
//! intrinsic unfolding.
//!
//! ```text
//!        C                     C
//!       / \                   /|\
//!      /   \                 / | \
//!     A-----B     flip      A  |  B
//!      \   /     ---->       \ | /
//!       \ /                   \|/
//!        D                     D
//! ```

use std::f64::consts::PI;

use crate::core::mesh::{EdgeKey, HalfedgeKey, SurfaceMesh};

/// Slack admitted on the opposite-angle sum before an edge is considered
/// non-Delaunay.
const DELAUNAY_EPSILON: f64 = 1e-10;

/// Returns whether three lengths form a strictly valid triangle.
fn strict_triangle(a: f64, b: f64, c: f64) -> bool {
    a > 0.0 && b > 0.0 && c > 0.0 && a + b > c && b + c > a && c + a > b
}

impl SurfaceMesh {
    /// Flips an interior edge, returning whether the flip was performed.
    ///
    /// Preconditions checked here (any failure returns `false` and leaves
    /// the mesh untouched):
    ///
    /// - the edge is interior (both halfedges present),
    /// - both endpoints have degree greater than one,
    /// - the two far vertices are distinct,
    /// - the two post-flip triangles satisfy the strict triangle
    ///   inequality with the new diagonal length.
    ///
    /// On success the edge connects the two far vertices of the former
    /// quadrilateral, its length is the extrinsic distance between them, the
    /// six surrounding halfedges are relinked into the two new triangles,
    /// and the representative halfedges of the faces and of any vertex that
    /// lost its representative are restored.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flipout::core::mesh::SurfaceMesh;
    ///
    /// let positions = [
    ///     0.0_f64, 0.0, 0.0, //
    ///     1.0, 0.0, 0.0, //
    ///     1.0, 1.0, 0.0, //
    ///     0.0, 1.0, 0.0,
    /// ];
    /// let mut mesh = SurfaceMesh::from_raw_buffers(&positions, &[0, 1, 2, 0, 2, 3]).unwrap();
    /// let diagonal = mesh.interior_edges().next().unwrap();
    ///
    /// // Both diagonals of the unit square have length √2.
    /// assert!(mesh.flip_edge(diagonal));
    /// assert!((mesh.edge_length(diagonal) - 2.0_f64.sqrt()).abs() < 1e-12);
    ///
    /// // Boundary edges never flip.
    /// let boundary = mesh
    ///     .edge_keys()
    ///     .find(|&e| mesh.is_boundary_edge(e))
    ///     .unwrap();
    /// assert!(!mesh.flip_edge(boundary));
    /// ```
    pub fn flip_edge(&mut self, edge: EdgeKey) -> bool {
        let Some(record) = self.edges.get(edge) else {
            return false;
        };
        let h1 = record.halfedge;
        let Some(t1) = self.halfedges[h1].twin else {
            return false;
        };

        let h2 = self.halfedges[h1].next;
        let h3 = self.halfedges[h2].next;
        let t2 = self.halfedges[t1].next;
        let t3 = self.halfedges[t2].next;

        let b = self.halfedges[h1].target;
        let a = self.halfedges[t1].target;
        let c = self.halfedges[h2].target;
        let d = self.halfedges[t2].target;
        if c == d {
            return false;
        }
        if self.vertex_degree(a) <= 1 || self.vertex_degree(b) <= 1 {
            return false;
        }

        let new_length = self.vertices[c].position.distance(&self.vertices[d].position);
        let l_h2 = self.edges[self.halfedges[h2].edge].length;
        let l_h3 = self.edges[self.halfedges[h3].edge].length;
        let l_t2 = self.edges[self.halfedges[t2].edge].length;
        let l_t3 = self.edges[self.halfedges[t3].edge].length;
        if !strict_triangle(new_length, l_h3, l_t2) || !strict_triangle(new_length, l_t3, l_h2) {
            return false;
        }

        let f1 = self.halfedges[h1].face;
        let f2 = self.halfedges[t1].face;

        // Retarget the diagonal: h1 becomes D→C, t1 becomes C→D.
        self.halfedges[h1].target = c;
        self.halfedges[t1].target = d;

        // New cycle for f1: h1 → h3 → t2.
        self.halfedges[h1].next = h3;
        self.halfedges[h3].next = t2;
        self.halfedges[t2].next = h1;
        self.halfedges[h1].prev = t2;
        self.halfedges[h3].prev = h1;
        self.halfedges[t2].prev = h3;
        self.halfedges[t2].face = f1;

        // New cycle for f2: t1 → t3 → h2.
        self.halfedges[t1].next = t3;
        self.halfedges[t3].next = h2;
        self.halfedges[h2].next = t1;
        self.halfedges[t1].prev = h2;
        self.halfedges[t3].prev = t1;
        self.halfedges[h2].prev = t3;
        self.halfedges[h2].face = f2;

        if let Some(face) = f1 {
            self.faces[face].halfedge = h1;
        }
        if let Some(face) = f2 {
            self.faces[face].halfedge = t1;
        }

        // The diagonal's halfedges no longer originate at A and B; restore
        // any representative that pointed at them.
        if self.vertices[a].halfedge == Some(h1) {
            self.vertices[a].halfedge = Some(t2);
        }
        if self.vertices[b].halfedge == Some(t1) {
            self.vertices[b].halfedge = Some(h2);
        }

        self.edges[edge].length = new_length;
        true
    }

    /// Checks the local Delaunay condition on an edge.
    ///
    /// An interior edge is Delaunay when the two angles opposite it sum to
    /// at most π (plus a small numerical slack). Boundary edges and edges
    /// whose incident faces are degenerate are reported as Delaunay so the
    /// flipping pass skips them.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flipout::core::mesh::SurfaceMesh;
    ///
    /// let positions = [
    ///     0.0_f64, 0.0, 0.0, //
    ///     1.0, 0.0, 0.0, //
    ///     1.0, 1.0, 0.0, //
    ///     0.0, 1.0, 0.0,
    /// ];
    /// let mesh = SurfaceMesh::from_raw_buffers(&positions, &[0, 1, 2, 0, 2, 3]).unwrap();
    /// assert!(mesh.edge_keys().all(|e| mesh.is_delaunay(e)));
    /// ```
    #[must_use]
    pub fn is_delaunay(&self, edge: EdgeKey) -> bool {
        let h1 = self.edges[edge].halfedge;
        let Some(t1) = self.halfedges[h1].twin else {
            return true;
        };
        // Opposite corners: the far vertex of each incident triangle.
        let opposite_of = |h: HalfedgeKey| {
            let next = self.halfedges[h].next;
            self.corner_angle_at(self.halfedges[next].next)
        };
        match (opposite_of(h1), opposite_of(t1)) {
            (Ok(alpha), Ok(beta)) => alpha + beta <= PI + DELAUNAY_EPSILON,
            _ => true,
        }
    }

    /// Flips non-Delaunay interior edges until the mesh is locally Delaunay.
    ///
    /// Sweeps the edges repeatedly, flipping each non-Delaunay edge it
    /// finds, until a sweep performs no flip. As a safety net the total
    /// number of flips is capped at `10 · |E|`. Returns the number of flips
    /// performed.
    ///
    /// Calling this twice in a row performs zero additional flips the
    /// second time.
    pub fn make_delaunay(&mut self) -> u32 {
        let flip_cap = 10 * self.number_of_edges();
        let edge_keys: Vec<EdgeKey> = self.edge_keys().collect();
        let mut flips = 0_u32;
        loop {
            let mut flipped_this_sweep = false;
            for &edge in &edge_keys {
                if flips as usize >= flip_cap {
                    return flips;
                }
                if !self.is_delaunay(edge) && self.flip_edge(edge) {
                    flips += 1;
                    flipped_this_sweep = true;
                }
            }
            if !flipped_this_sweep {
                return flips;
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
