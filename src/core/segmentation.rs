//! Face classification induced by a closed loop.
//!
//! A closed geodesic loop cuts the mesh along its edges; [`Segmentation`]
//! classifies every face as inside, outside, or boundary relative to that
//! cut. "Inside" is the left side of the loop direction: the seed is the
//! face of the first loop edge's halfedge oriented out of the base vertex,
//! and the outside seed is its twin's face.
//!
//! The fill is a multi-source BFS over face adjacency that never crosses a
//! loop edge, with both seeds expanding simultaneously. On a separating
//! loop this equals two independent fills; on a non-separating loop both
//! regions still come out non-empty. Faces the fill cannot reach are
//! resolved afterwards: faces touching a loop edge become boundary, the
//! rest are assigned by iterated neighbour majority vote, and anything
//! still unresolved defaults to outside.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

use crate::core::collections::FastHashSet;
use crate::core::mesh::{EdgeKey, FaceKey, SurfaceMesh};
use crate::core::path::GeodesicLoop;

/// Cap on majority-vote resolution passes.
const MAX_VOTE_PASSES: usize = 64;

/// The region a face belongs to relative to a closed loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaceRegion {
    /// Left of the loop direction.
    Inside,
    /// Right of the loop direction.
    Outside,
    /// Unreached by the fill but touching a loop edge.
    Boundary,
}

/// A complete inside/outside/boundary classification of the mesh faces.
///
/// Every face is classified exactly once:
/// `count(Inside) + count(Outside) + count(Boundary) == |F|`.
#[derive(Clone, Debug)]
pub struct Segmentation {
    regions: SecondaryMap<FaceKey, FaceRegion>,
    inside_area: f64,
    outside_area: f64,
    boundary_area: f64,
    inside_count: usize,
    outside_count: usize,
    boundary_count: usize,
}

impl Segmentation {
    /// Classifies every face of the mesh relative to a closed loop.
    #[must_use]
    pub fn classify(mesh: &SurfaceMesh, cycle: &GeodesicLoop) -> Self {
        let loop_edges: FastHashSet<EdgeKey> = cycle.edges().iter().copied().collect();
        let mut regions: SecondaryMap<FaceKey, FaceRegion> = SecondaryMap::new();

        // Seed faces on both sides of the first loop edge, oriented out of
        // the base vertex.
        let mut queue: VecDeque<FaceKey> = VecDeque::new();
        let first_edge = cycle.edges()[0];
        let departing = mesh
            .halfedge_from(first_edge, cycle.base_vertex())
            .unwrap_or_else(|| mesh.edge(first_edge).halfedge());
        if let Some(inside_seed) = mesh.halfedge(departing).face() {
            regions.insert(inside_seed, FaceRegion::Inside);
            queue.push_back(inside_seed);
        }
        if let Some(outside_seed) = mesh
            .halfedge(departing)
            .twin()
            .and_then(|twin| mesh.halfedge(twin).face())
        {
            if !regions.contains_key(outside_seed) {
                regions.insert(outside_seed, FaceRegion::Outside);
                queue.push_back(outside_seed);
            }
        }

        // Multi-source flood fill that never crosses a loop edge.
        while let Some(face) = queue.pop_front() {
            let region = regions[face];
            for halfedge in mesh.face_halfedges(face) {
                if loop_edges.contains(&mesh.halfedge(halfedge).edge()) {
                    continue;
                }
                let neighbor = mesh
                    .halfedge(halfedge)
                    .twin()
                    .and_then(|twin| mesh.halfedge(twin).face());
                if let Some(neighbor) = neighbor {
                    if !regions.contains_key(neighbor) {
                        regions.insert(neighbor, region);
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        // Unreached faces adjacent to the loop become boundary.
        for face in mesh.face_keys() {
            if regions.contains_key(face) {
                continue;
            }
            let touches_loop = mesh
                .face_halfedges(face)
                .into_iter()
                .any(|h| loop_edges.contains(&mesh.halfedge(h).edge()));
            if touches_loop {
                regions.insert(face, FaceRegion::Boundary);
            }
        }

        // Iterated neighbour majority vote for the remainder.
        for _ in 0..MAX_VOTE_PASSES {
            let mut assignments: Vec<(FaceKey, FaceRegion)> = Vec::new();
            for face in mesh.face_keys() {
                if regions.contains_key(face) {
                    continue;
                }
                let mut inside_votes = 0_u32;
                let mut outside_votes = 0_u32;
                for halfedge in mesh.face_halfedges(face) {
                    let neighbor = mesh
                        .halfedge(halfedge)
                        .twin()
                        .and_then(|twin| mesh.halfedge(twin).face());
                    match neighbor.and_then(|n| regions.get(n).copied()) {
                        Some(FaceRegion::Inside) => inside_votes += 1,
                        Some(FaceRegion::Outside) => outside_votes += 1,
                        _ => {}
                    }
                }
                if inside_votes > outside_votes {
                    assignments.push((face, FaceRegion::Inside));
                } else if outside_votes > inside_votes {
                    assignments.push((face, FaceRegion::Outside));
                }
            }
            if assignments.is_empty() {
                break;
            }
            for (face, region) in assignments {
                regions.insert(face, region);
            }
        }

        // Residual unknowns (isolated components, tie votes) are outside.
        for face in mesh.face_keys() {
            if !regions.contains_key(face) {
                regions.insert(face, FaceRegion::Outside);
            }
        }

        let mut result = Self {
            regions,
            inside_area: 0.0,
            outside_area: 0.0,
            boundary_area: 0.0,
            inside_count: 0,
            outside_count: 0,
            boundary_count: 0,
        };
        for face in mesh.face_keys() {
            let area = mesh.face_area(face).unwrap_or(0.0);
            match result.regions[face] {
                FaceRegion::Inside => {
                    result.inside_count += 1;
                    result.inside_area += area;
                }
                FaceRegion::Outside => {
                    result.outside_count += 1;
                    result.outside_area += area;
                }
                FaceRegion::Boundary => {
                    result.boundary_count += 1;
                    result.boundary_area += area;
                }
            }
        }
        result
    }

    /// The region of a face.
    ///
    /// # Panics
    ///
    /// Panics if `face` is not a key of the classified mesh.
    #[must_use]
    pub fn region_of(&self, face: FaceKey) -> FaceRegion {
        self.regions[face]
    }

    /// Iterates over the faces of one region.
    pub fn faces_in(&self, region: FaceRegion) -> impl Iterator<Item = FaceKey> + '_ {
        self.regions
            .iter()
            .filter(move |&(_, &r)| r == region)
            .map(|(face, _)| face)
    }

    /// The full face-to-region map.
    #[must_use]
    pub const fn face_region_map(&self) -> &SecondaryMap<FaceKey, FaceRegion> {
        &self.regions
    }

    /// Number of faces in a region.
    #[must_use]
    pub const fn count(&self, region: FaceRegion) -> usize {
        match region {
            FaceRegion::Inside => self.inside_count,
            FaceRegion::Outside => self.outside_count,
            FaceRegion::Boundary => self.boundary_count,
        }
    }

    /// Total intrinsic area (Heron) of a region.
    #[must_use]
    pub const fn area(&self, region: FaceRegion) -> f64 {
        match region {
            FaceRegion::Inside => self.inside_area,
            FaceRegion::Outside => self.outside_area,
            FaceRegion::Boundary => self.boundary_area,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::path::GeodesicLoop;
    use approx::assert_relative_eq;

    /// An octahedron: eight faces, every vertex interior.
    fn octahedron() -> SurfaceMesh {
        let positions = [
            1.0_f64, 0.0, 0.0, //
            -1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, -1.0, 0.0, //
            0.0, 0.0, 1.0, //
            0.0, 0.0, -1.0,
        ];
        let indices = [
            0_u32, 2, 4, //
            2, 1, 4, //
            1, 3, 4, //
            3, 0, 4, //
            2, 0, 5, //
            1, 2, 5, //
            3, 1, 5, //
            0, 3, 5,
        ];
        SurfaceMesh::from_raw_buffers(&positions, &indices).unwrap()
    }

    /// The equatorial square loop of the octahedron.
    fn equator(mesh: &SurfaceMesh) -> GeodesicLoop {
        let v = |i: usize| mesh.vertex_key(i).unwrap();
        let edges = vec![
            mesh.find_edge(v(0), v(2)).unwrap(),
            mesh.find_edge(v(2), v(1)).unwrap(),
            mesh.find_edge(v(1), v(3)).unwrap(),
            mesh.find_edge(v(3), v(0)).unwrap(),
        ];
        GeodesicLoop::new(mesh, v(0), edges).unwrap()
    }

    #[test]
    fn equator_splits_octahedron_in_half() {
        let mesh = octahedron();
        let cycle = equator(&mesh);
        let segmentation = Segmentation::classify(&mesh, &cycle);

        assert_eq!(
            segmentation.count(FaceRegion::Inside)
                + segmentation.count(FaceRegion::Outside)
                + segmentation.count(FaceRegion::Boundary),
            mesh.number_of_faces()
        );
        assert_eq!(segmentation.count(FaceRegion::Inside), 4);
        assert_eq!(segmentation.count(FaceRegion::Outside), 4);
        assert_eq!(segmentation.count(FaceRegion::Boundary), 0);
        assert!(segmentation.area(FaceRegion::Inside) > 0.0);
        assert!(segmentation.area(FaceRegion::Outside) > 0.0);
        assert_relative_eq!(
            segmentation.area(FaceRegion::Inside),
            segmentation.area(FaceRegion::Outside),
            epsilon = 1e-9
        );
    }

    #[test]
    fn inside_is_left_of_the_loop() {
        let mesh = octahedron();
        let cycle = equator(&mesh);
        let segmentation = Segmentation::classify(&mesh, &cycle);

        // The loop runs 0→2→1→3; faces containing the apex vertex 4 lie on
        // one side, faces containing vertex 5 on the other.
        let v4 = mesh.vertex_key(4).unwrap();
        let mut apex_regions: Vec<FaceRegion> = Vec::new();
        for face in mesh.face_keys() {
            if mesh.face_vertices(face).contains(&v4) {
                apex_regions.push(segmentation.region_of(face));
            }
        }
        assert_eq!(apex_regions.len(), 4);
        assert!(apex_regions.iter().all(|&r| r == apex_regions[0]));
    }

    #[test]
    fn region_iterators_partition_faces() {
        let mesh = octahedron();
        let cycle = equator(&mesh);
        let segmentation = Segmentation::classify(&mesh, &cycle);

        let inside: Vec<FaceKey> = segmentation.faces_in(FaceRegion::Inside).collect();
        let outside: Vec<FaceKey> = segmentation.faces_in(FaceRegion::Outside).collect();
        assert_eq!(inside.len() + outside.len(), mesh.number_of_faces());
        for face in inside {
            assert_eq!(segmentation.region_of(face), FaceRegion::Inside);
        }
        assert_eq!(segmentation.face_region_map().len(), mesh.number_of_faces());
    }
}
