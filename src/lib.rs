//! # flipout
//!
//! This is a library for computing **exact polyhedral geodesics** on
//! triangulated 2-manifolds by iterative intrinsic edge flipping.
//!
//! A geodesic on a polyhedral surface is a path that is *locally shortest*:
//! it unfolds flat at every interior vertex. Starting from an arbitrary edge
//! path (produced here by Dijkstra over the vertex graph), the shortener
//! repeatedly locates a *flexible joint* — a path vertex whose wedge angle is
//! strictly less than π — and flips every intrinsic edge inside that wedge.
//! Each round of flips reroutes the path across a shorter diagonal, and the
//! process terminates when the path is straight at every unpinned vertex.
//!
//! # Features
//!
//! - Halfedge mesh with mutable intrinsic connectivity over a fixed extrinsic
//!   embedding, stored in [slotmap](https://docs.rs/slotmap) arenas with
//!   stable, copyable keys
//! - Per-vertex angular *signpost* index maintained incrementally across flips
//! - Dijkstra bootstrap for single, piecewise, and multi-source shortest paths
//! - Iterative FlipOut shortening for open paths and closed loops, with
//!   pinnable (marked) waypoints
//! - Waypoint-edge ordering for closed loops (nearest-neighbour + bounded
//!   2-opt)
//! - Inside/outside/boundary face segmentation induced by a closed loop
//! - Serialization of the exported value types with [serde](https://serde.rs)
//!
//! # Basic Usage
//!
//! ```rust
//! use flipout::prelude::*;
//!
//! // A unit square split along the (0,0,0)–(1,1,0) diagonal.
//! let positions = [
//!     0.0_f64, 0.0, 0.0, //
//!     1.0, 0.0, 0.0, //
//!     1.0, 1.0, 0.0, //
//!     0.0, 1.0, 0.0,
//! ];
//! let indices = [0_u32, 1, 2, 0, 2, 3];
//!
//! let mut mesh = SurfaceMesh::from_raw_buffers(&positions, &indices).unwrap();
//! assert_eq!(mesh.number_of_vertices(), 4);
//! assert_eq!(mesh.number_of_edges(), 5);
//! assert_eq!(mesh.number_of_faces(), 2);
//! assert!(mesh.is_valid().is_ok());
//!
//! // The diagonal is interior; flipping it swaps it for the other diagonal.
//! let diagonal = mesh
//!     .interior_edges()
//!     .next()
//!     .expect("the shared diagonal is the only interior edge");
//! assert!(mesh.flip_edge(diagonal));
//! assert!(mesh.is_valid().is_ok());
//! ```
//!
//! # Shortening a path
//!
//! ```rust
//! use flipout::prelude::*;
//!
//! let positions = [
//!     0.0_f64, 0.0, 0.0, //
//!     1.0, 0.0, 0.0, //
//!     1.0, 1.0, 0.0, //
//!     0.0, 1.0, 0.0,
//! ];
//! let indices = [0_u32, 1, 2, 0, 2, 3];
//! let mesh = SurfaceMesh::from_raw_buffers(&positions, &indices).unwrap();
//!
//! let src = mesh.vertex_key(0).unwrap();
//! let tgt = mesh.vertex_key(1).unwrap();
//! let mut network =
//!     FlipNetwork::from_dijkstra_path(mesh, src, tgt, ShorteningOptions::default()).unwrap();
//!
//! // Adjacent vertices: the single-edge path is already geodesic.
//! let report = network.iterative_shorten();
//! assert_eq!(report.iterations, 0);
//! assert!(report.converged);
//! ```
//!
//! # Invariants
//!
//! The mesh maintains a set of structural invariants that are checked by
//! [`SurfaceMesh::is_valid`](core::mesh::SurfaceMesh::is_valid):
//!
//! - **Twin involution** – every interior halfedge's twin points back at it.
//! - **Triangle cycles** – `next` applied three times is the identity.
//! - **Metric validity** – every edge length is positive and the three
//!   lengths of every face satisfy the strict triangle inequality.
//! - **Representative incidence** – the stored representative halfedges of
//!   vertices, edges, and faces are incident to their owners.
//!
//! Edge flips preserve all of the above as well as the Euler characteristic
//! `|V| − |E| + |F|`; flips never create or delete entities, so every key
//! handed out by the mesh stays valid for the mesh's entire lifetime.

#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// The `core` module contains the mesh data structure and the geodesic
/// algorithms that operate on it.
///
/// It includes the [`SurfaceMesh`](core::mesh::SurfaceMesh) halfedge arena,
/// the [`SignpostIndex`](core::signpost::SignpostIndex) angular index, the
/// Dijkstra bootstrap, the path/loop containers, the FlipOut shorteners, the
/// waypoint-edge ordering heuristic, and the loop segmentation engine.
pub mod core {
    /// High-performance collection aliases used throughout the crate.
    pub mod collections;
    /// Shortest-path bootstrap over the vertex graph.
    pub mod dijkstra;
    /// Edge flips and the Delaunay utility pass.
    pub mod flip;
    /// The halfedge mesh with intrinsic edge lengths.
    pub mod mesh;
    /// FlipOut shortening networks for open paths and closed loops.
    pub mod network;
    /// Cyclic ordering of waypoint edges for loop construction.
    pub mod ordering;
    /// Geodesic path and loop containers.
    pub mod path;
    /// Face classification induced by a closed loop.
    pub mod segmentation;
    /// Per-vertex CCW angular coordinates for outgoing halfedges.
    pub mod signpost;

    pub use dijkstra::*;
    pub use flip::*;
    pub use mesh::*;
    pub use network::*;
    pub use ordering::*;
    pub use path::*;
    pub use segmentation::*;
    pub use signpost::*;
    // Note: collections is not re-exported here to avoid namespace pollution;
    // import specific aliases via the prelude or `crate::core::collections`.
}

/// Contains the geometric value types and scalar helpers.
///
/// The geometry module provides the [`Point3`](geometry::point::Point3)
/// extrinsic position type, checked triangle primitives (law-of-cosines
/// corner angles, Heron areas, planar layout, ray–segment intersection), and
/// numerically careful norm computations.
pub mod geometry {
    /// Extrinsic 3-D positions.
    pub mod point;
    /// Checked triangle primitives.
    pub mod primitives;
    /// Norms, distances, and angle normalisation.
    pub mod util;

    pub use point::*;
    pub use primitives::*;
    pub use util::*;
}

/// A prelude module that re-exports the commonly used types.
pub mod prelude {
    pub use crate::core::{
        collections::{FastHashMap, FastHashSet, SmallBuffer},
        dijkstra::{Dijkstra, ShortestPathTree},
        mesh::{
            EdgeKey, FaceKey, HalfedgeKey, MeshBuildError, MeshValidationError, SurfaceMesh,
            VertexKey,
        },
        network::{
            FlipNetwork, LoopNetwork, LoopOptions, LoopOptionsBuilder, LoopResult, NetworkError,
            ProgressSink, ShorteningOptions, ShorteningOptionsBuilder, ShorteningReport,
        },
        ordering::{EdgeOrdering, OrderingOptions, OrderingOptionsBuilder},
        path::{GeodesicLoop, GeodesicPath, PathError},
        segmentation::{FaceRegion, Segmentation},
        signpost::SignpostIndex,
    };
    pub use crate::geometry::{point::Point3, primitives::*, util::*};
}
