//! FlipOut shortening networks for open paths and closed loops.
//!
//! A network owns the mesh, its signpost index, and the path(s) being
//! shortened; for the duration of a shortening call it is the exclusive
//! mutator of all three. The FlipOut iteration is:
//!
//! 1. locate a *flexible joint* — the first unmarked interior vertex (in
//!    scan order) whose wedge angle is below π,
//! 2. flip every intrinsic edge inside that wedge in signpost CCW order,
//!    updating the signposts after each flip,
//! 3. reroute the path across the diagonal the flips produced and refresh
//!    the cached lengths,
//! 4. stop when no flexible joint remains, when the length stabilises
//!    below the convergence threshold, or when the iteration cap is hit.
//!
//! Each wedge flip replaces a triangle pocket with a shorter chord, so the
//! total length is monotonically non-increasing across iterations. An
//! iteration that performs zero flips and no rerouting terminates the loop
//! early — the joint it found cannot be straightened (typically a boundary
//! wedge), and revisiting it forever would not converge.
//!
//! Multiple paths may share one network (and therefore one mesh);
//! shortening one path can change edge lengths another path uses, which is
//! why every path's cached length is refreshed after each iteration.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::collections::FastHashSet;
use crate::core::dijkstra::Dijkstra;
use crate::core::mesh::{EdgeKey, SurfaceMesh, VertexKey};
use crate::core::ordering::{OrderingOptions, order_edge_waypoints};
use crate::core::path::{GeodesicLoop, GeodesicPath, PathError};
use crate::core::segmentation::Segmentation;
use crate::core::signpost::SignpostIndex;
use crate::geometry::point::Point3;
use crate::geometry::util::ccw_difference;

/// Default cap on FlipOut outer iterations.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10_000;

/// Default length-change convergence threshold.
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 1e-10;

/// A joint is flexible when its wedge angle is below `π −` this slack.
pub const FLEXIBLE_JOINT_EPSILON: f64 = 1e-6;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised while constructing a shortening network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkError {
    /// Dijkstra could not connect the requested vertices.
    NoPath {
        /// The source vertex.
        source: VertexKey,
        /// The unreachable target vertex.
        target: VertexKey,
    },
    /// A waypoint edge index does not exist in the mesh.
    EdgeIndexOutOfRange {
        /// The out-of-range index.
        index: usize,
        /// Number of edges in the mesh.
        count: usize,
    },
    /// The ordering pass skipped more waypoint edges than permitted.
    TooManySkippedEdges {
        /// Number of skipped waypoint edges.
        skipped: usize,
        /// Number of skips permitted by the options.
        allowed: usize,
    },
    /// An underlying path or loop was malformed.
    Path(PathError),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::NoPath { source, target } => {
                write!(f, "No path between {source:?} and {target:?}")
            }
            NetworkError::EdgeIndexOutOfRange { index, count } => {
                write!(f, "Edge index {index} is out of range for a mesh with {count} edges")
            }
            NetworkError::TooManySkippedEdges { skipped, allowed } => write!(
                f,
                "Ordering skipped {skipped} waypoint edges but only {allowed} were permitted"
            ),
            NetworkError::Path(source) => fmt::Display::fmt(source, f),
        }
    }
}

impl std::error::Error for NetworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetworkError::Path(source) => Some(source),
            _ => None,
        }
    }
}

impl From<PathError> for NetworkError {
    fn from(source: PathError) -> Self {
        NetworkError::Path(source)
    }
}

// =============================================================================
// PROGRESS SINK
// =============================================================================

/// Destination for human-readable per-iteration progress lines.
///
/// The core never owns a global logger; verbose output goes through a sink
/// injected by the caller. The default [`TracingSink`] forwards to
/// [`tracing::debug!`].
pub trait ProgressSink {
    /// Receives one progress line.
    fn emit(&mut self, line: &str);
}

/// The default sink: forwards progress lines to `tracing` at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&mut self, line: &str) {
        tracing::debug!(target: "flipout", "{line}");
    }
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Options for iterative shortening.
///
/// Build with [`ShorteningOptionsBuilder`] or take
/// [`ShorteningOptions::default`].
///
/// # Examples
///
/// ```rust
/// use flipout::core::network::{ShorteningOptions, ShorteningOptionsBuilder};
///
/// let defaults = ShorteningOptions::default();
/// assert_eq!(defaults.max_iterations, 10_000);
/// assert_eq!(defaults.convergence_threshold, 1e-10);
/// assert!(!defaults.verbose);
///
/// let tight = ShorteningOptionsBuilder::default()
///     .max_iterations(100_u32)
///     .build()
///     .unwrap();
/// assert_eq!(tight.max_iterations, 100);
/// ```
#[derive(Builder, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShorteningOptions {
    /// Hard cap on FlipOut outer iterations.
    #[builder(default = "DEFAULT_MAX_ITERATIONS")]
    pub max_iterations: u32,
    /// Length-change break condition.
    #[builder(default = "DEFAULT_CONVERGENCE_THRESHOLD")]
    pub convergence_threshold: f64,
    /// Emit per-iteration progress to the network's sink.
    #[builder(default = "false")]
    pub verbose: bool,
}

impl Default for ShorteningOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            verbose: false,
        }
    }
}

/// Options for building and shortening a waypoint loop.
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoopOptions {
    /// Shortening parameters for the FlipOut stage.
    #[builder(default)]
    pub shortening: ShorteningOptions,
    /// Run the waypoint-edge ordering optimiser (otherwise the given edge
    /// order is kept).
    #[builder(default = "true")]
    pub optimize_order: bool,
    /// Parameters of the ordering optimiser.
    #[builder(default)]
    pub ordering: OrderingOptions,
    /// Fail construction when any waypoint edge is skipped.
    #[builder(default = "false")]
    pub require_all_edges: bool,
    /// Upper bound on skipped waypoint edges (`None` = unbounded).
    #[builder(default = "None")]
    pub max_skipped_edges: Option<u32>,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            shortening: ShorteningOptions::default(),
            optimize_order: true,
            ordering: OrderingOptions::default(),
            require_all_edges: false,
            max_skipped_edges: None,
        }
    }
}

// =============================================================================
// REPORTS
// =============================================================================

/// The outcome of an iterative shortening run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShorteningReport {
    /// Outer iterations performed.
    pub iterations: u32,
    /// Whether the run terminated because no flexible joint remained or the
    /// length stabilised (as opposed to hitting the iteration cap or a
    /// zero-progress iteration).
    pub converged: bool,
    /// Total edge flips performed.
    pub flips: u32,
    /// Total length before the run.
    pub initial_length: f64,
    /// Total length after the run.
    pub final_length: f64,
}

/// Aggregate statistics of a waypoint-loop computation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoopStats {
    /// Number of waypoint edges requested.
    pub waypoint_edges: usize,
    /// Number of waypoint edges the ordering pass skipped.
    pub skipped_edges: usize,
    /// Tour length estimated by the ordering pass.
    pub estimated_length: f64,
    /// Loop length before shortening.
    pub initial_length: f64,
    /// Loop length after shortening.
    pub final_length: f64,
}

/// The result of [`LoopNetwork::compute`].
#[derive(Debug)]
pub struct LoopResult {
    /// The shortening outcome.
    pub report: ShorteningReport,
    /// The face classification induced by the final loop.
    pub segmentation: Segmentation,
    /// Aggregate statistics.
    pub stats: LoopStats,
}

// =============================================================================
// WEDGE FLIPPING (shared by paths and loops)
// =============================================================================

/// Flips every flippable intrinsic edge inside the wedge at `vertex`
/// between the incoming and outgoing path edges.
///
/// Wedge edges are the outgoing halfedges of `vertex` whose signpost angle
/// lies in the half-open CCW interval from the reversed incoming halfedge
/// to the outgoing halfedge, excluding every edge currently claimed by a
/// path. Each edge is attempted once, in CCW order; failed flips (boundary
/// or degenerate configurations) are skipped. The signpost index is updated
/// after every successful flip.
///
/// Returns the number of flips and, when the flips produced it, the new
/// diagonal edge connecting the far endpoints of the two path edges.
fn flip_out_wedge(
    mesh: &mut SurfaceMesh,
    signpost: &mut SignpostIndex,
    incoming: EdgeKey,
    outgoing: EdgeKey,
    vertex: VertexKey,
) -> (u32, Option<EdgeKey>) {
    let Some(arriving) = mesh.halfedge_into(incoming, vertex) else {
        return (0, None);
    };
    let Some(reversed) = mesh.halfedge(arriving).twin() else {
        return (0, None);
    };
    let Some(departing) = mesh.halfedge_from(outgoing, vertex) else {
        return (0, None);
    };
    let Some(far_in) = mesh.edge_other_endpoint(incoming, vertex) else {
        return (0, None);
    };
    let Some(far_out) = mesh.edge_other_endpoint(outgoing, vertex) else {
        return (0, None);
    };

    let theta_start = signpost.angle(reversed);
    let theta_end = signpost.angle(departing);

    let mut wedge: Vec<(f64, EdgeKey)> = Vec::new();
    for halfedge in mesh.outgoing_halfedges(vertex) {
        let edge = mesh.halfedge(halfedge).edge();
        if mesh.edge_in_path(edge) {
            continue;
        }
        let angle = signpost.angle(halfedge);
        if SignpostIndex::is_angle_between(angle, theta_start, theta_end) {
            wedge.push((ccw_difference(theta_start, angle), edge));
        }
    }
    wedge.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut attempted: FastHashSet<EdgeKey> = FastHashSet::default();
    let mut flips = 0_u32;
    let mut diagonal = None;
    for (_, edge) in wedge {
        if !attempted.insert(edge) {
            continue;
        }
        if mesh.flip_edge(edge) {
            signpost.update_after_flip(mesh, edge);
            flips += 1;
            let (a, b) = mesh.edge_endpoints(edge);
            if (a == far_in && b == far_out) || (a == far_out && b == far_in) {
                diagonal = Some(edge);
            }
        }
    }

    // A wedge spanning a single face has no interior edge to flip, but its
    // far side already connects the two path endpoints. Rerouting is only
    // valid when it strictly shortens and does not steal a path edge.
    if diagonal.is_none() {
        if let Some(existing) = mesh.find_edge(far_in, far_out) {
            let shortcut = mesh.edge_length(existing);
            let through = mesh.edge_length(incoming) + mesh.edge_length(outgoing);
            if !mesh.edge_in_path(existing) && shortcut < through {
                diagonal = Some(existing);
            }
        }
    }
    (flips, diagonal)
}

// =============================================================================
// FLIP NETWORK (open paths)
// =============================================================================

/// A FlipOut shortening network over one or more open paths.
///
/// Owns the mesh and the signpost index for the lifetime of the shortening;
/// recover the mesh afterwards with [`into_mesh`](Self::into_mesh).
///
/// See the [crate-level documentation](crate) for a usage example.
pub struct FlipNetwork {
    mesh: SurfaceMesh,
    signpost: SignpostIndex,
    paths: Vec<GeodesicPath>,
    options: ShorteningOptions,
    sink: Box<dyn ProgressSink>,
}

impl fmt::Debug for FlipNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlipNetwork")
            .field("paths", &self.paths.len())
            .field("total_length", &self.total_length())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl FlipNetwork {
    /// Builds a network around the Dijkstra shortest path between two
    /// vertices.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NoPath`] when the target is unreachable or
    /// equals the source.
    pub fn from_dijkstra_path(
        mesh: SurfaceMesh,
        source: VertexKey,
        target: VertexKey,
        options: ShorteningOptions,
    ) -> Result<Self, NetworkError> {
        let path = Dijkstra::new(&mesh)
            .compute_path(source, target)
            .ok_or(NetworkError::NoPath { source, target })?;
        Ok(Self::from_paths(mesh, vec![path], options))
    }

    /// Builds a network with one path segment per consecutive waypoint
    /// pair. With `mark_interior` the interior waypoints are pinned so the
    /// shortener keeps the path anchored to them.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::TooFewWaypoints`] (as a [`NetworkError`]) for
    /// fewer than two waypoints and [`NetworkError::NoPath`] when any
    /// segment is unreachable.
    pub fn from_piecewise_dijkstra_path(
        mesh: SurfaceMesh,
        waypoints: &[VertexKey],
        mark_interior: bool,
        options: ShorteningOptions,
    ) -> Result<Self, NetworkError> {
        let segments = Dijkstra::new(&mesh)
            .compute_piecewise_path(waypoints)?
            .ok_or(NetworkError::NoPath {
                source: waypoints[0],
                target: waypoints[waypoints.len() - 1],
            })?;
        let mut network = Self::from_paths(mesh, segments, options);
        if mark_interior {
            for &waypoint in &waypoints[1..waypoints.len() - 1] {
                network.mesh.set_vertex_marked(waypoint, true);
            }
        }
        Ok(network)
    }

    fn from_paths(mesh: SurfaceMesh, paths: Vec<GeodesicPath>, options: ShorteningOptions) -> Self {
        let mut network = Self {
            signpost: SignpostIndex::new(&mesh),
            mesh,
            paths,
            options,
            sink: Box::new(TracingSink),
        };
        network.refresh_path_flags();
        network
    }

    /// Replaces the progress sink used in verbose mode.
    pub fn set_progress_sink(&mut self, sink: Box<dyn ProgressSink>) {
        self.sink = sink;
    }

    /// The mesh being shortened over.
    #[must_use]
    pub const fn mesh(&self) -> &SurfaceMesh {
        &self.mesh
    }

    /// The signpost index maintained across flips.
    #[must_use]
    pub const fn signpost(&self) -> &SignpostIndex {
        &self.signpost
    }

    /// The paths of this network.
    #[must_use]
    pub fn paths(&self) -> &[GeodesicPath] {
        &self.paths
    }

    /// Consumes the network and returns the (mutated) mesh.
    #[must_use]
    pub fn into_mesh(self) -> SurfaceMesh {
        self.mesh
    }

    /// Pins a vertex against selection as a flexible joint.
    pub fn mark_vertex(&mut self, vertex: VertexKey, marked: bool) {
        self.mesh.set_vertex_marked(vertex, marked);
    }

    /// Whether an edge currently belongs to any path of this network.
    #[must_use]
    pub fn edge_in_path(&self, edge: EdgeKey) -> bool {
        self.mesh.edge_in_path(edge)
    }

    /// Sum of the cached path lengths.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.paths.iter().map(GeodesicPath::length).sum()
    }

    /// The smallest wedge angle over all unmarked interior path vertices.
    ///
    /// At convergence this is at least `π − 1e-6`; returns infinity when no
    /// interior vertex qualifies.
    #[must_use]
    pub fn min_interior_angle(&self) -> f64 {
        let mut minimum = f64::INFINITY;
        for path in &self.paths {
            let vertices = path.vertices(&self.mesh);
            for corner in 1..path.edges().len() {
                if self.mesh.is_vertex_marked(vertices[corner]) {
                    continue;
                }
                if let Some(angle) = path.wedge_angle_at_corner(&self.mesh, &self.signpost, corner)
                {
                    minimum = minimum.min(angle);
                }
            }
        }
        minimum
    }

    /// The first unmarked flexible joint in scan order, if any.
    #[must_use]
    pub fn find_flexible_joint(&self) -> Option<VertexKey> {
        self.locate_flexible_joint().map(|(_, _, vertex)| vertex)
    }

    /// Each path as a polyline of extrinsic positions.
    #[must_use]
    pub fn path_polylines_3d(&self) -> Vec<Vec<Point3>> {
        self.paths
            .iter()
            .map(|path| {
                path.vertices(&self.mesh)
                    .into_iter()
                    .map(|vertex| self.mesh.position(vertex))
                    .collect()
            })
            .collect()
    }

    /// Runs FlipOut with the options stored on the network.
    pub fn iterative_shorten(&mut self) -> ShorteningReport {
        let options = self.options;
        self.iterative_shorten_with(options.max_iterations, options.convergence_threshold)
    }

    /// Runs FlipOut with explicit bounds, overriding the stored options.
    pub fn iterative_shorten_with(
        &mut self,
        max_iterations: u32,
        convergence_threshold: f64,
    ) -> ShorteningReport {
        let initial_length = self.update_lengths();
        let mut previous = initial_length;
        let mut report = ShorteningReport {
            iterations: 0,
            converged: false,
            flips: 0,
            initial_length,
            final_length: initial_length,
        };
        for iteration in 0..max_iterations {
            let Some((path_index, corner, vertex)) = self.locate_flexible_joint() else {
                report.converged = true;
                break;
            };
            if self.options.verbose {
                let line =
                    format!("[FlipNetwork] Iteration {iteration}: Flexible joint at vertex {vertex:?}");
                self.sink.emit(&line);
            }
            let flips = self.flip_out_at(path_index, corner);
            report.iterations += 1;
            report.flips += flips;
            let current = self.update_lengths();
            report.final_length = current;
            if flips == 0 && current >= previous {
                break; // this joint cannot be straightened
            }
            if (previous - current).abs() < convergence_threshold {
                report.converged = true;
                break;
            }
            previous = current;
        }
        report.final_length = self.update_lengths();
        report
    }

    fn locate_flexible_joint(&self) -> Option<(usize, usize, VertexKey)> {
        for (path_index, path) in self.paths.iter().enumerate() {
            let vertices = path.vertices(&self.mesh);
            for corner in 1..path.edges().len() {
                let vertex = vertices[corner];
                if self.mesh.is_vertex_marked(vertex) {
                    continue;
                }
                let Some(angle) =
                    path.wedge_angle_at_corner(&self.mesh, &self.signpost, corner)
                else {
                    continue;
                };
                if angle < PI - FLEXIBLE_JOINT_EPSILON {
                    return Some((path_index, corner, vertex));
                }
            }
        }
        None
    }

    /// Straightens one corner and reroutes the path across the resulting
    /// diagonal. Returns the number of flips.
    fn flip_out_at(&mut self, path_index: usize, corner: usize) -> u32 {
        let (incoming, outgoing, vertex, far_in, far_out) = {
            let path = &self.paths[path_index];
            let vertices = path.vertices(&self.mesh);
            (
                path.edges()[corner - 1],
                path.edges()[corner],
                vertices[corner],
                vertices[corner - 1],
                vertices[corner + 1],
            )
        };
        let (flips, diagonal) =
            flip_out_wedge(&mut self.mesh, &mut self.signpost, incoming, outgoing, vertex);

        if far_in == far_out {
            // The path doubles back over one edge; drop the spike entirely.
            let path = &mut self.paths[path_index];
            if path.edges().len() > 2 {
                path.edges_mut().drain(corner - 1..=corner);
            }
        } else if let Some(diagonal) = diagonal {
            let path = &mut self.paths[path_index];
            let edges = path.edges_mut();
            edges.remove(corner);
            edges[corner - 1] = diagonal;
        }

        self.refresh_path_flags();
        flips
    }

    fn refresh_path_flags(&mut self) {
        self.mesh.clear_path_flags();
        for path in &self.paths {
            for &edge in path.edges() {
                self.mesh.set_edge_in_path(edge, true);
            }
        }
    }

    fn update_lengths(&mut self) -> f64 {
        let mut total = 0.0;
        for path in &mut self.paths {
            total += path.update_length(&self.mesh);
        }
        total
    }
}

// =============================================================================
// LOOP NETWORK (closed loops)
// =============================================================================

/// A FlipOut shortening network over one closed loop through waypoint
/// edges.
///
/// Built from edge indices, ordered by the TSP heuristic, connected with
/// Dijkstra segments, then shortened like a path — except that *every*
/// vertex is interior, the base vertex included, whose incoming edge is the
/// last edge of the loop.
pub struct LoopNetwork {
    mesh: SurfaceMesh,
    signpost: SignpostIndex,
    cycle: GeodesicLoop,
    options: LoopOptions,
    sink: Box<dyn ProgressSink>,
    waypoint_edges: Vec<EdgeKey>,
    skipped_edges: Vec<EdgeKey>,
    estimated_length: f64,
}

impl fmt::Debug for LoopNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopNetwork")
            .field("edges", &self.cycle.edges().len())
            .field("length", &self.cycle.length())
            .field("skipped_edges", &self.skipped_edges.len())
            .finish_non_exhaustive()
    }
}

impl LoopNetwork {
    /// Builds a loop network visiting the waypoint edges given by creation
    /// index.
    ///
    /// The waypoint edges are ordered (optionally via the TSP heuristic),
    /// consecutive waypoints are connected with Dijkstra segments, the
    /// waypoint endpoints are pinned, and the loop is validated.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::EdgeIndexOutOfRange`] for an unknown edge index.
    /// - [`NetworkError::TooManySkippedEdges`] when the ordering skipped
    ///   more edges than `max_skipped_edges` (or any, with
    ///   `require_all_edges`).
    /// - [`NetworkError::NoPath`] when a connecting segment is unreachable.
    /// - [`NetworkError::Path`] when the assembled loop is malformed (for
    ///   example fewer than three edges).
    pub fn from_edge_waypoints(
        mesh: SurfaceMesh,
        edge_indices: &[usize],
        options: LoopOptions,
    ) -> Result<Self, NetworkError> {
        let mut waypoint_edges = Vec::with_capacity(edge_indices.len());
        for &index in edge_indices {
            let edge = mesh.edge_key(index).ok_or(NetworkError::EdgeIndexOutOfRange {
                index,
                count: mesh.number_of_edges(),
            })?;
            waypoint_edges.push(edge);
        }

        let ordering_options = if options.optimize_order {
            options.ordering
        } else {
            OrderingOptions {
                use_nearest_neighbor: false,
                use_2opt: false,
                ..options.ordering
            }
        };
        let ordering = order_edge_waypoints(&mesh, &waypoint_edges, &ordering_options);

        let allowed = if options.require_all_edges {
            0
        } else {
            options
                .max_skipped_edges
                .map_or(usize::MAX, |bound| bound as usize)
        };
        if ordering.skipped_edges.len() > allowed {
            return Err(NetworkError::TooManySkippedEdges {
                skipped: ordering.skipped_edges.len(),
                allowed,
            });
        }

        // Assemble the cyclic edge sequence: each waypoint edge, then a
        // Dijkstra connector to the next waypoint's entry vertex.
        let dijkstra = Dijkstra::new(&mesh);
        let tour = &ordering.edges;
        let mut edges: Vec<EdgeKey> = Vec::new();
        for (index, waypoint) in tour.iter().enumerate() {
            edges.push(waypoint.edge);
            let next_entry = tour[(index + 1) % tour.len()].entry;
            if waypoint.exit != next_entry {
                let segment = dijkstra
                    .compute_path(waypoint.exit, next_entry)
                    .ok_or(NetworkError::NoPath {
                        source: waypoint.exit,
                        target: next_entry,
                    })?;
                edges.extend_from_slice(segment.edges());
            }
        }
        let base = tour
            .first()
            .map(|waypoint| waypoint.entry)
            .ok_or(PathError::TooFewLoopEdges { count: 0 })?;
        let cycle = GeodesicLoop::new(&mesh, base, edges)?;

        let mut mesh = mesh;
        for waypoint in tour {
            mesh.set_vertex_marked(waypoint.entry, true);
            mesh.set_vertex_marked(waypoint.exit, true);
        }

        let mut network = Self {
            signpost: SignpostIndex::new(&mesh),
            mesh,
            cycle,
            options,
            sink: Box::new(TracingSink),
            waypoint_edges,
            skipped_edges: ordering.skipped_edges,
            estimated_length: ordering.estimated_length,
        };
        network.refresh_path_flags();
        Ok(network)
    }

    /// Replaces the progress sink used in verbose mode.
    pub fn set_progress_sink(&mut self, sink: Box<dyn ProgressSink>) {
        self.sink = sink;
    }

    /// The mesh being shortened over.
    #[must_use]
    pub const fn mesh(&self) -> &SurfaceMesh {
        &self.mesh
    }

    /// The current loop.
    #[must_use]
    pub const fn geodesic_loop(&self) -> &GeodesicLoop {
        &self.cycle
    }

    /// Waypoint edges the ordering pass could not place.
    #[must_use]
    pub fn skipped_edges(&self) -> &[EdgeKey] {
        &self.skipped_edges
    }

    /// The cached loop length.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.cycle.length()
    }

    /// The smallest wedge angle over all unmarked loop vertices.
    #[must_use]
    pub fn min_interior_angle(&self) -> f64 {
        let mut minimum = f64::INFINITY;
        let vertices = self.cycle.vertices(&self.mesh);
        for corner in 0..self.cycle.edges().len() {
            if self.mesh.is_vertex_marked(vertices[corner]) {
                continue;
            }
            if let Some(angle) =
                self.cycle.wedge_angle_at_corner(&self.mesh, &self.signpost, corner)
            {
                minimum = minimum.min(angle);
            }
        }
        minimum
    }

    /// The first unmarked flexible joint in cyclic scan order, if any.
    #[must_use]
    pub fn find_flexible_joint(&self) -> Option<VertexKey> {
        self.locate_flexible_joint().map(|(_, vertex)| vertex)
    }

    /// The loop as a closed polyline: the base position is appended again
    /// at the end.
    #[must_use]
    pub fn loop_polyline_3d(&self) -> Vec<Point3> {
        let mut polyline: Vec<Point3> = self
            .cycle
            .vertices(&self.mesh)
            .into_iter()
            .map(|vertex| self.mesh.position(vertex))
            .collect();
        if let Some(&first) = polyline.first() {
            polyline.push(first);
        }
        polyline
    }

    /// Shortens the loop, classifies the faces, and reports statistics.
    pub fn compute(&mut self) -> LoopResult {
        let report = self.iterative_shorten();
        let segmentation = Segmentation::classify(&self.mesh, &self.cycle);
        let stats = LoopStats {
            waypoint_edges: self.waypoint_edges.len(),
            skipped_edges: self.skipped_edges.len(),
            estimated_length: self.estimated_length,
            initial_length: report.initial_length,
            final_length: report.final_length,
        };
        LoopResult {
            report,
            segmentation,
            stats,
        }
    }

    /// Runs FlipOut with the options stored on the network.
    pub fn iterative_shorten(&mut self) -> ShorteningReport {
        let options = self.options.shortening;
        self.iterative_shorten_with(options.max_iterations, options.convergence_threshold)
    }

    /// Runs FlipOut with explicit bounds, overriding the stored options.
    pub fn iterative_shorten_with(
        &mut self,
        max_iterations: u32,
        convergence_threshold: f64,
    ) -> ShorteningReport {
        let initial_length = self.cycle.update_length(&self.mesh);
        let mut previous = initial_length;
        let mut report = ShorteningReport {
            iterations: 0,
            converged: false,
            flips: 0,
            initial_length,
            final_length: initial_length,
        };
        for iteration in 0..max_iterations {
            let Some((corner, vertex)) = self.locate_flexible_joint() else {
                report.converged = true;
                break;
            };
            if self.options.shortening.verbose {
                let line =
                    format!("[LoopNetwork] Iteration {iteration}: Flexible joint at vertex {vertex:?}");
                self.sink.emit(&line);
            }
            let flips = self.flip_out_at(corner);
            report.iterations += 1;
            report.flips += flips;
            let current = self.cycle.update_length(&self.mesh);
            report.final_length = current;
            if flips == 0 && current >= previous {
                break;
            }
            if (previous - current).abs() < convergence_threshold {
                report.converged = true;
                break;
            }
            previous = current;
        }
        report.final_length = self.cycle.update_length(&self.mesh);
        report
    }

    fn locate_flexible_joint(&self) -> Option<(usize, VertexKey)> {
        let vertices = self.cycle.vertices(&self.mesh);
        for corner in 0..self.cycle.edges().len() {
            let vertex = vertices[corner];
            if self.mesh.is_vertex_marked(vertex) {
                continue;
            }
            let Some(angle) =
                self.cycle.wedge_angle_at_corner(&self.mesh, &self.signpost, corner)
            else {
                continue;
            };
            if angle < PI - FLEXIBLE_JOINT_EPSILON {
                return Some((corner, vertex));
            }
        }
        None
    }

    /// Straightens one cyclic corner and reroutes the loop across the
    /// resulting diagonal. Returns the number of flips.
    fn flip_out_at(&mut self, corner: usize) -> u32 {
        let count = self.cycle.edges().len();
        let (incoming, outgoing) = self.cycle.corner_edges(corner);
        let vertices = self.cycle.vertices(&self.mesh);
        let vertex = vertices[corner];
        let far_in = vertices[(corner + count - 1) % count];
        let far_out = vertices[(corner + 1) % count];

        let (flips, diagonal) =
            flip_out_wedge(&mut self.mesh, &mut self.signpost, incoming, outgoing, vertex);

        if far_in == far_out {
            // Dropping the two spike edges must leave a valid loop.
            if count > 4 {
                let edges = self.cycle.edges_mut();
                if corner == 0 {
                    edges.pop();
                    edges.remove(0);
                    self.cycle.set_base(far_in);
                } else {
                    edges.remove(corner);
                    edges.remove(corner - 1);
                }
            }
        } else if let Some(diagonal) = diagonal {
            // Replacing two edges by one must leave at least three.
            if count > 3 {
                let edges = self.cycle.edges_mut();
                if corner == 0 {
                    edges.pop();
                    edges[0] = diagonal;
                    self.cycle.set_base(far_in);
                } else {
                    edges.remove(corner);
                    edges[corner - 1] = diagonal;
                }
            }
        }

        self.refresh_path_flags();
        flips
    }

    fn refresh_path_flags(&mut self) {
        self.mesh.clear_path_flags();
        for &edge in self.cycle.edges() {
            self.mesh.set_edge_in_path(edge, true);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
