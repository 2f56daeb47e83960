//! Route and range queries against cached networks.
//!
//! # Route pipeline
//!
//! ```text
//! cache.get_or_load(area, mode)
//!   → snap start / end to their nearest edges (max_distance_m)
//!   → read-lock the graph
//!   → VirtualOverlay::insert   (start/end spliced into their edges)
//!   → bidirectional search start → end over the overlay
//!   → path → edge features → cumulative cost / length / mode
//!   → drop overlay, release lock
//! ```
//!
//! [`RouteCalculator::calculate_route`] never fails: every error becomes an
//! empty [`RouteCollection`] with a message.  [`RouteCalculator::try_route`]
//! is the same pipeline with the error kept typed.

use std::sync::Arc;

use geojson::JsonValue;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

use evac_core::geo::{line_first, line_last};
use evac_core::{EdgeId, LonLat, ModeCosts, NodeCategory, RoutingConfig};
use evac_network::{
    EdgeFeature, EdgeToggleReport, NetworkError, NetworkLoader, NodeCost, NodesInRange, PathNode,
    RangeTree, RoutingGraph, SearchControl, SourceNode, bidirectional_indexed, edge_cost, find_path,
    is_virtual_id,
};

use crate::cache::{NetworkBundle, NetworkCache, NetworkStats};
use crate::output::{RangeEdge, RouteCollection, RouteSegment};
use crate::overlay::VirtualOverlay;
use crate::{RouteError, RoutePoint, RouteResult};

/// Edge property matched by disable/enable calls unless told otherwise.
pub const DEFAULT_ID_FIELD: &str = "id";

// ── RouteRequest ──────────────────────────────────────────────────────────────

/// Parameters of one route calculation.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteRequest {
    pub area: String,
    pub mode: String,
    pub start: LonLat,
    pub end: LonLat,
    /// Snapping tolerance in metres; the configured default when `None`.
    pub max_distance_m: Option<f64>,
    pub mode_costs: Option<ModeCosts>,
}

impl RouteRequest {
    pub fn new(area: impl Into<String>, mode: impl Into<String>, start: LonLat, end: LonLat) -> Self {
        Self {
            area: area.into(),
            mode: mode.into(),
            start,
            end,
            max_distance_m: None,
            mode_costs: None,
        }
    }

    pub fn with_max_distance(mut self, max_distance_m: f64) -> Self {
        self.max_distance_m = Some(max_distance_m);
        self
    }

    pub fn with_mode_costs(mut self, mode_costs: ModeCosts) -> Self {
        self.mode_costs = Some(mode_costs);
        self
    }
}

// ── RouteCalculator ───────────────────────────────────────────────────────────

/// Entry point for route, range and edge-toggle operations.
///
/// Cheap to clone; clones share one [`NetworkCache`].
#[derive(Clone)]
pub struct RouteCalculator {
    cache: Arc<NetworkCache>,
}

impl RouteCalculator {
    pub fn new(cache: Arc<NetworkCache>) -> Self {
        Self { cache }
    }

    /// A calculator with its own cache over `loader`.
    pub fn with_loader(loader: impl NetworkLoader + 'static, config: RoutingConfig) -> Self {
        Self::new(Arc::new(NetworkCache::new(loader, config)))
    }

    pub fn cache(&self) -> &NetworkCache {
        &self.cache
    }

    pub fn config(&self) -> &RoutingConfig {
        self.cache.config()
    }

    /// Search limits from the configuration, without a cancel token.
    pub fn search_control(&self) -> SearchControl {
        SearchControl::from_config(self.config())
    }

    fn bundle(&self, area: &str, mode: &str) -> RouteResult<Arc<NetworkBundle>> {
        self.cache.get_or_load(area, mode)
    }

    // ── Routes ────────────────────────────────────────────────────────────

    /// Route between two coordinates.  Never fails; see
    /// [`RouteCollection::message`] for why a route is empty.
    pub fn calculate_route(&self, request: &RouteRequest) -> RouteCollection {
        self.calculate_route_with(request, &self.search_control())
    }

    /// [`calculate_route`](Self::calculate_route) under explicit search
    /// limits, e.g. with a [`CancelToken`](evac_network::CancelToken).
    pub fn calculate_route_with(&self, request: &RouteRequest, control: &SearchControl) -> RouteCollection {
        match self.try_route(request, control) {
            Ok(route) => route,
            Err(err) => {
                info!(area = %request.area, mode = %request.mode, error = %err, "route not found");
                let message = match &err {
                    RouteError::Network(inner) => format!("CalculateRoute unexpected error: {inner}"),
                    other => other.to_string(),
                };
                RouteCollection::failure(message)
            }
        }
    }

    /// The route pipeline with typed errors.
    pub fn try_route(&self, request: &RouteRequest, control: &SearchControl) -> RouteResult<RouteCollection> {
        let bundle = self.bundle(&request.area, &request.mode)?;
        let edges = bundle.edges();
        let max_distance = request.max_distance_m.unwrap_or(self.config().max_snap_distance_m);

        let snap = |point: LonLat, which: RoutePoint| {
            bundle
                .spatial()
                .find_nearest(edges, point, max_distance)
                .ok_or_else(|| RouteError::PointNotNearNetwork { which, area: request.area.clone() })
        };
        let start = snap(request.start, RoutePoint::Start)?;
        let end = snap(request.end, RoutePoint::End)?;

        let graph = bundle.graph();
        let overlay = VirtualOverlay::insert(&graph, edges, &start, request.start, &end, request.end)?;

        let origin = [NodeCost { node: overlay.start(), cost: 0.0 }];
        let mode_costs = request.mode_costs.as_ref();
        let no_path = || RouteError::NoPathFound { start: request.start, end: request.end };

        let tree = bidirectional_indexed(&overlay, &origin, overlay.end(), mode_costs, control)?
            .ok_or_else(no_path)?;
        let path = find_path(&overlay, &tree.previous, tree.target);
        if path.is_empty() {
            return Err(no_path());
        }

        let segments = route_segments(&bundle, &overlay, &path, &request.mode, mode_costs);
        debug!(
            area = %request.area,
            mode = %request.mode,
            nodes = path.len(),
            segments = segments.len(),
            cost = tree.total_cost,
            "route calculated"
        );
        Ok(RouteCollection::new(segments))
    }

    // ── Range queries ─────────────────────────────────────────────────────

    /// Every node within `max_cost` of `sources`.
    pub fn find_nodes_in_range(
        &self,
        area: &str,
        mode: &str,
        sources: &[SourceNode],
        max_cost: f64,
        mode_costs: Option<&ModeCosts>,
    ) -> RouteResult<NodesInRange> {
        let bundle = self.bundle(area, mode)?;
        let graph = bundle.graph();
        Ok(evac_network::find_nodes_in_range(&*graph, sources, max_cost, mode_costs, &self.search_control())?)
    }

    /// Like [`find_nodes_in_range`](Self::find_nodes_in_range), keeping the
    /// search tree.  Pass it to [`path_in_range`](Self::path_in_range).
    pub fn find_nodes_and_paths_in_range(
        &self,
        area: &str,
        mode: &str,
        sources: &[SourceNode],
        max_cost: f64,
        mode_costs: Option<&ModeCosts>,
    ) -> RouteResult<RangeTree> {
        let bundle = self.bundle(area, mode)?;
        let graph = bundle.graph();
        Ok(evac_network::find_nodes_and_paths_in_range(
            &*graph,
            sources,
            max_cost,
            mode_costs,
            &self.search_control(),
        )?)
    }

    /// Path from the nearest source to node `dest_id` in a range tree.
    /// Empty when `dest_id` is a source or was not reached.
    pub fn path_in_range(&self, area: &str, mode: &str, tree: &RangeTree, dest_id: &str) -> RouteResult<Vec<PathNode>> {
        let bundle = self.bundle(area, mode)?;
        let graph = bundle.graph();
        let dest = graph
            .index_of(dest_id)
            .ok_or_else(|| NetworkError::NodeNotFound(dest_id.to_owned()))?;
        Ok(tree.path_to(&*graph, dest))
    }

    /// Edges whose two ends are both within `max_cost` of the network point
    /// nearest to `point`.
    ///
    /// The search starts at whichever end of the nearest edge is closer to
    /// `point`.  Each undirected edge is reported once, with the reached
    /// cost at both of its ends.
    pub fn get_edges_in_range(&self, area: &str, mode: &str, point: LonLat, max_cost: f64) -> RouteResult<Vec<RangeEdge>> {
        let bundle = self.bundle(area, mode)?;
        let edges = bundle.edges();
        let snap_distance = self.config().range_snap_distance_m;

        let nearest = bundle
            .spatial()
            .find_nearest(edges, point, snap_distance)
            .ok_or_else(|| RouteError::PointNotNearNetwork { which: RoutePoint::Center, area: area.to_owned() })?;
        let Some(snapped) = edges.get(nearest.edge) else {
            return Ok(Vec::new());
        };
        let origin = closer_end(snapped, point);

        let graph = bundle.graph();
        let reached = evac_network::find_nodes_in_range(
            &*graph,
            &[SourceNode::new(origin, 0.0)],
            max_cost,
            None,
            &self.search_control(),
        )?;
        drop(graph);

        let distances: FxHashMap<&str, f64> = reached
            .node_ids
            .iter()
            .map(String::as_str)
            .zip(reached.node_costs.iter().copied())
            .collect();

        let index = bundle.edge_index();
        let mut seen: FxHashSet<(&str, &str)> = FxHashSet::default();
        let mut result = Vec::new();
        for source in &reached.node_ids {
            let mut outgoing: Vec<(&str, EdgeId)> = index.outgoing(source).collect();
            outgoing.sort_by_key(|&(_, id)| id);
            for (target, edge_id) in outgoing {
                let (Some(&source_distance), Some(&target_distance)) =
                    (distances.get(source.as_str()), distances.get(target))
                else {
                    continue;
                };
                if !seen.insert(undirected(source, target)) {
                    continue;
                }
                let Some(feature) = edges.get(edge_id) else { continue };
                result.push(RangeEdge { feature: feature.clone(), source_distance, target_distance });
            }
        }

        debug!(area, mode, origin, nodes = reached.len(), edges = result.len(), "edges in range");
        Ok(result)
    }

    // ── Edge toggles ──────────────────────────────────────────────────────

    /// Make the listed edges impassable in both directions.  `id_field`
    /// names the edge property the ids are matched against.
    pub fn disable_graph_edges<S: AsRef<str>>(
        &self,
        area: &str,
        mode: &str,
        edge_ids: &[S],
        id_field: &str,
    ) -> RouteResult<EdgeToggleReport> {
        let bundle = self.bundle(area, mode)?;
        let field = bundle.field_index(id_field);
        let report = bundle.graph_mut().disable_edges(bundle.edges(), &field, edge_ids);
        info!(area, mode, matched = report.matched, unknown = report.unknown.len(), "edges disabled");
        Ok(report)
    }

    /// Restore the listed edges to their values before they were disabled.
    pub fn enable_graph_edges<S: AsRef<str>>(
        &self,
        area: &str,
        mode: &str,
        edge_ids: &[S],
        id_field: &str,
    ) -> RouteResult<EdgeToggleReport> {
        let bundle = self.bundle(area, mode)?;
        let field = bundle.field_index(id_field);
        let report = bundle.graph_mut().enable_edges(bundle.edges(), &field, edge_ids);
        info!(area, mode, matched = report.matched, unknown = report.unknown.len(), "edges enabled");
        Ok(report)
    }

    /// Restore every disabled entry.  Returns how many were restored.
    pub fn reset_graph_to_default(&self, area: &str, mode: &str) -> RouteResult<usize> {
        let bundle = self.bundle(area, mode)?;
        let restored = bundle.graph_mut().reset_to_default();
        info!(area, mode, restored, "graph reset to default");
        Ok(restored)
    }

    pub fn network_stats(&self, area: &str, mode: &str) -> RouteResult<NetworkStats> {
        Ok(self.bundle(area, mode)?.stats())
    }
}

// ── Path → segments ───────────────────────────────────────────────────────────

/// Edge features along `path`, annotated with running totals.
///
/// Pairs touching a virtual slot use the overlay's synthetic edges; all
/// others use the edge index, in either direction.  A pair without a feature
/// is skipped.
fn route_segments(
    bundle: &NetworkBundle,
    overlay: &VirtualOverlay<'_>,
    path: &[PathNode],
    network_mode: &str,
    mode_costs: Option<&ModeCosts>,
) -> Vec<RouteSegment> {
    let index = bundle.edge_index();
    let edges = bundle.edges();

    let mut segments = Vec::with_capacity(path.len().saturating_sub(1));
    let mut route_cost = 0.0;
    let mut route_length = 0.0;

    for pair in path.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let feature = if is_virtual_id(&from.id) || is_virtual_id(&to.id) {
            overlay.find_synthetic(&from.id, &to.id)
        } else {
            index
                .get(&from.id, &to.id)
                .or_else(|| index.get(&to.id, &from.id))
                .and_then(|id| edges.get(id))
        };
        let Some(feature) = feature else {
            debug!(from = %from.id, to = %to.id, "no edge feature for path step; skipped");
            continue;
        };

        let (source_index, target_index) =
            if feature.source == from.id { (from.index, to.index) } else { (to.index, from.index) };

        route_cost += edge_cost(overlay, from.index, to.index, mode_costs);
        route_length += feature.length;
        let route_mode = route_mode(overlay.category(from.index), overlay.category(to.index), feature, network_mode);

        segments.push(RouteSegment {
            feature: feature.clone(),
            source_index,
            target_index,
            route_from: from.id.clone(),
            route_to: to.id.clone(),
            route_cost,
            route_length,
            route_mode,
        });
    }
    segments
}

/// Travel mode of one segment.
///
/// Two ends of the same real category give that category.  Otherwise (a
/// virtual end, or a modal transfer) the feature's `mode` property is used
/// if present, then the category of the first end that is neither virtual
/// nor a transshipment node, then the network's mode.
fn route_mode(from: NodeCategory, to: NodeCategory, feature: &EdgeFeature, network_mode: &str) -> String {
    if from == to && !from.is_virtual() {
        return from.as_str().to_owned();
    }
    if let Some(mode) = feature.properties.get("mode").and_then(JsonValue::as_str) {
        return mode.to_owned();
    }
    [from, to]
        .into_iter()
        .find(|c| !c.is_virtual() && *c != NodeCategory::Transshipment)
        .map_or_else(|| network_mode.to_owned(), |c| c.as_str().to_owned())
}

/// Id of the end of `feature` geometrically closer to `point`; the source on
/// a tie.
fn closer_end(feature: &EdgeFeature, point: LonLat) -> &str {
    let source_distance = line_first(&feature.geometry).map_or(f64::INFINITY, |p| point.distance_m(p));
    let target_distance = line_last(&feature.geometry).map_or(f64::INFINITY, |p| point.distance_m(p));
    if target_distance < source_distance { &feature.target } else { &feature.source }
}

fn undirected<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}
