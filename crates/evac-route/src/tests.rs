//! Unit tests for evac-route.
//!
//! Networks come from an in-memory loader so no data files are needed.

#[cfg(test)]
pub(crate) mod helpers {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use rustc_hash::FxHashMap;

    use evac_core::{LonLat, RoutingConfig};
    use evac_network::{
        EdgeCollection, EdgeFeature, LoadedNetwork, NetworkError, NetworkGraphBuilder, NetworkLoader,
        NetworkResult,
    };

    use crate::RouteCalculator;

    pub const AREA: &str = "delta";
    pub const MODE: &str = "car";

    /// Metres per 0.01° of longitude on the equator.
    pub fn edge_length() -> f64 {
        LonLat::new(0.0, 0.0).distance_m(LonLat::new(0.01, 0.0))
    }

    /// Point `fraction` of the way along edge `edge` (0-based) of the line
    /// network.
    pub fn along(edge: usize, fraction: f64) -> LonLat {
        LonLat::new((edge as f64 + fraction) * 0.01, 0.0)
    }

    /// Line A–B–C–D along the equator, 0.01° per edge, cost 1 each way.
    /// Edges `e1` (A–B), `e2` (B–C), `e3` (C–D).
    pub fn line_network() -> LoadedNetwork {
        let ids = ["A", "B", "C", "D"];
        let mut b = NetworkGraphBuilder::new();
        let mut features = Vec::new();
        for i in 0..3 {
            let (s, t) = (ids[i], ids[i + 1]);
            b.add_entry(s, t, Some(1.0));
            b.add_entry(t, s, Some(1.0));
            let line = vec![along(i, 0.0), along(i + 1, 0.0)];
            let mut feature = EdgeFeature::new(format!("e{}", i + 1), s, t, line).with_costs(Some(1.0), Some(1.0));
            feature.fid = Some(format!("f{}", i + 1));
            feature.properties.insert("fid".into(), format!("f{}", i + 1).into());
            features.push(feature);
        }
        LoadedNetwork { graph: b.build(), edges: EdgeCollection::new(features) }
    }

    /// Serves fixed networks and counts how often it is asked to load.
    pub struct MemoryLoader {
        networks: FxHashMap<(String, String), LoadedNetwork>,
        loads: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl MemoryLoader {
        pub fn new() -> Self {
            Self { networks: FxHashMap::default(), loads: Arc::default(), delay: Duration::ZERO }
        }

        pub fn with(mut self, area: &str, mode: &str, network: LoadedNetwork) -> Self {
            self.networks.insert((area.to_owned(), mode.to_owned()), network);
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn counter(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.loads)
        }
    }

    impl NetworkLoader for MemoryLoader {
        fn load(&self, area: &str, mode: &str) -> NetworkResult<LoadedNetwork> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.networks
                .get(&(area.to_owned(), mode.to_owned()))
                .cloned()
                .ok_or_else(|| NetworkError::NetworkMissing { area: area.to_owned(), mode: mode.to_owned() })
        }
    }

    pub fn calculator() -> RouteCalculator {
        RouteCalculator::with_loader(MemoryLoader::new().with(AREA, MODE, line_network()), RoutingConfig::default())
    }
}

// ── NetworkCache ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod cache {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use evac_core::{NodeCategory, RoutingConfig};

    use super::helpers::{AREA, MODE, MemoryLoader, line_network};
    use crate::{NetworkCache, RouteError};

    #[test]
    fn loads_once_and_shares_the_bundle() {
        let loader = MemoryLoader::new().with(AREA, MODE, line_network());
        let loads = loader.counter();
        let cache = NetworkCache::new(loader, RoutingConfig::default());

        let first = cache.get_or_load(AREA, MODE).unwrap();
        let second = cache.get_or_load(AREA, MODE).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(cache.contains(AREA, MODE));
        assert_eq!(cache.keys(), vec![(AREA.to_string(), MODE.to_string())]);
    }

    #[test]
    fn concurrent_callers_share_one_load() {
        let loader = MemoryLoader::new()
            .with(AREA, MODE, line_network())
            .with_delay(Duration::from_millis(20));
        let loads = loader.counter();
        let cache = NetworkCache::new(loader, RoutingConfig::default());

        let bundles: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| cache.get_or_load(AREA, MODE).unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(bundles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn failed_load_is_not_cached() {
        let loader = MemoryLoader::new();
        let loads = loader.counter();
        let cache = NetworkCache::new(loader, RoutingConfig::default());

        for _ in 0..2 {
            let err = cache.get_or_load("nowhere", MODE).err().unwrap();
            assert!(matches!(err, RouteError::NetworkNotFound { .. }));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert!(!cache.contains("nowhere", MODE));
    }

    #[test]
    fn invalidate_forces_a_reload() {
        let loader = MemoryLoader::new().with(AREA, MODE, line_network());
        let loads = loader.counter();
        let cache = NetworkCache::new(loader, RoutingConfig::default());

        let first = cache.get_or_load(AREA, MODE).unwrap();
        assert!(cache.invalidate(AREA, MODE));
        assert!(!cache.invalidate(AREA, MODE));
        let second = cache.get_or_load(AREA, MODE).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn evict_and_clear() {
        let cache = NetworkCache::new(MemoryLoader::new().with(AREA, MODE, line_network()), RoutingConfig::default());
        assert!(cache.evict(AREA, MODE).is_none());

        let held = cache.get_or_load(AREA, MODE).unwrap();
        let evicted = cache.evict(AREA, MODE).unwrap();
        assert!(Arc::ptr_eq(&held, &evicted));
        assert!(!cache.contains(AREA, MODE));
        // Holders keep a usable bundle.
        assert_eq!(held.edges().len(), 3);

        cache.insert("other", MODE, line_network());
        assert!(cache.contains("other", MODE));
        cache.clear();
        assert!(cache.keys().is_empty());
    }

    #[test]
    fn bundle_stats() {
        let cache = NetworkCache::new(MemoryLoader::new(), RoutingConfig::default());
        let bundle = cache.insert(AREA, MODE, line_network());
        let stats = bundle.stats();
        assert_eq!(stats.node_count, 6);
        assert_eq!(stats.car_nodes, 4);
        assert_eq!(stats.boat_nodes, 0);
        assert_eq!(stats.edge_count, 3);
        assert_eq!(stats.entry_count, 6);
        assert_eq!(stats.disabled_entries, 0);
        assert_eq!(bundle.graph().category_count(NodeCategory::Start), 1);
    }

    #[test]
    fn field_indexes_are_built_once() {
        let cache = NetworkCache::new(MemoryLoader::new(), RoutingConfig::default());
        let bundle = cache.insert(AREA, MODE, line_network());
        let a = bundle.field_index("fid");
        let b = bundle.field_index("fid");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.get("f2").is_some());
    }
}

// ── VirtualOverlay ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod overlay {
    use assert_approx_eq::assert_approx_eq;

    use evac_core::RoutingConfig;
    use evac_network::{Adjacency, NearestEdge, RoutingGraph, SpatialFeatureIndex};

    use super::helpers::{along, line_network};
    use crate::VirtualOverlay;

    fn snap(spatial: &SpatialFeatureIndex, edges: &evac_network::EdgeCollection, point: evac_core::LonLat) -> NearestEdge {
        spatial.find_nearest(edges, point, 50.0).unwrap()
    }

    #[test]
    fn splices_with_proportional_costs() {
        let network = line_network();
        let spatial = SpatialFeatureIndex::build(&network.edges, &RoutingConfig::default());
        let (start_pt, end_pt) = (along(0, 0.4), along(2, 0.5));
        let start = snap(&spatial, &network.edges, start_pt);
        let end = snap(&spatial, &network.edges, end_pt);

        let overlay = VirtualOverlay::insert(&network.graph, &network.edges, &start, start_pt, &end, end_pt).unwrap();
        let g = &network.graph;
        let (a, b) = (g.index_of("A").unwrap(), g.index_of("B").unwrap());
        let (c, d) = (g.index_of("C").unwrap(), g.index_of("D").unwrap());
        let (s, e) = (overlay.start(), overlay.end());

        assert_approx_eq!(overlay.entry(a, s).unwrap().cost(), 0.4, 1e-9);
        assert_approx_eq!(overlay.entry(s, b).unwrap().cost(), 0.6, 1e-9);
        assert_approx_eq!(overlay.entry(s, a).unwrap().cost(), 0.4, 1e-9);
        assert_approx_eq!(overlay.entry(b, s).unwrap().cost(), 0.6, 1e-9);
        assert_approx_eq!(overlay.entry(c, e).unwrap().cost(), 0.5, 1e-9);
        assert_approx_eq!(overlay.entry(e, d).unwrap().cost(), 0.5, 1e-9);

        // Base entries stay visible through the overlay.
        assert_eq!(overlay.entry(a, b), Some(Adjacency::Allowed(1.0)));
        assert!(overlay.successors(a).any(|(n, _)| n == s));
        assert!(overlay.successors(a).any(|(n, _)| n == b));
        assert!(overlay.predecessors(e).any(|(n, _)| n == c));

        let ids: Vec<&str> = overlay.synthetic_edges().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["A-to-start", "start-to-B", "C-to-end", "end-to-D"]);

        // The halves meet at the snapped point.
        let halves = overlay.synthetic_edges();
        let cut = halves[0].geometry.0.last().copied().unwrap();
        assert_approx_eq!(cut.x, start_pt.lon, 1e-12);
        assert_eq!(halves[1].geometry.0.first().copied(), Some(cut));
        assert_approx_eq!(halves[0].length + halves[1].length, network.edges.as_slice()[0].length, 1e-6);
    }

    #[test]
    fn one_way_edge_stays_one_way() {
        let mut network = line_network();
        let mut b = evac_network::NetworkGraphBuilder::new();
        b.add_entry("A", "B", Some(2.0));
        b.add_entry("B", "A", None);
        network.graph = b.build();

        let spatial = SpatialFeatureIndex::build(&network.edges, &RoutingConfig::default());
        let (start_pt, end_pt) = (along(0, 0.25), along(0, 0.75));
        let start = snap(&spatial, &network.edges, start_pt);
        let end = snap(&spatial, &network.edges, end_pt);
        let overlay = VirtualOverlay::insert(&network.graph, &network.edges, &start, start_pt, &end, end_pt).unwrap();

        let a = network.graph.index_of("A").unwrap();
        let (s, e) = (overlay.start(), overlay.end());
        assert_approx_eq!(overlay.entry(a, s).unwrap().cost(), 0.5, 1e-9);
        assert_eq!(overlay.entry(s, a), Some(Adjacency::Disallowed));
        assert_approx_eq!(overlay.entry(s, e).unwrap().cost(), 1.0, 1e-9);
        assert_eq!(overlay.entry(e, s), Some(Adjacency::Disallowed));
    }

    #[test]
    fn base_graph_is_untouched() {
        let network = line_network();
        let before = network.graph.to_indexed();
        let spatial = SpatialFeatureIndex::build(&network.edges, &RoutingConfig::default());
        let (start_pt, end_pt) = (along(0, 0.4), along(1, 0.5));
        let start = snap(&spatial, &network.edges, start_pt);
        let end = snap(&spatial, &network.edges, end_pt);
        {
            let overlay =
                VirtualOverlay::insert(&network.graph, &network.edges, &start, start_pt, &end, end_pt).unwrap();
            assert_eq!(overlay.links().len(), 8);
        }
        assert_eq!(network.graph.to_indexed(), before);
        assert_eq!(network.edges.len(), 3);
    }

    #[test]
    fn synthetic_lookup_prefers_exact_direction() {
        let network = line_network();
        let spatial = SpatialFeatureIndex::build(&network.edges, &RoutingConfig::default());
        let (start_pt, end_pt) = (along(0, 0.4), along(2, 0.5));
        let start = snap(&spatial, &network.edges, start_pt);
        let end = snap(&spatial, &network.edges, end_pt);
        let overlay = VirtualOverlay::insert(&network.graph, &network.edges, &start, start_pt, &end, end_pt).unwrap();

        assert_eq!(overlay.find_synthetic("start", "B").unwrap().id, "start-to-B");
        assert_eq!(overlay.find_synthetic("B", "start").unwrap().id, "start-to-B");
        assert_eq!(overlay.find_synthetic("end", "C").unwrap().id, "C-to-end");
        assert!(overlay.find_synthetic("start", "end").is_none());
    }
}

// ── calculate_route ────────────────────────────────────────────────────────────

#[cfg(test)]
mod route {
    use assert_approx_eq::assert_approx_eq;

    use evac_core::{LonLat, ModeCost, ModeCosts, NodeCategory};
    use evac_network::CancelToken;

    use super::helpers::{AREA, MODE, along, calculator, edge_length};
    use crate::{DEFAULT_ID_FIELD, RouteRequest};

    fn ids(route: &crate::RouteCollection) -> Vec<&str> {
        route.segments.iter().map(|s| s.feature.id.as_str()).collect()
    }

    #[test]
    fn line_route_through_virtual_nodes() {
        let calc = calculator();
        let route = calc.calculate_route(&RouteRequest::new(AREA, MODE, along(0, 0.4), along(2, 0.5)));

        assert!(route.message.is_none(), "{:?}", route.message);
        assert_eq!(ids(&route), vec!["start-to-B", "e2", "C-to-end"]);

        let l = edge_length();
        assert_approx_eq!(route.segments[0].route_length, 0.6 * l, 1e-6);
        assert_approx_eq!(route.total_length(), 2.1 * l, 1e-6);
        assert_approx_eq!(route.total_cost(), 2.1, 1e-9);

        let first = &route.segments[0];
        assert_eq!((first.route_from.as_str(), first.route_to.as_str()), ("start", "B"));
        assert_eq!(first.route_mode, "car");
        let last = &route.segments[2];
        assert_eq!((last.route_from.as_str(), last.route_to.as_str()), ("C", "end"));
    }

    #[test]
    fn segment_indices_follow_feature_direction() {
        let calc = calculator();
        // Travelling D → A runs every edge against its direction.
        let route = calc.calculate_route(&RouteRequest::new(AREA, MODE, along(2, 0.5), along(0, 0.4)));
        assert_eq!(ids(&route), vec!["C-to-start", "e2", "end-to-B"]);

        let bundle = calc.cache().get(AREA, MODE).unwrap();
        let graph = bundle.graph();
        let middle = &route.segments[1];
        assert_eq!(middle.source_index, graph.index_of("B").unwrap());
        assert_eq!(middle.target_index, graph.index_of("C").unwrap());
        assert_eq!((middle.route_from.as_str(), middle.route_to.as_str()), ("C", "B"));
    }

    #[test]
    fn geojson_output_properties() {
        let calc = calculator();
        let route = calc.calculate_route(&RouteRequest::new(AREA, MODE, along(0, 0.4), along(2, 0.5)));
        let collection = route.to_geojson();
        assert_eq!(collection.features.len(), 3);
        assert!(collection.foreign_members.is_none());

        let props = collection.features[1].properties.as_ref().unwrap();
        for key in ["routeFrom", "routeTo", "routeCost", "routeLength", "routeMode", "sourceIndex", "targetIndex", "source", "target", "length"] {
            assert!(props.contains_key(key), "missing {key}");
        }
        assert_eq!(props["routeFrom"], "B");
        assert_eq!(props["fid"], "f2");
    }

    #[test]
    fn start_far_from_network() {
        let calc = calculator();
        // About 500 m north of the line.
        let far = LonLat::new(0.004, 0.0045);
        let route = calc.calculate_route(&RouteRequest::new(AREA, MODE, far, along(2, 0.5)).with_max_distance(50.0));
        assert!(route.is_empty());
        let message = route.message.unwrap();
        assert!(message.contains("not near a line"), "{message}");
        assert!(message.starts_with("start"), "{message}");
    }

    #[test]
    fn end_far_from_network() {
        let calc = calculator();
        let route = calc.calculate_route(&RouteRequest::new(AREA, MODE, along(0, 0.4), LonLat::new(0.025, 0.0045)));
        assert_eq!(route.message.as_deref(), Some("end point not near a line in delta"));
    }

    #[test]
    fn missing_network() {
        let calc = calculator();
        let route = calc.calculate_route(&RouteRequest::new("nowhere", MODE, along(0, 0.4), along(2, 0.5)));
        assert!(route.is_empty());
        assert_eq!(route.message.as_deref(), Some("Network nowhere car not found"));
        let collection = route.to_geojson();
        assert_eq!(collection.foreign_members.unwrap()["message"], "Network nowhere car not found");
    }

    #[test]
    fn start_equals_end() {
        let calc = calculator();
        let point = along(0, 0.4);
        let route = calc.calculate_route(&RouteRequest::new(AREA, MODE, point, point));
        assert!(route.len() <= 1);
        assert_approx_eq!(route.total_length(), 0.0, 1e-6);
    }

    #[test]
    fn both_points_on_one_edge_forward() {
        let calc = calculator();
        let route = calc.calculate_route(&RouteRequest::new(AREA, MODE, along(0, 0.2), along(0, 0.7)));
        assert_eq!(ids(&route), vec!["start-to-end"]);
        assert_approx_eq!(route.total_length(), 0.5 * edge_length(), 1e-6);
        assert_approx_eq!(route.total_cost(), 0.5, 1e-9);
    }

    #[test]
    fn both_points_on_one_edge_backward() {
        let calc = calculator();
        let route = calc.calculate_route(&RouteRequest::new(AREA, MODE, along(0, 0.7), along(0, 0.2)));
        assert_eq!(ids(&route), vec!["end-to-start"]);
        assert_approx_eq!(route.total_length(), 0.5 * edge_length(), 1e-6);
        assert_approx_eq!(route.total_cost(), 0.5, 1e-9);
    }

    #[test]
    fn mode_costs_weight_the_total() {
        let calc = calculator();
        let costs = ModeCosts::new().with(NodeCategory::Car, ModeCost::multiplier(2.0));
        let request = RouteRequest::new(AREA, MODE, along(0, 0.4), along(2, 0.5)).with_mode_costs(costs);
        let route = calc.calculate_route(&request);
        // start→B and B→C are doubled; C→end takes the origin's mode too.
        assert_approx_eq!(route.total_cost(), 4.2, 1e-9);
    }

    #[test]
    fn disabled_edge_blocks_the_route_until_reset() {
        let calc = calculator();
        let request = RouteRequest::new(AREA, MODE, along(0, 0.4), along(2, 0.5));

        let report = calc.disable_graph_edges(AREA, MODE, &["e2"], DEFAULT_ID_FIELD).unwrap();
        assert_eq!(report.matched, 1);
        let blocked = calc.calculate_route(&request);
        assert!(blocked.is_empty());
        assert!(blocked.message.unwrap().starts_with("No route found between"));

        let bundle = calc.cache().get(AREA, MODE).unwrap();
        let (b, c) = {
            let g = bundle.graph();
            (g.index_of("B").unwrap(), g.index_of("C").unwrap())
        };
        assert_eq!(calc.reset_graph_to_default(AREA, MODE).unwrap(), 2);
        {
            let g = bundle.graph();
            assert_eq!(g.get_entry(b, c).unwrap().cost().to_bits(), 1.0f64.to_bits());
            assert_eq!(g.get_entry(c, b).unwrap().cost().to_bits(), 1.0f64.to_bits());
        }
        assert_eq!(ids(&calc.calculate_route(&request)), vec!["start-to-B", "e2", "C-to-end"]);
    }

    #[test]
    fn disable_by_other_field_and_enable() {
        let calc = calculator();
        let report = calc.disable_graph_edges(AREA, MODE, &["f1", "f9"], "fid").unwrap();
        assert_eq!(report.matched, 1);
        assert_eq!(report.unknown, vec!["f9".to_string()]);
        assert_eq!(calc.network_stats(AREA, MODE).unwrap().disabled_entries, 2);

        calc.enable_graph_edges(AREA, MODE, &["f1"], "fid").unwrap();
        assert_eq!(calc.network_stats(AREA, MODE).unwrap().disabled_entries, 0);
    }

    #[test]
    fn routing_leaves_the_shared_network_unchanged() {
        let calc = calculator();
        let bundle = calc.cache().get_or_load(AREA, MODE).unwrap();
        let before = bundle.graph().to_indexed();

        let route = calc.calculate_route(&RouteRequest::new(AREA, MODE, along(0, 0.4), along(2, 0.5)));
        assert_eq!(route.len(), 3);
        assert_eq!(bundle.graph().to_indexed(), before);
        assert_eq!(bundle.edges().len(), 3);
        assert!(bundle.edge_index().get("start", "B").is_none());
    }

    #[test]
    fn concurrent_routes_on_one_network() {
        let calc = calculator();
        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let calc = calc.clone();
                    scope.spawn(move || {
                        let start = along(0, 0.1 + 0.1 * i as f64);
                        calc.calculate_route(&RouteRequest::new(AREA, MODE, start, along(2, 0.5)))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for route in &results {
            assert_eq!(ids(route), vec!["start-to-B", "e2", "C-to-end"]);
        }
    }

    #[test]
    fn cancelled_route_reports_a_message() {
        let calc = calculator();
        let token = CancelToken::new();
        token.cancel();
        let mut control = calc.search_control().with_cancel(token);
        control.check_interval = 1;
        let route = calc.calculate_route_with(&RouteRequest::new(AREA, MODE, along(0, 0.4), along(2, 0.5)), &control);
        assert!(route.is_empty());
        assert_eq!(route.message.as_deref(), Some("CalculateRoute unexpected error: search cancelled"));
    }
}

// ── Range queries ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod range {
    use assert_approx_eq::assert_approx_eq;

    use evac_core::LonLat;
    use evac_network::SourceNode;

    use super::helpers::{AREA, MODE, along, calculator};
    use crate::{RouteError, RoutePoint, range_edges_to_geojson};

    #[test]
    fn nodes_in_range_by_id() {
        let calc = calculator();
        let reached = calc.find_nodes_in_range(AREA, MODE, &[SourceNode::new("A", 0.0)], 2.0, None).unwrap();
        assert_eq!(reached.node_ids, vec!["A", "B", "C"]);
        assert_eq!(reached.node_costs, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn zero_range_is_the_source() {
        let calc = calculator();
        let reached = calc.find_nodes_in_range(AREA, MODE, &[SourceNode::new("B", 0.0)], 0.0, None).unwrap();
        assert_eq!(reached.node_ids, vec!["B"]);
        assert_eq!(reached.node_costs, vec![0.0]);
    }

    #[test]
    fn paths_in_range() {
        let calc = calculator();
        let tree = calc
            .find_nodes_and_paths_in_range(AREA, MODE, &[SourceNode::new("A", 0.0)], 10.0, None)
            .unwrap();
        assert_eq!(tree.nodes.len(), 4);
        let path: Vec<String> = calc.path_in_range(AREA, MODE, &tree, "D").unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(path, vec!["A", "B", "C", "D"]);
        assert!(calc.path_in_range(AREA, MODE, &tree, "A").unwrap().is_empty());
    }

    #[test]
    fn edges_in_range_around_a_point() {
        let calc = calculator();
        // On e1, close to B: the search starts at B.
        let mut edges = calc.get_edges_in_range(AREA, MODE, along(0, 0.99), 1.0).unwrap();
        edges.sort_by(|a, b| a.feature.id.cmp(&b.feature.id));

        let ids: Vec<&str> = edges.iter().map(|e| e.feature.id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e2"]);
        assert_approx_eq!(edges[0].source_distance, 1.0, 1e-9);
        assert_approx_eq!(edges[0].target_distance, 0.0, 1e-9);
        assert_approx_eq!(edges[1].source_distance, 0.0, 1e-9);
        assert_approx_eq!(edges[1].target_distance, 1.0, 1e-9);

        let collection = range_edges_to_geojson(&edges);
        let props = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(props["sourceDistance"], 1.0);
        assert_eq!(props["targetDistance"], 0.0);
    }

    #[test]
    fn range_errors_carry_no_route_prefix() {
        let calc = calculator();
        let tree = calc
            .find_nodes_and_paths_in_range(AREA, MODE, &[SourceNode::new("A", 0.0)], 10.0, None)
            .unwrap();
        let err = calc.path_in_range(AREA, MODE, &tree, "nowhere").unwrap_err();
        assert!(matches!(err, RouteError::Network(_)));
        assert_eq!(err.to_string(), "node nowhere not found in graph");
    }

    #[test]
    fn edges_in_range_far_from_network() {
        let calc = calculator();
        let err = calc.get_edges_in_range(AREA, MODE, LonLat::new(0.015, 0.02), 1.0).unwrap_err();
        assert!(matches!(err, RouteError::PointNotNearNetwork { which: RoutePoint::Center, .. }));
        assert_eq!(err.to_string(), "center point not near a line in delta");
    }
}
