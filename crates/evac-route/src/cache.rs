//! Process-wide network cache.
//!
//! # Single-flight loading
//!
//! Each `(area, mode)` key owns a slot: a mutex around the loaded bundle.
//! The first caller for an uncached key takes the slot lock and loads;
//! concurrent callers for the same key block on that lock and then find the
//! bundle already there.  Different keys load in parallel.  A failed load
//! leaves the slot empty, so the next caller retries.
//!
//! ```text
//! slots:  Mutex<(area, mode) → Arc<Mutex<Option<Arc<NetworkBundle>>>>>
//!           └─ held only to find/create a slot
//!                                 └─ held for the duration of one load
//! ```

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info};

use evac_core::{NodeCategory, RoutingConfig};
use evac_network::{
    EdgeCollection, EdgeIndex, FieldIndex, LoadedNetwork, NetworkGraph, NetworkLoader, SpatialFeatureIndex,
};

use crate::RouteResult;

// ── NetworkBundle ─────────────────────────────────────────────────────────────

/// Everything cached for one network: the graph, its edges and the indexes
/// over them.
///
/// The graph sits behind a read/write lock.  Searches hold a read guard for
/// their whole run; disabling and restoring edges takes the write guard.
/// Edges are immutable once loaded, so the spatial and edge indexes never go
/// stale.
pub struct NetworkBundle {
    area:          String,
    mode:          String,
    graph:         RwLock<NetworkGraph>,
    edges:         EdgeCollection,
    spatial:       SpatialFeatureIndex,
    edge_index:    OnceLock<EdgeIndex>,
    field_indexes: Mutex<FxHashMap<String, Arc<FieldIndex>>>,
}

/// Summary counts for one cached network.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NetworkStats {
    pub area:                String,
    pub mode:                String,
    pub node_count:          usize,
    pub entry_count:         usize,
    pub edge_count:          usize,
    pub car_nodes:           usize,
    pub boat_nodes:          usize,
    pub transshipment_nodes: usize,
    pub disabled_entries:    usize,
}

impl NetworkBundle {
    pub fn new(area: &str, mode: &str, network: LoadedNetwork, config: &RoutingConfig) -> Self {
        let LoadedNetwork { graph, edges } = network;
        let spatial = SpatialFeatureIndex::build(&edges, config);
        Self {
            area: area.to_owned(),
            mode: mode.to_owned(),
            graph: RwLock::new(graph),
            edges,
            spatial,
            edge_index: OnceLock::new(),
            field_indexes: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn area(&self) -> &str {
        &self.area
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Shared access to the graph.  Hold the guard for the whole search.
    pub fn graph(&self) -> RwLockReadGuard<'_, NetworkGraph> {
        self.graph.read()
    }

    /// Exclusive access to the graph, for disable/enable/reset.
    pub fn graph_mut(&self) -> RwLockWriteGuard<'_, NetworkGraph> {
        self.graph.write()
    }

    pub fn edges(&self) -> &EdgeCollection {
        &self.edges
    }

    pub fn spatial(&self) -> &SpatialFeatureIndex {
        &self.spatial
    }

    /// `source → target → edge` lookup, built on first use.
    pub fn edge_index(&self) -> &EdgeIndex {
        self.edge_index.get_or_init(|| EdgeIndex::build(&self.edges))
    }

    /// Edge lookup by the value of `field`, built once per field.
    pub fn field_index(&self, field: &str) -> Arc<FieldIndex> {
        let mut indexes = self.field_indexes.lock();
        indexes
            .entry(field.to_owned())
            .or_insert_with(|| Arc::new(FieldIndex::build(&self.edges, field)))
            .clone()
    }

    pub fn stats(&self) -> NetworkStats {
        let graph = self.graph();
        NetworkStats {
            area:                self.area.clone(),
            mode:                self.mode.clone(),
            node_count:          graph.node_count(),
            entry_count:         graph.entry_count(),
            edge_count:          self.edges.len(),
            car_nodes:           graph.category_count(NodeCategory::Car),
            boat_nodes:          graph.category_count(NodeCategory::Boat),
            transshipment_nodes: graph.category_count(NodeCategory::Transshipment),
            disabled_entries:    graph.disabled_count(),
        }
    }
}

// ── NetworkCache ──────────────────────────────────────────────────────────────

type Key = (String, String);
type Slot = Arc<Mutex<Option<Arc<NetworkBundle>>>>;

/// `(area, mode)` → loaded network, with single-flight loading.
pub struct NetworkCache {
    loader: Box<dyn NetworkLoader>,
    config: RoutingConfig,
    slots:  Mutex<FxHashMap<Key, Slot>>,
}

impl NetworkCache {
    pub fn new(loader: impl NetworkLoader + 'static, config: RoutingConfig) -> Self {
        Self { loader: Box::new(loader), config, slots: Mutex::new(FxHashMap::default()) }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    fn slot(&self, area: &str, mode: &str) -> Slot {
        let mut slots = self.slots.lock();
        slots.entry((area.to_owned(), mode.to_owned())).or_default().clone()
    }

    /// The cached bundle, loading it first if needed.
    pub fn get_or_load(&self, area: &str, mode: &str) -> RouteResult<Arc<NetworkBundle>> {
        let slot = self.slot(area, mode);
        let mut cached = slot.lock();
        if let Some(bundle) = cached.as_ref() {
            return Ok(Arc::clone(bundle));
        }

        let started = Instant::now();
        let network = self.loader.load(area, mode)?;
        let bundle = Arc::new(NetworkBundle::new(area, mode, network, &self.config));
        *cached = Some(Arc::clone(&bundle));
        info!(area, mode, elapsed_ms = started.elapsed().as_millis() as u64, "network cached");
        Ok(bundle)
    }

    /// The cached bundle, without loading.
    pub fn get(&self, area: &str, mode: &str) -> Option<Arc<NetworkBundle>> {
        let slot = self.slots.lock().get(&(area.to_owned(), mode.to_owned())).cloned()?;
        let cached = slot.lock();
        cached.clone()
    }

    /// Cache an already-loaded network, replacing any previous one.
    pub fn insert(&self, area: &str, mode: &str, network: LoadedNetwork) -> Arc<NetworkBundle> {
        let bundle = Arc::new(NetworkBundle::new(area, mode, network, &self.config));
        *self.slot(area, mode).lock() = Some(Arc::clone(&bundle));
        bundle
    }

    /// Remove a network from the cache entirely.  Callers still holding the
    /// bundle keep using it.
    pub fn evict(&self, area: &str, mode: &str) -> Option<Arc<NetworkBundle>> {
        let slot = self.slots.lock().remove(&(area.to_owned(), mode.to_owned()))?;
        let evicted = slot.lock().take();
        debug!(area, mode, found = evicted.is_some(), "network evicted");
        evicted
    }

    /// Drop the cached bundle so the next request reloads it.  Returns
    /// whether anything was cached.
    pub fn invalidate(&self, area: &str, mode: &str) -> bool {
        let slot = self.slots.lock().get(&(area.to_owned(), mode.to_owned())).cloned();
        slot.is_some_and(|slot| slot.lock().take().is_some())
    }

    pub fn contains(&self, area: &str, mode: &str) -> bool {
        self.get(area, mode).is_some()
    }

    /// Drop every cached network.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    /// Keys with a loaded network, sorted.
    pub fn keys(&self) -> Vec<(String, String)> {
        let slots: Vec<(Key, Slot)> =
            self.slots.lock().iter().map(|(k, s)| (k.clone(), Arc::clone(s))).collect();
        let mut keys: Vec<Key> = slots
            .into_iter()
            .filter(|(_, slot)| slot.lock().is_some())
            .map(|(key, _)| key)
            .collect();
        keys.sort();
        keys
    }
}
