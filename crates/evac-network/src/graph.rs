//! Indexed network graph.
//!
//! # Data layout
//!
//! Nodes get dense [`NodeIndex`]es packed in category blocks, in the fixed
//! order Car, Boat, Transshipment, Start, End.  Within a block, indices follow
//! the order in which ids were first seen while scanning the source data.
//! The Start and End blocks hold the two reserved virtual slots `"start"` and
//! `"end"`, which have no entries in a freshly built graph.
//!
//! ```text
//! ids[i]          node id of index i
//! categories[i]   NodeCategory of index i
//! adjacency[i]    target index → Adjacency (outgoing entries of i)
//! predecessors[i] every u with an entry u → i
//! ```
//!
//! Entries are never removed once built.  Disabling an edge overwrites its
//! entries with [`Adjacency::Disallowed`] and records the original values in
//! a side table so they can be restored exactly.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Range;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use evac_core::{NodeCategory, NodeIndex};

use crate::edges::{EdgeCollection, END_ID, FieldIndex, START_ID};
use crate::{NetworkError, NetworkResult};

// ── Adjacency ─────────────────────────────────────────────────────────────────

/// A directed adjacency entry: either a traversable cost or no passage.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Adjacency {
    Allowed(f64),
    Disallowed,
}

impl Adjacency {
    /// Interpret a stored value.  `null`, negative and NaN costs are all
    /// `Disallowed`.
    #[inline]
    pub fn from_raw(raw: Option<f64>) -> Self {
        match raw {
            Some(cost) if cost >= 0.0 => Adjacency::Allowed(cost),
            _ => Adjacency::Disallowed,
        }
    }

    /// Raw cost, `+∞` when disallowed.
    #[inline]
    pub fn cost(self) -> f64 {
        match self {
            Adjacency::Allowed(cost) => cost,
            Adjacency::Disallowed => f64::INFINITY,
        }
    }

    #[inline]
    pub fn is_allowed(self) -> bool {
        matches!(self, Adjacency::Allowed(_))
    }

    /// Persisted form: the cost, or `null`.
    #[inline]
    pub fn to_raw(self) -> Option<f64> {
        match self {
            Adjacency::Allowed(cost) => Some(cost),
            Adjacency::Disallowed => None,
        }
    }
}

// ── RoutingGraph ──────────────────────────────────────────────────────────────

/// Read access a search needs.  Implemented by [`NetworkGraph`] and by
/// overlays that layer temporary nodes over one.
pub trait RoutingGraph {
    fn node_count(&self) -> usize;

    fn node_id(&self, node: NodeIndex) -> &str;

    fn category(&self, node: NodeIndex) -> NodeCategory;

    /// Index of a node id, if present.
    fn find_node(&self, id: &str) -> Option<NodeIndex>;

    /// The entry `from → to`, `None` when there is none.
    fn entry(&self, from: NodeIndex, to: NodeIndex) -> Option<Adjacency>;

    /// Outgoing entries of `node`.
    fn successors(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, Adjacency)> + '_;

    /// Incoming entries of `node`, as `(predecessor, entry predecessor → node)`.
    fn predecessors(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, Adjacency)> + '_;
}

// ── NetworkGraph ──────────────────────────────────────────────────────────────

/// The adjacency graph of one (area, mode) network.
///
/// Do not construct directly; use [`NetworkGraphBuilder`],
/// [`NetworkGraph::from_adjacency`] or [`NetworkGraph::from_indexed`].
#[derive(Clone, Debug)]
pub struct NetworkGraph {
    ids: Vec<String>,
    categories: Vec<NodeCategory>,
    adjacency: Vec<FxHashMap<NodeIndex, Adjacency>>,
    predecessors: Vec<Vec<NodeIndex>>,
    lookup: FxHashMap<String, NodeIndex>,
    /// Exclusive end index of each category block, in `NodeCategory::ALL` order.
    block_ends: [usize; 5],
    /// Original values of disabled entries, keyed by `(from, to)`.
    disabled: FxHashMap<(NodeIndex, NodeIndex), Adjacency>,
}

/// Which edge ids a disable/enable call acted on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeToggleReport {
    /// Edges found in the field index and in the graph.
    pub matched: usize,
    /// Requested ids that matched nothing.
    pub unknown: Vec<String>,
}

impl NetworkGraph {
    /// Build from a raw `source → target → cost` adjacency.
    pub fn from_adjacency(raw: &RawAdjacency) -> Self {
        let mut builder = NetworkGraphBuilder::new();
        for (source, links) in &raw.0 {
            builder.add_node(source);
            for (target, cost) in links {
                builder.add_entry(source, target, *cost);
            }
        }
        builder.build()
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    #[inline]
    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of stored entries, disallowed ones included.
    pub fn entry_count(&self) -> usize {
        self.adjacency.iter().map(FxHashMap::len).sum()
    }

    /// Index range of a category block.
    pub fn block(&self, category: NodeCategory) -> Range<usize> {
        let b = category.block();
        let start = if b == 0 { 0 } else { self.block_ends[b - 1] };
        start..self.block_ends[b]
    }

    pub fn category_count(&self, category: NodeCategory) -> usize {
        self.block(category).len()
    }

    // ── Nodes ─────────────────────────────────────────────────────────────

    #[inline]
    pub fn id(&self, node: NodeIndex) -> &str {
        &self.ids[node.index()]
    }

    #[inline]
    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.lookup.get(id).copied()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// The reserved virtual start slot.
    pub fn start_slot(&self) -> Option<NodeIndex> {
        self.index_of(START_ID)
    }

    /// The reserved virtual end slot.
    pub fn end_slot(&self) -> Option<NodeIndex> {
        self.index_of(END_ID)
    }

    // ── Entries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn get_entry(&self, from: NodeIndex, to: NodeIndex) -> Option<Adjacency> {
        self.adjacency.get(from.index())?.get(&to).copied()
    }

    /// The entry as it was before any disable call.
    pub fn default_entry(&self, from: NodeIndex, to: NodeIndex) -> Option<Adjacency> {
        self.disabled
            .get(&(from, to))
            .copied()
            .or_else(|| self.get_entry(from, to))
    }

    // ── Disable / restore ─────────────────────────────────────────────────

    /// Make both directions of each listed edge impassable.
    ///
    /// Only currently allowed entries are recorded, so disabling twice keeps
    /// the first recorded value.  Ids missing from `field` (or whose end
    /// nodes are missing from the graph) are logged and reported.
    pub fn disable_edges<S: AsRef<str>>(
        &mut self,
        edges: &EdgeCollection,
        field: &FieldIndex,
        edge_ids: &[S],
    ) -> EdgeToggleReport {
        self.toggle_edges(edges, field, edge_ids, |graph, from, to| graph.disable_entry(from, to))
    }

    /// Restore the recorded values of each listed edge.
    pub fn enable_edges<S: AsRef<str>>(
        &mut self,
        edges: &EdgeCollection,
        field: &FieldIndex,
        edge_ids: &[S],
    ) -> EdgeToggleReport {
        self.toggle_edges(edges, field, edge_ids, |graph, from, to| graph.enable_entry(from, to))
    }

    /// Restore every recorded entry and clear the side table.  Returns the
    /// number of entries restored.
    pub fn reset_to_default(&mut self) -> usize {
        let restored = self.disabled.len();
        for ((from, to), original) in self.disabled.drain() {
            if let Some(slot) = self.adjacency[from.index()].get_mut(&to) {
                *slot = original;
            }
        }
        restored
    }

    /// Number of entries currently held disabled.
    pub fn disabled_count(&self) -> usize {
        self.disabled.len()
    }

    fn toggle_edges<S: AsRef<str>>(
        &mut self,
        edges: &EdgeCollection,
        field: &FieldIndex,
        edge_ids: &[S],
        mut apply: impl FnMut(&mut Self, NodeIndex, NodeIndex),
    ) -> EdgeToggleReport {
        let mut report = EdgeToggleReport::default();
        for edge_id in edge_ids {
            let edge_id = edge_id.as_ref();
            let ends = field.get(edge_id).and_then(|e| edges.get(e)).and_then(|feature| {
                Some((self.index_of(&feature.source)?, self.index_of(&feature.target)?))
            });
            match ends {
                Some((source, target)) => {
                    apply(self, source, target);
                    apply(self, target, source);
                    report.matched += 1;
                }
                None => {
                    warn!(edge = edge_id, field = field.field(), "edge not found in network");
                    report.unknown.push(edge_id.to_owned());
                }
            }
        }
        report
    }

    fn disable_entry(&mut self, from: NodeIndex, to: NodeIndex) {
        if self.disabled.contains_key(&(from, to)) {
            return;
        }
        if let Some(slot) = self.adjacency[from.index()].get_mut(&to) {
            if slot.is_allowed() {
                self.disabled.insert((from, to), *slot);
                *slot = Adjacency::Disallowed;
            }
        }
    }

    fn enable_entry(&mut self, from: NodeIndex, to: NodeIndex) {
        if let Some(original) = self.disabled.remove(&(from, to)) {
            if let Some(slot) = self.adjacency[from.index()].get_mut(&to) {
                *slot = original;
            }
        }
    }

    // ── Persisted forms ───────────────────────────────────────────────────

    /// Load and validate the indexed (`graph2.json`) form.
    ///
    /// Any structural inconsistency is a [`NetworkError::MalformedGraph`].
    pub fn from_indexed(indexed: IndexedGraph) -> NetworkResult<Self> {
        let n = indexed.id_array.len();
        if indexed.graph_array.len() != n {
            return Err(malformed(format!(
                "idArray has {n} entries but graphArray has {}",
                indexed.graph_array.len()
            )));
        }

        let lasts = [
            indexed.last_car_id,
            indexed.last_boat_id,
            indexed.last_transshipment_id,
            indexed.last_start_id,
            indexed.last_end_id,
        ];
        let mut block_ends = [0usize; 5];
        let mut previous_end = 0usize;
        for (b, &last) in lasts.iter().enumerate() {
            let end = last
                .checked_add(1)
                .and_then(|end| usize::try_from(end).ok())
                .ok_or_else(|| malformed(format!("category bound {last} is out of range")))?;
            if end < previous_end {
                return Err(malformed("category bounds are not non-decreasing".into()));
            }
            block_ends[b] = end;
            previous_end = end;
        }
        if block_ends[4] != n {
            return Err(malformed(format!("lastEndId {} does not close {n} nodes", indexed.last_end_id)));
        }

        let mut categories = Vec::with_capacity(n);
        let mut start = 0;
        for (category, &end) in NodeCategory::ALL.iter().zip(&block_ends) {
            categories.extend(std::iter::repeat_n(*category, end - start));
            start = end;
        }

        let mut lookup = FxHashMap::default();
        for (i, id) in indexed.id_array.iter().enumerate() {
            if lookup.insert(id.clone(), NodeIndex(i as u32)).is_some() {
                return Err(malformed(format!("node id {id:?} appears twice")));
            }
        }
        // Each slot block holds exactly its own slot.
        for (slot, block) in [(START_ID, block_ends[2]..block_ends[3]), (END_ID, block_ends[3]..block_ends[4])] {
            let Some(&index) = lookup.get(slot) else {
                return Err(malformed(format!("virtual slot {slot:?} is missing")));
            };
            if block != (index.index()..index.index() + 1) {
                return Err(malformed(format!(
                    "virtual slot {slot:?} is at index {} but its category block is {block:?}",
                    index.index()
                )));
            }
        }

        let mut adjacency = Vec::with_capacity(n);
        let mut predecessors = vec![Vec::new(); n];
        for (i, links) in indexed.graph_array.into_iter().enumerate() {
            let mut map = FxHashMap::default();
            for (target, cost) in links.unwrap_or_default() {
                if target as usize >= n {
                    return Err(malformed(format!("node {i} links to index {target}, beyond {n} nodes")));
                }
                map.insert(NodeIndex(target), Adjacency::from_raw(cost));
                predecessors[target as usize].push(NodeIndex(i as u32));
            }
            adjacency.push(map);
        }

        Ok(Self {
            ids: indexed.id_array,
            categories,
            adjacency,
            predecessors,
            lookup,
            block_ends,
            disabled: FxHashMap::default(),
        })
    }

    /// The indexed (`graph2.json`) form, with default (pre-disable) costs.
    pub fn to_indexed(&self) -> IndexedGraph {
        let graph_array = (0..self.node_count())
            .map(|i| {
                let from = NodeIndex(i as u32);
                let links: BTreeMap<u32, Option<f64>> = self.adjacency[i]
                    .keys()
                    .filter_map(|&to| Some((to.0, self.default_entry(from, to)?.to_raw())))
                    .collect();
                Some(links)
            })
            .collect();
        let last = |b: usize| self.block_ends[b] as i64 - 1;
        IndexedGraph {
            id_array: self.ids.clone(),
            graph_array,
            last_car_id: last(0),
            last_boat_id: last(1),
            last_transshipment_id: last(2),
            last_start_id: last(3),
            last_end_id: last(4),
        }
    }

    /// The raw (`graph.json`) form with default costs.  Virtual slots and
    /// entries touching them are left out.
    pub fn to_adjacency(&self) -> RawAdjacency {
        let real = |i: usize| !self.categories[i].is_virtual();
        let nodes = (0..self.node_count())
            .filter(|&i| real(i))
            .map(|i| {
                let from = NodeIndex(i as u32);
                let mut targets: Vec<NodeIndex> =
                    self.adjacency[i].keys().copied().filter(|t| real(t.index())).collect();
                targets.sort_unstable();
                let links = targets
                    .into_iter()
                    .filter_map(|to| Some((self.ids[to.index()].clone(), self.default_entry(from, to)?.to_raw())))
                    .collect();
                (self.ids[i].clone(), links)
            })
            .collect();
        RawAdjacency(nodes)
    }
}

fn malformed(message: String) -> NetworkError {
    NetworkError::MalformedGraph(message)
}

impl RoutingGraph for NetworkGraph {
    #[inline]
    fn node_count(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    fn node_id(&self, node: NodeIndex) -> &str {
        self.id(node)
    }

    #[inline]
    fn category(&self, node: NodeIndex) -> NodeCategory {
        self.categories[node.index()]
    }

    #[inline]
    fn find_node(&self, id: &str) -> Option<NodeIndex> {
        self.index_of(id)
    }

    #[inline]
    fn entry(&self, from: NodeIndex, to: NodeIndex) -> Option<Adjacency> {
        self.get_entry(from, to)
    }

    fn successors(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, Adjacency)> + '_ {
        self.adjacency[node.index()].iter().map(|(&to, &adj)| (to, adj))
    }

    fn predecessors(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, Adjacency)> + '_ {
        let adjacency = &self.adjacency;
        self.predecessors[node.index()]
            .iter()
            .filter_map(move |&from| Some((from, *adjacency[from.index()].get(&node)?)))
    }
}

// ── NetworkGraphBuilder ───────────────────────────────────────────────────────

/// Construct a [`NetworkGraph`] incrementally, then call [`build`](Self::build).
///
/// Ids are classified by [`NodeCategory::from_id`] and indexed in first-seen
/// order within their category.  A repeated `(source, target)` entry
/// overwrites the earlier one.
///
/// # Example
///
/// ```
/// use evac_network::NetworkGraphBuilder;
///
/// let mut b = NetworkGraphBuilder::new();
/// b.add_entry("c1", "b1", Some(100.5));
/// b.add_entry("b1", "c1", None);
/// let graph = b.build();
/// assert_eq!(graph.node_count(), 4); // c1, b1, start, end
/// ```
#[derive(Default)]
pub struct NetworkGraphBuilder {
    blocks: [Vec<String>; 5],
    seen: FxHashSet<String>,
    entries: Vec<(String, String, Option<f64>)>,
}

impl NetworkGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node id.  No-op if already known.
    pub fn add_node(&mut self, id: &str) {
        if self.seen.contains(id) {
            return;
        }
        self.seen.insert(id.to_owned());
        self.blocks[NodeCategory::from_id(id).block()].push(id.to_owned());
    }

    /// Add a directed entry.  `None` or a negative cost is disallowed.
    pub fn add_entry(&mut self, source: &str, target: &str, cost: Option<f64>) {
        self.add_node(source);
        self.add_node(target);
        self.entries.push((source.to_owned(), target.to_owned(), cost));
    }

    /// Append the virtual slots, pack the category blocks and index entries.
    pub fn build(mut self) -> NetworkGraph {
        self.add_node(START_ID);
        self.add_node(END_ID);

        let n: usize = self.blocks.iter().map(Vec::len).sum();
        let mut ids = Vec::with_capacity(n);
        let mut categories = Vec::with_capacity(n);
        let mut block_ends = [0usize; 5];
        for (b, block) in self.blocks.into_iter().enumerate() {
            categories.extend(std::iter::repeat_n(NodeCategory::ALL[b], block.len()));
            ids.extend(block);
            block_ends[b] = ids.len();
        }

        let lookup: FxHashMap<String, NodeIndex> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), NodeIndex(i as u32)))
            .collect();

        let mut adjacency: Vec<FxHashMap<NodeIndex, Adjacency>> = vec![FxHashMap::default(); n];
        for (source, target, cost) in &self.entries {
            let (from, to) = (lookup[source.as_str()], lookup[target.as_str()]);
            adjacency[from.index()].insert(to, Adjacency::from_raw(*cost));
        }

        let mut predecessors = vec![Vec::new(); n];
        for (i, links) in adjacency.iter().enumerate() {
            for to in links.keys() {
                predecessors[to.index()].push(NodeIndex(i as u32));
            }
        }

        NetworkGraph {
            ids,
            categories,
            adjacency,
            predecessors,
            lookup,
            block_ends,
            disabled: FxHashMap::default(),
        }
    }
}

// ── IndexedGraph ──────────────────────────────────────────────────────────────

/// Persisted indexed form of a graph (`graph2.json`).
///
/// `last*Id` are inclusive block bounds; an empty leading block gives `-1`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedGraph {
    pub id_array: Vec<String>,
    pub graph_array: Vec<Option<BTreeMap<u32, Option<f64>>>>,
    pub last_car_id: i64,
    pub last_boat_id: i64,
    pub last_transshipment_id: i64,
    pub last_start_id: i64,
    pub last_end_id: i64,
}

// ── RawAdjacency ──────────────────────────────────────────────────────────────

/// Raw `source → target → cost` adjacency (`graph.json`), in document order.
///
/// Key order decides index assignment, so this deserializes through an
/// order-preserving visitor instead of a hash map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawAdjacency(pub Vec<(String, Vec<(String, Option<f64>)>)>);

struct Links(Vec<(String, Option<f64>)>);

struct OrderedMap<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMap<V> {
    type Value = Vec<(String, V)>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, V>()? {
            out.push((key, value));
        }
        Ok(out)
    }
}

impl<'de> Deserialize<'de> for Links {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMap::<Option<f64>>(PhantomData)).map(Links)
    }
}

impl<'de> Deserialize<'de> for RawAdjacency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let nodes = deserializer.deserialize_map(OrderedMap::<Links>(PhantomData))?;
        Ok(RawAdjacency(nodes.into_iter().map(|(id, links)| (id, links.0)).collect()))
    }
}

impl Serialize for RawAdjacency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut outer = serializer.serialize_map(Some(self.0.len()))?;
        for (source, links) in &self.0 {
            outer.serialize_entry(source, &LinksRef(links))?;
        }
        outer.end()
    }
}

struct LinksRef<'a>(&'a [(String, Option<f64>)]);

impl Serialize for LinksRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut inner = serializer.serialize_map(Some(self.0.len()))?;
        for (target, cost) in self.0 {
            inner.serialize_entry(target, cost)?;
        }
        inner.end()
    }
}
