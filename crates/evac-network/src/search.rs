//! Point-to-point shortest-path search.
//!
//! # Algorithm
//!
//! [`bidirectional`] runs two Dijkstra frontiers at once: forward from one or
//! more weighted sources over successor entries, backward from the target
//! over predecessor entries.  Every time a node's cost improves on one side
//! while the other side has a finite cost for it, the sum is a candidate
//! for the best total `μ` and the node becomes the meeting node.  Each
//! iteration settles one node per side; the search stops once the two
//! settled costs add up to at least `μ`, or either frontier runs dry.
//!
//! The result is expressed as a forward shortest-path tree: the backward
//! half-path from the meeting node is stitched onto the forward `previous`
//! array, so [`find_path`] walks a single array from target to source.
//!
//! # Cost units
//!
//! Costs are whatever the network's adjacency values are (seconds, metres or
//! a blend), optionally weighted per mode by [`ModeCosts`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, warn};

use evac_core::{ModeCosts, NodeIndex, RoutingConfig};

use crate::graph::{Adjacency, RoutingGraph};
use crate::heap::PriorityQueue;
use crate::{NetworkError, NetworkResult};

// ── Inputs ────────────────────────────────────────────────────────────────────

/// A search origin given by node id, with the cost already spent reaching it.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceNode {
    pub id: String,
    pub cost: f64,
}

impl SourceNode {
    pub fn new(id: impl Into<String>, cost: f64) -> Self {
        Self { id: id.into(), cost }
    }
}

/// A resolved search origin.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NodeCost {
    pub node: NodeIndex,
    pub cost: f64,
}

/// Resolve source ids to indices.  Unknown ids are logged and skipped.
pub fn resolve_sources<G: RoutingGraph>(graph: &G, sources: &[SourceNode]) -> Vec<NodeCost> {
    sources
        .iter()
        .filter_map(|source| match graph.find_node(&source.id) {
            Some(node) => Some(NodeCost { node, cost: source.cost }),
            None => {
                warn!(node = %source.id, "source node not found in graph; skipped");
                None
            }
        })
        .collect()
}

// ── Cancellation and limits ───────────────────────────────────────────────────

/// Shared flag that asks a running search to stop.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Limits applied to one search.
#[derive(Clone, Debug)]
pub struct SearchControl {
    pub cancel: Option<CancelToken>,
    /// Maximum number of settled nodes.
    pub step_limit: usize,
    /// Settled nodes between polls of `cancel`.
    pub check_interval: usize,
}

impl Default for SearchControl {
    fn default() -> Self {
        Self::from_config(&RoutingConfig::default())
    }
}

impl SearchControl {
    pub fn from_config(config: &RoutingConfig) -> Self {
        Self {
            cancel: None,
            step_limit: config.step_limit,
            check_interval: config.cancel_check_interval.max(1),
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Called once per settled node with the running count.
    #[inline]
    pub(crate) fn tick(&self, steps: usize) -> NetworkResult<()> {
        if steps > self.step_limit {
            return Err(NetworkError::StepLimitExceeded(self.step_limit));
        }
        if steps % self.check_interval == 0 && self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(NetworkError::Cancelled);
        }
        Ok(())
    }
}

// ── Edge cost ─────────────────────────────────────────────────────────────────

/// Weighted cost of the entry `from → to`; `+∞` when there is no passable
/// entry.
#[inline]
pub fn edge_cost<G: RoutingGraph>(graph: &G, from: NodeIndex, to: NodeIndex, mode_costs: Option<&ModeCosts>) -> f64 {
    match graph.entry(from, to) {
        Some(Adjacency::Allowed(raw)) => match mode_costs {
            None => raw,
            Some(modes) => modes.apply(raw, graph.category(from), graph.category(to)),
        },
        _ => f64::INFINITY,
    }
}

// ── Result ────────────────────────────────────────────────────────────────────

/// Forward shortest-path tree towards one target.
///
/// `previous[v]` is `NodeIndex::NONE` for sources and unreached nodes.
#[derive(Clone, Debug)]
pub struct ShortestPathTree {
    pub costs: Vec<f64>,
    pub previous: Vec<NodeIndex>,
    pub target: NodeIndex,
    pub total_cost: f64,
}

/// One step of a reconstructed path.
#[derive(Clone, Debug, PartialEq)]
pub struct PathNode {
    pub index: NodeIndex,
    pub id: String,
}

// ── Bidirectional Dijkstra ────────────────────────────────────────────────────

struct Frontier {
    costs: Vec<f64>,
    previous: Vec<NodeIndex>,
    visited: Vec<bool>,
    heap: PriorityQueue,
}

impl Frontier {
    fn new(n: usize) -> Self {
        Self {
            costs: vec![f64::INFINITY; n],
            previous: vec![NodeIndex::NONE; n],
            visited: vec![false; n],
            heap: PriorityQueue::new(),
        }
    }

    /// Pop the cheapest unsettled node and settle it.  Stale entries are
    /// discarded.
    fn settle_next(&mut self) -> Option<NodeIndex> {
        while let Some(entry) = self.heap.extract_min() {
            let node = entry.value;
            if !self.visited[node.index()] {
                self.visited[node.index()] = true;
                return Some(node);
            }
        }
        None
    }
}

/// Best meeting found so far.
struct Meeting {
    cost: f64,
    node: NodeIndex,
}

impl Meeting {
    #[inline]
    fn offer(&mut self, node: NodeIndex, forward: f64, backward: f64) {
        let total = forward + backward;
        if total < self.cost {
            self.cost = total;
            self.node = node;
        }
    }
}

/// Shortest path from `sources` to `target`.
///
/// Returns `Ok(None)` when the target is unreachable (or no source resolves).
/// An unknown target id is [`NetworkError::NodeNotFound`].
pub fn bidirectional<G: RoutingGraph>(
    graph: &G,
    sources: &[SourceNode],
    target: &str,
    mode_costs: Option<&ModeCosts>,
    control: &SearchControl,
) -> NetworkResult<Option<ShortestPathTree>> {
    let target = graph
        .find_node(target)
        .ok_or_else(|| NetworkError::NodeNotFound(target.to_owned()))?;
    let origins = resolve_sources(graph, sources);
    bidirectional_indexed(graph, &origins, target, mode_costs, control)
}

/// [`bidirectional`] over already-resolved indices.
pub fn bidirectional_indexed<G: RoutingGraph>(
    graph: &G,
    sources: &[NodeCost],
    target: NodeIndex,
    mode_costs: Option<&ModeCosts>,
    control: &SearchControl,
) -> NetworkResult<Option<ShortestPathTree>> {
    let started = Instant::now();
    let n = graph.node_count();
    let mut fwd = Frontier::new(n);
    let mut bwd = Frontier::new(n);
    let mut best = Meeting { cost: f64::INFINITY, node: NodeIndex::NONE };

    for &NodeCost { node, cost } in sources {
        if cost < fwd.costs[node.index()] {
            fwd.costs[node.index()] = cost;
            fwd.heap.insert(cost, node);
        }
    }
    bwd.costs[target.index()] = 0.0;
    bwd.heap.insert(0.0, target);
    if fwd.costs[target.index()].is_finite() {
        best.offer(target, fwd.costs[target.index()], 0.0);
    }

    let mut steps = 0usize;
    loop {
        let Some(u) = fwd.settle_next() else { break };
        steps += 1;
        control.tick(steps)?;
        let Some(v) = bwd.settle_next() else { break };
        steps += 1;
        control.tick(steps)?;

        let fu = fwd.costs[u.index()];
        for (next, _) in graph.successors(u) {
            if fwd.visited[next.index()] {
                continue;
            }
            let alt = fu + edge_cost(graph, u, next, mode_costs);
            if alt < fwd.costs[next.index()] {
                fwd.costs[next.index()] = alt;
                fwd.previous[next.index()] = u;
                fwd.heap.insert(alt, next);
                if bwd.costs[next.index()].is_finite() {
                    best.offer(next, alt, bwd.costs[next.index()]);
                }
            }
        }

        let bv = bwd.costs[v.index()];
        for (prev, _) in graph.predecessors(v) {
            if bwd.visited[prev.index()] {
                continue;
            }
            let alt = bv + edge_cost(graph, prev, v, mode_costs);
            if alt < bwd.costs[prev.index()] {
                bwd.costs[prev.index()] = alt;
                bwd.previous[prev.index()] = v;
                bwd.heap.insert(alt, prev);
                if fwd.costs[prev.index()].is_finite() {
                    best.offer(prev, fwd.costs[prev.index()], alt);
                }
            }
        }

        if best.cost.is_finite() && fu + bv >= best.cost {
            break;
        }
    }

    debug!(
        settled = steps,
        cost = best.cost,
        elapsed_us = started.elapsed().as_micros() as u64,
        "bidirectional search finished"
    );

    if !best.cost.is_finite() {
        return Ok(None);
    }

    // Stitch the backward half onto the forward tree.
    let Frontier { mut costs, mut previous, .. } = fwd;
    let mut step = best.node;
    let mut hops = 0;
    while step != target && hops < n {
        let next = bwd.previous[step.index()];
        if next == NodeIndex::NONE {
            break;
        }
        previous[next.index()] = step;
        costs[next.index()] = costs[step.index()] + edge_cost(graph, step, next, mode_costs);
        step = next;
        hops += 1;
    }

    let total_cost = costs[target.index()];
    Ok(Some(ShortestPathTree { costs, previous, target, total_cost }))
}

// ── Path walk ─────────────────────────────────────────────────────────────────

/// Walk `previous` back from `dest` to a node without a predecessor and
/// return the path source-first.  Empty when `dest` has no predecessor.
pub fn find_path<G: RoutingGraph>(graph: &G, previous: &[NodeIndex], dest: NodeIndex) -> Vec<PathNode> {
    let has_previous = previous
        .get(dest.index())
        .is_some_and(|p| p.is_some());
    if !has_previous {
        return Vec::new();
    }

    let mut path = Vec::new();
    let mut step = dest;
    // A well-formed tree never repeats a node; the cap guards against cycles.
    while step.is_some() && path.len() <= previous.len() {
        path.push(PathNode { index: step, id: graph.node_id(step).to_owned() });
        step = previous[step.index()];
    }
    path.reverse();
    path
}
