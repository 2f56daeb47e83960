//! Range (isochrone) queries: single-source Dijkstra bounded by cost.
//!
//! A neighbour is only pushed when its tentative cost stays within the bound,
//! so nodes beyond it never enter the heap.  Memory stays proportional to the
//! reached area rather than to the whole network.

use evac_core::{ModeCosts, NodeIndex};

use crate::graph::RoutingGraph;
use crate::heap::PriorityQueue;
use crate::search::{NodeCost, PathNode, SearchControl, SourceNode, edge_cost, find_path, resolve_sources};
use crate::NetworkResult;

/// Nodes reached within the bound, in the order they were settled.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodesInRange {
    pub node_ids: Vec<String>,
    pub node_costs: Vec<f64>,
    pub node_indices: Vec<NodeIndex>,
}

impl NodesInRange {
    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }
}

/// One reached node of a [`RangeTree`].
#[derive(Clone, Debug, PartialEq)]
pub struct RangeNode {
    pub id: String,
    pub distance: f64,
    pub index: NodeIndex,
}

/// Range query result that keeps the search tree for path lookups.
#[derive(Clone, Debug)]
pub struct RangeTree {
    /// Reached nodes in index order.
    pub nodes: Vec<RangeNode>,
    pub costs: Vec<f64>,
    pub previous: Vec<NodeIndex>,
}

impl RangeTree {
    /// Path from the nearest source to `dest`; empty if `dest` was not reached
    /// through an edge.
    pub fn path_to<G: RoutingGraph>(&self, graph: &G, dest: NodeIndex) -> Vec<PathNode> {
        get_path_to(graph, &self.previous, dest)
    }
}

/// Every node reachable from `sources` at total cost ≤ `max_cost`.
///
/// Sources whose id is not in the graph are logged and skipped.
pub fn find_nodes_in_range<G: RoutingGraph>(
    graph: &G,
    sources: &[SourceNode],
    max_cost: f64,
    mode_costs: Option<&ModeCosts>,
    control: &SearchControl,
) -> NetworkResult<NodesInRange> {
    let mut result = NodesInRange::default();
    bounded_dijkstra(graph, &resolve_sources(graph, sources), max_cost, mode_costs, control, |node, cost| {
        result.node_ids.push(graph.node_id(node).to_owned());
        result.node_costs.push(cost);
        result.node_indices.push(node);
    })?;
    Ok(result)
}

/// Like [`find_nodes_in_range`], also keeping `costs` and `previous` for
/// [`get_path_to`].
pub fn find_nodes_and_paths_in_range<G: RoutingGraph>(
    graph: &G,
    sources: &[SourceNode],
    max_cost: f64,
    mode_costs: Option<&ModeCosts>,
    control: &SearchControl,
) -> NetworkResult<RangeTree> {
    let (costs, previous) =
        bounded_dijkstra(graph, &resolve_sources(graph, sources), max_cost, mode_costs, control, |_, _| {})?;

    let nodes = costs
        .iter()
        .enumerate()
        .filter(|&(_, &cost)| cost <= max_cost && cost.is_finite())
        .map(|(i, &distance)| {
            let index = NodeIndex(i as u32);
            RangeNode { id: graph.node_id(index).to_owned(), distance, index }
        })
        .collect();

    Ok(RangeTree { nodes, costs, previous })
}

/// Path to `dest` in a range search tree, source-first.
pub fn get_path_to<G: RoutingGraph>(graph: &G, previous: &[NodeIndex], dest: NodeIndex) -> Vec<PathNode> {
    find_path(graph, previous, dest)
}

/// Shared loop.  `on_settle` sees each node settled within the bound.
fn bounded_dijkstra<G: RoutingGraph>(
    graph: &G,
    sources: &[NodeCost],
    max_cost: f64,
    mode_costs: Option<&ModeCosts>,
    control: &SearchControl,
    mut on_settle: impl FnMut(NodeIndex, f64),
) -> NetworkResult<(Vec<f64>, Vec<NodeIndex>)> {
    let n = graph.node_count();
    let mut costs = vec![f64::INFINITY; n];
    let mut previous = vec![NodeIndex::NONE; n];
    let mut visited = vec![false; n];
    let mut heap = PriorityQueue::new();

    for &NodeCost { node, cost } in sources {
        if cost < costs[node.index()] {
            costs[node.index()] = cost;
            heap.insert(cost, node);
        }
    }

    let mut steps = 0usize;
    while let Some(entry) = heap.extract_min() {
        let (node, cost) = (entry.value, entry.key);
        if visited[node.index()] {
            continue;
        }
        visited[node.index()] = true;
        if cost > max_cost {
            continue;
        }
        steps += 1;
        control.tick(steps)?;
        on_settle(node, cost);

        for (next, _) in graph.successors(node) {
            if visited[next.index()] {
                continue;
            }
            let step_cost = edge_cost(graph, node, next, mode_costs);
            if step_cost.is_infinite() {
                continue;
            }
            let alt = cost + step_cost;
            if alt <= max_cost && alt < costs[next.index()] {
                costs[next.index()] = alt;
                previous[next.index()] = node;
                heap.insert(alt, next);
            }
        }
    }

    Ok((costs, previous))
}
