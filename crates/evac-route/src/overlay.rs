//! Virtual start/end nodes layered over a shared graph.
//!
//! A route between two arbitrary coordinates needs graph nodes at those
//! coordinates.  The base graph reserves two slots, `start` and `end`, that
//! have no entries of their own.  A [`VirtualOverlay`] borrows the base graph
//! and adds, for each slot, the four directed links that splice it into the
//! edge it was snapped to:
//!
//! ```text
//!            head                 tail
//!  source ────────────▶ slot ────────────▶ target     forward cost × ratio
//!  source ◀──────────── slot ◀──────────── target     reverse cost × ratio
//! ```
//!
//! plus the two synthetic edge features `"{source}-to-{slot}"` and
//! `"{slot}-to-{target}"` used when the route is written out.  The base graph
//! is never written to; dropping the overlay discards everything it added.

use evac_core::geo::{line_length_m, locate_on_line, point_to_line_distance_m, slice_line};
use evac_core::{LonLat, NodeCategory, NodeIndex};
use evac_network::{
    Adjacency, EdgeCollection, EdgeFeature, NearestEdge, NetworkError, NetworkGraph, NetworkResult,
    RoutingGraph, END_ID, START_ID,
};

/// One directed link added by the overlay.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VirtualLink {
    pub from: NodeIndex,
    pub to: NodeIndex,
    pub adjacency: Adjacency,
}

/// A base graph plus the links and synthetic edges of the virtual slots.
pub struct VirtualOverlay<'g> {
    base: &'g NetworkGraph,
    links: Vec<VirtualLink>,
    edges: Vec<EdgeFeature>,
    start: NodeIndex,
    end: NodeIndex,
}

impl<'g> VirtualOverlay<'g> {
    /// An overlay with no links yet.  Fails if the base graph lacks either
    /// virtual slot.
    pub fn new(base: &'g NetworkGraph) -> NetworkResult<Self> {
        let start = base
            .start_slot()
            .ok_or_else(|| NetworkError::NodeNotFound(START_ID.to_owned()))?;
        let end = base
            .end_slot()
            .ok_or_else(|| NetworkError::NodeNotFound(END_ID.to_owned()))?;
        Ok(Self { base, links: Vec::new(), edges: Vec::new(), start, end })
    }

    /// Splice `start` and `end` into the edges their points snapped to.
    ///
    /// When both points snapped to the same edge, `end` is spliced into
    /// whichever half of the split edge lies closer to `end_point`: the
    /// head (`source → start`) when it is strictly closer, the tail
    /// (`start → target`) otherwise.
    pub fn insert(
        base: &'g NetworkGraph,
        edges: &EdgeCollection,
        start: &NearestEdge,
        start_point: LonLat,
        end: &NearestEdge,
        end_point: LonLat,
    ) -> NetworkResult<Self> {
        let mut overlay = Self::new(base)?;
        let (start_slot, end_slot) = (overlay.start, overlay.end);

        let (head, tail) = overlay.splice(start_slot, START_ID, edge(edges, start)?, start_point)?;

        if start.edge == end.edge {
            let head_distance = point_to_line_distance_m(end_point, &overlay.edges[head].geometry);
            let tail_distance = point_to_line_distance_m(end_point, &overlay.edges[tail].geometry);
            let half = if head_distance < tail_distance { head } else { tail };
            let half = overlay.edges[half].clone();
            overlay.splice(end_slot, END_ID, &half, end_point)?;
        } else {
            overlay.splice(end_slot, END_ID, edge(edges, end)?, end_point)?;
        }
        Ok(overlay)
    }

    pub fn base(&self) -> &NetworkGraph {
        self.base
    }

    pub fn start(&self) -> NodeIndex {
        self.start
    }

    pub fn end(&self) -> NodeIndex {
        self.end
    }

    pub fn links(&self) -> &[VirtualLink] {
        &self.links
    }

    /// Synthetic edges in the order they were created.
    pub fn synthetic_edges(&self) -> &[EdgeFeature] {
        &self.edges
    }

    /// Split `edge` at the point on it closest to `point` and link `slot`
    /// into it.
    ///
    /// Returns the positions in [`Self::synthetic_edges`] of the head
    /// (`source → slot`) and tail (`slot → target`) features.
    pub fn splice(
        &mut self,
        slot: NodeIndex,
        name: &str,
        edge: &EdgeFeature,
        point: LonLat,
    ) -> NetworkResult<(usize, usize)> {
        let line = &edge.geometry;
        let invalid = || NetworkError::InvalidEdge(format!("edge {:?} has an empty geometry", edge.id));
        let cut = locate_on_line(line, point).ok_or_else(invalid)?;

        let head_line = slice_line(line, 0.0, cut.fraction);
        let tail_line = slice_line(line, cut.fraction, 1.0);
        let (head_len, tail_len) = (line_length_m(&head_line), line_length_m(&tail_line));
        let (head_ratio, tail_ratio) = if edge.length > 0.0 {
            (head_len / edge.length, tail_len / edge.length)
        } else {
            (0.5, 0.5)
        };

        let source = self.resolve(&edge.source)?;
        let target = self.resolve(&edge.target)?;
        let forward = self.entry(source, target).unwrap_or(Adjacency::Disallowed);
        let backward = self.entry(target, source).unwrap_or(Adjacency::Disallowed);

        self.set_link(source, slot, scaled(forward, head_ratio));
        self.set_link(slot, target, scaled(forward, tail_ratio));
        self.set_link(slot, source, scaled(backward, head_ratio));
        self.set_link(target, slot, scaled(backward, tail_ratio));

        let mut head = edge.clone();
        head.id = format!("{}-to-{name}", edge.source);
        head.target = name.to_owned();
        head.geometry = head_line;
        head.length = head_len;

        let mut tail = edge.clone();
        tail.id = format!("{name}-to-{}", edge.target);
        tail.source = name.to_owned();
        tail.geometry = tail_line;
        tail.length = tail_len;

        self.edges.push(head);
        self.edges.push(tail);
        Ok((self.edges.len() - 2, self.edges.len() - 1))
    }

    /// Add or replace the overlay link `from → to`.
    pub fn set_link(&mut self, from: NodeIndex, to: NodeIndex, adjacency: Adjacency) {
        match self.links.iter_mut().find(|l| l.from == from && l.to == to) {
            Some(link) => link.adjacency = adjacency,
            None => self.links.push(VirtualLink { from, to, adjacency }),
        }
    }

    /// The synthetic edge joining `a` and `b`, newest first.  An edge running
    /// `a → b` is preferred over one running `b → a`.
    pub fn find_synthetic(&self, a: &str, b: &str) -> Option<&EdgeFeature> {
        self.edges
            .iter()
            .rev()
            .find(|e| e.source == a && e.target == b)
            .or_else(|| self.edges.iter().rev().find(|e| e.source == b && e.target == a))
    }

    fn resolve(&self, id: &str) -> NetworkResult<NodeIndex> {
        self.base
            .index_of(id)
            .ok_or_else(|| NetworkError::NodeNotFound(id.to_owned()))
    }

    fn link(&self, from: NodeIndex, to: NodeIndex) -> Option<&VirtualLink> {
        self.links.iter().find(|l| l.from == from && l.to == to)
    }
}

fn edge<'a>(edges: &'a EdgeCollection, nearest: &NearestEdge) -> NetworkResult<&'a EdgeFeature> {
    edges
        .get(nearest.edge)
        .ok_or_else(|| NetworkError::InvalidEdge(format!("{} is not in the collection", nearest.edge)))
}

fn scaled(adjacency: Adjacency, ratio: f64) -> Adjacency {
    match adjacency {
        Adjacency::Allowed(cost) => Adjacency::Allowed(cost * ratio),
        Adjacency::Disallowed => Adjacency::Disallowed,
    }
}

impl RoutingGraph for VirtualOverlay<'_> {
    #[inline]
    fn node_count(&self) -> usize {
        self.base.node_count()
    }

    #[inline]
    fn node_id(&self, node: NodeIndex) -> &str {
        self.base.id(node)
    }

    #[inline]
    fn category(&self, node: NodeIndex) -> NodeCategory {
        self.base.category(node)
    }

    #[inline]
    fn find_node(&self, id: &str) -> Option<NodeIndex> {
        self.base.index_of(id)
    }

    fn entry(&self, from: NodeIndex, to: NodeIndex) -> Option<Adjacency> {
        match self.link(from, to) {
            Some(link) => Some(link.adjacency),
            None => self.base.get_entry(from, to),
        }
    }

    fn successors(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, Adjacency)> + '_ {
        let base = self
            .base
            .successors(node)
            .filter(move |&(to, _)| self.link(node, to).is_none());
        let added = self
            .links
            .iter()
            .filter(move |l| l.from == node)
            .map(|l| (l.to, l.adjacency));
        base.chain(added)
    }

    fn predecessors(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, Adjacency)> + '_ {
        let base = self
            .base
            .predecessors(node)
            .filter(move |&(from, _)| self.link(from, node).is_none());
        let added = self
            .links
            .iter()
            .filter(move |l| l.to == node)
            .map(|l| (l.from, l.adjacency));
        base.chain(added)
    }
}
