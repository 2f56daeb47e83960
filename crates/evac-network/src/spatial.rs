//! Nearest-edge lookup over an R-tree of edge bounding boxes.
//!
//! Each edge is entered with its bounding box padded by a fraction of its
//! extent.  A query collects every box within `candidate_radius_deg` of the
//! point (plain degree space, like the boxes themselves), then ranks those
//! candidates by haversine distance to the closest point on each line.

use rstar::RTree;
use rstar::primitives::{GeomWithData, Rectangle};

use evac_core::geo::{locate_on_line, padded_bounds, point_to_line_distance_m};
use evac_core::{EdgeId, LinePosition, LonLat, RoutingConfig};

use crate::edges::EdgeCollection;

type EdgeBox = GeomWithData<Rectangle<[f64; 2]>, EdgeId>;

/// The edge closest to a query point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NearestEdge {
    pub edge: EdgeId,
    pub distance_m: f64,
    /// Where the query point falls along the edge's line.
    pub position: LinePosition,
}

pub struct SpatialFeatureIndex {
    tree: RTree<EdgeBox>,
    /// Revision of the collection the tree was built from.
    revision: u64,
    len: usize,
    padding: f64,
    candidate_radius_deg: f64,
}

impl SpatialFeatureIndex {
    /// Bulk-load the tree over every edge with a non-empty geometry.
    pub fn build(edges: &EdgeCollection, config: &RoutingConfig) -> Self {
        Self::with_params(edges, config.bbox_padding, config.candidate_radius_deg)
    }

    pub fn with_params(edges: &EdgeCollection, padding: f64, candidate_radius_deg: f64) -> Self {
        let items: Vec<EdgeBox> = edges
            .iter()
            .filter_map(|(id, feature)| {
                let bounds = padded_bounds(&feature.geometry, padding)?;
                let (min, max) = (bounds.min(), bounds.max());
                Some(GeomWithData::new(Rectangle::from_corners([min.x, min.y], [max.x, max.y]), id))
            })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
            revision: edges.revision(),
            len: edges.len(),
            padding,
            candidate_radius_deg,
        }
    }

    /// `true` if `edges` has changed since the tree was built.
    pub fn is_stale(&self, edges: &EdgeCollection) -> bool {
        self.revision != edges.revision() || self.len != edges.len()
    }

    /// Rebuild if `edges` has changed.  Returns whether a rebuild happened.
    pub fn ensure_current(&mut self, edges: &EdgeCollection) -> bool {
        if !self.is_stale(edges) {
            return false;
        }
        *self = Self::with_params(edges, self.padding, self.candidate_radius_deg);
        true
    }

    pub fn size(&self) -> usize {
        self.tree.size()
    }

    /// The closest candidate edge regardless of distance.  Ties go to the
    /// lower edge id.
    pub fn nearest_candidate(&self, edges: &EdgeCollection, point: LonLat) -> Option<NearestEdge> {
        let r = self.candidate_radius_deg;
        let mut best: Option<(EdgeId, f64)> = None;
        for candidate in self.tree.locate_within_distance(point.to_array(), r * r) {
            let edge = candidate.data;
            let Some(feature) = edges.get(edge) else {
                continue;
            };
            let distance_m = point_to_line_distance_m(point, &feature.geometry);
            let closer = best.is_none_or(|(b_edge, b_distance)| {
                distance_m < b_distance || (distance_m == b_distance && edge < b_edge)
            });
            if closer && distance_m.is_finite() {
                best = Some((edge, distance_m));
            }
        }
        let (edge, distance_m) = best?;
        let position = locate_on_line(&edges.get(edge)?.geometry, point)?;
        Some(NearestEdge { edge, distance_m, position })
    }

    /// The closest edge within `max_distance_m` metres of `point`.
    pub fn find_nearest(&self, edges: &EdgeCollection, point: LonLat, max_distance_m: f64) -> Option<NearestEdge> {
        self.nearest_candidate(edges, point)
            .filter(|nearest| nearest.distance_m <= max_distance_m)
    }
}
