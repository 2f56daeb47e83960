//! GeoJSON results of route and range queries.
//!
//! Route segments keep every property of the underlying edge and add:
//!
//! | Property      | Meaning                                                   |
//! |---------------|-----------------------------------------------------------|
//! | `sourceIndex` | node index of the feature's `source`                      |
//! | `targetIndex` | node index of the feature's `target`                      |
//! | `routeFrom`   | node the route enters the segment at                      |
//! | `routeTo`     | node the route leaves the segment at                      |
//! | `routeCost`   | cumulative (mode-weighted) cost up to the end of segment  |
//! | `routeLength` | cumulative length in metres up to the end of segment      |
//! | `routeMode`   | travel mode on the segment                                |
//!
//! A failed route is an empty collection carrying a `message` foreign member.

use geojson::{FeatureCollection, JsonObject, JsonValue};

use evac_core::NodeIndex;
use evac_network::EdgeFeature;

// ── Routes ────────────────────────────────────────────────────────────────────

/// One edge of a computed route.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteSegment {
    pub feature: EdgeFeature,
    pub source_index: NodeIndex,
    pub target_index: NodeIndex,
    pub route_from: String,
    pub route_to: String,
    pub route_cost: f64,
    pub route_length: f64,
    pub route_mode: String,
}

impl RouteSegment {
    pub fn to_geojson(&self) -> geojson::Feature {
        let mut extra = JsonObject::new();
        extra.insert("sourceIndex".into(), self.source_index.index().into());
        extra.insert("targetIndex".into(), self.target_index.index().into());
        extra.insert("routeFrom".into(), self.route_from.clone().into());
        extra.insert("routeTo".into(), self.route_to.clone().into());
        extra.insert("routeCost".into(), self.route_cost.into());
        extra.insert("routeLength".into(), self.route_length.into());
        extra.insert("routeMode".into(), self.route_mode.clone().into());
        self.feature.to_geojson(extra)
    }
}

/// The result of a route calculation: the segments in travel order, or no
/// segments and a message saying why.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteCollection {
    pub segments: Vec<RouteSegment>,
    pub message: Option<String>,
}

impl RouteCollection {
    pub fn new(segments: Vec<RouteSegment>) -> Self {
        Self { segments, message: None }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { segments: Vec::new(), message: Some(message.into()) }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_failure(&self) -> bool {
        self.message.is_some()
    }

    /// Total cost of the route; 0 when empty.
    pub fn total_cost(&self) -> f64 {
        self.segments.last().map_or(0.0, |s| s.route_cost)
    }

    /// Total length of the route in metres; 0 when empty.
    pub fn total_length(&self) -> f64 {
        self.segments.last().map_or(0.0, |s| s.route_length)
    }

    pub fn to_geojson(&self) -> FeatureCollection {
        let foreign_members = self.message.as_ref().map(|message| {
            let mut members = JsonObject::new();
            members.insert("message".into(), JsonValue::String(message.clone()));
            members
        });
        FeatureCollection {
            bbox: None,
            features: self.segments.iter().map(RouteSegment::to_geojson).collect(),
            foreign_members,
        }
    }
}

// ── Range edges ───────────────────────────────────────────────────────────────

/// An edge with both ends reached by a range query.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeEdge {
    pub feature: EdgeFeature,
    pub source_distance: f64,
    pub target_distance: f64,
}

impl RangeEdge {
    pub fn to_geojson(&self) -> geojson::Feature {
        let mut extra = JsonObject::new();
        extra.insert("sourceDistance".into(), self.source_distance.into());
        extra.insert("targetDistance".into(), self.target_distance.into());
        self.feature.to_geojson(extra)
    }
}

pub fn range_edges_to_geojson(edges: &[RangeEdge]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: edges.iter().map(RangeEdge::to_geojson).collect(),
        foreign_members: None,
    }
}
