//! Edge features and the lookup tables built over them.
//!
//! An [`EdgeFeature`] is one line of the network's `edges.geojson`: a
//! polyline plus the `source`/`target` node ids it connects.  Edges are what
//! callers get back; the adjacency graph is what the searches walk.  The two
//! are tied together by node ids, so the lookup tables here are keyed by id
//! strings rather than dense indices.

use geo::{Coord, LineString};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Value};
use rustc_hash::FxHashMap;
use tracing::warn;

use evac_core::geo::line_length_m;
use evac_core::{EdgeId, LonLat};

use crate::{NetworkError, NetworkResult};

/// Ids of the two virtual slots.  Edges touching them are synthetic.
pub const START_ID: &str = "start";
pub const END_ID: &str = "end";

#[inline]
pub fn is_virtual_id(id: &str) -> bool {
    id == START_ID || id == END_ID
}

// ── EdgeFeature ───────────────────────────────────────────────────────────────

/// One network edge with its geometry and properties.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeFeature {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Cost source → target.  `None` when the edge is one-way the other way.
    pub cost: Option<f64>,
    /// Cost target → source.
    pub reverse_cost: Option<f64>,
    /// Geometric length in metres, always recomputed from `geometry`.
    pub length: f64,
    pub capacity: Option<f64>,
    pub fid: Option<String>,
    pub geometry: LineString<f64>,
    /// All feature properties as loaded, passed through to output.
    pub properties: JsonObject,
}

impl EdgeFeature {
    /// Build a feature from a line geometry; `length` is computed.
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        geometry: impl Into<LineString<f64>>,
    ) -> Self {
        let geometry = geometry.into();
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            cost: None,
            reverse_cost: None,
            length: line_length_m(&geometry),
            capacity: None,
            fid: None,
            geometry,
            properties: JsonObject::new(),
        }
    }

    pub fn with_costs(mut self, cost: Option<f64>, reverse_cost: Option<f64>) -> Self {
        self.cost = cost;
        self.reverse_cost = reverse_cost;
        self
    }

    /// Parse a GeoJSON feature.
    ///
    /// A single-part `MultiLineString` is read as its only part; a multi-part
    /// one is logged and its parts concatenated.
    pub fn from_geojson(feature: &Feature) -> NetworkResult<Self> {
        let properties = feature.properties.clone().unwrap_or_default();
        let id = properties
            .get("id")
            .and_then(json_key)
            .or_else(|| feature.id.as_ref().map(feature_id_key))
            .unwrap_or_default();

        let source = properties
            .get("source")
            .and_then(json_key)
            .ok_or_else(|| NetworkError::InvalidEdge(format!("edge {id:?} has no source")))?;
        let target = properties
            .get("target")
            .and_then(json_key)
            .ok_or_else(|| NetworkError::InvalidEdge(format!("edge {id:?} has no target")))?;

        let geometry: LineString<f64> = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::LineString(coords)) => positions(coords).collect(),
            Some(Value::MultiLineString(parts)) => {
                if parts.len() > 1 {
                    warn!(edge = %id, parts = parts.len(), "edge is a multi-part line; joining parts");
                }
                parts.iter().flat_map(|part| positions(part)).collect()
            }
            _ => {
                return Err(NetworkError::InvalidEdge(format!("edge {id:?} is not a line")));
            }
        };
        if geometry.0.is_empty() {
            return Err(NetworkError::InvalidEdge(format!("edge {id:?} has an empty geometry")));
        }

        Ok(Self {
            cost: properties.get("cost").and_then(JsonValue::as_f64),
            reverse_cost: properties
                .get("reverse_cost")
                .or_else(|| properties.get("reverseCost"))
                .and_then(JsonValue::as_f64),
            capacity: properties.get("capacity").and_then(JsonValue::as_f64),
            fid: properties.get("fid").and_then(json_key),
            length: line_length_m(&geometry),
            id,
            source,
            target,
            geometry,
            properties,
        })
    }

    /// The feature as GeoJSON, with `extra` properties merged on top.
    pub fn to_geojson(&self, extra: JsonObject) -> Feature {
        let mut properties = self.properties.clone();
        properties.insert("id".into(), self.id.clone().into());
        properties.insert("source".into(), self.source.clone().into());
        properties.insert("target".into(), self.target.clone().into());
        properties.insert("length".into(), self.length.into());
        properties.extend(extra);

        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::from(&self.geometry))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }

    /// The value of `field` as a lookup key.  `id`, `source`, `target` and
    /// `fid` read the typed fields; anything else reads the raw properties.
    pub fn field_key(&self, field: &str) -> Option<String> {
        match field {
            "id" => Some(self.id.clone()),
            "source" => Some(self.source.clone()),
            "target" => Some(self.target.clone()),
            "fid" => self.fid.clone(),
            other => self.properties.get(other).and_then(json_key),
        }
    }

    /// `true` if either end is a virtual slot.
    pub fn touches_virtual(&self) -> bool {
        is_virtual_id(&self.source) || is_virtual_id(&self.target)
    }

    /// `true` if this edge joins `a` and `b`, in either direction.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

fn positions(coords: &[Vec<f64>]) -> impl Iterator<Item = Coord<f64>> + '_ {
    coords.iter().filter_map(|p| LonLat::from_position(p)).map(Coord::from)
}

/// String form of a scalar property (ids arrive as strings or numbers).
fn json_key(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn feature_id_key(id: &geojson::feature::Id) -> String {
    match id {
        geojson::feature::Id::String(s) => s.clone(),
        geojson::feature::Id::Number(n) => n.to_string(),
    }
}

// ── EdgeCollection ────────────────────────────────────────────────────────────

/// The ordered edge features of one network.
///
/// `revision` changes on every mutation so indexes built over the collection
/// can tell that they are out of date.
#[derive(Clone, Debug, Default)]
pub struct EdgeCollection {
    features: Vec<EdgeFeature>,
    revision: u64,
}

impl EdgeCollection {
    pub fn new(features: Vec<EdgeFeature>) -> Self {
        Self { features, revision: 0 }
    }

    /// Parse a GeoJSON `FeatureCollection`.  A feature that cannot be read
    /// as an edge fails the whole collection.
    pub fn from_geojson_str(text: &str) -> NetworkResult<Self> {
        let collection = match text.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(fc) => fc,
            GeoJson::Feature(f) => FeatureCollection { bbox: None, features: vec![f], foreign_members: None },
            GeoJson::Geometry(_) => {
                return Err(NetworkError::InvalidEdge("expected a FeatureCollection, got a bare geometry".into()));
            }
        };
        let features = collection
            .features
            .iter()
            .map(EdgeFeature::from_geojson)
            .collect::<NetworkResult<Vec<_>>>()?;
        Ok(Self::new(features))
    }

    pub fn to_geojson(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.features.iter().map(|f| f.to_geojson(JsonObject::new())).collect(),
            foreign_members: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    pub fn get(&self, id: EdgeId) -> Option<&EdgeFeature> {
        self.features.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (EdgeId, &EdgeFeature)> + '_ {
        self.features.iter().enumerate().map(|(i, f)| (EdgeId(i as u32), f))
    }

    pub fn as_slice(&self) -> &[EdgeFeature] {
        &self.features
    }

    pub fn push(&mut self, feature: EdgeFeature) -> EdgeId {
        self.revision += 1;
        self.features.push(feature);
        EdgeId((self.features.len() - 1) as u32)
    }

    pub fn pop(&mut self) -> Option<EdgeFeature> {
        self.revision += 1;
        self.features.pop()
    }
}

// ── EdgeIndex ─────────────────────────────────────────────────────────────────

/// `source id → target id → edge`, for O(1) feature lookup while rebuilding
/// a path.  Edges touching the virtual slots are left out.  When two edges
/// share a `(source, target)` pair the later one wins.
#[derive(Clone, Debug, Default)]
pub struct EdgeIndex {
    by_source: FxHashMap<String, FxHashMap<String, EdgeId>>,
}

impl EdgeIndex {
    pub fn build(edges: &EdgeCollection) -> Self {
        let mut by_source: FxHashMap<String, FxHashMap<String, EdgeId>> = FxHashMap::default();
        for (id, feature) in edges.iter() {
            if feature.touches_virtual() {
                continue;
            }
            by_source
                .entry(feature.source.clone())
                .or_default()
                .insert(feature.target.clone(), id);
        }
        Self { by_source }
    }

    #[inline]
    pub fn get(&self, source: &str, target: &str) -> Option<EdgeId> {
        self.by_source.get(source)?.get(target).copied()
    }

    /// Edges leaving `source`, as `(target id, edge)`.
    pub fn outgoing<'a>(&'a self, source: &str) -> impl Iterator<Item = (&'a str, EdgeId)> + use<'a> {
        self.by_source
            .get(source)
            .into_iter()
            .flat_map(|targets| targets.iter().map(|(t, &e)| (t.as_str(), e)))
    }

    pub fn len(&self) -> usize {
        self.by_source.values().map(FxHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}

// ── FieldIndex ────────────────────────────────────────────────────────────────

/// Edge lookup by the value of one property (`id`, `fid`, …).  Later edges
/// win on duplicate values.
#[derive(Clone, Debug)]
pub struct FieldIndex {
    field: String,
    by_value: FxHashMap<String, EdgeId>,
}

impl FieldIndex {
    pub fn build(edges: &EdgeCollection, field: &str) -> Self {
        let by_value = edges
            .iter()
            .filter_map(|(id, f)| f.field_key(field).map(|key| (key, id)))
            .collect();
        Self { field: field.to_owned(), by_value }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    #[inline]
    pub fn get(&self, value: &str) -> Option<EdgeId> {
        self.by_value.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.by_value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_value.is_empty()
    }
}
