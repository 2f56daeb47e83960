//! Geographic coordinate type and polyline utilities.
//!
//! Edge geometries are [`LineString`]s in GeoJSON axis order (`x` is
//! longitude, `y` latitude).  Distances and lengths are haversine metres
//! ([`Haversine`], GRS80 mean radius).
//!
//! Positions along a line are fractions of its length in coordinate space,
//! the measure [`LineLocatePoint`] and [`LineInterpolatePoint`] use.
//! [`slice_line`] walks the line by the same measure, so cutting at a located
//! fraction cuts exactly at the located point.

use std::fmt;

use ::geo::{
    BoundingRect, Closest, Coord, Distance, Euclidean, Haversine, HaversineClosestPoint, Length, Line,
    LineInterpolatePoint, LineLocatePoint, LineString, Point, Rect,
};

/// A WGS-84 coordinate, GeoJSON axis order.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    #[inline]
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Build from a GeoJSON position (`[lon, lat, ...]`).  Returns `None` for
    /// positions with fewer than two ordinates.
    pub fn from_position(pos: &[f64]) -> Option<Self> {
        match pos {
            [lon, lat, ..] => Some(Self::new(*lon, *lat)),
            _ => None,
        }
    }

    #[inline]
    pub fn to_array(self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    #[inline]
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// Haversine great-circle distance in metres.
    pub fn distance_m(self, other: LonLat) -> f64 {
        Haversine.distance(self.to_point(), other.to_point())
    }
}

impl From<[f64; 2]> for LonLat {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self::new(lon, lat)
    }
}

impl From<Coord<f64>> for LonLat {
    fn from(c: Coord<f64>) -> Self {
        Self::new(c.x, c.y)
    }
}

impl From<Point<f64>> for LonLat {
    fn from(p: Point<f64>) -> Self {
        p.0.into()
    }
}

impl From<LonLat> for Coord<f64> {
    fn from(p: LonLat) -> Self {
        Coord { x: p.lon, y: p.lat }
    }
}

impl From<LonLat> for Point<f64> {
    fn from(p: LonLat) -> Self {
        p.to_point()
    }
}

/// Formats as `lon,lat`, the way coordinate pairs appear in route messages.
impl fmt::Display for LonLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lon, self.lat)
    }
}

// ── Polylines ─────────────────────────────────────────────────────────────────

/// Total haversine length of a polyline in metres.
pub fn line_length_m(line: &LineString<f64>) -> f64 {
    Haversine.length(line)
}

/// First vertex of a line, if any.
pub fn line_first(line: &LineString<f64>) -> Option<LonLat> {
    line.0.first().map(|&c| c.into())
}

/// Last vertex of a line, if any.
pub fn line_last(line: &LineString<f64>) -> Option<LonLat> {
    line.0.last().map(|&c| c.into())
}

/// A location on a polyline, `fraction` ∈ [0, 1] of the way along it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinePosition {
    pub fraction: f64,
    /// The located point itself.
    pub point: LonLat,
    /// Distance in metres from the query point.
    pub distance_m: f64,
}

/// Locate the point on `line` closest to `point`.
///
/// Returns `None` for an empty line or non-finite input.  A single-vertex
/// line locates onto that vertex.
pub fn locate_on_line(line: &LineString<f64>, point: LonLat) -> Option<LinePosition> {
    let query = point.to_point();
    let (fraction, located) = match line.0.as_slice() {
        [] => return None,
        [only] => (0.0, Point(*only)),
        _ => {
            let fraction = line.line_locate_point(&query)?;
            // Interpolation is undefined at 0 when the first segment has zero length.
            let located = line.line_interpolate_point(fraction).or_else(|| line.points().next())?;
            (fraction, located)
        }
    };
    Some(LinePosition {
        fraction,
        point: located.into(),
        distance_m: Haversine.distance(query, located),
    })
}

/// Shortest haversine distance in metres from `point` to `line`; `+∞` for an
/// empty line.
pub fn point_to_line_distance_m(point: LonLat, line: &LineString<f64>) -> f64 {
    let query = point.to_point();
    match line.haversine_closest_point(&query) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => Haversine.distance(query, p),
        Closest::Indeterminate => line
            .points()
            .next()
            .map_or(f64::INFINITY, |p| Haversine.distance(query, p)),
    }
}

/// The part of `line` between two fractions, in line order regardless of the
/// order they are given in.  Consecutive duplicate vertices are collapsed; a
/// zero-length slice is a two-point line on the cut point.
pub fn slice_line(line: &LineString<f64>, a: f64, b: f64) -> LineString<f64> {
    let (from, to) = if a <= b { (a, b) } else { (b, a) };
    let lengths: Vec<f64> = line.lines().map(|segment| Euclidean.length(&segment)).collect();
    let total: f64 = lengths.iter().sum();
    let start_at = from.clamp(0.0, 1.0) * total;
    let end_at = to.clamp(0.0, 1.0) * total;

    let mut coords: Vec<Coord<f64>> = Vec::new();
    let mut walked = 0.0;
    for (segment, &len) in line.lines().zip(&lengths) {
        let next = walked + len;
        if coords.is_empty() {
            if next < start_at {
                walked = next;
                continue;
            }
            push_distinct(&mut coords, along(segment, start_at - walked, len));
        }
        if next >= end_at {
            push_distinct(&mut coords, along(segment, end_at - walked, len));
            break;
        }
        push_distinct(&mut coords, segment.end);
        walked = next;
    }

    if coords.len() < 2 {
        let only = coords.first().or(line.0.first()).copied();
        coords = only.map(|c| vec![c, c]).unwrap_or_default();
    }
    LineString::new(coords)
}

/// The point `distance` into a segment of length `len`.
fn along(segment: Line<f64>, distance: f64, len: f64) -> Coord<f64> {
    if len <= 0.0 {
        return segment.start;
    }
    let t = (distance / len).clamp(0.0, 1.0);
    Coord {
        x: segment.start.x + (segment.end.x - segment.start.x) * t,
        y: segment.start.y + (segment.end.y - segment.start.y) * t,
    }
}

fn push_distinct(out: &mut Vec<Coord<f64>>, c: Coord<f64>) {
    if out.last() != Some(&c) {
        out.push(c);
    }
}

// ── Bounding boxes ────────────────────────────────────────────────────────────

/// Bounding rectangle of `line` grown on each side by `ratio` of its extent
/// on that axis.  `None` for an empty line.
pub fn padded_bounds(line: &LineString<f64>, ratio: f64) -> Option<Rect<f64>> {
    let rect = line.bounding_rect()?;
    let pad = Coord { x: rect.width() * ratio, y: rect.height() * ratio };
    Some(Rect::new(rect.min() - pad, rect.max() + pad))
}
