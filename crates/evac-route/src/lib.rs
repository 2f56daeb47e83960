//! `evac-route`: route and range queries over cached evacuation networks.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                     |
//! |----------------|--------------------------------------------------------------|
//! | [`cache`]      | `NetworkCache` (single-flight per area/mode), `NetworkBundle` |
//! | [`overlay`]    | `VirtualOverlay`: start/end nodes spliced over a base graph  |
//! | [`calculator`] | `RouteCalculator`, `RouteRequest`                            |
//! | [`output`]     | `RouteCollection`, `RouteSegment`, `RangeEdge` (GeoJSON)     |
//! | [`error`]      | `RouteError`, `RouteResult<T>`                               |
//!
//! # Concurrency
//!
//! A [`RouteCalculator`] may be shared across threads.  Route and range
//! queries on one network run concurrently under a read lock; disabling,
//! enabling or resetting edges takes the write lock and waits for them.

pub mod cache;
pub mod calculator;
pub mod error;
pub mod output;
pub mod overlay;

#[cfg(test)]
mod tests;

pub use cache::{NetworkBundle, NetworkCache, NetworkStats};
pub use calculator::{DEFAULT_ID_FIELD, RouteCalculator, RouteRequest};
pub use error::{RouteError, RoutePoint, RouteResult};
pub use output::{RangeEdge, RouteCollection, RouteSegment, range_edges_to_geojson};
pub use overlay::{VirtualLink, VirtualOverlay};
