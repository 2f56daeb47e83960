//! `evac-network`: multi-modal network graph, spatial indexing, and search.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                      |
//! |-------------|---------------------------------------------------------------|
//! | [`heap`]    | `PriorityQueue` (binary min-heap, stale entries tolerated)    |
//! | [`graph`]   | `NetworkGraph`, `Adjacency`, `RoutingGraph`, `IndexedGraph`   |
//! | [`edges`]   | `EdgeFeature`, `EdgeCollection`, `EdgeIndex`, `FieldIndex`    |
//! | [`spatial`] | `SpatialFeatureIndex` (R-tree over padded edge boxes)         |
//! | [`search`]  | bidirectional Dijkstra, `edge_cost`, `find_path`              |
//! | [`range`]   | bounded single-source Dijkstra (range / isochrone queries)    |
//! | [`loader`]  | `NetworkLoader` trait, `FileNetworkLoader`                    |
//! | [`error`]   | `NetworkError`, `NetworkResult<T>`                            |

pub mod edges;
pub mod error;
pub mod graph;
pub mod heap;
pub mod loader;
pub mod range;
pub mod search;
pub mod spatial;


pub use edges::{END_ID, EdgeCollection, EdgeFeature, EdgeIndex, FieldIndex, START_ID, is_virtual_id};
pub use error::{NetworkError, NetworkResult};
pub use graph::{
    Adjacency, EdgeToggleReport, IndexedGraph, NetworkGraph, NetworkGraphBuilder, RawAdjacency,
    RoutingGraph,
};
pub use heap::{HeapEntry, PriorityQueue};
pub use loader::{FileNetworkLoader, LoadedNetwork, NetworkLoader};
pub use range::{
    NodesInRange, RangeNode, RangeTree, find_nodes_and_paths_in_range, find_nodes_in_range,
    get_path_to,
};
pub use search::{
    CancelToken, NodeCost, PathNode, SearchControl, ShortestPathTree, SourceNode, bidirectional,
    bidirectional_indexed, edge_cost, find_path, resolve_sources,
};
pub use spatial::{NearestEdge, SpatialFeatureIndex};
