//! Loading networks from disk.
//!
//! # Directory layout
//!
//! ```text
//! {data_dir}/{area}/{mode}/graph2.json    indexed graph (preferred)
//! {data_dir}/{area}/{mode}/graph.json     raw source → target → cost map
//! {data_dir}/{area}/{mode}/edges.geojson  edge features
//! ```
//!
//! The indexed form is what the router wants; the raw form is converted on
//! load (and can be converted once ahead of time with
//! [`FileNetworkLoader::index_graph`]).

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use crate::edges::EdgeCollection;
use crate::graph::{IndexedGraph, NetworkGraph, RawAdjacency};
use crate::{NetworkError, NetworkResult};

pub const INDEXED_GRAPH_FILE: &str = "graph2.json";
pub const RAW_GRAPH_FILE: &str = "graph.json";
pub const EDGES_FILE: &str = "edges.geojson";

/// A graph with its edge features, as produced by a [`NetworkLoader`].
#[derive(Clone, Debug)]
pub struct LoadedNetwork {
    pub graph: NetworkGraph,
    pub edges: EdgeCollection,
}

/// Source of networks keyed by `(area, mode)`.
///
/// Implementations must be `Send + Sync`: a cache may call `load` from
/// several threads, though never twice at once for the same key.
pub trait NetworkLoader: Send + Sync {
    /// Load one network.  A network that does not exist is
    /// [`NetworkError::NetworkMissing`].
    fn load(&self, area: &str, mode: &str) -> NetworkResult<LoadedNetwork>;
}

/// Reads networks from a data directory.
#[derive(Clone, Debug)]
pub struct FileNetworkLoader {
    data_dir: PathBuf,
}

impl FileNetworkLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn network_dir(&self, area: &str, mode: &str) -> PathBuf {
        self.data_dir.join(area).join(mode)
    }

    /// Read the graph, preferring the indexed form.
    pub fn load_graph(&self, area: &str, mode: &str) -> NetworkResult<NetworkGraph> {
        let dir = self.network_dir(area, mode);
        let indexed = dir.join(INDEXED_GRAPH_FILE);
        if indexed.is_file() {
            let parsed: IndexedGraph = serde_json::from_str(&read_text(&indexed)?)?;
            return NetworkGraph::from_indexed(parsed);
        }
        let raw = dir.join(RAW_GRAPH_FILE);
        if raw.is_file() {
            debug!(path = %raw.display(), "no indexed graph; converting raw adjacency");
            let parsed: RawAdjacency = serde_json::from_str(&read_text(&raw)?)?;
            return Ok(NetworkGraph::from_adjacency(&parsed));
        }
        Err(missing(area, mode))
    }

    pub fn load_edges(&self, area: &str, mode: &str) -> NetworkResult<EdgeCollection> {
        let path = self.network_dir(area, mode).join(EDGES_FILE);
        if !path.is_file() {
            return Err(missing(area, mode));
        }
        EdgeCollection::from_geojson_str(&read_text(&path)?)
    }

    /// Write `graph` as `graph2.json` for `(area, mode)`.
    pub fn save_indexed_graph(&self, area: &str, mode: &str, graph: &NetworkGraph) -> NetworkResult<PathBuf> {
        let dir = self.network_dir(area, mode);
        std::fs::create_dir_all(&dir).map_err(|source| NetworkError::Io { path: dir.clone(), source })?;
        let path = dir.join(INDEXED_GRAPH_FILE);
        let text = serde_json::to_string(&graph.to_indexed())?;
        std::fs::write(&path, text).map_err(|source| NetworkError::Io { path: path.clone(), source })?;
        Ok(path)
    }

    /// Convert `graph.json` to `graph2.json`.
    pub fn index_graph(&self, area: &str, mode: &str) -> NetworkResult<PathBuf> {
        let raw = self.network_dir(area, mode).join(RAW_GRAPH_FILE);
        if !raw.is_file() {
            return Err(missing(area, mode));
        }
        let parsed: RawAdjacency = serde_json::from_str(&read_text(&raw)?)?;
        let graph = NetworkGraph::from_adjacency(&parsed);
        let path = self.save_indexed_graph(area, mode, &graph)?;
        info!(area, mode, nodes = graph.node_count(), path = %path.display(), "indexed graph written");
        Ok(path)
    }
}

impl NetworkLoader for FileNetworkLoader {
    fn load(&self, area: &str, mode: &str) -> NetworkResult<LoadedNetwork> {
        let started = Instant::now();
        let graph = self.load_graph(area, mode)?;
        let edges = self.load_edges(area, mode)?;
        info!(
            area,
            mode,
            nodes = graph.node_count(),
            edges = edges.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "network loaded"
        );
        Ok(LoadedNetwork { graph, edges })
    }
}

fn missing(area: &str, mode: &str) -> NetworkError {
    NetworkError::NetworkMissing { area: area.to_owned(), mode: mode.to_owned() }
}

fn read_text(path: &Path) -> NetworkResult<String> {
    std::fs::read_to_string(path).map_err(|source| NetworkError::Io { path: path.to_path_buf(), source })
}
