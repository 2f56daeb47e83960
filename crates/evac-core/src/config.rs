//! Routing configuration.
//!
//! All tunables of the routing pipeline live in one [`RoutingConfig`] so an
//! application can load them from a single JSON file.  Every field has a
//! default; a config file only needs the fields it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// Tunables for network loading, snapping and search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Root of the network data tree (`{data_dir}/{area}/{mode}/…`).
    pub data_dir: PathBuf,

    /// Start/end points farther than this from every edge are rejected.
    pub max_snap_distance_m: f64,

    /// Snapping tolerance for range (isochrone) queries.
    pub range_snap_distance_m: f64,

    /// Radius, in degrees, of the bounding-box candidate search around a
    /// query point.  Candidates are then ranked by true distance.
    pub candidate_radius_deg: f64,

    /// Fraction by which edge bounding boxes are padded in the R-tree.
    pub bbox_padding: f64,

    /// Node expansions allowed per search before it gives up.
    pub step_limit: usize,

    /// How many heap pops pass between polls of the cancellation flag.
    pub cancel_check_interval: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            data_dir:              PathBuf::from("data"),
            max_snap_distance_m:   50.0,
            range_snap_distance_m: 200.0,
            candidate_radius_deg:  0.01,
            bbox_padding:          0.05,
            step_limit:            10_000_000,
            cancel_check_interval: 1024,
        }
    }
}

impl RoutingConfig {
    /// Read a config from a JSON file and validate it.
    pub fn from_json_file(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> CoreResult<Self> {
        let config: RoutingConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the router cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.max_snap_distance_m > 0.0) {
            return Err(CoreError::Config("max_snap_distance_m must be positive".into()));
        }
        if !(self.range_snap_distance_m > 0.0) {
            return Err(CoreError::Config("range_snap_distance_m must be positive".into()));
        }
        if !(self.candidate_radius_deg > 0.0) {
            return Err(CoreError::Config("candidate_radius_deg must be positive".into()));
        }
        if !(self.bbox_padding >= 0.0) {
            return Err(CoreError::Config("bbox_padding must not be negative".into()));
        }
        if self.cancel_check_interval == 0 {
            return Err(CoreError::Config("cancel_check_interval must be at least 1".into()));
        }
        Ok(())
    }
}
