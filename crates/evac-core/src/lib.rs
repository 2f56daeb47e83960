//! `evac-core`: foundational types for the evac routing engine.
//!
//! This crate is a dependency of every other `evac-*` crate.  It intentionally
//! has no `evac-*` dependencies and minimal external ones (`thiserror`,
//! `serde`, `serde_json`, `geo`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `NodeIndex`, `EdgeId`                                |
//! | [`geo`]         | `LonLat`, haversine distance, line location/slicing   |
//! | [`category`]    | `NodeCategory`, `ModeCost`, `ModeCosts`               |
//! | [`config`]      | `RoutingConfig`                                       |
//! | [`error`]       | `CoreError`, `CoreResult`                             |

pub mod category;
pub mod config;
pub mod error;
pub mod geo;
pub mod ids;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use category::{ModeCost, ModeCosts, NodeCategory};
pub use config::RoutingConfig;
pub use error::{CoreError, CoreResult};
pub use self::geo::{LinePosition, LonLat};
pub use ids::{EdgeId, NodeIndex};
