//! Route-subsystem error type.
//!
//! The `Display` strings are the messages callers see in a failed
//! [`RouteCollection`](crate::RouteCollection).

use std::fmt;

use evac_core::LonLat;
use evac_network::NetworkError;
use thiserror::Error;

/// Which query point failed to snap.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RoutePoint {
    Start,
    End,
    /// Centre point of a range query.
    Center,
}

impl fmt::Display for RoutePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RoutePoint::Start  => "start",
            RoutePoint::End    => "end",
            RoutePoint::Center => "center",
        })
    }
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Network {area} {mode} not found")]
    NetworkNotFound { area: String, mode: String },

    #[error("{which} point not near a line in {area}")]
    PointNotNearNetwork { which: RoutePoint, area: String },

    #[error("No route found between {start} and {end}")]
    NoPathFound { start: LonLat, end: LonLat },

    /// Any other network failure.  A failed route prefixes the message with
    /// `CalculateRoute unexpected error:`.
    #[error(transparent)]
    Network(NetworkError),
}

impl From<NetworkError> for RouteError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::NetworkMissing { area, mode } => RouteError::NetworkNotFound { area, mode },
            other => RouteError::Network(other),
        }
    }
}

pub type RouteResult<T> = Result<T, RouteError>;
