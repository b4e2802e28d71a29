//! Geographic coordinate and transport mode primitives.

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A straight-line leg shorter than this is always walked, regardless of
/// the trip's chosen transport mode.
pub const IMPLICIT_WALK_THRESHOLD_M: f64 = 500.0;

/// Transport mode chosen for a trip (or a single leg, once resolved).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Walking,
    Public,
    Car,
}

impl TransportMode {
    /// Resolve the effective mode for a leg of the given straight-line
    /// distance: short legs are always walked, regardless of
    /// the trip-level mode.
    pub fn effective_for_distance(requested: TransportMode, straight_line_m: f64) -> TransportMode {
        if straight_line_m < IMPLICIT_WALK_THRESHOLD_M {
            TransportMode::Walking
        } else {
            requested
        }
    }
}
