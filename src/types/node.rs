//! Optimization nodes: the homogeneous representation the pipeline works on
//! once origin, destination, places, and accommodations have been normalized
//! (see `services::node_builder`).

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::coordinate::Coordinate;

/// A stable node identifier. Wrapping `String` instead of passing bare
/// strings around keeps the synthetic IDs (`__origin__`, `__destination__`,
/// `__accommodation_<n>__`) constructed in one place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn place(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn origin() -> Self {
        Self("__origin__".to_string())
    }

    pub fn destination() -> Self {
        Self("__destination__".to_string())
    }

    pub fn accommodation(index: usize) -> Self {
        Self(format!("__accommodation_{index}__"))
    }

    pub fn is_origin(&self) -> bool {
        self.0 == "__origin__"
    }

    pub fn is_destination(&self) -> bool {
        self.0 == "__destination__"
    }

    pub fn is_accommodation(&self) -> bool {
        self.0.starts_with("__accommodation_") && self.0.ends_with("__")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A homogeneous optimization node: origin, destination, a place to visit,
/// or a synthetic per-night accommodation anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeNode {
    pub id: NodeId,
    pub name: String,
    pub coordinate: Coordinate,
    /// Stay time in minutes; 0 for endpoints and accommodations.
    pub duration_min: u32,
    /// Lower is higher priority.
    pub priority: i32,
    pub is_fixed: bool,
    pub fixed_date: Option<NaiveDate>,
    pub fixed_start_time: Option<NaiveTime>,
    pub fixed_end_time: Option<NaiveTime>,
}

impl OptimizeNode {
    pub fn endpoint(id: NodeId, name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            id,
            name: name.into(),
            coordinate,
            duration_min: 0,
            priority: 0,
            is_fixed: false,
            fixed_date: None,
            fixed_start_time: None,
            fixed_end_time: None,
        }
    }
}
