//! The distance/duration/polyline tensor (`DistanceMatrix`, `MatrixCell`,
//! `TransitDetails`, `SubPath`) and the enriched view the transit enricher
//! hands back without mutating the matrix that optimization already read.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::coordinate::TransportMode;
use super::node::NodeId;

/// Traffic type of a transit sub-path. The mapping here is the single
/// authoritative one referenced from `DESIGN.md`'s Open Question resolution;
/// unknown upstream codes decode to `Other(code)` rather than being dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
pub enum TrafficType {
    Subway,
    Bus,
    Walking,
    Train,
    ExpressBus,
    AirportBus,
    Ferry,
    Other(u8),
}

impl From<u8> for TrafficType {
    fn from(code: u8) -> Self {
        match code {
            1 => TrafficType::Subway,
            2 => TrafficType::Bus,
            3 => TrafficType::Walking,
            10 => TrafficType::Train,
            11 => TrafficType::ExpressBus,
            12 => TrafficType::AirportBus,
            14 => TrafficType::Ferry,
            other => TrafficType::Other(other),
        }
    }
}

impl From<TrafficType> for u8 {
    fn from(t: TrafficType) -> u8 {
        match t {
            TrafficType::Subway => 1,
            TrafficType::Bus => 2,
            TrafficType::Walking => 3,
            TrafficType::Train => 10,
            TrafficType::ExpressBus => 11,
            TrafficType::AirportBus => 12,
            TrafficType::Ferry => 14,
            TrafficType::Other(code) => code,
        }
    }
}

/// A point used to draw a transit lane (`start_coord`/`end_coord`/
/// `pass_stop_coords`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneCoord {
    pub lat: f64,
    pub lng: f64,
}

/// The transit lane metadata for one sub-path (bus number, subway line color, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lane {
    pub name: Option<String>,
    pub bus_no: Option<String>,
    pub bus_type: Option<String>,
    pub subway_code: Option<String>,
    pub line_color: Option<String>,
}

/// One homogeneous portion of a transit segment: one bus ride, one subway
/// ride, or one walking transfer between legs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubPath {
    pub traffic_type: TrafficType,
    pub distance: f64,
    pub section_time: u32,
    pub station_count: u32,
    pub start_name: String,
    pub end_name: String,
    pub polyline: Option<String>,
    pub lane: Option<Lane>,
    pub start_coord: Option<LaneCoord>,
    pub end_coord: Option<LaneCoord>,
    pub pass_stop_coords: Option<Vec<LaneCoord>>,
}

/// Rich detail for a public-transit leg: fare, transfer count, and the
/// sub-paths that compose it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitDetails {
    pub total_fare: u32,
    pub transfer_count: u32,
    pub walking_time: u32,
    pub walking_distance: f64,
    pub sub_paths: Vec<SubPath>,
}

/// One matrix cell: the cost and, optionally, the rich detail of traveling
/// directly from one node to another.
///
/// A single struct keyed by `(from, to)` rather than parallel 2-D arrays
/// — there is no way for distance, duration, and
/// mode to drift out of alignment for a pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixCell {
    pub distance_m: f64,
    pub duration_min: f64,
    pub mode: TransportMode,
    pub polyline: Option<String>,
    pub transit_details: Option<TransitDetails>,
}

impl MatrixCell {
    pub fn new(distance_m: f64, duration_min: f64, mode: TransportMode) -> Self {
        Self {
            distance_m,
            duration_min,
            mode,
            polyline: None,
            transit_details: None,
        }
    }
}

/// The N×N distance/duration/polyline tensor. `None` at `[i][j]` means the
/// pair is not required (an edge into the origin or out of the destination)
/// rather than "not yet computed" — callers distinguish the two by checking
/// whether the pair is in `Self::required_pairs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceMatrix {
    pub places: Vec<NodeId>,
    id_to_index: HashMap<NodeId, usize>,
    cells: Vec<Vec<Option<MatrixCell>>>,
}

impl DistanceMatrix {
    /// Build an empty matrix sized for `places`, with every diagonal cell
    /// pre-filled at zero cost.
    pub fn new(places: Vec<NodeId>) -> Self {
        let n = places.len();
        let id_to_index: HashMap<NodeId, usize> =
            places.iter().cloned().enumerate().map(|(i, id)| (id, i)).collect();
        let mut cells: Vec<Vec<Option<MatrixCell>>> = (0..n).map(|_| vec![None; n]).collect();
        for i in 0..n {
            cells[i][i] = Some(MatrixCell::new(0.0, 0.0, TransportMode::Walking));
        }
        Self { places, id_to_index, cells }
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.id_to_index.get(id).copied()
    }

    /// Whether the ordered pair `(from, to)` is ever traversed: every pair
    /// except edges into the origin and edges out of the destination.
    pub fn is_required_pair(&self, from: &NodeId, to: &NodeId) -> bool {
        from != to && !to.is_origin() && !from.is_destination()
    }

    pub fn set(&mut self, from: &NodeId, to: &NodeId, cell: MatrixCell) {
        if let (Some(i), Some(j)) = (self.index_of(from), self.index_of(to)) {
            self.cells[i][j] = Some(cell);
        }
    }

    pub fn set_by_index(&mut self, i: usize, j: usize, cell: MatrixCell) {
        self.cells[i][j] = Some(cell);
    }

    /// Look up the cell for `(from, to)`. Returns `None` if either ID is
    /// unknown or no entry has been computed for the pair.
    pub fn get(&self, from: &NodeId, to: &NodeId) -> Option<&MatrixCell> {
        let i = self.index_of(from)?;
        let j = self.index_of(to)?;
        self.cells[i][j].as_ref()
    }

    pub fn get_by_index(&self, i: usize, j: usize) -> Option<&MatrixCell> {
        self.cells[i][j].as_ref()
    }

    pub fn distance(&self, from: &NodeId, to: &NodeId) -> Option<f64> {
        self.get(from, to).map(|c| c.distance_m)
    }

    pub fn duration(&self, from: &NodeId, to: &NodeId) -> Option<f64> {
        self.get(from, to).map(|c| c.duration_min)
    }

    /// Whether every required pair (per `is_required_pair`) has a finite
    /// entry — the completeness a provider-backed build should leave a
    /// matrix in.
    pub fn is_complete(&self) -> bool {
        for from in &self.places {
            for to in &self.places {
                if self.is_required_pair(from, to) && self.get(from, to).is_none() {
                    return false;
                }
            }
        }
        true
    }

    /// Whether the matrix is symmetric, i.e. `get(a, b) == get(b, a)` for
    /// distance/duration on every pair that exists both ways. Haversine
    /// matrices always satisfy this; provider matrices generally do not.
    pub fn is_symmetric(&self) -> bool {
        let n = self.len();
        for i in 0..n {
            for j in 0..n {
                let (Some(a), Some(b)) = (&self.cells[i][j], &self.cells[j][i]) else {
                    continue;
                };
                if (a.distance_m - b.distance_m).abs() > 1e-6 || (a.duration_min - b.duration_min).abs() > 1e-6 {
                    return false;
                }
            }
        }
        true
    }
}

/// An enriched view keyed by the final segment set the transit enricher
/// produced, separate from the original (now stale for those pairs) matrix —
/// applied on top of it with `apply_to` rather than mutating the matrix
/// optimization already read.
#[derive(Debug, Clone, Default)]
pub struct EnrichedMatrix {
    entries: HashMap<(NodeId, NodeId), MatrixCell>,
}

impl EnrichedMatrix {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn insert(&mut self, from: NodeId, to: NodeId, cell: MatrixCell) {
        self.entries.insert((from, to), cell);
    }

    pub fn get(&self, from: &NodeId, to: &NodeId) -> Option<&MatrixCell> {
        self.entries.get(&(from.clone(), to.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply this view's entries on top of `matrix`, producing the
    /// back-filled matrix `enrich_distance_matrix_with_transit` describes.
    /// The original `matrix` is left untouched; a cloned copy is returned.
    pub fn apply_to(&self, matrix: &DistanceMatrix) -> DistanceMatrix {
        let mut out = matrix.clone();
        for ((from, to), cell) in &self.entries {
            out.set(from, to, cell.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<NodeId> {
        (0..n).map(|i| NodeId::place(format!("p{i}"))).collect()
    }

    #[test]
    fn diagonal_is_zero_on_construction() {
        let m = DistanceMatrix::new(ids(3));
        for id in &m.places.clone() {
            assert_eq!(m.distance(id, id), Some(0.0));
            assert_eq!(m.duration(id, id), Some(0.0));
        }
    }

    #[test]
    fn origin_in_edges_and_destination_out_edges_are_not_required() {
        let places = vec![NodeId::origin(), NodeId::place("poi"), NodeId::destination()];
        let m = DistanceMatrix::new(places);
        assert!(!m.is_required_pair(&NodeId::place("poi"), &NodeId::origin()));
        assert!(!m.is_required_pair(&NodeId::destination(), &NodeId::place("poi")));
        assert!(m.is_required_pair(&NodeId::origin(), &NodeId::place("poi")));
        assert!(m.is_required_pair(&NodeId::place("poi"), &NodeId::destination()));
    }

    #[test]
    fn unknown_id_lookup_returns_none() {
        let m = DistanceMatrix::new(ids(2));
        assert_eq!(m.distance(&NodeId::place("p0"), &NodeId::place("ghost")), None);
    }

    #[test]
    fn traffic_type_round_trips_known_codes() {
        for code in [1u8, 2, 3, 10, 11, 12, 14] {
            let t: TrafficType = code.into();
            let back: u8 = t.into();
            assert_eq!(back, code);
        }
    }

    #[test]
    fn traffic_type_preserves_unknown_codes() {
        let t: TrafficType = 4u8.into();
        assert_eq!(t, TrafficType::Other(4));
    }
}
