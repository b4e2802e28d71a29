//! Node Builder: normalize trip input into the homogeneous
//! `OptimizeNode` list plus the per-day endpoint table the distributor reads.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DailyAccommodation, NodeId, OptimizeNode, TripInput};

/// The synthetic start/end anchor for a single day.
#[derive(Debug, Clone)]
pub struct DayEndpoints {
    pub start_id: Option<NodeId>,
    pub end_id: Option<NodeId>,
}

/// Output of the node builder: the ordered node list, a lookup map, and the
/// per-day endpoint table.
#[derive(Debug)]
pub struct BuiltNodes {
    pub nodes: Vec<OptimizeNode>,
    pub node_map: HashMap<NodeId, OptimizeNode>,
    pub day_endpoints: Vec<DayEndpoints>,
    pub origin_id: NodeId,
    pub destination_id: NodeId,
}

/// Validate trip-level invariants and produce the node list and day-endpoint
/// table.
pub fn build_nodes(trip: &TripInput) -> PipelineResult<BuiltNodes> {
    if trip.end_date < trip.start_date {
        return Err(PipelineError::InvalidInput(format!(
            "end_date {} is before start_date {}",
            trip.end_date, trip.start_date
        )));
    }
    check_no_overlapping_accommodations(&trip.accommodations)?;

    let origin_id = NodeId::origin();
    let destination_id = NodeId::destination();

    let mut nodes = Vec::with_capacity(trip.places.len() + trip.accommodations.len() + 2);
    nodes.push(OptimizeNode::endpoint(origin_id.clone(), trip.origin.name.clone(), trip.origin.coordinate()));

    for place in &trip.places {
        let fixed = trip.fixed_schedules.iter().find(|f| f.place_id == place.id);
        nodes.push(OptimizeNode {
            id: NodeId::place(place.id.clone()),
            name: place.name.clone(),
            coordinate: place.coordinate(),
            duration_min: place.estimated_duration,
            priority: place.priority,
            is_fixed: fixed.is_some(),
            fixed_date: fixed.map(|f| f.date),
            fixed_start_time: fixed.map(|f| f.start_time),
            fixed_end_time: fixed.map(|f| f.end_time),
        });
    }

    for (i, acc) in trip.accommodations.iter().enumerate() {
        nodes.push(OptimizeNode::endpoint(NodeId::accommodation(i), acc.name.clone(), acc.coordinate()));
    }

    nodes.push(OptimizeNode::endpoint(destination_id.clone(), trip.destination.name.clone(), trip.destination.coordinate()));

    let node_map: HashMap<NodeId, OptimizeNode> = nodes.iter().cloned().map(|n| (n.id.clone(), n)).collect();

    let num_days = trip.num_days();
    let mut day_endpoints = Vec::with_capacity(num_days as usize);
    for d in 0..num_days {
        let date = trip.start_date + chrono::Duration::days(d);
        let is_first = d == 0;
        let is_last = d == num_days - 1;

        let start_id = if is_first {
            Some(origin_id.clone())
        } else {
            accommodation_covering(&trip.accommodations, date - chrono::Duration::days(1)).map(|i| NodeId::accommodation(i))
        };

        let end_id = if is_last {
            Some(destination_id.clone())
        } else {
            accommodation_covering(&trip.accommodations, date).map(|i| NodeId::accommodation(i))
        };

        day_endpoints.push(DayEndpoints { start_id, end_id });
    }

    debug!(nodes = nodes.len(), days = day_endpoints.len(), "built optimization nodes");

    Ok(BuiltNodes { nodes, node_map, day_endpoints, origin_id, destination_id })
}

fn accommodation_covering(accommodations: &[DailyAccommodation], date: NaiveDate) -> Option<usize> {
    accommodations.iter().position(|acc| acc.covers_night(date))
}

fn check_no_overlapping_accommodations(accommodations: &[DailyAccommodation]) -> PipelineResult<()> {
    for (i, a) in accommodations.iter().enumerate() {
        for b in accommodations.iter().skip(i + 1) {
            if a.overlaps(b) {
                return Err(PipelineError::InvalidInput(format!(
                    "accommodations '{}' and '{}' have overlapping date ranges",
                    a.name, b.name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NamedPoint, Place, TransportMode};
    use chrono::NaiveTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn minimal_trip() -> TripInput {
        TripInput {
            origin: NamedPoint { name: "Origin".into(), lat: 37.5665, lng: 126.978 },
            destination: NamedPoint { name: "Destination".into(), lat: 37.4979, lng: 127.0276 },
            start_date: date(2025, 1, 15),
            end_date: date(2025, 1, 15),
            daily_start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            daily_end_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            transport_modes: vec![TransportMode::Car],
            accommodations: vec![],
            places: vec![
                Place { id: "p1".into(), name: "Palace".into(), lat: 37.58, lng: 126.98, estimated_duration: 60, priority: 0 },
                Place { id: "p2".into(), name: "Market".into(), lat: 37.57, lng: 126.99, estimated_duration: 30, priority: 0 },
            ],
            fixed_schedules: vec![],
        }
    }

    #[test]
    fn a_trip_with_no_places_still_builds_origin_and_destination_nodes() {
        let mut trip = minimal_trip();
        trip.places.clear();
        let built = build_nodes(&trip).unwrap();
        assert_eq!(built.nodes.len(), 2);
        assert_eq!(built.nodes[0].id, NodeId::origin());
        assert_eq!(built.nodes[1].id, NodeId::destination());
    }

    #[test]
    fn rejects_inverted_dates() {
        let mut trip = minimal_trip();
        trip.end_date = trip.start_date - chrono::Duration::days(1);
        let err = build_nodes(&trip).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn rejects_overlapping_accommodations() {
        let mut trip = minimal_trip();
        trip.end_date = date(2025, 1, 17);
        trip.accommodations = vec![
            DailyAccommodation { name: "A".into(), lat: 0.0, lng: 0.0, start_date: date(2025, 1, 15), end_date: date(2025, 1, 17) },
            DailyAccommodation { name: "B".into(), lat: 0.0, lng: 0.0, start_date: date(2025, 1, 16), end_date: date(2025, 1, 18) },
        ];
        let err = build_nodes(&trip).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn single_day_trip_has_origin_and_destination_endpoints() {
        let trip = minimal_trip();
        let built = build_nodes(&trip).unwrap();
        assert_eq!(built.day_endpoints.len(), 1);
        assert_eq!(built.day_endpoints[0].start_id, Some(NodeId::origin()));
        assert_eq!(built.day_endpoints[0].end_id, Some(NodeId::destination()));
    }

    #[test]
    fn accommodation_anchors_the_days_it_covers() {
        let mut trip = minimal_trip();
        trip.end_date = date(2025, 1, 16);
        trip.accommodations = vec![DailyAccommodation {
            name: "Hotel".into(),
            lat: 37.55,
            lng: 126.97,
            start_date: date(2025, 1, 15),
            end_date: date(2025, 1, 16),
        }];
        let built = build_nodes(&trip).unwrap();
        assert_eq!(built.day_endpoints[0].start_id, Some(NodeId::origin()));
        assert_eq!(built.day_endpoints[0].end_id, Some(NodeId::accommodation(0)));
        assert_eq!(built.day_endpoints[1].start_id, Some(NodeId::accommodation(0)));
        assert_eq!(built.day_endpoints[1].end_id, Some(NodeId::destination()));
    }
}
