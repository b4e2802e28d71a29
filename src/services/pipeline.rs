//! Top-level orchestration: node building,
//! matrix construction, route construction and improvement, daily
//! distribution, transit enrichment, and validation, run in that order.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveTime};
use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, PipelineResult};
use crate::services::distance_matrix::{self, MatrixBuildOptions};
use crate::services::nearest_neighbor::{self, CostWeights};
use crate::services::node_builder::{self, DayEndpoints};
use crate::services::routing::{CarRoutingProvider, TransitRoutingProvider, WalkingRoutingProvider};
use crate::services::transit_enricher::{self, EnrichmentOptions};
use crate::services::two_opt::{self, TwoOptConfig};
use crate::services::validator::{self, TripWindow};
use crate::types::{
    CarLeg, DailyItinerary, DayEndpoint, DistanceMatrix, EnrichedMatrix, EndpointKind, ErrorCode, ErrorObject, MatrixCell, NodeId, OptimizeNode,
    OptimizeResult, ScheduleItem, Segment, TransitLeg, TransportMode, TripInput, UnassignedPlaceDetail, UnassignedReason, WalkLeg,
};

/// Tuning knobs for a single `optimize_route` call, grouping each stage's
/// own options struct.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub matrix_options: MatrixBuildOptions,
    pub enrichment_options: EnrichmentOptions,
    pub cost_weights: CostWeights,
    pub two_opt_config: TwoOptConfig,
    pub two_opt_runs: u32,
    pub max_daily_minutes: Option<u32>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            matrix_options: MatrixBuildOptions::default(),
            enrichment_options: EnrichmentOptions::default(),
            cost_weights: CostWeights::default(),
            two_opt_config: TwoOptConfig::default(),
            two_opt_runs: 1,
            max_daily_minutes: None,
        }
    }
}

/// Run every stage of the optimizer over `trip` and produce a day-by-day
/// itinerary plus any validation errors collected along the way.
pub async fn optimize_route(
    trip: &TripInput,
    car: &dyn CarRoutingProvider,
    transit: &dyn TransitRoutingProvider,
    walking: &dyn WalkingRoutingProvider,
    options: &PipelineOptions,
    cancel: &CancellationToken,
) -> PipelineResult<OptimizeResult> {
    let built = node_builder::build_nodes(trip)?;

    let window = TripWindow {
        start_date: trip.start_date,
        end_date: trip.end_date,
        daily_start: trip.daily_start_time,
        daily_end: trip.daily_end_time,
    };
    let mut errors = validator::validate_fixed_schedules(&trip.fixed_schedules, &window).errors;

    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    let (matrix, matrix_completed) =
        distance_matrix::build_from_provider(&built.nodes, trip.primary_mode(), car, &options.matrix_options, cancel, |_, _| {}).await;
    if !matrix_completed {
        return Err(PipelineError::Cancelled);
    }

    let middle: Vec<NodeId> = built
        .nodes
        .iter()
        .map(|n| n.id.clone())
        .filter(|id| !id.is_origin() && !id.is_destination() && !id.is_accommodation())
        .collect();

    let nn = nearest_neighbor::nn_with_endpoints(&middle, &matrix, &options.cost_weights, &built.origin_id, &built.destination_id);
    let improved = two_opt::iterated_two_opt(&nn.route, &matrix, &options.cost_weights, &options.two_opt_config, options.two_opt_runs);

    let inner: Vec<NodeId> = improved.route[1..improved.route.len().saturating_sub(1)].to_vec();

    let distributor_options = crate::services::daily_distributor::DistributorOptions {
        start_date: trip.start_date,
        end_date: trip.end_date,
        daily_start_time: trip.daily_start_time,
        daily_end_time: trip.daily_end_time,
        max_daily_minutes: options.max_daily_minutes,
    };
    let dist = crate::services::daily_distributor::distribute_to_daily(
        &inner,
        &built.node_map,
        &matrix,
        &built.day_endpoints,
        &trip.fixed_schedules,
        &distributor_options,
    );

    let mut unassigned_places = Vec::with_capacity(dist.unassigned_places.len());
    for id in &dist.unassigned_places {
        let name = built.node_map.get(id).map(|n| n.name.clone()).unwrap_or_else(|| id.to_string());
        errors.push(
            ErrorObject::new(ErrorCode::ExceedsDailyLimit, format!("'{name}' could not be placed within any day's budget")).with_place(id.to_string()),
        );
        unassigned_places.push(UnassignedPlaceDetail {
            place_id: id.to_string(),
            place_name: name,
            reason_code: UnassignedReason::TimeExceeded,
            reason_message: "no day had enough remaining time budget to fit this place".to_string(),
        });
    }

    let distribution_check = validator::validate_distribution(&dist.days, &dist.unassigned_places, &inner);
    for id in &distribution_check.missing_places {
        errors.push(
            ErrorObject::new(ErrorCode::MissingPlace, format!("'{id}' was lost during distribution and never assigned to a day")).with_place(id.to_string()),
        );
    }
    for id in &distribution_check.duplicate_places {
        errors.push(ErrorObject::new(ErrorCode::DuplicatePlace, format!("'{id}' was assigned to more than one day")).with_place(id.to_string()));
    }

    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    let pairs = transit_enricher::extract_route_segments(&dist.days, &built.day_endpoints);
    let (enriched, enrichment_completed) = transit_enricher::enrich_distance_matrix_with_transit(
        &matrix,
        &built.node_map,
        &pairs,
        walking,
        transit,
        &options.enrichment_options,
        cancel,
        |_, _| {},
    )
    .await;
    if !enrichment_completed {
        return Err(PipelineError::Cancelled);
    }

    let mut itinerary = Vec::with_capacity(dist.days.len());
    for (i, day) in dist.days.iter().enumerate() {
        let date = trip.start_date + Duration::days(i as i64);
        let endpoints = &built.day_endpoints[i];
        itinerary.push(build_daily_itinerary(i as u32 + 1, date, day, endpoints, &built.node_map, &matrix, &enriched, trip));
    }

    errors.extend(validator::validate_itinerary(&itinerary, trip.daily_start_time, trip.daily_end_time).errors);

    Ok(OptimizeResult { itinerary, errors, unassigned_places })
}

fn leg_cell(from: &NodeId, to: &NodeId, matrix: &DistanceMatrix, enriched: &EnrichedMatrix) -> Option<MatrixCell> {
    enriched.get(from, to).or_else(|| matrix.get(from, to)).cloned()
}

fn segment_from_cell(cell: &MatrixCell) -> Segment {
    match cell.mode {
        TransportMode::Walking => Segment::Walk(WalkLeg { distance_m: cell.distance_m, duration_min: cell.duration_min, polyline: cell.polyline.clone() }),
        TransportMode::Car => Segment::Car(CarLeg { distance_m: cell.distance_m, duration_min: cell.duration_min, polyline: cell.polyline.clone() }),
        TransportMode::Public => Segment::Transit(TransitLeg {
            distance_m: cell.distance_m,
            duration_min: cell.duration_min,
            fare: cell.transit_details.as_ref().map(|d| d.total_fare),
            polyline: cell.polyline.clone(),
            details: cell.transit_details.clone(),
        }),
    }
}

fn add_minutes(time: NaiveTime, minutes: f64) -> NaiveTime {
    time + Duration::minutes(minutes.round() as i64)
}

fn day_endpoint(id: &NodeId, node_map: &HashMap<NodeId, OptimizeNode>) -> Option<DayEndpoint> {
    let node = node_map.get(id)?;
    let kind = if id.is_origin() {
        EndpointKind::Origin
    } else if id.is_destination() {
        EndpointKind::Destination
    } else if id.is_accommodation() {
        EndpointKind::Accommodation
    } else {
        EndpointKind::Waypoint
    };
    Some(DayEndpoint { name: node.name.clone(), lat: node.coordinate.lat, lng: node.coordinate.lng, kind })
}

#[allow(clippy::too_many_arguments)]
fn build_daily_itinerary(
    day_number: u32,
    date: NaiveDate,
    items: &[NodeId],
    endpoints: &DayEndpoints,
    node_map: &HashMap<NodeId, OptimizeNode>,
    matrix: &DistanceMatrix,
    enriched: &EnrichedMatrix,
    trip: &TripInput,
) -> DailyItinerary {
    let day_origin = endpoints.start_id.as_ref().and_then(|id| day_endpoint(id, node_map));
    let day_destination = endpoints.end_id.as_ref().and_then(|id| day_endpoint(id, node_map));

    let mut schedule: Vec<ScheduleItem> = Vec::with_capacity(items.len());
    let mut clock = trip.daily_start_time;
    let mut prev_id = endpoints.start_id.clone();
    let mut total_duration_min = 0.0;
    let mut total_distance_m = 0.0;
    let mut total_stay_duration_min = 0u32;
    let mut transport_from_origin: Option<Segment> = None;

    for (i, id) in items.iter().enumerate() {
        let Some(node) = node_map.get(id) else { continue };

        let travel = prev_id.as_ref().and_then(|p| leg_cell(p, id, matrix, enriched));
        let travel_duration = travel.as_ref().map(|c| c.duration_min).unwrap_or(0.0);
        let travel_distance = travel.as_ref().map(|c| c.distance_m).unwrap_or(0.0);

        let (arrival_time, departure_time) = if node.is_fixed {
            let arrival = node.fixed_start_time.unwrap_or_else(|| add_minutes(clock, travel_duration));
            let departure = node.fixed_end_time.unwrap_or_else(|| add_minutes(arrival, node.duration_min as f64));
            (arrival, departure)
        } else {
            let arrival = add_minutes(clock, travel_duration);
            let departure = add_minutes(arrival, node.duration_min as f64);
            (arrival, departure)
        };

        if let Some(cell) = &travel {
            let segment = segment_from_cell(cell);
            if i == 0 {
                transport_from_origin = Some(segment);
            } else if let Some(prev_item) = schedule.last_mut() {
                prev_item.transport_to_next = Some(segment);
            }
        }

        total_duration_min += travel_duration;
        total_distance_m += travel_distance;
        total_stay_duration_min += node.duration_min;

        schedule.push(ScheduleItem {
            place_id: id.as_str().to_string(),
            place_name: node.name.clone(),
            order: i as u32,
            arrival_time,
            departure_time,
            duration_min: node.duration_min,
            is_fixed: node.is_fixed,
            transport_to_next: None,
        });

        clock = departure_time;
        prev_id = Some(id.clone());
    }

    let end_leg = match (&prev_id, &endpoints.end_id) {
        (Some(p), Some(end)) if p != end => leg_cell(p, end, matrix, enriched).map(|cell| {
            total_duration_min += cell.duration_min;
            total_distance_m += cell.distance_m;
            segment_from_cell(&cell)
        }),
        _ => None,
    };

    // A day with no places has no per-item loop to claim the sole
    // origin-to-end leg, so it belongs to transport_from_origin instead of
    // transport_to_destination.
    let (transport_from_origin, transport_to_destination) = if items.is_empty() { (end_leg, None) } else { (transport_from_origin, end_leg) };

    DailyItinerary {
        day_number,
        date,
        start_time: trip.daily_start_time,
        end_time: trip.daily_end_time,
        place_count: items.len() as u32,
        total_duration_min,
        total_distance_m,
        total_stay_duration_min,
        schedule,
        day_origin,
        day_destination,
        transport_from_origin,
        transport_to_destination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::routing::{MockCarProvider, MockTransitProvider, MockWalkingProvider};
    use crate::types::{DailyAccommodation, FixedSchedule, NamedPoint, Place};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn base_trip() -> TripInput {
        TripInput {
            origin: NamedPoint { name: "Origin".into(), lat: 37.5665, lng: 126.978 },
            destination: NamedPoint { name: "Destination".into(), lat: 37.4979, lng: 127.0276 },
            start_date: date(2025, 1, 15),
            end_date: date(2025, 1, 15),
            daily_start_time: time(10, 0),
            daily_end_time: time(22, 0),
            transport_modes: vec![TransportMode::Car],
            accommodations: vec![],
            places: vec![
                Place { id: "p1".into(), name: "Palace".into(), lat: 37.58, lng: 126.98, estimated_duration: 60, priority: 0 },
                Place { id: "p2".into(), name: "Market".into(), lat: 37.57, lng: 126.99, estimated_duration: 30, priority: 0 },
            ],
            fixed_schedules: vec![],
        }
    }

    async fn run(trip: &TripInput) -> OptimizeResult {
        let cancel = CancellationToken::new();
        optimize_route(trip, &MockCarProvider, &MockTransitProvider, &MockWalkingProvider, &PipelineOptions::default(), &cancel)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn trivial_two_point_trip_places_both_stops_on_day_one() {
        let trip = base_trip();
        let result = run(&trip).await;

        assert_eq!(result.itinerary.len(), 1);
        assert_eq!(result.itinerary[0].schedule.len(), 2);
        assert!(result.itinerary[0].day_origin.is_some());
        assert!(result.itinerary[0].day_destination.is_some());
    }

    #[tokio::test]
    async fn trip_with_no_places_yields_a_single_origin_to_destination_leg() {
        let mut trip = base_trip();
        trip.places.clear();
        let result = run(&trip).await;

        assert_eq!(result.itinerary.len(), 1);
        let day = &result.itinerary[0];
        assert!(day.schedule.is_empty());
        assert!(day.day_origin.is_some());
        assert!(day.day_destination.is_some());
        let transport = day.transport_from_origin.as_ref().unwrap();
        assert!(transport.distance_m().is_finite() && transport.distance_m() > 0.0);
        assert!(transport.duration_min().is_finite() && transport.duration_min() > 0.0);
        assert!(day.transport_to_destination.is_none());
    }

    #[tokio::test]
    async fn crossing_quadrilateral_is_untangled_by_two_opt() {
        let mut trip = base_trip();
        trip.places = vec![
            Place { id: "a".into(), name: "a".into(), lat: 37.60, lng: 127.02, estimated_duration: 30, priority: 0 },
            Place { id: "b".into(), name: "b".into(), lat: 37.50, lng: 126.93, estimated_duration: 30, priority: 0 },
            Place { id: "c".into(), name: "c".into(), lat: 37.60, lng: 126.93, estimated_duration: 30, priority: 0 },
            Place { id: "d".into(), name: "d".into(), lat: 37.50, lng: 127.02, estimated_duration: 30, priority: 0 },
        ];

        let result = run(&trip).await;

        let placed: usize = result.itinerary.iter().map(|d| d.schedule.len()).sum();
        assert_eq!(placed, 4);
    }

    #[tokio::test]
    async fn fixed_appointment_keeps_its_pinned_time() {
        let mut trip = base_trip();
        trip.fixed_schedules = vec![FixedSchedule { place_id: "p1".into(), date: date(2025, 1, 15), start_time: time(14, 0), end_time: time(15, 0) }];

        let result = run(&trip).await;

        let item = result.itinerary[0].schedule.iter().find(|i| i.place_id == "p1").unwrap();
        assert_eq!(item.arrival_time, time(14, 0));
        assert_eq!(item.departure_time, time(15, 0));
    }

    #[tokio::test]
    async fn accommodation_anchors_the_second_day() {
        let mut trip = base_trip();
        trip.end_date = date(2025, 1, 16);
        trip.accommodations = vec![DailyAccommodation { name: "Hotel".into(), lat: 37.55, lng: 126.97, start_date: date(2025, 1, 15), end_date: date(2025, 1, 16) }];

        let result = run(&trip).await;

        assert_eq!(result.itinerary.len(), 2);
        assert_eq!(result.itinerary[0].day_destination.as_ref().unwrap().kind, EndpointKind::Accommodation);
        assert_eq!(result.itinerary[1].day_origin.as_ref().unwrap().kind, EndpointKind::Accommodation);
    }

    #[tokio::test]
    async fn overflowing_places_surface_as_errors_not_a_crash() {
        let mut trip = base_trip();
        trip.places = (0..10)
            .map(|i| Place { id: format!("p{i}"), name: format!("p{i}"), lat: 37.5665, lng: 126.978, estimated_duration: 180, priority: 0 })
            .collect();

        let result = run(&trip).await;

        assert!(result.has_errors());
        assert!(result.errors.iter().any(|e| e.code == ErrorCode::ExceedsDailyLimit));
        assert!(!result.unassigned_places.is_empty());
        assert!(result.unassigned_places.iter().all(|p| p.reason_code == UnassignedReason::TimeExceeded));
    }

    #[tokio::test]
    async fn a_short_leg_is_enriched_as_a_walking_segment() {
        let mut trip = base_trip();
        trip.places = vec![
            Place { id: "p1".into(), name: "Palace".into(), lat: 37.5665, lng: 126.978, estimated_duration: 30, priority: 0 },
            Place { id: "p2".into(), name: "Nearby".into(), lat: 37.567, lng: 126.979, estimated_duration: 30, priority: 0 },
        ];

        let result = run(&trip).await;

        let has_walk_segment = result.itinerary[0]
            .schedule
            .iter()
            .filter_map(|i| i.transport_to_next.as_ref())
            .any(|s| matches!(s, Segment::Walk(_)));
        assert!(has_walk_segment);
    }
}
