//! Transit Enricher: replace each traversed leg's coarse
//! matrix estimate with a real walking or transit route, batched the same
//! way the distance matrix builder batches car-provider calls.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::services::geo;
use crate::services::node_builder::DayEndpoints;
use crate::services::retry::retry_with_backoff;
use crate::services::routing::{TransitRoutingProvider, WalkingRoutingProvider};
use crate::types::{
    Coordinate, DistanceMatrix, EnrichedMatrix, MatrixCell, NodeId, OptimizeNode, Segment, TransitLeg, TransportMode, WalkLeg,
    IMPLICIT_WALK_THRESHOLD_M,
};

/// Tuning for `enrich`'s batched concurrency, mirroring
/// `distance_matrix::MatrixBuildOptions`.
#[derive(Debug, Clone)]
pub struct EnrichmentOptions {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for EnrichmentOptions {
    fn default() -> Self {
        Self { batch_size: 3, batch_delay_ms: 500, max_attempts: 3 }
    }
}

/// Walk every traversed `(from, to)` pair in `pairs`, replacing the
/// matrix's coarse estimate with a provider-backed walking or transit leg.
/// Legs shorter than `IMPLICIT_WALK_THRESHOLD_M` always go to the walking
/// provider; longer ones go to transit.
///
/// Returns `(segments, true)` if every pair was resolved, or `(segments,
/// false)` if `cancel` fired partway through — callers must treat a partial
/// result as unusable and discard it.
pub async fn enrich(
    pairs: &[(NodeId, NodeId)],
    node_map: &HashMap<NodeId, OptimizeNode>,
    walking: &dyn WalkingRoutingProvider,
    transit: &dyn TransitRoutingProvider,
    options: &EnrichmentOptions,
    cancel: &CancellationToken,
    on_progress: impl Fn(usize, usize) + Send + Sync,
) -> (HashMap<(NodeId, NodeId), Segment>, bool) {
    let total = pairs.len();
    info!(total, batch_size = options.batch_size, "enriching traversed legs with transit detail");

    let mut result = HashMap::with_capacity(total);
    let mut completed = 0usize;
    let mut chunks = stream::iter(pairs.iter().cloned()).chunks(options.batch_size.max(1));
    let mut first_chunk = true;
    let mut cut_short = false;

    while let Some(chunk) = chunks.next().await {
        if cancel.is_cancelled() {
            debug!("enrichment cancelled");
            cut_short = true;
            break;
        }
        if !first_chunk {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(options.batch_delay_ms)) => {}
                _ = cancel.cancelled() => { cut_short = true; break; }
            }
        }
        first_chunk = false;

        let futures = chunk.into_iter().filter_map(|(from, to)| {
            let from_node = node_map.get(&from)?;
            let to_node = node_map.get(&to)?;
            let origin = from_node.coordinate;
            let destination = to_node.coordinate;
            Some(async move {
                let segment = resolve_leg(origin, destination, walking, transit, options, cancel).await;
                (from, to, segment)
            })
        });

        let results = futures::future::join_all(futures).await;
        for (from, to, segment) in results {
            result.insert((from, to), segment);
            completed += 1;
            on_progress(completed, total);
        }
    }

    (result, !cut_short)
}

async fn resolve_leg(
    origin: Coordinate,
    destination: Coordinate,
    walking: &dyn WalkingRoutingProvider,
    transit: &dyn TransitRoutingProvider,
    options: &EnrichmentOptions,
    cancel: &CancellationToken,
) -> Segment {
    let straight_line = geo::haversine_distance_m(&origin, &destination);

    if straight_line < IMPLICIT_WALK_THRESHOLD_M {
        let route = retry_with_backoff(
            || walking.get_walking_route(origin, destination),
            options.max_attempts,
            Duration::from_millis(200),
            cancel,
        )
        .await;

        return match route {
            Some(route) => Segment::Walk(WalkLeg { distance_m: route.total_distance_m, duration_min: route.total_duration_min, polyline: route.polyline }),
            None => {
                let distance_m = geo::road_distance_m(&origin, &destination, TransportMode::Walking);
                let duration_min = geo::estimate_duration_min(distance_m, TransportMode::Walking);
                Segment::Walk(WalkLeg { distance_m, duration_min, polyline: None })
            }
        };
    }

    let route = retry_with_backoff(
        || transit.get_best_transit_route(origin, destination),
        options.max_attempts,
        Duration::from_millis(200),
        cancel,
    )
    .await;

    match route {
        Some(route) => Segment::Transit(TransitLeg {
            distance_m: route.total_distance_m,
            duration_min: route.total_duration_min,
            fare: Some(route.details.total_fare),
            polyline: route.polyline,
            details: Some(route.details),
        }),
        None => {
            let distance_m = geo::road_distance_m(&origin, &destination, TransportMode::Public);
            let duration_min = geo::estimate_duration_min(distance_m, TransportMode::Public);
            Segment::Transit(TransitLeg { distance_m, duration_min, fare: None, polyline: None, details: None })
        }
    }
}

/// Build an `EnrichedMatrix` over `matrix`'s required pairs, without
/// mutating `matrix` itself. Callers apply the
/// result with `EnrichedMatrix::apply_to` when they want a back-filled view.
///
/// Returns `(enriched, true)` if every pair was resolved, or `(enriched,
/// false)` if `cancel` fired partway through — callers must treat a partial
/// view as unusable and discard it.
pub async fn enrich_distance_matrix_with_transit(
    matrix: &DistanceMatrix,
    node_map: &HashMap<NodeId, OptimizeNode>,
    pairs: &[(NodeId, NodeId)],
    walking: &dyn WalkingRoutingProvider,
    transit: &dyn TransitRoutingProvider,
    options: &EnrichmentOptions,
    cancel: &CancellationToken,
    on_progress: impl Fn(usize, usize) + Send + Sync,
) -> (EnrichedMatrix, bool) {
    let (segments, completed) = enrich(pairs, node_map, walking, transit, options, cancel, on_progress).await;
    let mut enriched = EnrichedMatrix::new();

    for ((from, to), segment) in segments {
        if !matrix.is_required_pair(&from, &to) {
            continue;
        }
        let mode = match &segment {
            Segment::Walk(_) => TransportMode::Walking,
            Segment::Transit(_) => TransportMode::Public,
            Segment::Car(_) => TransportMode::Car,
        };
        let mut cell = MatrixCell::new(segment.distance_m(), segment.duration_min(), mode);
        cell.polyline = segment.polyline().map(|s| s.to_string());
        cell.transit_details = segment.transit_details().cloned();
        enriched.insert(from, to, cell);
    }

    (enriched, completed)
}

/// Walk each day's full path — day-start endpoint, the day's places in
/// order, day-end endpoint — and collect every consecutive `(from, to)`
/// pair actually traversed, deduplicated in first-seen order.
pub fn extract_route_segments(days: &[Vec<NodeId>], day_endpoints: &[DayEndpoints]) -> Vec<(NodeId, NodeId)> {
    let mut seen: HashSet<(NodeId, NodeId)> = HashSet::new();
    let mut ordered = Vec::new();

    for (d, day) in days.iter().enumerate() {
        let mut path = Vec::with_capacity(day.len() + 2);
        if let Some(start) = day_endpoints.get(d).and_then(|e| e.start_id.clone()) {
            path.push(start);
        }
        path.extend(day.iter().cloned());
        if let Some(end) = day_endpoints.get(d).and_then(|e| e.end_id.clone()) {
            path.push(end);
        }

        for pair in path.windows(2) {
            let key = (pair[0].clone(), pair[1].clone());
            if seen.insert(key.clone()) {
                ordered.push(key);
            }
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::routing::{MockTransitProvider, MockWalkingProvider};
    use crate::types::Coordinate as Coord;

    fn node(id: &str, lat: f64, lng: f64) -> OptimizeNode {
        OptimizeNode::endpoint(NodeId::place(id), id, Coord::new(lat, lng))
    }

    #[tokio::test]
    async fn short_leg_is_enriched_as_a_walk_segment() {
        let mut node_map = HashMap::new();
        node_map.insert(NodeId::place("a"), node("a", 37.5665, 126.978));
        node_map.insert(NodeId::place("b"), node("b", 37.567, 126.979));

        let pairs = vec![(NodeId::place("a"), NodeId::place("b"))];
        let cancel = CancellationToken::new();
        let (segments, completed) = enrich(
            &pairs,
            &node_map,
            &MockWalkingProvider,
            &MockTransitProvider,
            &EnrichmentOptions::default(),
            &cancel,
            |_, _| {},
        )
        .await;

        assert!(completed);
        let segment = segments.get(&(NodeId::place("a"), NodeId::place("b"))).unwrap();
        assert!(matches!(segment, Segment::Walk(_)));
    }

    #[tokio::test]
    async fn long_leg_is_enriched_as_a_transit_segment() {
        let mut node_map = HashMap::new();
        node_map.insert(NodeId::place("a"), node("a", 37.5665, 126.978));
        node_map.insert(NodeId::place("b"), node("b", 37.70, 127.20));

        let pairs = vec![(NodeId::place("a"), NodeId::place("b"))];
        let cancel = CancellationToken::new();
        let (segments, completed) = enrich(
            &pairs,
            &node_map,
            &MockWalkingProvider,
            &MockTransitProvider,
            &EnrichmentOptions::default(),
            &cancel,
            |_, _| {},
        )
        .await;

        assert!(completed);
        let segment = segments.get(&(NodeId::place("a"), NodeId::place("b"))).unwrap();
        assert!(matches!(segment, Segment::Transit(_)));
    }

    #[tokio::test]
    async fn a_pre_cancelled_token_cuts_enrichment_short() {
        let mut node_map = HashMap::new();
        node_map.insert(NodeId::place("a"), node("a", 37.5665, 126.978));
        node_map.insert(NodeId::place("b"), node("b", 37.567, 126.979));

        let pairs = vec![(NodeId::place("a"), NodeId::place("b"))];
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (segments, completed) = enrich(
            &pairs,
            &node_map,
            &MockWalkingProvider,
            &MockTransitProvider,
            &EnrichmentOptions::default(),
            &cancel,
            |_, _| {},
        )
        .await;

        assert!(!completed);
        assert!(segments.is_empty());
    }

    #[test]
    fn extract_route_segments_dedups_and_includes_endpoints() {
        let days = vec![vec![NodeId::place("a"), NodeId::place("b")], vec![NodeId::place("a")]];
        let day_endpoints = vec![
            DayEndpoints { start_id: Some(NodeId::origin()), end_id: Some(NodeId::accommodation(0)) },
            DayEndpoints { start_id: Some(NodeId::accommodation(0)), end_id: Some(NodeId::destination()) },
        ];

        let pairs = extract_route_segments(&days, &day_endpoints);

        assert_eq!(pairs[0], (NodeId::origin(), NodeId::place("a")));
        assert!(pairs.contains(&(NodeId::place("b"), NodeId::accommodation(0))));
        assert!(pairs.contains(&(NodeId::accommodation(0), NodeId::place("a"))));
        assert!(pairs.contains(&(NodeId::place("a"), NodeId::destination())));

        let unique: HashSet<_> = pairs.iter().cloned().collect();
        assert_eq!(unique.len(), pairs.len());
    }
}
