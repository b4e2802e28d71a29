//! Distance Matrix: the Haversine-fast and provider-accurate
//! matrix builders, with batched concurrency and per-pair fallback.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::services::geo;
use crate::services::retry::retry_with_backoff;
use crate::services::routing::CarRoutingProvider;
use crate::types::{DistanceMatrix, MatrixCell, NodeId, OptimizeNode, TransportMode};

/// The public/car duration ratio used to approximate a public-transit leg's
/// cost without spending transit-provider quota. Treated as a
/// tunable knob, not a physical constant.
pub const PUBLIC_TRANSIT_MULTIPLIER: f64 = 1.3;

/// A straight-line leg shorter than this needs no provider call at all; it's
/// filled with a fixed one-minute stub.
const NO_CALL_THRESHOLD_M: f64 = 10.0;

/// Tuning for `build_from_provider`'s batched concurrency.
#[derive(Debug, Clone)]
pub struct MatrixBuildOptions {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for MatrixBuildOptions {
    fn default() -> Self {
        Self { batch_size: 3, batch_delay_ms: 500, max_attempts: 3 }
    }
}

/// Build a matrix from pure Haversine estimation — deterministic, no
/// network, and always symmetric.
pub fn build_haversine(nodes: &[OptimizeNode], mode: TransportMode) -> DistanceMatrix {
    let ids: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
    let mut matrix = DistanceMatrix::new(ids);

    for (i, from) in nodes.iter().enumerate() {
        for (j, to) in nodes.iter().enumerate() {
            if i == j || !matrix.is_required_pair(&from.id, &to.id) {
                continue;
            }
            let (distance_m, duration_min, effective_mode) = geo::estimate_leg(&from.coordinate, &to.coordinate, mode);
            matrix.set_by_index(i, j, MatrixCell::new(distance_m, duration_min, effective_mode));
        }
    }

    matrix
}

/// Build a matrix backed by a real routing provider, batching calls and
/// falling back to Haversine on a per-pair basis.
///
/// `on_progress(completed, total)` is invoked after every pair resolves,
/// whether by provider call or fallback. Returns `(matrix, true)` if every
/// pair was resolved, or `(matrix, false)` if `cancel` fired partway through
/// — callers must treat a partial matrix as unusable and discard it.
pub async fn build_from_provider(
    nodes: &[OptimizeNode],
    mode: TransportMode,
    provider: &dyn CarRoutingProvider,
    options: &MatrixBuildOptions,
    cancel: &CancellationToken,
    on_progress: impl Fn(usize, usize) + Send + Sync,
) -> (DistanceMatrix, bool) {
    let ids: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
    let mut matrix = DistanceMatrix::new(ids);

    let required_pairs: Vec<(usize, usize)> = (0..nodes.len())
        .flat_map(|i| (0..nodes.len()).map(move |j| (i, j)))
        .filter(|&(i, j)| i != j && matrix.is_required_pair(&nodes[i].id, &nodes[j].id))
        .collect();

    let total = required_pairs.len();
    info!(total, batch_size = options.batch_size, "building provider-backed distance matrix");

    let mut completed = 0usize;
    let mut chunks = stream::iter(required_pairs).chunks(options.batch_size.max(1));
    let mut first_chunk = true;
    let mut cut_short = false;

    while let Some(chunk) = chunks.next().await {
        if cancel.is_cancelled() {
            debug!("matrix build cancelled");
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

        let futures = chunk.into_iter().map(|(i, j)| {
            let from = &nodes[i];
            let to = &nodes[j];
            async move {
                let cell = resolve_pair(from, to, mode, provider, options, cancel).await;
                (i, j, cell)
            }
        });

        let results = futures::future::join_all(futures).await;
        for (i, j, cell) in results {
            matrix.set_by_index(i, j, cell);
            completed += 1;
            on_progress(completed, total);
        }
    }

    (matrix, !cut_short)
}

async fn resolve_pair(
    from: &OptimizeNode,
    to: &OptimizeNode,
    mode: TransportMode,
    provider: &dyn CarRoutingProvider,
    options: &MatrixBuildOptions,
    cancel: &CancellationToken,
) -> MatrixCell {
    let straight_line = geo::haversine_distance_m(&from.coordinate, &to.coordinate);
    if straight_line < NO_CALL_THRESHOLD_M {
        return MatrixCell::new(straight_line, 1.0, TransportMode::Walking);
    }

    let effective_mode = TransportMode::effective_for_distance(mode, straight_line);
    if effective_mode == TransportMode::Walking {
        let (distance_m, duration_min, _) = geo::estimate_leg(&from.coordinate, &to.coordinate, TransportMode::Walking);
        return MatrixCell::new(distance_m, duration_min, TransportMode::Walking);
    }

    let origin = from.coordinate;
    let destination = to.coordinate;
    let route = retry_with_backoff(
        || provider.get_car_route(origin, destination),
        options.max_attempts,
        Duration::from_millis(200),
        cancel,
    )
    .await;

    match route {
        Some(route) => {
            let mut cell = MatrixCell::new(route.total_distance_m, route.total_duration_min, TransportMode::Car);
            cell.polyline = route.polyline;
            if effective_mode == TransportMode::Public {
                cell.distance_m *= PUBLIC_TRANSIT_MULTIPLIER;
                cell.duration_min *= PUBLIC_TRANSIT_MULTIPLIER;
                cell.mode = TransportMode::Public;
            }
            cell
        }
        None => {
            let (distance_m, duration_min, resolved_mode) = geo::estimate_leg(&from.coordinate, &to.coordinate, mode);
            MatrixCell::new(distance_m, duration_min, resolved_mode)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::routing::MockCarProvider;
    use crate::types::Coordinate;

    fn node(id: &str, lat: f64, lng: f64) -> OptimizeNode {
        OptimizeNode::endpoint(NodeId::place(id), id, Coordinate::new(lat, lng))
    }

    #[test]
    fn haversine_matrix_diagonal_is_zero_and_symmetric() {
        let nodes = vec![node("a", 37.56, 126.97), node("b", 37.50, 127.02), node("c", 37.55, 126.99)];
        let matrix = build_haversine(&nodes, TransportMode::Car);

        for n in &nodes {
            assert_eq!(matrix.distance(&n.id, &n.id), Some(0.0));
        }
        assert!(matrix.is_symmetric());
    }

    #[test]
    fn haversine_matrix_skips_origin_in_and_destination_out_edges() {
        let nodes = vec![
            OptimizeNode::endpoint(NodeId::origin(), "Origin", Coordinate::new(37.56, 126.97)),
            node("poi", 37.55, 126.99),
            OptimizeNode::endpoint(NodeId::destination(), "Destination", Coordinate::new(37.50, 127.02)),
        ];
        let matrix = build_haversine(&nodes, TransportMode::Car);

        assert!(matrix.get(&NodeId::place("poi"), &NodeId::origin()).is_none());
        assert!(matrix.get(&NodeId::destination(), &NodeId::place("poi")).is_none());
        assert!(matrix.get(&NodeId::origin(), &NodeId::place("poi")).is_some());
    }

    #[tokio::test]
    async fn provider_matrix_completes_every_required_pair() {
        let nodes = vec![node("a", 37.56, 126.97), node("b", 37.50, 127.02), node("c", 37.55, 126.99)];
        let provider = MockCarProvider;
        let cancel = CancellationToken::new();
        let (matrix, completed) = build_from_provider(&nodes, TransportMode::Car, &provider, &MatrixBuildOptions::default(), &cancel, |_, _| {}).await;

        assert!(completed);
        assert!(matrix.is_complete());
    }

    #[tokio::test]
    async fn a_pre_cancelled_token_cuts_the_build_short() {
        let nodes = vec![node("a", 37.56, 126.97), node("b", 37.50, 127.02), node("c", 37.55, 126.99)];
        let provider = MockCarProvider;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (_, completed) = build_from_provider(&nodes, TransportMode::Car, &provider, &MatrixBuildOptions::default(), &cancel, |_, _| {}).await;

        assert!(!completed);
    }

    #[tokio::test]
    async fn public_mode_applies_the_multiplier_over_the_car_estimate() {
        let nodes = vec![node("a", 37.56, 126.97), node("b", 37.70, 127.20)];
        let provider = MockCarProvider;
        let cancel = CancellationToken::new();

        let (car_matrix, _) = build_from_provider(&nodes, TransportMode::Car, &provider, &MatrixBuildOptions::default(), &cancel, |_, _| {}).await;
        let (public_matrix, _) = build_from_provider(&nodes, TransportMode::Public, &provider, &MatrixBuildOptions::default(), &cancel, |_, _| {}).await;

        let car_duration = car_matrix.duration(&NodeId::place("a"), &NodeId::place("b")).unwrap();
        let public_duration = public_matrix.duration(&NodeId::place("a"), &NodeId::place("b")).unwrap();

        assert!((public_duration / car_duration - PUBLIC_TRANSIT_MULTIPLIER).abs() < 1e-6);
    }
}
