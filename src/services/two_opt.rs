//! 2-opt Improver: edge-swap local search with fixed
//! endpoints and incremental delta costing.

use rand::Rng;
use tracing::debug;

use crate::services::nearest_neighbor::CostWeights;
use crate::types::{DistanceMatrix, NodeId};

/// Tuning for a single 2-opt run. Named presets mirror `SolverConfig`'s
/// `::fast()`/`::quality()` pattern: fewer iterations for interactive use,
/// more for a background batch job.
#[derive(Debug, Clone, Copy)]
pub struct TwoOptConfig {
    pub max_iterations: u32,
    pub no_improvement_limit: u32,
    pub min_improvement_threshold: f64,
}

impl Default for TwoOptConfig {
    fn default() -> Self {
        Self { max_iterations: 100, no_improvement_limit: 20, min_improvement_threshold: 0.001 }
    }
}

impl TwoOptConfig {
    pub fn fast() -> Self {
        Self { max_iterations: 25, no_improvement_limit: 5, min_improvement_threshold: 0.005 }
    }

    pub fn thorough() -> Self {
        Self { max_iterations: 300, no_improvement_limit: 50, min_improvement_threshold: 0.0005 }
    }
}

#[derive(Debug, Clone)]
pub struct TwoOptResult {
    pub route: Vec<NodeId>,
    pub initial_cost: f64,
    pub final_cost: f64,
    pub improvement_pct: f64,
    pub iterations: u32,
}

fn route_cost(route: &[NodeId], matrix: &DistanceMatrix, weights: &CostWeights) -> f64 {
    route.windows(2).filter_map(|pair| weights.cost(matrix, &pair[0], &pair[1])).sum()
}

fn edge_cost(matrix: &DistanceMatrix, weights: &CostWeights, a: &NodeId, b: &NodeId) -> f64 {
    weights.cost(matrix, a, b).unwrap_or(f64::INFINITY)
}

/// Improve `route` in place via 2-opt edge swaps. The first and last nodes
/// (origin/destination) are never moved.
pub fn two_opt_with_endpoints(
    route: &[NodeId],
    matrix: &DistanceMatrix,
    weights: &CostWeights,
    config: &TwoOptConfig,
) -> TwoOptResult {
    let mut route = route.to_vec();
    let initial_cost = route_cost(&route, matrix, weights);
    let mut current_cost = initial_cost;
    let mut no_improvement = 0u32;
    let mut iterations = 0u32;

    let end_idx = route.len().saturating_sub(1);

    'outer: for _ in 0..config.max_iterations {
        iterations += 1;
        let mut best: Option<(usize, usize, f64)> = None;

        for i in 0..end_idx {
            for j in (i + 2)..end_idx {
                let old = edge_cost(matrix, weights, &route[i], &route[i + 1]) + edge_cost(matrix, weights, &route[j], &route[j + 1]);
                let new = edge_cost(matrix, weights, &route[i], &route[j]) + edge_cost(matrix, weights, &route[i + 1], &route[j + 1]);
                let improvement = old - new;

                if improvement > 0.0 {
                    match best {
                        Some((_, _, best_improvement)) if best_improvement >= improvement => {}
                        _ => best = Some((i, j, improvement)),
                    }
                }
            }
        }

        match best {
            Some((i, j, improvement)) if improvement > config.min_improvement_threshold * current_cost => {
                route[i + 1..=j].reverse();
                current_cost -= improvement;
                no_improvement = 0;
            }
            _ => {
                no_improvement += 1;
                if no_improvement >= config.no_improvement_limit {
                    break 'outer;
                }
            }
        }
    }

    let final_cost = current_cost;
    let improvement_pct = if initial_cost > 0.0 { (initial_cost - final_cost) / initial_cost * 100.0 } else { 0.0 };

    debug!(initial_cost, final_cost, improvement_pct, iterations, "2-opt complete");

    TwoOptResult { route, initial_cost, final_cost, improvement_pct, iterations }
}

/// Run `two_opt_with_endpoints` `runs` times, perturbing the route with one
/// random middle-swap before each run after the first, and keep the best
/// result across all runs.
pub fn iterated_two_opt(
    route: &[NodeId],
    matrix: &DistanceMatrix,
    weights: &CostWeights,
    config: &TwoOptConfig,
    runs: u32,
) -> TwoOptResult {
    let mut best = two_opt_with_endpoints(route, matrix, weights, config);

    for _ in 1..runs {
        let perturbed = perturb(&best.route);
        let attempt = two_opt_with_endpoints(&perturbed, matrix, weights, config);
        if attempt.final_cost < best.final_cost {
            best = attempt;
        }
    }

    best
}

fn perturb(route: &[NodeId]) -> Vec<NodeId> {
    if route.len() <= 3 {
        return route.to_vec();
    }
    let mut perturbed = route.to_vec();
    let mut rng = rand::thread_rng();
    let a = rng.gen_range(1..route.len() - 1);
    let b = rng.gen_range(1..route.len() - 1);
    perturbed.swap(a, b);
    perturbed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::distance_matrix::build_haversine;
    use crate::types::{Coordinate, OptimizeNode, TransportMode};

    fn quadrilateral() -> (Vec<NodeId>, DistanceMatrix) {
        // A crossing order: origin, far-corner, near-corner, opposite, destination.
        let nodes = vec![
            OptimizeNode::endpoint(NodeId::origin(), "Origin", Coordinate::new(0.0, 0.0)),
            OptimizeNode::endpoint(NodeId::place("a"), "a", Coordinate::new(1.0, 1.0)),
            OptimizeNode::endpoint(NodeId::place("b"), "b", Coordinate::new(0.0, 1.0)),
            OptimizeNode::endpoint(NodeId::place("c"), "c", Coordinate::new(1.0, 0.0)),
            OptimizeNode::endpoint(NodeId::destination(), "Destination", Coordinate::new(2.0, 2.0)),
        ];
        let matrix = build_haversine(&nodes, TransportMode::Car);
        let ids: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
        (ids, matrix)
    }

    #[test]
    fn final_cost_never_exceeds_initial_cost() {
        let (ids, matrix) = quadrilateral();
        let route = vec![ids[0].clone(), ids[1].clone(), ids[2].clone(), ids[3].clone(), ids[4].clone()];
        let result = two_opt_with_endpoints(&route, &matrix, &CostWeights::default(), &TwoOptConfig::default());
        assert!(result.final_cost <= result.initial_cost + 1e-9);
    }

    #[test]
    fn endpoints_never_move() {
        let (ids, matrix) = quadrilateral();
        let route = vec![ids[0].clone(), ids[1].clone(), ids[2].clone(), ids[3].clone(), ids[4].clone()];
        let result = two_opt_with_endpoints(&route, &matrix, &CostWeights::default(), &TwoOptConfig::default());
        assert_eq!(result.route.first(), Some(&NodeId::origin()));
        assert_eq!(result.route.last(), Some(&NodeId::destination()));
    }

    #[test]
    fn improvement_pct_matches_its_definition() {
        let (ids, matrix) = quadrilateral();
        let route = vec![ids[0].clone(), ids[1].clone(), ids[2].clone(), ids[3].clone(), ids[4].clone()];
        let result = two_opt_with_endpoints(&route, &matrix, &CostWeights::default(), &TwoOptConfig::default());
        let expected = (result.initial_cost - result.final_cost) / result.initial_cost * 100.0;
        assert!((result.improvement_pct - expected).abs() < 1e-9);
    }

    #[test]
    fn two_consecutive_nodes_are_a_no_op() {
        let nodes = vec![
            OptimizeNode::endpoint(NodeId::origin(), "Origin", Coordinate::new(0.0, 0.0)),
            OptimizeNode::endpoint(NodeId::destination(), "Destination", Coordinate::new(1.0, 1.0)),
        ];
        let matrix = build_haversine(&nodes, TransportMode::Car);
        let route = vec![NodeId::origin(), NodeId::destination()];
        let result = two_opt_with_endpoints(&route, &matrix, &CostWeights::default(), &TwoOptConfig::default());
        assert_eq!(result.route, route);
    }
}
