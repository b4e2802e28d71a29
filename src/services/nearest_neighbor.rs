//! Nearest-Neighbor initial route construction.

use tracing::debug;

use crate::types::{DistanceMatrix, NodeId};

/// Weights for the edge cost function `cost = time_weight * duration_min +
/// distance_weight * distance_m`.
#[derive(Debug, Clone, Copy)]
pub struct CostWeights {
    pub time_weight: f64,
    pub distance_weight: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self { time_weight: 1.0, distance_weight: 0.1 }
    }
}

impl CostWeights {
    pub fn cost(&self, matrix: &DistanceMatrix, from: &NodeId, to: &NodeId) -> Option<f64> {
        let cell = matrix.get(from, to)?;
        Some(self.time_weight * cell.duration_min + self.distance_weight * cell.distance_m)
    }
}

/// Result of nearest-neighbor construction.
#[derive(Debug, Clone)]
pub struct NnResult {
    pub route: Vec<NodeId>,
    pub total_distance_m: f64,
    pub total_duration_min: f64,
    pub total_cost: f64,
}

/// Greedily construct an ordered route starting at `origin_id` and ending at
/// `destination_id`, visiting every node in `nodes` exactly once.
///
/// Nodes unreachable from the current position are skipped; if no further
/// node is reachable, construction stops early and the remaining nodes are
/// simply absent from `route` (the daily distributor reports them as
/// unassigned).
pub fn nn_with_endpoints(
    nodes: &[NodeId],
    matrix: &DistanceMatrix,
    weights: &CostWeights,
    origin_id: &NodeId,
    destination_id: &NodeId,
) -> NnResult {
    let mut middle: Vec<NodeId> =
        nodes.iter().filter(|id| *id != origin_id && *id != destination_id).cloned().collect();

    let mut route = vec![origin_id.clone()];
    let mut current = origin_id.clone();
    let mut total_distance_m = 0.0;
    let mut total_duration_min = 0.0;
    let mut total_cost = 0.0;

    while !middle.is_empty() {
        let best = middle
            .iter()
            .enumerate()
            .filter_map(|(idx, id)| weights.cost(matrix, &current, id).map(|cost| (idx, cost)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

        let Some((idx, cost)) = best else {
            debug!(remaining = middle.len(), "no reachable node from current position, stopping early");
            break;
        };

        let next = middle.remove(idx);
        if let Some(cell) = matrix.get(&current, &next) {
            total_distance_m += cell.distance_m;
            total_duration_min += cell.duration_min;
        }
        total_cost += cost;
        route.push(next.clone());
        current = next;
    }

    if let Some(cost) = weights.cost(matrix, &current, destination_id) {
        total_cost += cost;
        if let Some(cell) = matrix.get(&current, destination_id) {
            total_distance_m += cell.distance_m;
            total_duration_min += cell.duration_min;
        }
    }
    route.push(destination_id.clone());

    NnResult { route, total_distance_m, total_duration_min, total_cost }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::distance_matrix::build_haversine;
    use crate::types::{Coordinate, OptimizeNode, TransportMode};

    fn node(id: &str, lat: f64, lng: f64) -> OptimizeNode {
        OptimizeNode::endpoint(NodeId::place(id), id, Coordinate::new(lat, lng))
    }

    #[test]
    fn route_starts_at_origin_and_ends_at_destination() {
        let nodes = vec![
            OptimizeNode::endpoint(NodeId::origin(), "Origin", Coordinate::new(37.5665, 126.978)),
            node("a", 37.57, 126.98),
            node("b", 37.58, 126.99),
            OptimizeNode::endpoint(NodeId::destination(), "Destination", Coordinate::new(37.4979, 127.0276)),
        ];
        let matrix = build_haversine(&nodes, TransportMode::Car);
        let ids: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();

        let result = nn_with_endpoints(&ids, &matrix, &CostWeights::default(), &NodeId::origin(), &NodeId::destination());

        assert_eq!(result.route.first(), Some(&NodeId::origin()));
        assert_eq!(result.route.last(), Some(&NodeId::destination()));
        assert_eq!(result.route.len(), nodes.len());
    }

    #[test]
    fn no_middle_nodes_yields_direct_route() {
        let nodes = vec![
            OptimizeNode::endpoint(NodeId::origin(), "Origin", Coordinate::new(37.5665, 126.978)),
            OptimizeNode::endpoint(NodeId::destination(), "Destination", Coordinate::new(37.4979, 127.0276)),
        ];
        let matrix = build_haversine(&nodes, TransportMode::Car);
        let ids: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();

        let result = nn_with_endpoints(&ids, &matrix, &CostWeights::default(), &NodeId::origin(), &NodeId::destination());

        assert_eq!(result.route, vec![NodeId::origin(), NodeId::destination()]);
    }

    #[test]
    fn picks_the_cheaper_of_two_candidate_nodes_first() {
        let origin = OptimizeNode::endpoint(NodeId::origin(), "Origin", Coordinate::new(0.0, 0.0));
        let near = node("near", 0.01, 0.0);
        let far = node("far", 1.0, 0.0);
        let destination = OptimizeNode::endpoint(NodeId::destination(), "Destination", Coordinate::new(2.0, 0.0));

        let nodes = vec![origin, far.clone(), near.clone(), destination];
        let matrix = build_haversine(&nodes, TransportMode::Car);
        let ids: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();

        let result = nn_with_endpoints(&ids, &matrix, &CostWeights::default(), &NodeId::origin(), &NodeId::destination());

        assert_eq!(result.route[1], near.id);
        assert_eq!(result.route[2], far.id);
    }
}
