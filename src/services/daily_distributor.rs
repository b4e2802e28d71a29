//! Daily Distributor: pack a globally-ordered route into day
//! buckets honoring per-day time budgets, fixed appointments, and
//! day-specific start/end endpoints.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use crate::services::node_builder::DayEndpoints;
use crate::types::{DistanceMatrix, FixedSchedule, NodeId, OptimizeNode};

#[derive(Debug, Clone)]
pub struct DistributorOptions {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub daily_start_time: NaiveTime,
    pub daily_end_time: NaiveTime,
    pub max_daily_minutes: Option<u32>,
}

impl DistributorOptions {
    fn window_minutes(&self) -> i64 {
        (self.daily_end_time - self.daily_start_time).num_minutes()
    }

    fn day_budget_minutes(&self) -> f64 {
        let window = self.window_minutes() as f64;
        match self.max_daily_minutes {
            Some(max) => window.min(max as f64),
            None => window,
        }
    }

    fn num_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

#[derive(Debug, Clone)]
pub struct DistributionResult {
    pub days: Vec<Vec<NodeId>>,
    pub daily_durations: Vec<f64>,
    pub unassigned_places: Vec<NodeId>,
}

/// Distribute `route` (origin and destination excluded by the caller) into
/// per-day buckets.
pub fn distribute_to_daily(
    route: &[NodeId],
    node_map: &HashMap<NodeId, OptimizeNode>,
    matrix: &DistanceMatrix,
    day_endpoints: &[DayEndpoints],
    fixed_schedules: &[FixedSchedule],
    options: &DistributorOptions,
) -> DistributionResult {
    let num_days = options.num_days() as usize;
    let mut days: Vec<Vec<NodeId>> = vec![Vec::new(); num_days];
    let mut available: Vec<f64> = vec![options.day_budget_minutes(); num_days];
    let mut daily_durations: Vec<f64> = vec![0.0; num_days];
    let mut day_places: Vec<usize> = vec![0; num_days];
    let mut last_place_id: Vec<Option<NodeId>> = vec![None; num_days];
    let mut end_travel_minutes: Vec<f64> = vec![0.0; num_days];
    let mut assigned: std::collections::HashSet<NodeId> = std::collections::HashSet::new();

    // Debit fixed-appointment durations from each day's availability up front.
    for d in 0..num_days {
        let date = options.start_date + chrono::Duration::days(d as i64);
        let fixed_minutes: u32 = fixed_schedules
            .iter()
            .filter(|f| f.date == date)
            .filter_map(|f| node_map.get(&NodeId::place(f.place_id.clone())))
            .map(|n| n.duration_min)
            .sum();
        available[d] -= fixed_minutes as f64;
    }

    // Phase 1: fixed placement.
    for id in route {
        let Some(node) = node_map.get(id) else { continue };
        if !node.is_fixed {
            continue;
        }
        let Some(fixed_date) = node.fixed_date else { continue };
        let Some(d) = day_index(options.start_date, fixed_date) else { continue };
        if d >= num_days {
            continue;
        }
        days[d].push(id.clone());
        daily_durations[d] += node.duration_min as f64;
        day_places[d] += 1;
        assigned.insert(id.clone());
    }

    // Phase 2: greedy packing of non-fixed nodes, in route order.
    let non_fixed: Vec<NodeId> = route
        .iter()
        .filter(|id| node_map.get(*id).map(|n| !n.is_fixed).unwrap_or(false))
        .cloned()
        .collect();

    let target_per_day = if num_days > 0 { (non_fixed.len() as f64 / num_days as f64).ceil() as usize } else { 0 };
    let last_day = num_days.saturating_sub(1);
    let mut current_day = 0usize;
    let mut unassigned_places = Vec::new();

    for id in &non_fixed {
        let Some(node) = node_map.get(id) else { continue };

        let mut d = current_day;

        let travel_from_prev = |d: usize, last: &Option<NodeId>| -> f64 {
            match last {
                Some(prev) => matrix.duration(prev, id).unwrap_or(0.0),
                None => day_endpoints
                    .get(d)
                    .and_then(|e| e.start_id.as_ref())
                    .and_then(|start| matrix.duration(start, id))
                    .unwrap_or(0.0),
            }
        };
        let new_end_travel = |d: usize| -> f64 {
            day_endpoints.get(d).and_then(|e| e.end_id.as_ref()).and_then(|end| matrix.duration(id, end)).unwrap_or(0.0)
        };

        let delta_for = |d: usize| -> f64 {
            node.duration_min as f64 + travel_from_prev(d, &last_place_id[d]) + new_end_travel(d) - end_travel_minutes[d]
        };

        let mut delta = delta_for(d);

        if day_places[d] >= target_per_day && d < last_day {
            d += 1;
            delta = delta_for(d);
        }
        if available[d] < delta && d < last_day {
            d += 1;
            delta = delta_for(d);
        }

        let mut placed = false;
        while d < num_days {
            delta = delta_for(d);
            if available[d] >= delta {
                days[d].push(id.clone());
                daily_durations[d] += delta;
                available[d] -= delta;
                last_place_id[d] = Some(id.clone());
                end_travel_minutes[d] = new_end_travel(d);
                day_places[d] += 1;
                current_day = d;
                assigned.insert(id.clone());
                placed = true;
                break;
            }
            d += 1;
        }

        if !placed {
            unassigned_places.push(id.clone());
        }
    }

    // Phase 3: intra-day fixed-time ordering.
    for day in days.iter_mut() {
        *day = rethread_day(day, node_map);
    }

    debug!(
        assigned = assigned.len(),
        unassigned = unassigned_places.len(),
        days = num_days,
        "distributed route into daily buckets"
    );

    DistributionResult { days, daily_durations, unassigned_places }
}

fn day_index(start_date: NaiveDate, date: NaiveDate) -> Option<usize> {
    let delta = (date - start_date).num_days();
    if delta < 0 {
        None
    } else {
        Some(delta as usize)
    }
}

/// Re-thread a day's assigned nodes: fixed-time nodes stay in ascending
/// `fixed_start_time` order; non-fixed nodes are interleaved one per gap
/// between consecutive fixed nodes, in their existing (greedy-assignment)
/// order, with any remainder appended at the end.
fn rethread_day(day: &[NodeId], node_map: &HashMap<NodeId, OptimizeNode>) -> Vec<NodeId> {
    let mut fixed: Vec<NodeId> = day.iter().filter(|id| node_map.get(*id).and_then(|n| n.fixed_start_time).is_some()).cloned().collect();
    fixed.sort_by_key(|id| node_map.get(id).and_then(|n| n.fixed_start_time).unwrap());

    let non_fixed: Vec<NodeId> = day.iter().filter(|id| node_map.get(*id).and_then(|n| n.fixed_start_time).is_none()).cloned().collect();

    if fixed.is_empty() {
        return non_fixed;
    }

    let mut result = Vec::with_capacity(day.len());
    let mut non_fixed = non_fixed.into_iter();

    for f in &fixed {
        if let Some(item) = non_fixed.next() {
            result.push(item);
        }
        result.push(f.clone());
    }
    result.extend(non_fixed);
    result
}
