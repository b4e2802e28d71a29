//! Haversine-fast distance/duration estimation — the no-network fallback
//! used by `services::distance_matrix::build_haversine` and by any provider
//! call that fails.

use crate::types::{Coordinate, TransportMode};

/// Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Straight-line-to-road distance coefficient, applied to car/public legs.
/// An empirical constant — not a physical one.
pub const ROAD_COEFFICIENT: f64 = 1.3;

const WALKING_SPEED_KMH: f64 = 4.0;
const CAR_SPEED_KMH: f64 = 40.0;
const PUBLIC_SPEED_KMH: f64 = 25.0;

/// Great-circle distance between two coordinates, in meters.
pub fn haversine_distance_m(from: &Coordinate, to: &Coordinate) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Estimate road distance in meters for a non-walking leg: straight-line
/// distance scaled by `ROAD_COEFFICIENT`. Walking legs use the straight-line
/// distance directly (pedestrians aren't constrained to the road network the
/// same way).
pub fn road_distance_m(from: &Coordinate, to: &Coordinate, mode: TransportMode) -> f64 {
    let straight = haversine_distance_m(from, to);
    match mode {
        TransportMode::Walking => straight,
        TransportMode::Car | TransportMode::Public => straight * ROAD_COEFFICIENT,
    }
}

fn speed_kmh(mode: TransportMode) -> f64 {
    match mode {
        TransportMode::Walking => WALKING_SPEED_KMH,
        TransportMode::Car => CAR_SPEED_KMH,
        TransportMode::Public => PUBLIC_SPEED_KMH,
    }
}

/// Estimate travel duration in minutes for a leg of the given mode.
pub fn estimate_duration_min(distance_m: f64, mode: TransportMode) -> f64 {
    let distance_km = distance_m / 1000.0;
    (distance_km / speed_kmh(mode)) * 60.0
}

/// Resolve the mode and compute both distance and duration in one call,
/// downgrading short legs to walking.
pub fn estimate_leg(from: &Coordinate, to: &Coordinate, requested_mode: TransportMode) -> (f64, f64, TransportMode) {
    let straight = haversine_distance_m(from, to);
    let mode = TransportMode::effective_for_distance(requested_mode, straight);
    let distance = road_distance_m(from, to, mode);
    let duration = estimate_duration_min(distance, mode);
    (distance, duration, mode)
}
