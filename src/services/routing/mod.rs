//! Routing provider abstractions.
//!
//! Each provider is a thin point-to-point interface over an external
//! routing engine; the pipeline calls them per-pair, not as a bulk matrix,
//! so callers can batch and retry at the pipeline level (`services::retry`,
//! `services::distance_matrix`). A Valhalla-backed implementation is used in
//! production, mocks (Haversine-backed) stand in for tests and for when no
//! provider URL is configured.

pub mod car;
pub mod transit;
pub mod walking;

pub use car::{CarRoutingProvider, MockCarProvider, ValhallaCarProvider};
pub use transit::{MockTransitProvider, OdsayTransitProvider, TransitRoutingProvider};
pub use walking::{MockWalkingProvider, ValhallaWalkingProvider, WalkingRoutingProvider};

use crate::types::Coordinate;

/// Result of a point-to-point car or walking route request.
#[derive(Debug, Clone)]
pub struct RouteResult {
    pub total_distance_m: f64,
    pub total_duration_min: f64,
    pub polyline: Option<String>,
}

/// Build the three routing providers from configuration, falling back to
/// Haversine-backed mocks for whichever provider has no URL configured —
/// mirroring `create_routing_service_with_fallback`'s "mock when
/// unavailable" behavior, applied per-provider instead of globally.
pub fn providers_from_config(
    car_url: Option<&str>,
    transit_url: Option<&str>,
    walking_url: Option<&str>,
    timeout_ms: u64,
) -> (Box<dyn CarRoutingProvider>, Box<dyn TransitRoutingProvider>, Box<dyn WalkingRoutingProvider>) {
    let car: Box<dyn CarRoutingProvider> = match car_url {
        Some(url) => Box::new(ValhallaCarProvider::new(url, timeout_ms)),
        None => Box::new(MockCarProvider::default()),
    };
    let transit: Box<dyn TransitRoutingProvider> = match transit_url {
        Some(url) => Box::new(OdsayTransitProvider::new(url, timeout_ms)),
        None => Box::new(MockTransitProvider::default()),
    };
    let walking: Box<dyn WalkingRoutingProvider> = match walking_url {
        Some(url) => Box::new(ValhallaWalkingProvider::new(url, timeout_ms)),
        None => Box::new(MockWalkingProvider::default()),
    };
    (car, transit, walking)
}

pub(crate) fn straight_line_coords(from: &Coordinate, to: &Coordinate) -> Vec<[f64; 2]> {
    vec![[from.lng, from.lat], [to.lng, to.lat]]
}
