//! Pedestrian routing provider: Valhalla `/route` with `costing=pedestrian`,
//! used by the transit enricher for short-leg polylines.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::services::geo;
use crate::types::{Coordinate, TransportMode};

use super::car::{decode_polyline, encode_polyline};
use super::RouteResult;

#[async_trait]
pub trait WalkingRoutingProvider: Send + Sync {
    async fn get_walking_route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteResult>;

    fn name(&self) -> &str;
}

pub struct ValhallaWalkingProvider {
    client: Client,
    base_url: String,
}

impl ValhallaWalkingProvider {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .expect("failed to build HTTP client");
        Self { client, base_url: base_url.into() }
    }
}

#[async_trait]
impl WalkingRoutingProvider for ValhallaWalkingProvider {
    async fn get_walking_route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteResult> {
        let request = RouteRequest {
            locations: vec![
                ValhallaLocation { lat: origin.lat, lon: origin.lng },
                ValhallaLocation { lat: destination.lat, lon: destination.lng },
            ],
            costing: "pedestrian".to_string(),
            directions_type: "none".to_string(),
        };

        let url = format!("{}/route", self.base_url);
        debug!("requesting walking route from Valhalla");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("failed to send pedestrian route request to Valhalla")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Valhalla pedestrian route returned error {}: {}", status, body);
        }

        let parsed: RouteResponse = response.json().await.context("failed to parse Valhalla route response")?;

        let mut total_distance_km = 0.0;
        let mut total_duration_min = 0.0;
        let mut coords: Vec<[f64; 2]> = Vec::new();
        for (i, leg) in parsed.trip.legs.iter().enumerate() {
            total_distance_km += leg.summary.length;
            total_duration_min += leg.summary.time / 60.0;
            let leg_coords = decode_polyline(&leg.shape, 6)?;
            if i == 0 {
                coords.extend(leg_coords);
            } else if !leg_coords.is_empty() {
                coords.extend(leg_coords.into_iter().skip(1));
            }
        }

        Ok(RouteResult {
            total_distance_m: total_distance_km * 1000.0,
            total_duration_min,
            polyline: Some(encode_polyline(&coords, 6)),
        })
    }

    fn name(&self) -> &str {
        "valhalla-walking"
    }
}

/// Haversine-backed fallback at walking speed (.7's "Haversine
/// stub at walking speed" on provider failure).
#[derive(Default)]
pub struct MockWalkingProvider;

#[async_trait]
impl WalkingRoutingProvider for MockWalkingProvider {
    async fn get_walking_route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteResult> {
        let distance_m = geo::road_distance_m(&origin, &destination, TransportMode::Walking);
        let duration_min = geo::estimate_duration_min(distance_m, TransportMode::Walking);
        Ok(RouteResult {
            total_distance_m: distance_m,
            total_duration_min: duration_min,
            polyline: Some(encode_polyline(&super::straight_line_coords(&origin, &destination), 6)),
        })
    }

    fn name(&self) -> &str {
        "mock-walking"
    }
}

#[derive(Debug, Serialize)]
struct ValhallaLocation {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Serialize)]
struct RouteRequest {
    locations: Vec<ValhallaLocation>,
    costing: String,
    directions_type: String,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    trip: Trip,
}

#[derive(Debug, Deserialize)]
struct Trip {
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    shape: String,
    summary: Summary,
}

#[derive(Debug, Deserialize)]
struct Summary {
    length: f64,
    time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_walking_provider_is_slower_than_car_for_same_leg() {
        let origin = Coordinate::new(37.5665, 126.978);
        let destination = Coordinate::new(37.57, 126.985);

        let walk = MockWalkingProvider.get_walking_route(origin, destination).await.unwrap();
        let car_distance = geo::road_distance_m(&origin, &destination, TransportMode::Car);
        let car_duration = geo::estimate_duration_min(car_distance, TransportMode::Car);

        assert!(walk.total_duration_min > car_duration);
    }
}
