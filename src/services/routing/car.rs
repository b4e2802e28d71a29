//! Car routing provider: Valhalla `/route` for a single origin→destination
//! pair, narrowed from a full sources-to-targets matrix call to one
//! point-to-point request per pair — the pipeline does its own batching
//! (`services::distance_matrix`) across many such calls.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::services::geo;
use crate::types::{Coordinate, TransportMode};

use super::RouteResult;

#[async_trait]
pub trait CarRoutingProvider: Send + Sync {
    async fn get_car_route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteResult>;

    fn name(&self) -> &str;
}

pub struct ValhallaCarProvider {
    client: Client,
    base_url: String,
}

impl ValhallaCarProvider {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .expect("failed to build HTTP client");
        Self { client, base_url: base_url.into() }
    }
}

#[async_trait]
impl CarRoutingProvider for ValhallaCarProvider {
    async fn get_car_route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteResult> {
        let request = RouteRequest {
            locations: vec![
                ValhallaLocation { lat: origin.lat, lon: origin.lng, radius: Some(500) },
                ValhallaLocation { lat: destination.lat, lon: destination.lng, radius: Some(500) },
            ],
            costing: "auto".to_string(),
            directions_type: "none".to_string(),
        };

        let url = format!("{}/route", self.base_url);
        debug!("requesting car route from Valhalla");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("failed to send route request to Valhalla")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Valhalla route returned error {}: {}", status, body);
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
        "valhalla-car"
    }
}

/// Haversine-backed fallback: used when no Valhalla car URL is configured,
/// and by `services::retry` once attempts against a real provider exhaust.
#[derive(Default)]
pub struct MockCarProvider;

#[async_trait]
impl CarRoutingProvider for MockCarProvider {
    async fn get_car_route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteResult> {
        let distance_m = geo::road_distance_m(&origin, &destination, TransportMode::Car);
        let duration_min = geo::estimate_duration_min(distance_m, TransportMode::Car);
        Ok(RouteResult {
            total_distance_m: distance_m,
            total_duration_min: duration_min,
            polyline: Some(encode_polyline(&super::straight_line_coords(&origin, &destination), 6)),
        })
    }

    fn name(&self) -> &str {
        "mock-car"
    }
}

#[derive(Debug, Serialize, Clone)]
struct ValhallaLocation {
    lat: f64,
    lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    radius: Option<u32>,
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
    /// Kilometers (units=kilometers is implicit for a /route call).
    length: f64,
    /// Seconds.
    time: f64,
}

/// Decode Valhalla's encoded polyline format (6-decimal precision, vs. 5 for
/// Google's).
pub(crate) fn decode_polyline(encoded: &str, precision: u32) -> Result<Vec<[f64; 2]>> {
    let factor = 10_f64.powi(precision as i32);
    let mut coordinates = Vec::new();
    let mut lat = 0i64;
    let mut lng = 0i64;

    let bytes = encoded.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let mut shift = 0;
        let mut result = 0i64;
        loop {
            if i >= bytes.len() {
                anyhow::bail!("invalid polyline encoding");
            }
            let byte = bytes[i] as i64 - 63;
            i += 1;
            result |= (byte & 0x1f) << shift;
            shift += 5;
            if byte < 0x20 {
                break;
            }
        }
        let dlat = if result & 1 != 0 { !(result >> 1) } else { result >> 1 };
        lat += dlat;

        shift = 0;
        result = 0;
        loop {
            if i >= bytes.len() {
                anyhow::bail!("invalid polyline encoding");
            }
            let byte = bytes[i] as i64 - 63;
            i += 1;
            result |= (byte & 0x1f) << shift;
            shift += 5;
            if byte < 0x20 {
                break;
            }
        }
        let dlng = if result & 1 != 0 { !(result >> 1) } else { result >> 1 };
        lng += dlng;

        coordinates.push([lng as f64 / factor, lat as f64 / factor]);
    }

    Ok(coordinates)
}

/// Encode a coordinate sequence with Valhalla's 6-decimal polyline
/// algorithm, used only by the mock providers to hand back a
/// self-consistent straight-line polyline.
pub(crate) fn encode_polyline(coords: &[[f64; 2]], precision: u32) -> String {
    let factor = 10_f64.powi(precision as i32);
    let mut output = String::new();
    let mut prev_lat = 0i64;
    let mut prev_lng = 0i64;

    for [lng, lat] in coords {
        let lat_i = (lat * factor).round() as i64;
        let lng_i = (lng * factor).round() as i64;
        encode_value(lat_i - prev_lat, &mut output);
        encode_value(lng_i - prev_lng, &mut output);
        prev_lat = lat_i;
        prev_lng = lng_i;
    }

    output
}

fn encode_value(value: i64, output: &mut String) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    loop {
        let mut chunk = (v & 0x1f) as u8;
        v >>= 5;
        if v != 0 {
            chunk |= 0x20;
        }
        output.push((chunk + 63) as char);
        if v == 0 {
            break;
        }
    }
}
