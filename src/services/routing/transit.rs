//! Public-transit routing provider (`get_best_transit_route_with_details`).
//! The response shape (`total_fare`, `transfer_count`, per-leg `traffic_type`,
//! lane metadata) mirrors a Korean ODsay-style transit API, which is what the
//! `TransitDetails`/`SubPath` types are themselves modeled on.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::services::geo;
use crate::types::{Coordinate, LaneCoord, SubPath, TrafficType, TransitDetails, TransportMode};

use super::car::encode_polyline;

/// A transit route, richer than `RouteResult`: it always carries the
/// sub-path detail the enricher attaches to the final segment.
#[derive(Debug, Clone)]
pub struct TransitRouteResult {
    pub total_distance_m: f64,
    pub total_duration_min: f64,
    pub polyline: Option<String>,
    pub details: TransitDetails,
}

#[async_trait]
pub trait TransitRoutingProvider: Send + Sync {
    async fn get_best_transit_route(&self, origin: Coordinate, destination: Coordinate) -> Result<TransitRouteResult>;

    fn name(&self) -> &str;
}

pub struct OdsayTransitProvider {
    client: Client,
    base_url: String,
}

impl OdsayTransitProvider {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .expect("failed to build HTTP client");
        Self { client, base_url: base_url.into() }
    }
}

#[async_trait]
impl TransitRoutingProvider for OdsayTransitProvider {
    async fn get_best_transit_route(&self, origin: Coordinate, destination: Coordinate) -> Result<TransitRouteResult> {
        let url = format!(
            "{}/searchPubTransPathT?SX={}&SY={}&EX={}&EY={}",
            self.base_url, origin.lng, origin.lat, destination.lng, destination.lat
        );

        debug!("requesting transit route");

        let response = self.client.get(&url).send().await.context("failed to send transit route request")?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("transit provider returned error {}", status);
        }

        let parsed: OdsayResponse = response.json().await.context("failed to parse transit response")?;

        let best = parsed
            .result
            .path
            .into_iter()
            .min_by(|a, b| a.info.total_time.cmp(&b.info.total_time))
            .context("transit provider returned no paths")?;

        let sub_paths: Vec<SubPath> = best
            .sub_path
            .into_iter()
            .map(|sp| SubPath {
                traffic_type: TrafficType::from(sp.traffic_type),
                distance: sp.distance.unwrap_or(0.0),
                section_time: sp.section_time,
                station_count: sp.station_count.unwrap_or(0),
                start_name: sp.start_name.unwrap_or_default(),
                end_name: sp.end_name.unwrap_or_default(),
                polyline: None,
                lane: None,
                start_coord: sp.start_x.zip(sp.start_y).map(|(x, y)| LaneCoord { lat: y, lng: x }),
                end_coord: sp.end_x.zip(sp.end_y).map(|(x, y)| LaneCoord { lat: y, lng: x }),
                pass_stop_coords: None,
            })
            .collect();

        // ODsay reports total walking time within the transit route, not
        // distance; approximate distance at the fixed walking speed.
        const WALKING_M_PER_MIN: f64 = 66.7;
        let details = TransitDetails {
            total_fare: best.info.payment,
            transfer_count: best.info.busTransitCount + best.info.subwayTransitCount,
            walking_time: best.info.totalWalk,
            walking_distance: best.info.totalWalk as f64 * WALKING_M_PER_MIN,
            sub_paths,
        };

        Ok(TransitRouteResult {
            total_distance_m: best.info.total_distance as f64,
            total_duration_min: best.info.total_time as f64,
            polyline: None,
            details,
        })
    }

    fn name(&self) -> &str {
        "odsay-transit"
    }
}

/// Haversine-backed fallback: a single `Walking` sub-path at public-transit
/// speed, used when no transit URL is configured.
#[derive(Default)]
pub struct MockTransitProvider;

#[async_trait]
impl TransitRoutingProvider for MockTransitProvider {
    async fn get_best_transit_route(&self, origin: Coordinate, destination: Coordinate) -> Result<TransitRouteResult> {
        let distance_m = geo::road_distance_m(&origin, &destination, TransportMode::Public);
        let duration_min = geo::estimate_duration_min(distance_m, TransportMode::Public);

        let details = TransitDetails {
            total_fare: 1_250,
            transfer_count: 0,
            walking_time: 5,
            walking_distance: 300.0,
            sub_paths: vec![SubPath {
                traffic_type: TrafficType::Bus,
                distance: distance_m,
                section_time: duration_min.round() as u32,
                station_count: 0,
                start_name: "origin".to_string(),
                end_name: "destination".to_string(),
                polyline: None,
                lane: None,
                start_coord: Some(LaneCoord { lat: origin.lat, lng: origin.lng }),
                end_coord: Some(LaneCoord { lat: destination.lat, lng: destination.lng }),
                pass_stop_coords: None,
            }],
        };

        Ok(TransitRouteResult {
            total_distance_m: distance_m,
            total_duration_min: duration_min,
            polyline: Some(encode_polyline(&super::straight_line_coords(&origin, &destination), 6)),
            details,
        })
    }

    fn name(&self) -> &str {
        "mock-transit"
    }
}

// ODsay wire types — field names follow the upstream API's casing exactly,
// since that's how the JSON arrives.
#[derive(Debug, Deserialize)]
struct OdsayResponse {
    result: OdsayResult,
}

#[derive(Debug, Deserialize)]
struct OdsayResult {
    path: Vec<OdsayPath>,
}

#[derive(Debug, Deserialize)]
struct OdsayPath {
    info: OdsayInfo,
    #[serde(rename = "subPath")]
    sub_path: Vec<OdsaySubPath>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct OdsayInfo {
    #[serde(rename = "totalTime")]
    total_time: u32,
    #[serde(rename = "totalDistance")]
    total_distance: u32,
    payment: u32,
    busTransitCount: u32,
    subwayTransitCount: u32,
    totalWalk: u32,
}

#[derive(Debug, Deserialize)]
struct OdsaySubPath {
    #[serde(rename = "trafficType")]
    traffic_type: u8,
    distance: Option<f64>,
    #[serde(rename = "sectionTime")]
    section_time: u32,
    #[serde(rename = "stationCount")]
    station_count: Option<u32>,
    #[serde(rename = "startName")]
    start_name: Option<String>,
    #[serde(rename = "endName")]
    end_name: Option<String>,
    #[serde(rename = "startX")]
    start_x: Option<f64>,
    #[serde(rename = "startY")]
    start_y: Option<f64>,
    #[serde(rename = "endX")]
    end_x: Option<f64>,
    #[serde(rename = "endY")]
    end_y: Option<f64>,
}
