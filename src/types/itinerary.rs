//! Day-by-day itinerary output types and the validator/enricher error
//! vocabulary.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::segment::Segment;

/// What kind of anchor a day's start/end point is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    Origin,
    Destination,
    Accommodation,
    Waypoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayEndpoint {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "type")]
    pub kind: EndpointKind,
}

/// One place visited on a given day, in visit order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub place_id: String,
    pub place_name: String,
    pub order: u32,
    pub arrival_time: NaiveTime,
    pub departure_time: NaiveTime,
    pub duration_min: u32,
    pub is_fixed: bool,
    pub transport_to_next: Option<Segment>,
}

/// The full plan for a single day of the trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyItinerary {
    pub day_number: u32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub place_count: u32,
    pub total_duration_min: f64,
    pub total_distance_m: f64,
    pub total_stay_duration_min: u32,
    pub schedule: Vec<ScheduleItem>,
    pub day_origin: Option<DayEndpoint>,
    pub day_destination: Option<DayEndpoint>,
    pub transport_from_origin: Option<Segment>,
    pub transport_to_destination: Option<Segment>,
}

/// The closed set of error codes a validator or the top-level pipeline may
/// report. A plain enum rather than a string code keeps
/// the set closed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    EmptyDay,
    InvalidDuration,
    OutOfHours,
    InvalidTime,
    ScheduleConflict,
    ExceedsDailyLimit,
    OutOfRange,
    MissingPlace,
    DuplicatePlace,
}

/// A single validator or pipeline-level error, with optional locating detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: ErrorCode,
    pub message: String,
    pub day_number: Option<u32>,
    pub place_id: Option<String>,
}

impl ErrorObject {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), day_number: None, place_id: None }
    }

    pub fn with_day(mut self, day_number: u32) -> Self {
        self.day_number = Some(day_number);
        self
    }

    pub fn with_place(mut self, place_id: impl Into<String>) -> Self {
        self.place_id = Some(place_id.into());
        self
    }
}

/// Why a place ended up unassigned by the daily distributor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnassignedReason {
    TimeExceeded,
    Unreachable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnassignedPlaceDetail {
    pub place_id: String,
    pub place_name: String,
    pub reason_code: UnassignedReason,
    pub reason_message: String,
}

/// Top-level result of `optimize_route`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeResult {
    pub itinerary: Vec<DailyItinerary>,
    pub errors: Vec<ErrorObject>,
    pub unassigned_places: Vec<UnassignedPlaceDetail>,
}

impl OptimizeResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
