//! Constraint Validator: pre-flight fixed-schedule checks and
//! post-hoc itinerary/distribution checks.

use std::collections::HashSet;

use chrono::NaiveTime;

use crate::defaults::{MAX_STAY_DURATION_MINUTES, MIN_STAY_DURATION_MINUTES};
use crate::types::{DailyItinerary, ErrorCode, ErrorObject, FixedSchedule, NodeId};

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ErrorObject>,
}

impl ValidationReport {
    fn new(errors: Vec<ErrorObject>) -> Self {
        Self { is_valid: errors.is_empty(), errors }
    }
}

/// Options shared by `validate_fixed_schedules`.
#[derive(Debug, Clone)]
pub struct TripWindow {
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub daily_start: NaiveTime,
    pub daily_end: NaiveTime,
}

/// Pre-flight check: detect fixed-schedule conflicts, out-of-hours slots,
/// and dates outside the trip range.
pub fn validate_fixed_schedules(fixed: &[FixedSchedule], window: &TripWindow) -> ValidationReport {
    let mut errors = Vec::new();

    for f in fixed {
        if f.date < window.start_date || f.date > window.end_date {
            errors.push(
                ErrorObject::new(ErrorCode::OutOfRange, format!("fixed schedule for '{}' falls outside the trip's date range", f.place_id))
                    .with_place(f.place_id.clone()),
            );
        }
        if f.start_time < window.daily_start || f.end_time > window.daily_end {
            errors.push(
                ErrorObject::new(ErrorCode::OutOfHours, format!("fixed schedule for '{}' falls outside daily hours", f.place_id))
                    .with_place(f.place_id.clone()),
            );
        }
    }

    for (i, a) in fixed.iter().enumerate() {
        for b in fixed.iter().skip(i + 1) {
            if a.date == b.date && a.start_time < b.end_time && b.start_time < a.end_time {
                errors.push(
                    ErrorObject::new(ErrorCode::ScheduleConflict, format!("'{}' and '{}' overlap on {}", a.place_id, b.place_id, a.date))
                        .with_place(a.place_id.clone()),
                );
            }
        }
    }

    ValidationReport::new(errors)
}

/// Post-hoc per-day checks on a produced itinerary.
pub fn validate_itinerary(itineraries: &[DailyItinerary], daily_start: NaiveTime, daily_end: NaiveTime) -> ValidationReport {
    let mut errors = Vec::new();

    for day in itineraries {
        if day.schedule.is_empty() && day.day_origin.is_none() && day.day_destination.is_none() {
            errors.push(ErrorObject::new(ErrorCode::EmptyDay, format!("day {} has no places and no endpoints", day.day_number)).with_day(day.day_number));
        }

        for item in &day.schedule {
            if item.duration_min < MIN_STAY_DURATION_MINUTES || item.duration_min > MAX_STAY_DURATION_MINUTES || item.duration_min % 30 != 0 {
                errors.push(
                    ErrorObject::new(ErrorCode::InvalidDuration, format!("'{}' has an invalid stay duration of {} minutes", item.place_id, item.duration_min))
                        .with_day(day.day_number)
                        .with_place(item.place_id.clone()),
                );
            }
            if item.arrival_time < daily_start || item.departure_time > daily_end {
                errors.push(
                    ErrorObject::new(ErrorCode::OutOfHours, format!("'{}' is scheduled outside daily hours", item.place_id))
                        .with_day(day.day_number)
                        .with_place(item.place_id.clone()),
                );
            }
            if item.arrival_time >= item.departure_time {
                errors.push(
                    ErrorObject::new(ErrorCode::InvalidTime, format!("'{}' has arrival_time >= departure_time", item.place_id))
                        .with_day(day.day_number)
                        .with_place(item.place_id.clone()),
                );
            }
        }
    }

    ValidationReport::new(errors)
}

#[derive(Debug, Clone)]
pub struct DistributionValidation {
    pub is_valid: bool,
    pub missing_places: Vec<NodeId>,
    pub duplicate_places: Vec<NodeId>,
    pub all_places_assigned: bool,
}

/// Check that a distributor's day buckets account for every place in the
/// original route exactly once.
pub fn validate_distribution(days: &[Vec<NodeId>], unassigned: &[NodeId], original_route: &[NodeId]) -> DistributionValidation {
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut duplicate_places = Vec::new();

    for day in days {
        for id in day {
            if !seen.insert(id.clone()) {
                duplicate_places.push(id.clone());
            }
        }
    }
    for id in unassigned {
        seen.insert(id.clone());
    }

    let missing_places: Vec<NodeId> = original_route
        .iter()
        .filter(|id| !id.is_origin() && !id.is_destination() && !seen.contains(*id))
        .cloned()
        .collect();

    let all_places_assigned = missing_places.is_empty() && unassigned.is_empty();

    DistributionValidation {
        is_valid: missing_places.is_empty() && duplicate_places.is_empty(),
        missing_places,
        duplicate_places,
        all_places_assigned,
    }
}
