//! Caller-facing trip input types.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::coordinate::{Coordinate, TransportMode};

/// Opaque trip identifier handed to `optimize_route`; the calling layer owns
/// trip persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TripId(pub Uuid);

/// A named endpoint (trip origin or destination).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedPoint {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl NamedPoint {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// A point of interest the trip wants to visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub estimated_duration: u32,
    /// Lower is higher priority; defaults to 0 when the caller has no
    /// preference order among places.
    #[serde(default)]
    pub priority: i32,
}

impl Place {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// A per-night accommodation. `[start_date, end_date)` is the night range
/// during which this accommodation is the day's start/end anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyAccommodation {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DailyAccommodation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    /// Whether this accommodation's night range `[start_date, end_date)`
    /// contains `date`.
    pub fn covers_night(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date < self.end_date
    }

    /// Whether two accommodation ranges overlap (touching ranges, where one
    /// ends exactly when the other starts, are not an overlap).
    pub fn overlaps(&self, other: &DailyAccommodation) -> bool {
        self.start_date < other.end_date && other.start_date < self.end_date
    }
}

/// A user-pinned `(place, date, time)` constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedSchedule {
    pub place_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Top-level input to `optimize_route`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripInput {
    pub origin: NamedPoint,
    pub destination: NamedPoint,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub daily_start_time: NaiveTime,
    pub daily_end_time: NaiveTime,
    pub transport_modes: Vec<TransportMode>,
    #[serde(default)]
    pub accommodations: Vec<DailyAccommodation>,
    pub places: Vec<Place>,
    #[serde(default)]
    pub fixed_schedules: Vec<FixedSchedule>,
}

impl TripInput {
    /// The primary transport mode for the trip (first configured mode, or
    /// `Car` if none were supplied).
    pub fn primary_mode(&self) -> TransportMode {
        self.transport_modes.first().copied().unwrap_or(TransportMode::Car)
    }

    /// Inclusive day count of the trip.
    pub fn num_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn touching_accommodation_ranges_do_not_overlap() {
        let a = DailyAccommodation {
            name: "A".into(),
            lat: 0.0,
            lng: 0.0,
            start_date: date(2025, 1, 1),
            end_date: date(2025, 1, 3),
        };
        let b = DailyAccommodation {
            name: "B".into(),
            lat: 0.0,
            lng: 0.0,
            start_date: date(2025, 1, 3),
            end_date: date(2025, 1, 5),
        };
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn overlapping_accommodation_ranges_are_detected() {
        let a = DailyAccommodation {
            name: "A".into(),
            lat: 0.0,
            lng: 0.0,
            start_date: date(2025, 1, 1),
            end_date: date(2025, 1, 4),
        };
        let b = DailyAccommodation {
            name: "B".into(),
            lat: 0.0,
            lng: 0.0,
            start_date: date(2025, 1, 3),
            end_date: date(2025, 1, 5),
        };
        assert!(a.overlaps(&b));
    }

    #[test]
    fn covers_night_is_half_open() {
        let acc = DailyAccommodation {
            name: "A".into(),
            lat: 0.0,
            lng: 0.0,
            start_date: date(2025, 1, 1),
            end_date: date(2025, 1, 3),
        };
        assert!(acc.covers_night(date(2025, 1, 1)));
        assert!(acc.covers_night(date(2025, 1, 2)));
        assert!(!acc.covers_night(date(2025, 1, 3)));
    }
}
