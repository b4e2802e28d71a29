//! Final-itinerary travel legs. A sum type instead of an all-optional record:
//! each variant only carries the fields its mode actually produces.

use serde::{Deserialize, Serialize};

use super::matrix::TransitDetails;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarLeg {
    pub distance_m: f64,
    pub duration_min: f64,
    pub polyline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitLeg {
    pub distance_m: f64,
    pub duration_min: f64,
    pub fare: Option<u32>,
    pub polyline: Option<String>,
    pub details: Option<TransitDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkLeg {
    pub distance_m: f64,
    pub duration_min: f64,
    pub polyline: Option<String>,
}

/// One leg of travel between two consecutive placed entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Segment {
    Car(CarLeg),
    Transit(TransitLeg),
    Walk(WalkLeg),
}

impl Segment {
    pub fn distance_m(&self) -> f64 {
        match self {
            Segment::Car(l) => l.distance_m,
            Segment::Transit(l) => l.distance_m,
            Segment::Walk(l) => l.distance_m,
        }
    }

    pub fn duration_min(&self) -> f64 {
        match self {
            Segment::Car(l) => l.duration_min,
            Segment::Transit(l) => l.duration_min,
            Segment::Walk(l) => l.duration_min,
        }
    }

    pub fn polyline(&self) -> Option<&str> {
        match self {
            Segment::Car(l) => l.polyline.as_deref(),
            Segment::Transit(l) => l.polyline.as_deref(),
            Segment::Walk(l) => l.polyline.as_deref(),
        }
    }

    pub fn fare(&self) -> Option<u32> {
        match self {
            Segment::Transit(l) => l.fare,
            _ => None,
        }
    }

    pub fn transit_details(&self) -> Option<&TransitDetails> {
        match self {
            Segment::Transit(l) => l.details.as_ref(),
            _ => None,
        }
    }
}
