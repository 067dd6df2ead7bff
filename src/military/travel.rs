//! Travel distance and time between nations
//!
//! Distance is great-circle between territory centers. An expedition moves
//! at the pace of its slowest unit type.

use chrono::{DateTime, Duration, Utc};
use geo::{HaversineDistance, Point};
use serde::{Deserialize, Serialize};

use super::unit_type::Dispatch;
use crate::core::types::GeoPoint;

/// Speed used when a dispatch has no recognizable units
pub const FALLBACK_SPEED: f64 = 1.0;

/// Mean earth radius used by geo's haversine (IUGG), in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle distance in kilometers
///
/// Falls back to `nominal_km` when either center is unknown.
pub fn distance_km(from: Option<GeoPoint>, to: Option<GeoPoint>, nominal_km: f64) -> f64 {
    match (from, to) {
        (Some(a), Some(b)) => {
            // geo points are (x = lon, y = lat)
            let a = Point::new(a.lon, a.lat);
            let b = Point::new(b.lon, b.lat);
            a.haversine_distance(&b) / 1000.0
        }
        _ => nominal_km,
    }
}

/// Slowest catalog speed among the unit types present in a dispatch
pub fn slowest_speed(dispatch: &Dispatch) -> f64 {
    dispatch
        .iter()
        .filter(|(_, &count)| count > 0)
        .map(|(unit, _)| unit.stats().speed)
        .filter(|speed| *speed > 0.0)
        .min_by(|a, b| a.total_cmp(b))
        .unwrap_or(FALLBACK_SPEED)
}

/// Whole minutes needed to cover `distance_km` at `speed` km/min
pub fn travel_minutes(distance_km: f64, speed: f64) -> i64 {
    let speed = if speed > 0.0 { speed } else { FALLBACK_SPEED };
    (distance_km / speed).ceil() as i64
}

/// Distance and timing of an expedition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TravelPlan {
    pub distance_km: f64,
    pub slowest_speed: f64,
    pub travel_minutes: i64,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
}

impl TravelPlan {
    pub fn compute(
        from: Option<GeoPoint>,
        to: Option<GeoPoint>,
        dispatch: &Dispatch,
        departure: DateTime<Utc>,
        nominal_km: f64,
    ) -> Self {
        let distance_km = distance_km(from, to, nominal_km);
        let slowest_speed = slowest_speed(dispatch);
        let minutes = travel_minutes(distance_km, slowest_speed);
        Self {
            distance_km,
            slowest_speed,
            travel_minutes: minutes,
            departure,
            arrival: departure + Duration::minutes(minutes),
        }
    }
}
