//! Geodesy helpers used by route preview and turn-by-turn guidance.
//!
//! Points are longitude-first (`[lng, lat]`), matching GeoJSON and the map
//! libraries the shells render with.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// WGS-84 equatorial radius, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6378.137;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("Latitude {0} is out of valid range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is out of valid range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("Coordinate value is not finite (NaN or Infinity)")]
    NonFinite,
}

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    /// Builds a point, rejecting values a GPS fix or geocoder should never produce.
    pub fn new(lng: f64, lat: f64) -> Result<Self, CoordinateError> {
        if !lng.is_finite() || !lat.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(CoordinateError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lng, lat })
    }

    /// Reads a GeoJSON position. Extra ordinates (elevation) are ignored.
    #[must_use]
    pub fn from_position(position: &[f64]) -> Option<Self> {
        match position {
            [lng, lat, ..] => Self::new(*lng, *lat).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_position(self) -> Vec<f64> {
        vec![self.lng, self.lat]
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(point: LngLat) -> Self {
        [point.lng, point.lat]
    }
}

/// Axis-aligned box, serialized the way map `fitBounds` calls expect it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from([min_lng, min_lat, max_lng, max_lat]: [f64; 4]) -> Self {
        Self { min_lng, min_lat, max_lng, max_lat }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.min_lng, b.min_lat, b.max_lng, b.max_lat]
    }
}

/// Great-circle distance in whole metres.
#[must_use]
pub fn distance_meters(a: LngLat, b: LngLat) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    (EARTH_RADIUS_KM * c * 1000.0).round()
}

/// Initial bearing from `from` towards `to`, in `[0, 360)`.
///
/// Identical points have no direction; the result is then whatever
/// `atan2(0, 0)` normalizes to.
#[must_use]
pub fn bearing_degrees(from: LngLat, to: LngLat) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let y = d_lng.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lng.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Squared planar distance from `p` to the segment `[start, end]`, in squared
/// degrees. Only meaningful for comparing candidates against each other.
#[must_use]
pub fn point_to_segment_distance_squared(p: LngLat, start: LngLat, end: LngLat) -> f64 {
    let dx = end.lng - start.lng;
    let dy = end.lat - start.lat;
    let len_sq = dx * dx + dy * dy;

    let (cx, cy) = if len_sq > 0.0 {
        let t = (((p.lng - start.lng) * dx + (p.lat - start.lat) * dy) / len_sq).clamp(0.0, 1.0);
        (start.lng + t * dx, start.lat + t * dy)
    } else {
        (start.lng, start.lat)
    };

    (p.lng - cx).powi(2) + (p.lat - cy).powi(2)
}

/// Distance from `point` to the closest vertex of `path`; `+inf` for an empty path.
#[must_use]
pub fn min_distance_meters_to_vertices(point: LngLat, path: &[LngLat]) -> f64 {
    path.iter()
        .map(|vertex| distance_meters(point, *vertex))
        .fold(f64::INFINITY, f64::min)
}

/// Bounds of `path`, grown by `padding` of each axis span on every side.
#[must_use]
pub fn bounding_box_with_padding(path: &[LngLat], padding: f64) -> Option<BoundingBox> {
    let (first, rest) = path.split_first()?;

    let mut bounds = BoundingBox {
        min_lng: first.lng,
        min_lat: first.lat,
        max_lng: first.lng,
        max_lat: first.lat,
    };
    for point in rest {
        bounds.min_lng = bounds.min_lng.min(point.lng);
        bounds.min_lat = bounds.min_lat.min(point.lat);
        bounds.max_lng = bounds.max_lng.max(point.lng);
        bounds.max_lat = bounds.max_lat.max(point.lat);
    }

    let pad_lng = (bounds.max_lng - bounds.min_lng) * padding;
    let pad_lat = (bounds.max_lat - bounds.min_lat) * padding;
    bounds.min_lng -= pad_lng;
    bounds.max_lng += pad_lng;
    bounds.min_lat -= pad_lat;
    bounds.max_lat += pad_lat;

    Some(bounds)
}

/// Rounds a remaining distance down to a step that reads well on a bike
/// computer: 10 m up close, then 25, 50 and 100 m further out.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn round_for_display(distance_meters: f64) -> u32 {
    let d = distance_meters.max(0.0);
    let step = if d < 50.0 {
        10.0
    } else if d < 150.0 {
        25.0
    } else if d < 500.0 {
        50.0
    } else {
        100.0
    };
    ((d / step).floor() * step) as u32
}
