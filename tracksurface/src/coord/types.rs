//! Coordinate type definitions

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Valid latitude range (WGS84)
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// A single track point in WGS84 coordinates.
///
/// Points serialize as `[lon, lat]` pairs, the GeoJSON position order
/// used throughout the route payloads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    /// Longitude in decimal degrees, -180 to 180
    pub lon: f64,
    /// Latitude in decimal degrees, -90 to 90
    pub lat: f64,
}

impl TrackPoint {
    /// Creates a validated track point.
    ///
    /// # Errors
    ///
    /// Returns `CoordError` if either axis is outside the WGS84 range
    /// or is not a finite number.
    pub fn new(lon: f64, lat: f64) -> Result<Self, CoordError> {
        if !lon.is_finite() || !(MIN_LON..=MAX_LON).contains(&lon) {
            return Err(CoordError::InvalidLongitude(lon));
        }
        if !lat.is_finite() || !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(CoordError::InvalidLatitude(lat));
        }
        Ok(Self { lon, lat })
    }

    /// Creates a track point without range validation.
    ///
    /// Intended for values that already passed validation (e.g. read back
    /// from a stored payload).
    pub fn new_unchecked(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl fmt::Display for TrackPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lon, self.lat)
    }
}

impl Serialize for TrackPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.lon)?;
        tuple.serialize_element(&self.lat)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for TrackPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PairVisitor;

        impl<'de> Visitor<'de> for PairVisitor {
            type Value = TrackPoint;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a [lon, lat] pair")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<TrackPoint, A::Error> {
                let lon: f64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let lat: f64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                TrackPoint::new(lon, lat).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_tuple(2, PairVisitor)
    }
}

/// Errors that can occur when constructing coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude is outside valid range (-90 to 90) or not finite
    InvalidLatitude(f64),
    /// Longitude is outside valid range (-180 to 180) or not finite
    InvalidLongitude(f64),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(
                    f,
                    "Invalid latitude: {} (must be between {} and {})",
                    lat, MIN_LAT, MAX_LAT
                )
            }
            CoordError::InvalidLongitude(lon) => {
                write!(
                    f,
                    "Invalid longitude: {} (must be between {} and {})",
                    lon, MIN_LON, MAX_LON
                )
            }
        }
    }
}

impl std::error::Error for CoordError {}
