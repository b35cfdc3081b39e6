//! WGS84 coordinate types and validation.

mod types;

pub use types::{CoordError, TrackPoint, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};
