//! Geolocation utilities: great-circle distance, privacy fuzzing,
//! approximate address derivation, and geohash encoding.
//!
//! Everything in this crate is a pure function; the fuzzing routines take the
//! RNG as an argument so callers control determinism.

use serde::{Deserialize, Serialize};

pub mod address;
pub mod distance;
pub mod fuzz;
pub mod geohash;

pub use address::approximate_address;
pub use distance::distance_km;
pub use fuzz::{fuzz_location, FUZZ_MAX_METERS, FUZZ_MIN_METERS};
pub use geohash::encode as geohash_encode;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether the pair lies within the valid lat/lon ranges.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}
