//! Privacy-preserving coordinate fuzzing.
//!
//! Displaces a point by a random bearing and a random distance inside a fixed
//! band, so a user's published location never reveals the exact one. The band
//! keeps the fuzzed point close enough for distance-based discovery to stay
//! useful.

use rand::Rng;

use crate::{Coordinates, EARTH_RADIUS_KM};

/// Minimum displacement applied to a fuzzed coordinate, in meters.
pub const FUZZ_MIN_METERS: f64 = 250.0;
/// Maximum displacement applied to a fuzzed coordinate, in meters.
pub const FUZZ_MAX_METERS: f64 = 1200.0;

/// Displace `origin` by a random bearing and a random distance in
/// `[FUZZ_MIN_METERS, FUZZ_MAX_METERS)`.
pub fn fuzz_location<R: Rng + ?Sized>(origin: Coordinates, rng: &mut R) -> Coordinates {
    let bearing = rng.gen_range(0.0..std::f64::consts::TAU);
    let distance_m = rng.gen_range(FUZZ_MIN_METERS..FUZZ_MAX_METERS);
    displace(origin, bearing, distance_m / 1000.0)
}

/// Destination point given a start, an initial bearing (radians), and a
/// distance in kilometers, on a spherical Earth.
fn displace(origin: Coordinates, bearing: f64, distance_km: f64) -> Coordinates {
    let angular = distance_km / EARTH_RADIUS_KM;
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    Coordinates {
        latitude: lat2.to_degrees(),
        longitude: normalize_longitude(lon2.to_degrees()),
    }
}

fn normalize_longitude(lon: f64) -> f64 {
    let mut lon = (lon + 180.0) % 360.0;
    if lon < 0.0 {
        lon += 360.0;
    }
    lon - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance_km;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const ORIGIN: Coordinates = Coordinates {
        latitude: 40.4168,
        longitude: -3.7038,
    };

    #[test]
    fn fuzzed_point_stays_within_band_for_many_seeds() {
        for seed in 0..500u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let fuzzed = fuzz_location(ORIGIN, &mut rng);
            let d = distance_km(ORIGIN, fuzzed);

            assert!(d <= 1.5, "seed {seed} displaced {d} km");
            assert!(d >= FUZZ_MIN_METERS / 1000.0 - 0.01, "seed {seed} displaced only {d} km");
            assert!(fuzzed.is_valid());
        }
    }

    #[test]
    fn fuzzing_is_deterministic_for_a_fixed_seed() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);

        assert_eq!(fuzz_location(ORIGIN, &mut a), fuzz_location(ORIGIN, &mut b));
    }

    #[test]
    fn fuzzing_moves_the_point() {
        let mut rng = StdRng::seed_from_u64(7);
        let fuzzed = fuzz_location(ORIGIN, &mut rng);
        assert_ne!(fuzzed, ORIGIN);
    }

    #[test]
    fn displacement_near_the_antimeridian_stays_valid() {
        let origin = Coordinates::new(-16.5, 179.999);
        for seed in 0..50u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let fuzzed = fuzz_location(origin, &mut rng);
            assert!(fuzzed.is_valid(), "seed {seed} produced {fuzzed:?}");
        }
    }

    #[test]
    fn displace_follows_the_bearing() {
        // Due north displacement raises latitude, keeps longitude.
        let moved = displace(ORIGIN, 0.0, 1.0);
        assert!(moved.latitude > ORIGIN.latitude);
        assert!((moved.longitude - ORIGIN.longitude).abs() < 1e-6);

        // Due east displacement raises longitude, keeps latitude.
        let moved = displace(ORIGIN, std::f64::consts::FRAC_PI_2, 1.0);
        assert!(moved.longitude > ORIGIN.longitude);
        assert!((moved.latitude - ORIGIN.latitude).abs() < 1e-4);
    }
}
