//! Great-circle distance via the haversine formula.

use crate::{Coordinates, EARTH_RADIUS_KM};

/// Distance between two coordinates in kilometers.
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    // Clamp guards against floating point drift pushing sqrt out of domain
    // for antipodal points.
    2.0 * EARTH_RADIUS_KM * h.sqrt().clamp(0.0, 1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MADRID: Coordinates = Coordinates {
        latitude: 40.4168,
        longitude: -3.7038,
    };
    const BARCELONA: Coordinates = Coordinates {
        latitude: 41.3874,
        longitude: 2.1686,
    };

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance_km(MADRID, MADRID), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let ab = distance_km(MADRID, BARCELONA);
        let ba = distance_km(BARCELONA, MADRID);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn madrid_barcelona_is_about_505_km() {
        let d = distance_km(MADRID, BARCELONA);
        assert!((d - 505.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn antipodal_points_do_not_panic() {
        let north = Coordinates::new(90.0, 0.0);
        let south = Coordinates::new(-90.0, 0.0);
        let d = distance_km(north, south);
        assert!((d - EARTH_RADIUS_KM * std::f64::consts::PI).abs() < 1.0);
    }

    #[test]
    fn symmetry_holds_across_a_grid_of_points() {
        let points = [
            Coordinates::new(0.0, 0.0),
            Coordinates::new(51.5074, -0.1278),
            Coordinates::new(-33.8688, 151.2093),
            Coordinates::new(64.1466, -21.9426),
        ];

        for a in points {
            for b in points {
                let ab = distance_km(a, b);
                let ba = distance_km(b, a);
                assert!((ab - ba).abs() < 1e-9, "asymmetry between {a:?} and {b:?}");
            }
        }
    }
}
