//! Geohash encoding for coarse proximity bucketing.

use crate::Coordinates;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Default precision used for stored user locations (~5 m cells).
pub const DEFAULT_PRECISION: usize = 9;

/// Encode a coordinate pair into a geohash string of the given length.
///
/// Longitude and latitude bits are interleaved, longitude first, five bits
/// per output character.
pub fn encode(coords: Coordinates, precision: usize) -> String {
    let mut lat_range = (-90.0f64, 90.0f64);
    let mut lon_range = (-180.0f64, 180.0f64);

    let mut hash = String::with_capacity(precision);
    let mut bits = 0u8;
    let mut bit_count = 0u8;
    let mut even_bit = true;

    while hash.len() < precision {
        if even_bit {
            let mid = (lon_range.0 + lon_range.1) / 2.0;
            if coords.longitude >= mid {
                bits = (bits << 1) | 1;
                lon_range.0 = mid;
            } else {
                bits <<= 1;
                lon_range.1 = mid;
            }
        } else {
            let mid = (lat_range.0 + lat_range.1) / 2.0;
            if coords.latitude >= mid {
                bits = (bits << 1) | 1;
                lat_range.0 = mid;
            } else {
                bits <<= 1;
                lat_range.1 = mid;
            }
        }

        even_bit = !even_bit;
        bit_count += 1;

        if bit_count == 5 {
            hash.push(BASE32[bits as usize] as char);
            bits = 0;
            bit_count = 0;
        }
    }

    hash
}
