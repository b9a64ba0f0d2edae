// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Mean radius of Earth, in kilometers.
/// Source: https://en.wikipedia.org/wiki/Earth_radius#Arithmetic_mean_radius
const EARTH_RADIUS: f64 = 6371.0088;

/// Mean diameter of Earth, in kilometers.
/// Source: https://en.wikipedia.org/wiki/Earth_radius#Arithmetic_mean_radius
const EARTH_DIAMETER: f64 = EARTH_RADIUS + EARTH_RADIUS;

/// Calculates the great-circle distance between two lat-lon positions
/// on Earth using the `haversine formula <https://en.wikipedia.org/wiki/Haversine_formula>`_.
/// Returns the result in kilometers.
pub fn earth_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lon1 = lon1.to_radians();
    let lat2 = lat2.to_radians();
    let lon2 = lon2.to_radians();

    let sin_dlat_half = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon_half = ((lon2 - lon1) * 0.5).sin();

    let h = sin_dlat_half * sin_dlat_half + lat1.cos() * lat2.cos() * sin_dlon_half * sin_dlon_half;

    EARTH_DIAMETER * h.sqrt().asin()
}

/// Same as [earth_distance], but returns the result in meters.
#[inline]
pub fn earth_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    earth_distance(lat1, lon1, lat2, lon2) * 1000.0
}

/// Projects a point onto the segment from `a` to `b`.
///
/// Returns the fraction along the segment (clamped to `[0, 1]`)
/// and the latitude and longitude of the projected point.
///
/// Uses an equirectangular approximation around the segment, which is
/// precise enough for the short segments found in road networks,
/// but breaks down near the poles and the ante meridian.
pub fn project_onto_segment(
    lat: f64,
    lon: f64,
    a_lat: f64,
    a_lon: f64,
    b_lat: f64,
    b_lon: f64,
) -> (f64, f64, f64) {
    let shrink = ((a_lat + b_lat) * 0.5).to_radians().cos();

    let dx = (b_lon - a_lon) * shrink;
    let dy = b_lat - a_lat;
    let len_sq = dx * dx + dy * dy;

    if len_sq == 0.0 {
        return (0.0, a_lat, a_lon);
    }

    let px = (lon - a_lon) * shrink;
    let py = lat - a_lat;
    let fraction = ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0);

    (
        fraction,
        a_lat + fraction * (b_lat - a_lat),
        a_lon + fraction * (b_lon - a_lon),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_between_known_points() {
        // Warsaw Centralna to Warsaw Zachodnia
        let d = earth_distance(52.2289, 21.0033, 52.2197, 20.9655);
        assert!((d - 2.77).abs() < 0.05, "got {d}");
    }

    #[test]
    fn projection_inside_segment() {
        let (fraction, lat, lon) = project_onto_segment(0.001, 0.005, 0.0, 0.0, 0.0, 0.01);
        assert!((fraction - 0.5).abs() < 1e-9);
        assert!(lat.abs() < 1e-12);
        assert!((lon - 0.005).abs() < 1e-12);
    }

    #[test]
    fn projection_clamped_to_endpoints() {
        let (fraction, _, lon) = project_onto_segment(0.0, -0.5, 0.0, 0.0, 0.0, 0.01);
        assert_eq!(fraction, 0.0);
        assert_eq!(lon, 0.0);

        let (fraction, _, lon) = project_onto_segment(0.0, 0.5, 0.0, 0.0, 0.0, 0.01);
        assert_eq!(fraction, 1.0);
        assert_eq!(lon, 0.01);
    }

    #[test]
    fn projection_onto_degenerate_segment() {
        let (fraction, lat, lon) = project_onto_segment(1.0, 1.0, 0.5, 0.5, 0.5, 0.5);
        assert_eq!(fraction, 0.0);
        assert_eq!((lat, lon), (0.5, 0.5));
    }
}
