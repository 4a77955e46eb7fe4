//! Pure geodesy and signal-strength math.
//!
//! Everything here is stateless: haversine distance, initial bearing, CEP
//! ring generation, heatmap weighting and the RSSI color ramp. The CEP ring
//! uses a per-axis equirectangular approximation (longitude scaled by
//! `cos(lat)`), which is accurate to well under 5% for sub-kilometer radii
//! at |lat| < 80° and is an accepted simplification, not a geodesic circle.

use crate::types::LatLon;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude (treated as constant).
const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Number of distinct vertices in a CEP ring (65 points with the closure).
pub const CEP_RING_VERTICES: usize = 64;

/// Operational RSSI floor in dBm (weight 0).
pub const RSSI_FLOOR_DBM: f64 = -100.0;

/// Operational RSSI ceiling in dBm ("contact", weight 1).
pub const RSSI_CONTACT_DBM: f64 = -30.0;

/// Great-circle distance between two points, in meters (haversine).
pub fn distance_m(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Initial bearing from `a` to `b` in degrees, normalized to [0, 360).
pub fn bearing_deg(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Closed CEP ring around `center` with the given radius in meters.
///
/// Returns 65 points: 64 equally spaced vertices plus a closing point equal
/// to the first, ready to hand to a polygon overlay.
pub fn cep_ring(center: LatLon, radius_m: f64) -> Vec<LatLon> {
    let deg_lat = radius_m / METERS_PER_DEG_LAT;
    // Longitude degrees shrink with latitude; clamp cos to keep the ring
    // finite near the poles.
    let cos_lat = center.lat.to_radians().cos().max(1e-6);
    let deg_lon = radius_m / (METERS_PER_DEG_LAT * cos_lat);

    let mut ring = Vec::with_capacity(CEP_RING_VERTICES + 1);
    for i in 0..CEP_RING_VERTICES {
        let theta = 2.0 * std::f64::consts::PI * i as f64 / CEP_RING_VERTICES as f64;
        ring.push(LatLon::new(
            center.lat + deg_lat * theta.sin(),
            center.lon + deg_lon * theta.cos(),
        ));
    }
    ring.push(ring[0]);
    ring
}

/// Heatmap weight for an RSSI sample, normalized to [0, 1].
///
/// Linear over the operational range -100 dBm (floor) to -30 dBm (contact).
pub fn heat_weight(rssi_dbm: i16) -> f64 {
    let w = (rssi_dbm as f64 - RSSI_FLOOR_DBM) / (RSSI_CONTACT_DBM - RSSI_FLOOR_DBM);
    w.clamp(0.0, 1.0)
}

/// RGB color for an RSSI value: blue → green → yellow → red across the
/// operational range. This ramp is canonical for every overlay.
pub fn rssi_color(rssi_dbm: i16) -> [u8; 3] {
    const STOPS: [(f64, [u8; 3]); 4] = [
        (0.0, [0, 80, 255]),     // blue, floor
        (1.0 / 3.0, [0, 200, 80]),  // green
        (2.0 / 3.0, [255, 220, 0]), // yellow
        (1.0, [255, 40, 40]),    // red, contact
    ];

    let t = heat_weight(rssi_dbm);
    for pair in STOPS.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = (t - t0) / (t1 - t0);
            return [
                lerp_u8(c0[0], c1[0], f),
                lerp_u8(c0[1], c1[1], f),
                lerp_u8(c0[2], c1[2], f),
            ];
        }
    }
    STOPS[3].1
}

/// Hex form of [`rssi_color`], e.g. `#ff2828`.
pub fn rssi_color_hex(rssi_dbm: i16) -> String {
    let [r, g, b] = rssi_color(rssi_dbm);
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

fn lerp_u8(a: u8, b: u8, f: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * f).round() as u8
}

/// Whether a coordinate is worth plotting: in range and not null island.
///
/// A (0, 0) fix is what a GPS without lock reports, so it is treated as
/// missing data rather than a position in the Gulf of Guinea.
pub fn is_plausible(p: LatLon) -> bool {
    if !p.lat.is_finite() || !p.lon.is_finite() {
        return false;
    }
    if p.lat.abs() > 90.0 || p.lon.abs() > 180.0 {
        return false;
    }
    !(p.lat == 0.0 && p.lon == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NYC: LatLon = LatLon::new(40.7128, -74.0060);
    const LON: LatLon = LatLon::new(51.5074, -0.1278);

    #[test]
    fn test_distance_zero_and_symmetric() {
        assert_eq!(distance_m(NYC, NYC), 0.0);
        let ab = distance_m(NYC, LON);
        let ba = distance_m(LON, NYC);
        assert!((ab - ba).abs() < 1e-6);
        // NYC-London is about 5,570 km.
        assert!((ab - 5_570_000.0).abs() < 20_000.0);
    }

    #[test]
    fn test_distance_triangle_inequality() {
        let c = LatLon::new(48.8566, 2.3522);
        let direct = distance_m(NYC, LON);
        let via = distance_m(NYC, c) + distance_m(c, LON);
        assert!(direct <= via + 1e-6);
    }

    #[test]
    fn test_bearing_range() {
        assert!((0.0..360.0).contains(&bearing_deg(NYC, LON)));
        assert!((0.0..360.0).contains(&bearing_deg(LON, NYC)));
    }

    #[test]
    fn test_bearing_reciprocity_short_baseline() {
        // Forward and reverse initial bearings differ by ~180° at the
        // sub-kilometer scales the overlays work at.
        let a = LatLon::new(40.0, -74.0);
        let b = LatLon::new(40.005, -74.005);
        let fwd = bearing_deg(a, b);
        let back = bearing_deg(b, a);
        let diff = (fwd - back).rem_euclid(360.0);
        assert!((diff - 180.0).abs() < 0.5, "diff was {}", diff);
    }

    #[test]
    fn test_bearing_cardinal() {
        let origin = LatLon::new(10.0, 10.0);
        let north = LatLon::new(11.0, 10.0);
        let east = LatLon::new(10.0, 11.0);
        assert!(bearing_deg(origin, north).abs() < 0.5);
        let e = bearing_deg(origin, east);
        assert!((e - 90.0).abs() < 0.5, "east bearing was {}", e);
    }

    #[test]
    fn test_cep_ring_shape() {
        let center = LatLon::new(40.0, -74.0);
        let ring = cep_ring(center, 30.0);
        assert_eq!(ring.len(), CEP_RING_VERTICES + 1);
        assert_eq!(ring[0], ring[CEP_RING_VERTICES]);

        for v in &ring[..CEP_RING_VERTICES] {
            let d = distance_m(center, *v);
            assert!((d - 30.0).abs() <= 30.0 * 0.05, "vertex at {} m", d);
        }
    }

    #[test]
    fn test_cep_ring_high_latitude() {
        // Still within 5% just below the documented 80° limit.
        let center = LatLon::new(79.0, 20.0);
        for v in &cep_ring(center, 1000.0)[..CEP_RING_VERTICES] {
            let d = distance_m(center, *v);
            assert!((d - 1000.0).abs() <= 1000.0 * 0.05, "vertex at {} m", d);
        }
    }

    #[test]
    fn test_heat_weight_clamped() {
        assert_eq!(heat_weight(-100), 0.0);
        assert_eq!(heat_weight(-120), 0.0);
        assert_eq!(heat_weight(-30), 1.0);
        assert_eq!(heat_weight(-10), 1.0);
        let mid = heat_weight(-65);
        assert!((mid - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_rssi_color_endpoints() {
        assert_eq!(rssi_color(-100), [0, 80, 255]);
        assert_eq!(rssi_color(-30), [255, 40, 40]);
        assert_eq!(rssi_color_hex(-30), "#ff2828");
    }

    #[test]
    fn test_rssi_color_monotonic_red() {
        // Red channel never decreases as the signal strengthens.
        let mut last_r = 0u8;
        for rssi in (-100..=-30).step_by(5) {
            let [r, _, _] = rssi_color(rssi);
            assert!(r >= last_r, "red dipped at {} dBm", rssi);
            last_r = r;
        }
    }

    #[test]
    fn test_plausibility() {
        assert!(is_plausible(NYC));
        assert!(!is_plausible(LatLon::new(0.0, 0.0)));
        assert!(!is_plausible(LatLon::new(91.0, 0.0)));
        assert!(!is_plausible(LatLon::new(0.0, 181.0)));
        assert!(!is_plausible(LatLon::new(f64::NAN, 10.0)));
    }
}
