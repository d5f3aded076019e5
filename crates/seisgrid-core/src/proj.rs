//! Transverse-Mercator (UTM) projection on the WGS84 ellipsoid.
//!
//! Cross sections interpolate their profile points in planar coordinates,
//! so endpoints are projected forward into UTM, the straight line is walked
//! in meters, and each step is projected back to longitude/latitude.

use crate::geom::{PlanarPoint, planar};

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;

/// A single UTM zone. The plotting region of interest sits in zone 11
/// (California), which is the default used by the section builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmZone(pub u8);

impl UtmZone {
    pub const CALIFORNIA: UtmZone = UtmZone(11);

    fn central_meridian(&self) -> f64 {
        (f64::from(self.0) * 6.0 - 183.0).to_radians()
    }
}

fn e2() -> f64 {
    WGS84_F * (2.0 - WGS84_F)
}

fn ep2() -> f64 {
    e2() / (1.0 - e2())
}

/// Meridional arc length from the equator (Snyder 3-21).
fn meridional_arc(phi: f64) -> f64 {
    let e2 = e2();
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    WGS84_A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

/// Forward projection: lon/lat degrees to UTM easting/northing meters.
pub fn forward(zone: UtmZone, longitude: f64, latitude: f64) -> PlanarPoint {
    let e2 = e2();
    let ep2 = ep2();
    let phi = latitude.to_radians();
    let lam = longitude.to_radians();

    let sin_phi = phi.sin();
    let cos_phi = phi.cos();
    let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let t = phi.tan() * phi.tan();
    let c = ep2 * cos_phi * cos_phi;
    let a = (lam - zone.central_meridian()) * cos_phi;
    let m = meridional_arc(phi);

    let a2 = a * a;
    let a3 = a2 * a;
    let a4 = a3 * a;
    let a5 = a4 * a;
    let a6 = a5 * a;

    let x = K0
        * n
        * (a + (1.0 - t + c) * a3 / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0)
        + FALSE_EASTING;
    let y = K0
        * (m + n
            * phi.tan()
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

    planar(x, y)
}

/// Inverse projection: UTM easting/northing meters to lon/lat degrees.
pub fn inverse(zone: UtmZone, point: PlanarPoint) -> (f64, f64) {
    let e2 = e2();
    let ep2 = ep2();
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    let x = point.x - FALSE_EASTING;
    let m = point.y / K0;
    let mu = m / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    // Footpoint latitude.
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let c1 = ep2 * cos_phi1 * cos_phi1;
    let t1 = phi1.tan() * phi1.tan();
    let n1 = WGS84_A / (1.0 - e2 * sin_phi1 * sin_phi1).sqrt();
    let r1 = WGS84_A * (1.0 - e2) / (1.0 - e2 * sin_phi1 * sin_phi1).powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    let phi = phi1
        - (n1 * phi1.tan() / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d6
                    / 720.0);
    let lam = zone.central_meridian()
        + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d5
                / 120.0)
            / cos_phi1;

    (lam.to_degrees(), phi.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_matches_known_fix() {
        // Downtown Los Angeles, UTM zone 11N.
        let p = forward(UtmZone::CALIFORNIA, -118.2437, 34.0522);
        assert!((p.x - 385_300.0).abs() < 500.0, "easting {}", p.x);
        assert!((p.y - 3_768_800.0).abs() < 500.0, "northing {}", p.y);
    }

    #[test]
    fn planar_distance_is_metric() {
        // One degree of longitude at 34N is roughly 92.4 km.
        let a = forward(UtmZone::CALIFORNIA, -118.0, 34.0);
        let b = forward(UtmZone::CALIFORNIA, -117.0, 34.0);
        let dist = (b - a).length();
        assert!((dist - 92_400.0).abs() < 500.0, "distance {dist}");
    }

    #[test]
    fn round_trip_recovers_coordinates() {
        for &(lon, lat) in &[
            (-118.2437, 34.0522),
            (-121.8863, 37.3382),
            (-115.1398, 36.1699),
        ] {
            let p = forward(UtmZone::CALIFORNIA, lon, lat);
            let (lon2, lat2) = inverse(UtmZone::CALIFORNIA, p);
            assert!((lon - lon2).abs() < 1e-6, "lon {lon} vs {lon2}");
            assert!((lat - lat2).abs() < 1e-6, "lat {lat} vs {lat2}");
        }
    }

    #[test]
    fn zone_11_central_meridian() {
        assert!((UtmZone(11).central_meridian().to_degrees() + 117.0).abs() < 1e-12);
    }
}
