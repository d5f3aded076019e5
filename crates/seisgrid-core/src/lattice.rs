//! Query-point lattices.
//!
//! A lattice is the ordered set of geographic points a slice or section will
//! query, together with its 2D shape and the coordinate lists that end up in
//! the metadata artifact. Points are enumerated row-major:
//! `index = y * num_x + x`.

use tracing::debug;

use crate::error::{Error, Result};
use crate::point::{GeoPoint, VerticalCoord};
use crate::proj::{self, UtmZone};

/// Vertical extent of a cross section or profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerticalRange {
    /// Meters below the surface, iterated ascending from start to end.
    Depth { start: f64, end: f64 },
    /// Meters relative to sea level; may run in either direction.
    Elevation { start: f64, end: f64 },
}

impl VerticalRange {
    fn start(&self) -> f64 {
        match self {
            VerticalRange::Depth { start, .. } | VerticalRange::Elevation { start, .. } => *start,
        }
    }

    fn end(&self) -> f64 {
        match self {
            VerticalRange::Depth { end, .. } | VerticalRange::Elevation { end, .. } => *end,
        }
    }

    pub fn is_elevation(&self) -> bool {
        matches!(self, VerticalRange::Elevation { .. })
    }

    /// Validates the range against the vertical spacing before anything is
    /// queried. `(end - start)` must divide evenly by the spacing, and the
    /// spacing must step toward the end.
    fn check(&self, vspacing: f64) -> Result<()> {
        if vspacing == 0.0 || !vspacing.is_finite() {
            return Err(Error::config(format!(
                "vertical spacing must be a non-zero number, got {vspacing}"
            )));
        }
        let span = self.end() - self.start();
        match self {
            VerticalRange::Depth { start, end } => {
                if vspacing < 0.0 {
                    return Err(Error::config(
                        "depth ranges iterate downward; vertical spacing must be positive",
                    ));
                }
                if end < start {
                    return Err(Error::config(format!(
                        "ending depth {end} is above starting depth {start}"
                    )));
                }
            }
            VerticalRange::Elevation { .. } => {
                if span != 0.0 && span.signum() != vspacing.signum() {
                    return Err(Error::config(format!(
                        "vertical spacing {vspacing} steps away from the ending elevation"
                    )));
                }
            }
        }
        let steps = span / vspacing;
        if (steps - steps.round()).abs() > 1e-9 {
            return Err(Error::config(format!(
                "the spacing value does not divide evenly into the requested range: \
                 ({:.2} - {:.2}) / {:.2} has a remainder",
                self.end(),
                self.start(),
                vspacing
            )));
        }
        Ok(())
    }

    /// The vertical levels, endpoint inclusive.
    ///
    /// Depth ranges step `start..=end` ascending. Elevation ranges keep the
    /// source toolkit's exclusive-bound stepping with the bound nudged by
    /// one meter (down when descending, up when ascending) to force the
    /// endpoint in; that quirk is replicated as observed, not generalized.
    fn levels(&self, vspacing: f64) -> Vec<i64> {
        let start = self.start() as i64;
        let end = self.end() as i64;
        let step = vspacing as i64;
        let mut out = Vec::new();
        match self {
            VerticalRange::Depth { .. } => {
                let mut j = start;
                while j <= end {
                    out.push(j);
                    j += step;
                }
            }
            VerticalRange::Elevation { .. } => {
                let bound = if step < 0 { end - 1 } else { end + 1 };
                let mut j = start;
                while (step < 0 && j > bound) || (step > 0 && j < bound) {
                    out.push(j);
                    j += step;
                }
            }
        }
        out
    }
}

/// Lists of the coordinates a lattice spans, rounded for metadata output.
#[derive(Debug, Clone, Default)]
pub struct CoordinateLists {
    pub lon_list: Vec<f64>,
    pub lat_list: Vec<f64>,
    pub depth_list: Vec<f64>,
    pub elevation_list: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Lattice {
    points: Vec<GeoPoint>,
    num_x: usize,
    num_y: usize,
    coords: CoordinateLists,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

impl Lattice {
    /// A horizontal slice lattice between an upper-left and a bottom-right
    /// corner, stepped by `spacing` degrees, row-major from the upper-left.
    /// Explicit step counts override the derived dimensions when a persisted
    /// datafile dictates the shape.
    pub fn horizontal(
        upper_left: &GeoPoint,
        bottom_right: &GeoPoint,
        spacing: f64,
        steps: Option<(usize, usize)>,
    ) -> Result<Lattice> {
        let width = bottom_right.longitude - upper_left.longitude;
        let height = upper_left.latitude - bottom_right.latitude;
        if width <= 0.0 || height <= 0.0 {
            return Err(Error::config(format!(
                "({:.2}, {:.2}) to ({:.2}, {:.2}) is not a valid box; the first corner must be \
                 upper-left, the second bottom-right",
                upper_left.longitude,
                upper_left.latitude,
                bottom_right.longitude,
                bottom_right.latitude
            )));
        }
        let (num_x, num_y) = match steps {
            Some((nx, ny)) => (nx, ny),
            None => {
                if spacing <= 0.0 || !spacing.is_finite() {
                    return Err(Error::config(format!(
                        "grid spacing must be a positive number, got {spacing}"
                    )));
                }
                (
                    (width / spacing).ceil() as usize + 1,
                    (height / spacing).ceil() as usize + 1,
                )
            }
        };
        if num_x == 0 || num_y == 0 {
            return Err(Error::config("grid step counts must be at least 1"));
        }

        let mut points = Vec::with_capacity(num_x * num_y);
        let mut coords = CoordinateLists::default();
        for y in 0..num_y {
            let lat = upper_left.latitude - y as f64 * spacing;
            coords.lat_list.push(round_to(lat, 5));
            for x in 0..num_x {
                let lon = upper_left.longitude + x as f64 * spacing;
                if y == 0 {
                    coords.lon_list.push(round_to(lon, 5));
                }
                points.push(GeoPoint {
                    longitude: lon,
                    latitude: lat,
                    vertical: upper_left.vertical,
                });
            }
        }
        debug!(num_x, num_y, "built horizontal lattice");
        Ok(Lattice {
            points,
            num_x,
            num_y,
            coords,
        })
    }

    /// A cross-section lattice between two endpoints. The endpoints are
    /// projected into UTM, the straight path is split every `hspacing`
    /// meters, and the whole profile repeats per vertical level.
    pub fn cross_section(
        start: &GeoPoint,
        end: &GeoPoint,
        hspacing: f64,
        vspacing: f64,
        range: VerticalRange,
    ) -> Result<Lattice> {
        range.check(vspacing)?;
        if hspacing <= 0.0 || !hspacing.is_finite() {
            return Err(Error::config(format!(
                "horizontal spacing must be a positive number, got {hspacing}"
            )));
        }

        let zone = UtmZone::CALIFORNIA;
        let p1 = proj::forward(zone, start.longitude, start.latitude);
        let p2 = proj::forward(zone, end.longitude, end.latitude);
        let path_length = (p2 - p1).length();
        let num_prof = (path_length / hspacing).floor() as usize;
        if num_prof < 1 {
            return Err(Error::config(format!(
                "horizontal spacing {hspacing} exceeds the section path length {path_length:.1}"
            )));
        }

        let levels = range.levels(vspacing);
        let num_x = num_prof + 1;
        let num_y = levels.len();

        let mut points = Vec::with_capacity(num_x * num_y);
        let mut coords = CoordinateLists::default();
        for (row, level) in levels.iter().enumerate() {
            match range {
                VerticalRange::Depth { .. } => coords.depth_list.push(*level as f64),
                VerticalRange::Elevation { .. } => coords.elevation_list.push(*level as f64),
            }
            for i in 0..num_x {
                let t = i as f64 / num_prof as f64;
                let p = p1 + (p2 - p1) * t;
                let (lon, lat) = proj::inverse(zone, p);
                if row == 0 {
                    coords.lon_list.push(round_to(lon, 5));
                    coords.lat_list.push(round_to(lat, 5));
                }
                let vertical = if range.is_elevation() {
                    VerticalCoord::Elevation(*level as f64)
                } else {
                    VerticalCoord::Depth(*level as f64)
                };
                points.push(GeoPoint {
                    longitude: lon,
                    latitude: lat,
                    vertical,
                });
            }
        }
        debug!(num_x, num_y, path_length, "built cross-section lattice");
        Ok(Lattice {
            points,
            num_x,
            num_y,
            coords,
        })
    }

    /// A single-column profile at one surface location over a vertical
    /// range (`num_x == 1`).
    pub fn profile(at: &GeoPoint, vspacing: f64, range: VerticalRange) -> Result<Lattice> {
        range.check(vspacing)?;
        let levels = range.levels(vspacing);
        let mut points = Vec::with_capacity(levels.len());
        let mut coords = CoordinateLists {
            lon_list: vec![round_to(at.longitude, 5)],
            lat_list: vec![round_to(at.latitude, 5)],
            ..CoordinateLists::default()
        };
        for level in &levels {
            match range {
                VerticalRange::Depth { .. } => coords.depth_list.push(*level as f64),
                VerticalRange::Elevation { .. } => coords.elevation_list.push(*level as f64),
            }
            let vertical = if range.is_elevation() {
                VerticalCoord::Elevation(*level as f64)
            } else {
                VerticalCoord::Depth(*level as f64)
            };
            points.push(GeoPoint {
                longitude: at.longitude,
                latitude: at.latitude,
                vertical,
            });
        }
        Ok(Lattice {
            num_x: 1,
            num_y: points.len(),
            points,
            coords,
        })
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn num_x(&self) -> usize {
        self.num_x
    }

    pub fn num_y(&self) -> usize {
        self.num_y
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn coords(&self) -> &CoordinateLists {
        &self.coords
    }

    pub fn point(&self, y: usize, x: usize) -> &GeoPoint {
        &self.points[y * self.num_x + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lon: f64, lat: f64) -> GeoPoint {
        GeoPoint::at_depth(lon, lat, 0.0).unwrap()
    }

    #[test]
    fn horizontal_shape_and_order() {
        let ul = pt(-118.0, 35.0);
        let br = pt(-117.0, 34.0);
        let lat = Lattice::horizontal(&ul, &br, 0.5, None).unwrap();
        assert_eq!(lat.num_x(), 3);
        assert_eq!(lat.num_y(), 3);
        assert_eq!(lat.len(), lat.num_x() * lat.num_y());

        // Row-major from the upper-left: index y*num_x + x.
        for y in 0..3 {
            for x in 0..3 {
                let p = lat.point(y, x);
                assert!((p.longitude - (-118.0 + 0.5 * x as f64)).abs() < 1e-9);
                assert!((p.latitude - (35.0 - 0.5 * y as f64)).abs() < 1e-9);
            }
        }
        assert_eq!(lat.coords().lon_list, vec![-118.0, -117.5, -117.0]);
        assert_eq!(lat.coords().lat_list, vec![35.0, 34.5, 34.0]);
    }

    #[test]
    fn horizontal_non_divisible_spacing_rounds_up() {
        let ul = pt(-118.0, 35.0);
        let br = pt(-117.0, 34.0);
        let lat = Lattice::horizontal(&ul, &br, 0.3, None).unwrap();
        // ceil(1.0 / 0.3) + 1 = 5
        assert_eq!(lat.num_x(), 5);
        assert_eq!(lat.num_y(), 5);
    }

    #[test]
    fn horizontal_explicit_steps_override() {
        let ul = pt(-118.0, 35.0);
        let br = pt(-117.0, 34.0);
        let lat = Lattice::horizontal(&ul, &br, 0.5, Some((11, 7))).unwrap();
        assert_eq!(lat.num_x(), 11);
        assert_eq!(lat.num_y(), 7);
        assert_eq!(lat.len(), 77);
    }

    #[test]
    fn horizontal_invalid_box_is_config_error() {
        let ul = pt(-117.0, 34.0);
        let br = pt(-118.0, 35.0);
        assert!(matches!(
            Lattice::horizontal(&ul, &br, 0.5, None),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn depth_levels_are_inclusive_ascending() {
        let range = VerticalRange::Depth {
            start: 0.0,
            end: 50_000.0,
        };
        assert_eq!(
            range.levels(10_000.0),
            vec![0, 10_000, 20_000, 30_000, 40_000, 50_000]
        );
    }

    #[test]
    fn elevation_levels_descending_include_endpoint() {
        let range = VerticalRange::Elevation {
            start: 0.0,
            end: -15_000.0,
        };
        assert_eq!(
            range.levels(-5_000.0),
            vec![0, -5_000, -10_000, -15_000]
        );
    }

    #[test]
    fn elevation_levels_ascending_include_endpoint() {
        let range = VerticalRange::Elevation {
            start: -15_000.0,
            end: 0.0,
        };
        assert_eq!(
            range.levels(5_000.0),
            vec![-15_000, -10_000, -5_000, 0]
        );
    }

    #[test]
    fn uneven_vertical_spacing_is_config_error() {
        let range = VerticalRange::Depth {
            start: 0.0,
            end: 50_000.0,
        };
        let start = pt(-118.5, 34.5);
        let end = pt(-117.5, 34.5);
        let err = Lattice::cross_section(&start, &end, 1_000.0, 7_000.0, range).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn wrong_direction_elevation_spacing_is_config_error() {
        let range = VerticalRange::Elevation {
            start: 0.0,
            end: -15_000.0,
        };
        assert!(range.check(5_000.0).is_err());
        assert!(range.check(-5_000.0).is_ok());
    }

    #[test]
    fn cross_section_shape_matches_path() {
        let start = pt(-118.5, 34.5);
        let end = pt(-117.5, 34.5);
        let range = VerticalRange::Depth {
            start: 0.0,
            end: 10_000.0,
        };
        let lat = Lattice::cross_section(&start, &end, 10_000.0, 5_000.0, range).unwrap();
        // One degree of longitude at 34.5N is about 91.8 km: 9 full steps.
        assert_eq!(lat.num_x(), 10);
        assert_eq!(lat.num_y(), 3);
        assert_eq!(lat.len(), 30);
        assert_eq!(lat.coords().depth_list, vec![0.0, 5_000.0, 10_000.0]);
        assert_eq!(lat.coords().lon_list.len(), lat.num_x());

        // Endpoints of the first row recover the section endpoints.
        let first = lat.point(0, 0);
        let last = lat.point(0, lat.num_x() - 1);
        assert!((first.longitude - start.longitude).abs() < 1e-4);
        assert!((last.longitude - end.longitude).abs() < 0.02);
    }

    #[test]
    fn profile_is_single_column() {
        let at = pt(-118.0, 34.0);
        let range = VerticalRange::Depth {
            start: 0.0,
            end: 3_000.0,
        };
        let lat = Lattice::profile(&at, 1_000.0, range).unwrap();
        assert_eq!(lat.num_x(), 1);
        assert_eq!(lat.num_y(), 4);
        assert_eq!(lat.coords().depth_list, vec![0.0, 1_000.0, 2_000.0, 3_000.0]);
    }
}
