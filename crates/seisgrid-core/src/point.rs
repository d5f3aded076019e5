use crate::error::{Error, Result};

/// Vertical coordinate of a query point. Exactly one of depth or elevation
/// applies per query mode; the toolkit is invoked with `gd` for depth-based
/// queries and `ge` for elevation-based ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerticalCoord {
    /// Meters below the free surface. Never negative.
    Depth(f64),
    /// Meters relative to sea level, signed.
    Elevation(f64),
}

impl VerticalCoord {
    pub fn value(&self) -> f64 {
        match self {
            VerticalCoord::Depth(v) | VerticalCoord::Elevation(v) => *v,
        }
    }

    pub fn is_elevation(&self) -> bool {
        matches!(self, VerticalCoord::Elevation(_))
    }
}

/// A point in WGS84 longitude/latitude, with a depth or an elevation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
    pub vertical: VerticalCoord,
}

impl GeoPoint {
    pub fn at_depth(longitude: f64, latitude: f64, depth: f64) -> Result<Self> {
        if !depth.is_finite() || depth < 0.0 {
            return Err(Error::config(format!(
                "depth must be a non-negative number, got {depth}"
            )));
        }
        Ok(Self {
            longitude,
            latitude,
            vertical: VerticalCoord::Depth(depth),
        })
    }

    pub fn at_elevation(longitude: f64, latitude: f64, elevation: f64) -> Result<Self> {
        if !elevation.is_finite() {
            return Err(Error::config(format!(
                "elevation must be a finite number, got {elevation}"
            )));
        }
        Ok(Self {
            longitude,
            latitude,
            vertical: VerticalCoord::Elevation(elevation),
        })
    }

    /// The stdin line the query tool expects: `lon lat depth-or-elevation`,
    /// fixed 5-decimal format.
    pub fn query_line(&self) -> String {
        format!(
            "{:.5} {:.5} {:.5}\n",
            self.longitude,
            self.latitude,
            self.vertical.value()
        )
    }

    /// 2-column variant for the vs30/basin-depth query tools.
    pub fn surface_query_line(&self) -> String {
        format!("{:.5} {:.5}\n", self.longitude, self.latitude)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.4}, {:.4}, {:.4})",
            self.longitude,
            self.latitude,
            self.vertical.value()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_depth_is_rejected() {
        assert!(GeoPoint::at_depth(-118.0, 34.0, -10.0).is_err());
        assert!(GeoPoint::at_depth(-118.0, 34.0, 0.0).is_ok());
    }

    #[test]
    fn negative_elevation_is_allowed() {
        let p = GeoPoint::at_elevation(-118.0, 34.0, -15000.0).unwrap();
        assert_eq!(p.vertical, VerticalCoord::Elevation(-15000.0));
    }

    #[test]
    fn query_line_uses_five_decimals() {
        let p = GeoPoint::at_depth(-118.123456, 34.5, 1000.0).unwrap();
        assert_eq!(p.query_line(), "-118.12346 34.50000 1000.00000\n");
        assert_eq!(p.surface_query_line(), "-118.12346 34.50000\n");
    }
}
