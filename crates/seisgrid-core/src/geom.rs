#![forbid(unsafe_code)]

pub type Unit = euclid::UnknownUnit;

/// Planar (projected) coordinates in meters.
pub type PlanarPoint = euclid::Point2D<f64, Unit>;
pub type PlanarVector = euclid::Vector2D<f64, Unit>;

pub fn planar(x: f64, y: f64) -> PlanarPoint {
    euclid::point2(x, y)
}
