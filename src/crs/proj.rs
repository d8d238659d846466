use geo::{Coord, MapCoords, MultiPolygon, Point};
use proj4rs::{proj::Proj as Proj4, transform::transform};

use super::Crs;
use crate::error::DataLoadError;

/// A prepared transformation between two supported systems.
///
/// Geographic systems are given and returned in degrees; the radian
/// conversion proj4rs expects is handled here.
pub struct Reprojector {
    source: Crs,
    target: Crs,
    from: Proj4,
    to: Proj4,
}

impl Reprojector {
    pub fn new(source: Crs, target: Crs) -> Result<Self, DataLoadError> {
        let build = |crs: Crs| Proj4::from_proj_string(crs.proj4())
            .map_err(|e| DataLoadError::Projection(format!("failed to build PROJ.4 for {crs}: {e:?}")));

        Ok(Self { source, target, from: build(source)?, to: build(target)? })
    }

    #[inline] pub fn source(&self) -> Crs { self.source }
    #[inline] pub fn target(&self) -> Crs { self.target }

    /// True when source and target are the same system.
    #[inline]
    pub fn is_identity(&self) -> bool { self.source == self.target }

    pub fn coord(&self, coord: Coord<f64>) -> Result<Coord<f64>, DataLoadError> {
        if self.is_identity() { return Ok(coord) }

        let mut point = if self.source.is_geographic() {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };

        transform(&self.from, &self.to, &mut point)
            .map_err(|e| DataLoadError::Projection(format!(
                "{} -> {} at ({}, {}): {e:?}", self.source, self.target, coord.x, coord.y
            )))?;

        let out = if self.target.is_geographic() {
            Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
        } else {
            Coord { x: point.0, y: point.1 }
        };

        if out.x.is_finite() && out.y.is_finite() { Ok(out) }
        else {
            Err(DataLoadError::Projection(format!(
                "{} -> {} produced a non-finite coordinate for ({}, {})",
                self.source, self.target, coord.x, coord.y
            )))
        }
    }

    pub fn point(&self, point: Point<f64>) -> Result<Point<f64>, DataLoadError> {
        self.coord(point.0).map(Point)
    }

    pub fn multi_polygon(&self, shape: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, DataLoadError> {
        if self.is_identity() { return Ok(shape.clone()) }
        shape.try_map_coords(|coord| self.coord(coord))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn central_meridian_maps_to_false_easting() {
        let reprojector = Reprojector::new(Crs::Wgs84, Crs::Twd97Tm2).unwrap();
        let out = reprojector.coord(Coord { x: 121.0, y: 0.0 }).unwrap();
        assert!((out.x - 250_000.0).abs() < 1e-3, "x = {}", out.x);
        assert!(out.y.abs() < 1e-3, "y = {}", out.y);
    }

    #[test]
    fn round_trip_stays_within_a_millimetre() {
        let forward = Reprojector::new(Crs::Wgs84, Crs::Twd97Tm2).unwrap();
        let back = Reprojector::new(Crs::Twd97Tm2, Crs::Wgs84).unwrap();
        let science_park = Coord { x: 120.9964, y: 24.7935 };

        let metric = forward.coord(science_park).unwrap();
        assert!(metric.x > 240_000.0 && metric.x < 260_000.0);
        assert!(metric.y > 2_730_000.0 && metric.y < 2_760_000.0);

        let lonlat = back.coord(metric).unwrap();
        assert!((lonlat.x - science_park.x).abs() < 1e-8);
        assert!((lonlat.y - science_park.y).abs() < 1e-8);
    }

    #[test]
    fn identity_returns_input() {
        let reprojector = Reprojector::new(Crs::Twd97Tm2, Crs::Twd97Tm2).unwrap();
        let coord = Coord { x: 247_000.5, y: 2_743_000.25 };
        assert_eq!(reprojector.coord(coord).unwrap(), coord);
    }
}
