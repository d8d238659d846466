use std::sync::Arc;

use geo::Point;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    crs::{Crs, Reprojector},
    error::DataLoadError,
    stats::{bottom_k, describe, Ranked, Summary},
    table::AnalysisTable,
    Undefined, Value,
};

/// A named fixed location, in geodetic degrees (WGS84).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub name: String,
    /// Short identifier used in column names, e.g. `science_park`.
    pub slug: String,
    pub lat: f64,
    pub lon: f64,
}

impl Landmark {
    pub fn new(name: &str, slug: &str, lat: f64, lon: f64) -> Self {
        Self { name: name.into(), slug: slug.into(), lat, lon }
    }

    /// Hsinchu Science Park and Hsinchu Air Base.
    pub fn hsinchu() -> Vec<Landmark> {
        vec![
            Landmark::new("Hsinchu Science Park", "science_park", 24.7935, 120.9964),
            Landmark::new("Hsinchu Air Base", "airbase", 24.8180, 120.9394),
        ]
    }

    pub fn meters_column(&self) -> String { format!("dist_to_{}_m", self.slug) }

    pub fn km_column(&self) -> String { format!("dist_to_{}_km", self.slug) }

    /// Location in `crs`. The conversion only ever runs geodetic to planar.
    pub fn locate(&self, crs: Crs) -> Result<Point<f64>, DataLoadError> {
        Reprojector::new(Crs::Wgs84, crs)?.point(Point::new(self.lon, self.lat))
    }
}

/// Straight-line distances from every unit's centroid to one landmark.
#[derive(Debug, Clone)]
pub struct LandmarkDistances {
    pub landmark: Landmark,
    /// The landmark in the metric CRS.
    pub location: Point<f64>,
    pub meters: Arc<[Value]>,
}

impl LandmarkDistances {
    pub fn kilometers(&self) -> Vec<Value> {
        self.meters.iter().map(|m| m.map(|m| m / 1000.0)).collect()
    }

    /// The `k` closest units, nearest first.
    pub fn nearest(&self, k: usize) -> Vec<Ranked> {
        bottom_k(&self.meters, k)
    }

    /// Summary of the distances in kilometres.
    pub fn summary(&self) -> Summary {
        describe(&self.landmark.km_column(), &self.kilometers())
    }
}

/// Planar Euclidean distance.
#[inline]
pub fn planar_distance(a: Point<f64>, b: Point<f64>) -> f64 {
    (a.x() - b.x()).hypot(a.y() - b.y())
}

/// Distances from each centroid (in the metric CRS `crs`) to each landmark.
/// A unit without a centroid gets an undefined distance.
pub fn landmark_distances(
    centroids: &[Option<Point<f64>>],
    landmarks: &[Landmark],
    crs: Crs,
) -> Result<Vec<LandmarkDistances>, DataLoadError> {
    if crs.is_geographic() {
        return Err(DataLoadError::Projection(format!("{crs} is not a planar system; distances need metres")));
    }

    landmarks.iter()
        .map(|landmark| {
            let location = landmark.locate(crs)?;
            debug!(landmark = %landmark.name, x = location.x(), y = location.y(), "landmark located");

            let meters = centroids.iter()
                .map(|c| c.map_or(Value::Undefined(Undefined::Missing), |c| Value::new(planar_distance(c, location))))
                .collect();

            Ok(LandmarkDistances { landmark: landmark.clone(), location, meters })
        })
        .collect()
}

/// Append `dist_to_<slug>_m` and `dist_to_<slug>_km` for every landmark.
pub fn with_distances(table: &AnalysisTable, distances: &[LandmarkDistances]) -> AnalysisTable {
    let table = table.with_columns(distances.iter().flat_map(|d| [
        (d.landmark.meters_column(), d.meters.clone()),
        (d.landmark.km_column(), Arc::from(d.kilometers())),
    ]));
    info!(landmarks = distances.len(), "added landmark distances");
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric_and_zero_only_at_coincidence() {
        let a = Point::new(250_000.0, 2_743_000.0);
        let b = Point::new(253_000.0, 2_747_000.0);

        assert_eq!(planar_distance(a, b), 5_000.0);
        assert_eq!(planar_distance(a, b), planar_distance(b, a));
        assert_eq!(planar_distance(a, a), 0.0);
        assert!(planar_distance(a, Point::new(250_000.0, 2_743_000.001)) > 0.0);
    }

    #[test]
    fn landmark_at_a_centroid_has_zero_distance() {
        let landmarks = Landmark::hsinchu();
        let science_park = landmarks[0].locate(Crs::METRIC).unwrap();
        let centroids = [Some(science_park), Some(Point::new(science_park.x() + 300.0, science_park.y() + 400.0)), None];

        let distances = landmark_distances(&centroids, &landmarks[..1], Crs::METRIC).unwrap();
        let d = &distances[0];

        assert_eq!(d.meters[0], Value::Valid(0.0));
        assert!((d.meters[1].get().unwrap() - 500.0).abs() < 1e-6);
        assert_eq!(d.meters[2], Value::Undefined(Undefined::Missing));
        assert!((d.kilometers()[1].get().unwrap() - 0.5).abs() < 1e-9);

        assert_eq!(d.nearest(5).iter().map(|r| r.row).collect::<Vec<_>>(), vec![0, 1]);
        let summary = d.summary();
        assert_eq!((summary.count, summary.excluded), (2, 1));
        assert_eq!(summary.column, "dist_to_science_park_km");
    }

    #[test]
    fn landmarks_are_about_six_kilometres_apart() {
        let [science_park, airbase] = <[Landmark; 2]>::try_from(Landmark::hsinchu()).unwrap();
        let distance = planar_distance(
            science_park.locate(Crs::METRIC).unwrap(),
            airbase.locate(Crs::METRIC).unwrap(),
        );
        assert!((5_500.0..6_800.0).contains(&distance), "distance = {distance}");
    }

    #[test]
    fn geographic_target_is_rejected() {
        assert!(landmark_distances(&[], &Landmark::hsinchu(), Crs::Wgs84).is_err());
    }

    #[test]
    fn columns_follow_slug() {
        let airbase = &Landmark::hsinchu()[1];
        assert_eq!(airbase.meters_column(), "dist_to_airbase_m");
        assert_eq!(airbase.km_column(), "dist_to_airbase_km");
    }
}
