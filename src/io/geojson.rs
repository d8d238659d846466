//! GeoJSON export of the enriched units.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use geo::{orient::{Direction, Orient}, MultiPolygon};
use serde_json::{json, Map, Value as Json};
use tracing::info;

use crate::{crs::{Crs, Reprojector}, dataset::Dataset, io::fs::write_atomic, table::AnalysisTable};

/// Build a FeatureCollection of `dataset` reprojected to `crs`, with every
/// table column as a property. Undefined values become `null`.
pub fn to_geojson(dataset: &Dataset, table: &AnalysisTable, crs: Crs) -> Result<Json> {
    ensure!(
        dataset.len() == table.len(),
        "[io::geojson] Geometry count ({}) does not match table rows ({})",
        dataset.len(),
        table.len()
    );
    let reprojector = Reprojector::new(dataset.crs(), crs)?;
    let names = table.names().collect::<Vec<_>>();

    let features = dataset.units().iter().zip(table.identities()).enumerate()
        .map(|(row, (unit, identity))| {
            let geometry = reprojector.multi_polygon(&unit.geometry)
                .with_context(|| format!("[io::geojson] Failed to reproject unit {}", identity.code))?;

            let mut properties = Map::new();
            properties.insert("code".into(), json!(identity.code));
            properties.insert("name".into(), json!(identity.name));
            properties.insert("district".into(), json!(identity.district));
            for &name in &names {
                if let Some(column) = table.column(name) {
                    properties.insert(name.into(), json!(column[row]));
                }
            }

            Ok(json!({
                "type": "Feature",
                "id": identity.code,
                "geometry": multipolygon_to_geojson(&geometry),
                "properties": properties,
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(json!({
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", crs.epsg()) } },
        "features": features,
    }))
}

/// Write the FeatureCollection to `path`.
pub fn write_geojson(dataset: &Dataset, table: &AnalysisTable, crs: Crs, path: &Path) -> Result<()> {
    let collection = to_geojson(dataset, table, crs)?;
    write_atomic(path, |w| Ok(serde_json::to_writer(w, &collection)?))
        .with_context(|| format!("[io::geojson] Failed to write {}", path.display()))?;
    info!(path = %path.display(), features = dataset.len(), %crs, "wrote GeoJSON");
    Ok(())
}

/// GeoJSON geometry of a MultiPolygon: per polygon the exterior ring, then its holes.
/// Exteriors are wound counter-clockwise and holes clockwise (RFC 7946).
fn multipolygon_to_geojson(mp: &MultiPolygon<f64>) -> Json {
    let polygons = mp.orient(Direction::Default).0.iter()
        .map(|polygon| {
            std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect::<Vec<_>>())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    json!({
        "type": "MultiPolygon",
        "coordinates": polygons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    use crate::{
        derive::derive,
        unit::{BaseAttributes, SpatialUnit, UnitIdentity},
        Value,
    };

    fn dataset() -> Dataset {
        let unit = |code: &str, x: f64, income: f64| SpatialUnit {
            identity: UnitIdentity::new(code, "Village", "East"),
            geometry: MultiPolygon(vec![polygon![
                (x: 250_000.0 + x, y: 2_740_000.0),
                (x: 251_000.0 + x, y: 2_740_000.0),
                (x: 251_000.0 + x, y: 2_741_000.0),
                (x: 250_000.0 + x, y: 2_741_000.0),
            ]]),
            attributes: BaseAttributes::from_fn(|_| Value::Valid(income)),
        };
        Dataset::from_units(vec![unit("001", 0.0, 100.0), unit("002", 1_000.0, 0.0)], Crs::METRIC)
    }

    #[test]
    fn features_carry_attributes_in_wgs84() {
        let dataset = dataset();
        let table = derive(&dataset).table;
        let collection = to_geojson(&dataset, &table, Crs::Wgs84).unwrap();

        let features = collection["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["properties"]["code"], "001");
        assert_eq!(features[0]["properties"]["POPULATION"], 100.0);
        // income per capita of the second unit divides by zero
        assert!(features[1]["properties"]["income_per_capita"].is_null());

        let ring = &features[0]["geometry"]["coordinates"][0][0];
        let lon = ring[0][0].as_f64().unwrap();
        let lat = ring[0][1].as_f64().unwrap();
        assert!((120.0..122.0).contains(&lon) && (24.0..26.0).contains(&lat), "{lon}, {lat}");
    }

    /// Twice the signed area of a GeoJSON ring; positive when counter-clockwise.
    fn winding(ring: &Json) -> f64 {
        let pts = ring.as_array().unwrap().iter()
            .map(|p| (p[0].as_f64().unwrap(), p[1].as_f64().unwrap()))
            .collect::<Vec<_>>();
        pts.windows(2).map(|w| w[0].0 * w[1].1 - w[1].0 * w[0].1).sum()
    }

    #[test]
    fn rings_follow_the_right_hand_rule() {
        // shapefile winding: clockwise exterior, counter-clockwise hole
        let mp = MultiPolygon(vec![geo::Polygon::new(
            geo::LineString::from(vec![(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0), (0.0, 0.0)]),
            vec![geo::LineString::from(vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0), (1.0, 1.0)])],
        )]);
        let geometry = multipolygon_to_geojson(&mp);
        let rings = &geometry["coordinates"][0];

        assert!(winding(&rings[0]) > 0.0);
        assert!(winding(&rings[1]) < 0.0);
    }

    #[test]
    fn writes_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("villages.geojson");
        let dataset = dataset();

        write_geojson(&dataset, &derive(&dataset).table, Crs::Wgs84, &path).unwrap();
        let parsed: Json = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["type"], "FeatureCollection");
    }
}
