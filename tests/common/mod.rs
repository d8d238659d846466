// Synthetic Hsinchu-like village grids shared by the integration tests.

use geo::{polygon, MultiPolygon};
use incomescope::{
    unit::{Attribute, BaseAttributes, SpatialUnit, UnitIdentity},
    Crs, Dataset, Value,
};

/// Lower-left corner of the grid in TWD97 / TM2, a few km west of the Science Park.
const ORIGIN: (f64, f64) = (244_000.0, 2_740_000.0);
const CELL: f64 = 500.0;

/// `side` x `side` square villages. Income per capita is high in the western
/// half and low in the eastern half; the other attributes vary without pattern.
/// The last village has no residents.
pub fn villages(side: usize) -> Dataset {
    let n = side * side;
    let units = (0..n)
        .map(|k| {
            let (col, row) = (k % side, k / side);
            let x = ORIGIN.0 + col as f64 * CELL;
            let y = ORIGIN.1 + row as f64 * CELL;

            let population = if k == n - 1 { 0.0 } else { 800.0 + (k * 137 % 400) as f64 };
            let per_capita = if col < side / 2 { 400.0 + (k * 13 % 50) as f64 } else { 250.0 + (k * 17 % 50) as f64 };
            let attributes = BaseAttributes::from_fn(|a| Value::Valid(match a {
                Attribute::Population => population,
                Attribute::Households => (population / (2.5 + (k % 5) as f64 * 0.2)).round(),
                Attribute::Income => per_capita * population,
                Attribute::Tertiary => (population * (0.2 + (k * 7 % 11) as f64 / 40.0)).round(),
                Attribute::Indigenous => (population * (k * 3 % 7) as f64 / 100.0).round(),
                Attribute::PopDensity => 5_000.0 + (k * 53 % 900) as f64 * 10.0,
                Attribute::AgingIndex => 60.0 + (k * 29 % 80) as f64,
                Attribute::SexRatio => 95.0 + (k * 11 % 9) as f64,
            }));

            SpatialUnit {
                identity: UnitIdentity::new(&format!("10018{k:03}"), &format!("Village {k}"), if col < side / 2 { "North" } else { "East" }),
                geometry: MultiPolygon(vec![polygon![
                    (x: x, y: y), (x: x + CELL, y: y), (x: x + CELL, y: y + CELL), (x: x, y: y + CELL),
                ]]),
                attributes,
            }
        })
        .collect();

    Dataset::from_units(units, Crs::METRIC)
}
