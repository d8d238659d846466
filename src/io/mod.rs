//! Reading and writing, organized by format.
//!
//! - `shp` - ESRI shapefile input
//! - `csv` - tabular output (enriched table, statistics)
//! - `geojson` - enriched geometry output
//! - `svg` - static maps and charts
//! - `html` - interactive Leaflet map
//! - `report` - text and JSON run reports
//!
//! Every writer goes through [`fs::write_atomic`], so a failed export never
//! leaves a partial file behind.

pub mod csv;
pub mod fs;
pub mod geojson;
pub mod html;
pub mod report;
pub mod shp;
pub mod svg;
