use std::path::{Path, PathBuf};

use geo::{BoundingRect, Rect};
use tracing::{debug, info, warn};

use crate::{
    crs::{Crs, Reprojector},
    error::DataLoadError,
    io::shp,
    schema::Schema,
    unit::{BaseAttributes, SpatialUnit, UnitIdentity},
    Value,
};

/// The loaded polygon dataset, in the metric CRS.
#[derive(Debug, Clone)]
pub struct Dataset {
    source: Option<PathBuf>,
    source_crs: Crs,
    crs: Crs,
    units: Vec<SpatialUnit>,
}

impl Dataset {
    /// Wrap units that are already in `crs`.
    pub fn from_units(units: Vec<SpatialUnit>, crs: Crs) -> Self {
        Self { source: None, source_crs: crs, crs, units }
    }

    /// Load a shapefile, validate it against `schema`, and reproject it to `target`.
    pub fn load(path: &Path, schema: &Schema, target: Crs) -> Result<Self, DataLoadError> {
        let items = shp::read_shapefile(path)?;
        let Some((_, first)) = items.first() else {
            return Err(DataLoadError::Empty(path.to_path_buf()));
        };

        let fields = shp::field_names(first);
        schema.validate(fields.iter().map(String::as_str))?;
        debug!(records = items.len(), fields = fields.len(), "schema validated");

        let mut units = Vec::with_capacity(items.len());
        for (row, (shape, record)) in items.iter().enumerate() {
            let geometry = shp::shape_to_geo(shape).ok_or_else(|| DataLoadError::NonPolygonShape {
                record: row,
                shape: shp::shape_kind(shape).to_string(),
            })?;

            let identity = UnitIdentity::new(
                &shp::text_field(record, &schema.code, row)?,
                &shp::text_field(record, &schema.name, row)?,
                &shp::text_field(record, &schema.district, row)?,
            );

            let mut failure = None;
            let attributes = BaseAttributes::from_fn(|attribute| {
                match shp::numeric_field(record, schema.field(attribute), row) {
                    Ok(value) => Value::from_option(value),
                    Err(e) => {
                        failure.get_or_insert(e);
                        Value::from_option(None)
                    }
                }
            });
            if let Some(e) = failure { return Err(e) }

            units.push(SpatialUnit { identity, geometry, attributes });
        }

        let source_crs = match Crs::from_shapefile(path) {
            Ok(Some(crs)) => crs,
            Ok(None) => {
                let crs = bounds(&units).map_or(target, |b| Crs::guess_from_bounds(&b));
                warn!(path = %path.display(), guessed = %crs, "no .prj sidecar, inferring CRS from coordinate bounds");
                crs
            }
            Err(wkt) => return Err(DataLoadError::UnsupportedCrs(wkt)),
        };

        let dataset = Self { source: Some(path.to_path_buf()), source_crs, crs: source_crs, units }
            .reproject(target)?;

        info!(
            path = %path.display(), units = dataset.len(), source_crs = %source_crs, crs = %dataset.crs,
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Reproject every geometry to `target`. A no-op when already there.
    pub fn reproject(self, target: Crs) -> Result<Self, DataLoadError> {
        if self.crs == target { return Ok(self) }

        let reprojector = Reprojector::new(self.crs, target)?;
        let units = self.units.into_iter()
            .map(|unit| reprojector.multi_polygon(&unit.geometry).map(|geometry| SpatialUnit { geometry, ..unit }))
            .collect::<Result<Vec<_>, DataLoadError>>()?;

        debug!(from = %self.crs, to = %target, "reprojected geometries");
        Ok(Self { units, crs: target, ..self })
    }

    #[inline] pub fn len(&self) -> usize { self.units.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.units.is_empty() }

    #[inline] pub fn units(&self) -> &[SpatialUnit] { &self.units }

    /// CRS of the geometries.
    #[inline] pub fn crs(&self) -> Crs { self.crs }

    /// CRS the data was stored in before reprojection.
    #[inline] pub fn source_crs(&self) -> Crs { self.source_crs }

    #[inline] pub fn source(&self) -> Option<&Path> { self.source.as_deref() }

    /// Bounding box of every geometry.
    pub fn bounds(&self) -> Option<Rect<f64>> { bounds(&self.units) }
}

fn bounds(units: &[SpatialUnit]) -> Option<Rect<f64>> {
    units.iter()
        .filter_map(|unit| unit.geometry.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
            )
        })
}
