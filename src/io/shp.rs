use std::{collections::BTreeMap, path::Path};

use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile::{dbase::{FieldValue, Record}, PolygonRing, Reader, Shape};

use crate::error::DataLoadError;

/// Read every shape and attribute record from a `.shp` file (and its `.dbf` sidecar).
pub fn read_shapefile(path: &Path) -> Result<Vec<(Shape, Record)>, DataLoadError> {
    if !path.exists() { return Err(DataLoadError::MissingFile(path.to_path_buf())) }

    let unreadable = |reason: String| DataLoadError::Unreadable { path: path.to_path_buf(), reason };

    let mut reader = Reader::from_path(path).map_err(|e| unreadable(e.to_string()))?;
    let mut items = Vec::with_capacity(reader.shape_count().map_err(|e| unreadable(e.to_string()))?);
    for (i, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result.map_err(|e| unreadable(format!("record {i}: {e}")))?;
        items.push((shape, record));
    }

    Ok(items)
}

/// Attribute field names of a record, sorted.
pub fn field_names(record: &Record) -> Vec<String> {
    let mut names = record.clone().into_iter().map(|(name, _)| name).collect::<Vec<_>>();
    names.sort();
    names
}

/// Human-readable name of a shape's type.
pub fn shape_kind(shape: &Shape) -> &'static str {
    match shape {
        Shape::NullShape => "Null",
        Shape::Point(_) | Shape::PointM(_) | Shape::PointZ(_) => "Point",
        Shape::Polyline(_) | Shape::PolylineM(_) | Shape::PolylineZ(_) => "Polyline",
        Shape::Polygon(_) | Shape::PolygonM(_) | Shape::PolygonZ(_) => "Polygon",
        Shape::Multipoint(_) | Shape::MultipointM(_) | Shape::MultipointZ(_) => "Multipoint",
        Shape::Multipatch(_) => "Multipatch",
    }
}

/// Convert a polygon shape (of any dimension) to a MultiPolygon.
/// Null shapes become an empty MultiPolygon; anything else is `None`.
pub fn shape_to_geo(shape: &Shape) -> Option<MultiPolygon<f64>> {
    macro_rules! rings {
        ($polygon:expr) => {
            $polygon.rings().iter()
                .map(|ring| {
                    let coords = ring.points().iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect();
                    (matches!(ring, PolygonRing::Outer(_)), coords)
                })
                .collect()
        };
    }

    match shape {
        Shape::NullShape => Some(MultiPolygon(Vec::new())),
        Shape::Polygon(p) => Some(rings_to_geo(rings!(p))),
        Shape::PolygonM(p) => Some(rings_to_geo(rings!(p))),
        Shape::PolygonZ(p) => Some(rings_to_geo(rings!(p))),
        _ => None,
    }
}

/// Assemble tagged `(outer, coords)` rings into polygons. Each outer ring is
/// followed by its holes. An inner ring with no open exterior starts a polygon
/// of its own, so files wound counter-clockwise still keep their shapes.
fn rings_to_geo(rings: Vec<(bool, Vec<Coord<f64>>)>) -> MultiPolygon<f64> {
    /// Ensure first and last are the same for geo::LineString coords
    fn ensure_closed(coords: &mut Vec<Coord<f64>>) {
        if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
            if first != last { coords.push(first) }
        }
    }

    let mut polygons = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes = Vec::new();

    for (outer, mut coords) in rings {
        ensure_closed(&mut coords);
        if coords.len() < 4 { continue }

        if outer || exterior.is_none() {
            if let Some(ext) = exterior.take() {
                polygons.push(Polygon::new(ext, std::mem::take(&mut holes)));
            }
            exterior = Some(LineString(coords));
        } else {
            holes.push(LineString(coords));
        }
    }
    if let Some(ext) = exterior {
        polygons.push(Polygon::new(ext, holes));
    }

    MultiPolygon(polygons)
}

/// A numeric field, `Ok(None)` when empty. Numbers stored as text are accepted.
pub fn numeric_field(record: &Record, field: &str, row: usize) -> Result<Option<f64>, DataLoadError> {
    let invalid = || DataLoadError::InvalidField { field: field.to_string(), record: row, expected: "numeric" };

    match record.get(field) {
        Some(FieldValue::Numeric(n)) => Ok(*n),
        Some(FieldValue::Float(f)) => Ok(f.map(f64::from)),
        Some(FieldValue::Double(d)) => Ok(Some(*d)),
        Some(FieldValue::Integer(i)) => Ok(Some(f64::from(*i))),
        Some(FieldValue::Currency(c)) => Ok(Some(*c)),
        Some(FieldValue::Character(None)) => Ok(None),
        Some(FieldValue::Character(Some(s))) if s.trim().is_empty() => Ok(None),
        Some(FieldValue::Character(Some(s))) => s.trim().parse().map(Some).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// A text field, trimmed. Numeric codes are formatted without a fractional part.
pub fn text_field(record: &Record, field: &str, row: usize) -> Result<String, DataLoadError> {
    match record.get(field) {
        Some(FieldValue::Character(s)) => Ok(s.as_deref().unwrap_or_default().trim().to_string()),
        Some(FieldValue::Memo(s)) => Ok(s.trim().to_string()),
        Some(FieldValue::Numeric(Some(n))) if n.fract() == 0.0 => Ok(format!("{n:.0}")),
        Some(FieldValue::Integer(i)) => Ok(i.to_string()),
        _ => Err(DataLoadError::InvalidField { field: field.to_string(), record: row, expected: "text" }),
    }
}

/// Display form of a single attribute value.
pub fn display_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Character(s) => s.as_deref().unwrap_or_default().trim().to_string(),
        FieldValue::Memo(s) => s.trim().to_string(),
        FieldValue::Numeric(Some(n)) => n.to_string(),
        FieldValue::Float(Some(f)) => f.to_string(),
        FieldValue::Double(d) | FieldValue::Currency(d) => d.to_string(),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Logical(Some(b)) => b.to_string(),
        FieldValue::Numeric(None) | FieldValue::Float(None) | FieldValue::Logical(None) => String::new(),
        other => format!("{other:?}"),
    }
}

/// Structure of a shapefile at a glance.
#[derive(Debug)]
pub struct Inspection {
    pub records: usize,
    pub fields: Vec<String>,
    pub shape_kinds: BTreeMap<&'static str, usize>,
    pub sample: Vec<Vec<(String, String)>>,
}

/// Summarize fields, geometry mix, and the first `n` records of a shapefile.
pub fn inspect(items: &[(Shape, Record)], n: usize) -> Inspection {
    let mut shape_kinds = BTreeMap::new();
    for (shape, _) in items {
        *shape_kinds.entry(shape_kind(shape)).or_default() += 1;
    }

    let fields = items.first().map(|(_, record)| field_names(record)).unwrap_or_default();
    let sample = items.iter().take(n)
        .map(|(_, record)| fields.iter()
            .map(|f| (f.clone(), record.get(f).map(display_value).unwrap_or_default()))
            .collect())
        .collect();

    Inspection { records: items.len(), fields, shape_kinds, sample }
}
