//! Error taxonomy for the analysis stages.
//!
//! Undefined arithmetic (division by zero, log of a non-positive number) is
//! not an error: it is carried as [`crate::Value::Undefined`]. The enums here
//! cover the failures that stop a stage.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to load the polygon dataset or its attribute table.
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("input file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("failed to read {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("attribute table is missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("field {field:?} in record {record} is not a {expected} field")]
    InvalidField { field: String, record: usize, expected: &'static str },

    #[error("record {record} has a non-polygon shape ({shape})")]
    NonPolygonShape { record: usize, shape: String },

    #[error("dataset {} contains no records", .0.display())]
    Empty(PathBuf),

    #[error("unsupported coordinate reference system: {0}")]
    UnsupportedCrs(String),

    #[error("reprojection failed: {0}")]
    Projection(String),
}

/// Failure to fit the least-squares model.
#[derive(Error, Debug, PartialEq)]
pub enum RegressionError {
    #[error("unknown column {0:?}")]
    UnknownColumn(String),

    #[error("need at least {params} complete rows for {params} parameters, found {rows}")]
    TooFewObservations { rows: usize, params: usize },

    #[error("design matrix is singular (column {column:?} is collinear with the others)")]
    Singular { column: String },
}

/// Failure of a spatial diagnostic. Fatal for that diagnostic only.
#[derive(Error, Debug, PartialEq)]
pub enum DiagnosticsError {
    #[error("unknown column {0:?}")]
    UnknownColumn(String),

    #[error("spatial weights have no neighbor pairs ({units} units, all islands)")]
    NoNeighbors { units: usize },

    #[error("need at least {required} analysable units, found {found}")]
    TooFewUnits { found: usize, required: usize },

    #[error("values have zero variance; spatial autocorrelation is undefined")]
    ZeroVariance,

    #[error("{values} values supplied for {units} spatial units")]
    LengthMismatch { values: usize, units: usize },

    #[error("geometry predicate failed: {0}")]
    Geometry(String),
}

/// Failure to read an analysis configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}", .path.display())]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error("invalid config {}", .path.display())]
    Parse { path: PathBuf, #[source] source: serde_json::Error },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Any error raised by the library.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    DataLoad(#[from] DataLoadError),

    #[error(transparent)]
    Regression(#[from] RegressionError),

    #[error(transparent)]
    Diagnostics(#[from] DiagnosticsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unknown column {0:?}")]
    UnknownColumn(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
