#![doc = "Socioeconomic and spatial analysis of Hsinchu villages"]
pub mod config;
pub mod crs;
pub mod dataset;
pub mod derive;
pub mod distance;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod schema;
pub mod spatial;
pub mod stats;
pub mod table;
pub mod unit;
pub mod value;

#[doc(inline)]
pub use config::AnalysisConfig;

#[doc(inline)]
pub use crs::Crs;

#[doc(inline)]
pub use dataset::Dataset;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use pipeline::{Analysis, Report, Stages};

#[doc(inline)]
pub use table::AnalysisTable;

#[doc(inline)]
pub use value::{Undefined, Value};
