//! SVG rendering of maps and charts.

mod color;
mod map;
mod writer;

pub use color::{diverging_color, hotspot_color, lisa_color, Rgb, NO_DATA};
pub use map::*;
pub(crate) use writer::escape;
