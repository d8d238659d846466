//! CSV writing of analysis tables and statistics.

mod write;

pub use write::*;
