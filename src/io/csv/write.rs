//! CSV writing operations.

use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::{Column, CsvWriter}};

use crate::{io::fs::write_atomic, stats::{CorrelationMatrix, Summary}, table::AnalysisTable};

/// Write a DataFrame as CSV to any writer.
pub(crate) fn write_csv_to(df: &mut DataFrame, writer: &mut dyn Write) -> Result<()> {
    CsvWriter::new(writer)
        .include_header(true)
        .finish(df)
        .context("[io::csv::write] Failed to write CSV")
}

/// Write a DataFrame to a CSV file.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    write_atomic(path, |w| write_csv_to(df, w))
        .with_context(|| format!("[io::csv::write] Failed to write CSV to {}", path.display()))
}

/// Enriched table: identity columns, then every numeric column, undefined values empty.
pub fn write_table(table: &AnalysisTable, path: &Path) -> Result<()> {
    let mut df = table.to_dataframe()
        .context("[io::csv::write] Failed to build DataFrame from the analysis table")?;
    write_csv(&mut df, path)
}

/// Descriptive statistics, one row per column, with the coefficient of variation.
pub fn summaries_frame(summaries: &[Summary]) -> Result<DataFrame> {
    let stat = |f: fn(&Summary) -> Option<f64>| summaries.iter().map(f).collect::<Vec<_>>();

    Ok(DataFrame::new(vec![
        Column::new("column".into(), summaries.iter().map(|s| s.column.as_str()).collect::<Vec<_>>()),
        Column::new("count".into(), summaries.iter().map(|s| s.count as u64).collect::<Vec<_>>()),
        Column::new("excluded".into(), summaries.iter().map(|s| s.excluded as u64).collect::<Vec<_>>()),
        Column::new("mean".into(), stat(|s| s.mean)),
        Column::new("std".into(), stat(|s| s.std)),
        Column::new("min".into(), stat(|s| s.min)),
        Column::new("25%".into(), stat(|s| s.q25)),
        Column::new("50%".into(), stat(|s| s.median)),
        Column::new("75%".into(), stat(|s| s.q75)),
        Column::new("max".into(), stat(|s| s.max)),
        Column::new("cv".into(), stat(Summary::cv)),
    ])?)
}

pub fn write_summaries(summaries: &[Summary], path: &Path) -> Result<()> {
    write_csv(&mut summaries_frame(summaries)?, path)
}

/// Correlation matrix with a leading `column` label column; undefined entries empty.
pub fn write_correlation(matrix: &CorrelationMatrix, path: &Path) -> Result<()> {
    let mut columns = vec![Column::new("column".into(), matrix.columns.clone())];
    columns.extend(matrix.columns.iter().enumerate().map(|(j, name)| {
        Column::new(name.as_str().into(), matrix.matrix.column(j).to_vec())
    }));
    write_csv(&mut DataFrame::new(columns)?, path)
}
