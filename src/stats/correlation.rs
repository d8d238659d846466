use ndarray::{Array1, Array2};
use serde::Serialize;

use crate::{error::Error, table::AnalysisTable, Value};

/// Pearson correlation matrix over rows where every column is defined.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// `None` where a column has zero variance over the complete rows.
    pub matrix: Array2<Option<f64>>,
    pub rows_used: usize,
    pub rows_excluded: usize,
    /// Columns with zero variance; their rows and columns are `None`, diagonal included.
    pub degenerate: Vec<String>,
}

impl CorrelationMatrix {
    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.matrix[(self.position(a)?, self.position(b)?)]
    }

    /// Correlations of every other column with `column`, highest first.
    pub fn with(&self, column: &str) -> Vec<(&str, Option<f64>)> {
        let Some(i) = self.position(column) else { return Vec::new() };
        let mut pairs = self.columns.iter().enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(j, name)| (name.as_str(), self.matrix[(i, j)]))
            .collect::<Vec<_>>();
        pairs.sort_by(|a, b| {
            let key = |r: Option<f64>| r.unwrap_or(f64::NEG_INFINITY);
            key(b.1).total_cmp(&key(a.1))
        });
        pairs
    }

    /// Nested rows for serialization.
    pub fn rows(&self) -> Vec<Vec<Option<f64>>> {
        self.matrix.rows().into_iter().map(|row| row.to_vec()).collect()
    }
}

impl Serialize for CorrelationMatrix {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Repr<'a> {
            columns: &'a [String],
            matrix: Vec<Vec<Option<f64>>>,
            rows_used: usize,
            rows_excluded: usize,
            degenerate: &'a [String],
        }

        Repr {
            columns: &self.columns,
            matrix: self.rows(),
            rows_used: self.rows_used,
            rows_excluded: self.rows_excluded,
            degenerate: &self.degenerate,
        }.serialize(serializer)
    }
}

/// Correlate the given table columns, dropping any row with an undefined value in any of them.
pub fn correlation_matrix(table: &AnalysisTable, columns: &[&str]) -> Result<CorrelationMatrix, Error> {
    let rows = table.complete_rows(columns)?;
    let data = columns.iter()
        .map(|&name| {
            let column = table.require(name)?;
            Ok(rows.iter().filter_map(|&r| column[r].get()).collect::<Array1<f64>>())
        })
        .collect::<Result<Vec<_>, Error>>()?;

    // Centered columns and their norms
    let centered = data.into_iter()
        .map(|x| {
            let mean = x.mean().unwrap_or(0.0);
            let x = x - mean;
            let norm = x.dot(&x).sqrt();
            (x, norm)
        })
        .collect::<Vec<_>>();

    let k = columns.len();
    let degenerate = (0..k).filter(|&i| !(centered[i].1 > 0.0)).collect::<Vec<_>>();

    let matrix = Array2::from_shape_fn((k, k), |(i, j)| {
        if degenerate.contains(&i) || degenerate.contains(&j) { return None }
        if i == j { return Some(1.0) }
        let ((x, nx), (y, ny)) = (&centered[i], &centered[j]);
        Some((x.dot(y) / (nx * ny)).clamp(-1.0, 1.0))
    });

    Ok(CorrelationMatrix {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        matrix,
        rows_used: rows.len(),
        rows_excluded: table.len() - rows.len(),
        degenerate: degenerate.into_iter().map(|i| columns[i].to_string()).collect(),
    })
}

/// Pearson correlation of two columns over the rows where both are defined.
pub fn pearson(x: &[Value], y: &[Value]) -> (Option<f64>, usize) {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x.iter().zip(y)
        .filter_map(|(a, b)| Some((a.get()?, b.get()?)))
        .unzip();
    let n = xs.len();
    if n < 2 { return (None, n) }

    let (x, y) = (Array1::from(xs), Array1::from(ys));
    let (x, y) = (&x - x.mean().unwrap_or(0.0), &y - y.mean().unwrap_or(0.0));
    let denom = (x.dot(&x) * y.dot(&y)).sqrt();

    ((denom > 0.0).then(|| (x.dot(&y) / denom).clamp(-1.0, 1.0)), n)
}
