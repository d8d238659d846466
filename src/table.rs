use std::sync::Arc;

use ahash::AHashMap;
use polars::prelude::*;

use crate::{error::Error, unit::UnitIdentity, Value};

/// The enriched attribute table: identity columns plus named numeric columns.
///
/// Immutable. Adding columns returns a new table that shares the existing
/// column buffers, so every stage can hand its output to the next one
/// without copying or mutating earlier results.
#[derive(Debug, Clone)]
pub struct AnalysisTable {
    identities: Arc<[UnitIdentity]>,
    names: Vec<Arc<str>>,
    columns: Vec<Arc<[Value]>>,
    index: AHashMap<Arc<str>, usize>,
}

impl AnalysisTable {
    pub fn new(identities: impl Into<Arc<[UnitIdentity]>>) -> Self {
        Self {
            identities: identities.into(),
            names: Vec::new(),
            columns: Vec::new(),
            index: AHashMap::new(),
        }
    }

    /// Number of rows (spatial units).
    #[inline] pub fn len(&self) -> usize { self.identities.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.identities.is_empty() }

    #[inline] pub fn identities(&self) -> &[UnitIdentity] { &self.identities }

    /// Column names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(|name| name.as_ref())
    }

    #[inline] pub fn has_column(&self, name: &str) -> bool { self.index.contains_key(name) }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.index.get(name).map(|&i| self.columns[i].as_ref())
    }

    /// Like [`AnalysisTable::column`], failing with [`Error::UnknownColumn`].
    pub fn require(&self, name: &str) -> Result<&[Value], Error> {
        self.column(name).ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// Return a new table with the given columns appended (or replaced, if the name exists).
    ///
    /// Panics if a column's length differs from the number of rows.
    pub fn with_columns<N, C>(&self, columns: impl IntoIterator<Item = (N, C)>) -> Self
    where
        N: AsRef<str>,
        C: Into<Arc<[Value]>>,
    {
        let mut table = self.clone();
        for (name, values) in columns {
            let (name, values) = (name.as_ref(), values.into());
            assert_eq!(values.len(), table.len(), "column {name:?} has {} values for {} rows", values.len(), table.len());

            match table.index.get(name) {
                Some(&i) => table.columns[i] = values,
                None => {
                    let name = Arc::<str>::from(name);
                    table.index.insert(name.clone(), table.columns.len());
                    table.names.push(name);
                    table.columns.push(values);
                }
            }
        }
        table
    }

    pub fn with_column(&self, name: &str, values: impl Into<Arc<[Value]>>) -> Self {
        self.with_columns([(name, values)])
    }

    /// Rows where every listed column is defined, in table order.
    pub fn complete_rows(&self, names: &[&str]) -> Result<Vec<usize>, Error> {
        let columns = names.iter()
            .map(|name| self.require(name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((0..self.len())
            .filter(|&row| columns.iter().all(|column| column[row].is_valid()))
            .collect())
    }

    /// Convert to a polars DataFrame: `code`, `name`, `district`, then every numeric
    /// column with undefined values as nulls.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut columns = vec![
            Column::new("code".into(), self.identities.iter().map(|u| u.code.as_str()).collect::<Vec<_>>()),
            Column::new("name".into(), self.identities.iter().map(|u| u.name.as_ref()).collect::<Vec<_>>()),
            Column::new("district".into(), self.identities.iter().map(|u| u.district.as_ref()).collect::<Vec<_>>()),
        ];

        columns.extend(self.names.iter().zip(&self.columns).map(|(name, values)| {
            Column::new(name.as_ref().into(), values.iter().map(|v| v.get()).collect::<Vec<_>>())
        }));

        DataFrame::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Undefined;

    fn table() -> AnalysisTable {
        AnalysisTable::new(vec![
            UnitIdentity::new("10018010-001", "Alpha", "East"),
            UnitIdentity::new("10018010-002", "Beta", "East"),
            UnitIdentity::new("10018020-001", "Gamma", "North"),
        ])
    }

    #[test]
    fn with_column_leaves_original_untouched() {
        let base = table();
        let enriched = base.with_column("x", vec![Value::Valid(1.0), Value::Valid(2.0), Value::Valid(3.0)]);

        assert!(base.column("x").is_none());
        assert_eq!(enriched.column("x").unwrap()[2], Value::Valid(3.0));
        assert_eq!(enriched.names().collect::<Vec<_>>(), vec!["x"]);
    }

    #[test]
    fn replacing_a_column_keeps_its_position() {
        let t = table()
            .with_column("a", vec![Value::Valid(0.0); 3])
            .with_column("b", vec![Value::Valid(0.0); 3])
            .with_column("a", vec![Value::Valid(9.0); 3]);

        assert_eq!(t.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(t.column("a").unwrap()[0], Value::Valid(9.0));
    }

    #[test]
    fn complete_rows_is_listwise() {
        let missing = Value::Undefined(Undefined::Missing);
        let t = table()
            .with_column("a", vec![Value::Valid(1.0), missing, Value::Valid(3.0)])
            .with_column("b", vec![Value::Valid(1.0), Value::Valid(2.0), missing]);

        assert_eq!(t.complete_rows(&["a"]).unwrap(), vec![0, 2]);
        assert_eq!(t.complete_rows(&["a", "b"]).unwrap(), vec![0]);
        assert!(matches!(t.complete_rows(&["c"]), Err(Error::UnknownColumn(c)) if c == "c"));
    }

    #[test]
    #[should_panic(expected = "has 2 values for 3 rows")]
    fn with_column_panics_on_length_mismatch() {
        table().with_column("x", vec![Value::Valid(1.0); 2]);
    }

    #[test]
    fn dataframe_has_nulls_for_undefined() {
        let t = table().with_column("ratio", vec![
            Value::Valid(0.5), Value::Undefined(Undefined::ZeroDenominator), Value::Valid(1.5),
        ]);
        let df = t.to_dataframe().unwrap();

        assert_eq!(df.shape(), (3, 4));
        assert_eq!(df.column("ratio").unwrap().null_count(), 1);
    }
}
