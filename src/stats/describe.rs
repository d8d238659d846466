use serde::Serialize;

use crate::{error::Error, table::AnalysisTable, value::valid_values, Value};

/// Descriptive statistics of one column, over its defined values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub column: String,
    pub count: usize,
    /// Undefined values left out of every statistic.
    pub excluded: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (denominator n - 1).
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl Summary {
    /// Coefficient of variation, `std / mean`.
    pub fn cv(&self) -> Option<f64> {
        match (self.std, self.mean) {
            (Some(std), Some(mean)) if mean != 0.0 => Some(std / mean),
            _ => None,
        }
    }
}

/// Summarize a column. Undefined values are excluded and counted.
pub fn describe(column: &str, values: &[Value]) -> Summary {
    let (mut valid, excluded) = valid_values(values);
    valid.sort_by(f64::total_cmp);

    let count = valid.len();
    let mean = (count > 0).then(|| valid.iter().sum::<f64>() / count as f64);
    let std = mean.filter(|_| count > 1).map(|mean| {
        (valid.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
    });

    Summary {
        column: column.to_string(),
        count,
        excluded,
        mean,
        std,
        min: valid.first().copied(),
        q25: quantile(&valid, 0.25),
        median: quantile(&valid, 0.5),
        q75: quantile(&valid, 0.75),
        max: valid.last().copied(),
    }
}

/// Summarize several table columns.
pub fn describe_columns(table: &AnalysisTable, columns: &[&str]) -> Result<Vec<Summary>, Error> {
    columns.iter()
        .map(|&name| Ok(describe(name, table.require(name)?)))
        .collect()
}

/// Quantile of sorted data with linear interpolation between closest ranks.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let pos = q.clamp(0.0, 1.0) * last as f64;
    let (lo, frac) = (pos.floor() as usize, pos.fract());

    Some(match sorted.get(lo + 1) {
        Some(&hi) if frac > 0.0 => sorted[lo] + frac * (hi - sorted[lo]),
        _ => sorted[lo],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Undefined;

    #[test]
    fn matches_standard_definitions() {
        let values = [1.0, 2.0, 3.0, 4.0, 10.0].map(Value::Valid);
        let s = describe("x", &values);

        assert_eq!(s.count, 5);
        assert_eq!(s.excluded, 0);
        assert_eq!(s.mean, Some(4.0));
        // squared deviations 9 + 4 + 1 + 0 + 36 = 50, over n - 1 = 4
        assert!((s.std.unwrap() - 12.5_f64.sqrt()).abs() < 1e-12);
        assert_eq!((s.min, s.q25, s.median, s.q75, s.max), (Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(10.0)));
    }

    #[test]
    fn quartiles_interpolate_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.25), Some(1.75));
        assert_eq!(quantile(&sorted, 0.5), Some(2.5));
        assert_eq!(quantile(&sorted, 0.75), Some(3.25));
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[7.0], 0.75), Some(7.0));
    }

    #[test]
    fn undefined_values_are_excluded_and_counted() {
        let values = [
            Value::Valid(2.0),
            Value::Undefined(Undefined::ZeroDenominator),
            Value::Valid(4.0),
            Value::Undefined(Undefined::Missing),
        ];
        let s = describe("x", &values);

        assert_eq!((s.count, s.excluded), (2, 2));
        assert_eq!(s.mean, Some(3.0));
    }

    #[test]
    fn single_value_has_no_std() {
        let s = describe("x", &[Value::Valid(5.0)]);
        assert_eq!(s.std, None);
        assert_eq!(s.cv(), None);
        assert_eq!(s.median, Some(5.0));
    }

    #[test]
    fn coefficient_of_variation() {
        let s = describe("x", &[2.0, 4.0, 6.0].map(Value::Valid));
        assert_eq!(s.cv(), Some(0.5));
    }
}
