use ndarray::{s, Array1, Array2, Axis};
use serde::Serialize;
use tracing::info;

use crate::{error::RegressionError, table::AnalysisTable};

/// An ordinary least-squares fit with intercept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OlsFit {
    pub target: String,
    pub predictors: Vec<String>,
    pub intercept: f64,
    /// One coefficient per predictor, in order.
    pub coefficients: Vec<f64>,
    /// `None` when the target is constant over the fitted rows.
    pub r_squared: Option<f64>,
    pub adj_r_squared: Option<f64>,
    pub rmse: f64,
    pub rows_used: usize,
    pub rows_excluded: usize,
    /// `(row, actual, predicted)` for every fitted row.
    #[serde(skip)]
    pub fitted: Vec<(usize, f64, f64)>,
}

impl OlsFit {
    pub fn coefficient(&self, predictor: &str) -> Option<f64> {
        self.predictors.iter().position(|p| p == predictor).map(|i| self.coefficients[i])
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        self.intercept + self.coefficients.iter().zip(x).map(|(b, x)| b * x).sum::<f64>()
    }
}

/// Regress `target` on `predictors`, dropping rows with any undefined value.
pub fn fit_ols(table: &AnalysisTable, target: &str, predictors: &[&str]) -> Result<OlsFit, RegressionError> {
    let unknown = |name: &str| RegressionError::UnknownColumn(name.to_string());

    let y_column = table.column(target).ok_or_else(|| unknown(target))?;
    let x_columns = predictors.iter()
        .map(|&p| table.column(p).ok_or_else(|| unknown(p)))
        .collect::<Result<Vec<_>, _>>()?;

    let rows = (0..table.len())
        .filter(|&r| y_column[r].is_valid() && x_columns.iter().all(|c| c[r].is_valid()))
        .collect::<Vec<_>>();

    let (n, p) = (rows.len(), predictors.len() + 1);
    if n < p { return Err(RegressionError::TooFewObservations { rows: n, params: p }) }

    let x = Array2::from_shape_fn((n, p), |(i, j)| match j {
        0 => 1.0,
        j => x_columns[j - 1][rows[i]].get().unwrap_or_default(),
    });
    let y = rows.iter().map(|&r| y_column[r].get().unwrap_or_default()).collect::<Array1<f64>>();

    let beta = least_squares(&x, &y).map_err(|column| RegressionError::Singular {
        column: match column {
            0 => "intercept".to_string(),
            j => predictors[j - 1].to_string(),
        },
    })?;

    let predicted = x.dot(&beta);
    let ss_res = (&y - &predicted).mapv(|r| r * r).sum();
    let mean = y.mean().unwrap_or_default();
    let ss_tot = y.mapv(|v| (v - mean).powi(2)).sum();

    let r_squared = (ss_tot > 0.0).then(|| 1.0 - ss_res / ss_tot);
    let adj_r_squared = r_squared
        .filter(|_| n > p)
        .map(|r2| 1.0 - (1.0 - r2) * (n - 1) as f64 / (n - p) as f64);

    let fit = OlsFit {
        target: target.to_string(),
        predictors: predictors.iter().map(|p| p.to_string()).collect(),
        intercept: beta[0],
        coefficients: beta.iter().skip(1).copied().collect(),
        r_squared,
        adj_r_squared,
        rmse: (ss_res / n as f64).sqrt(),
        rows_used: n,
        rows_excluded: table.len() - n,
        fitted: rows.iter().zip(y.iter().zip(&predicted)).map(|(&r, (&a, &p))| (r, a, p)).collect(),
    };

    info!(column = target, rows = n, excluded = fit.rows_excluded, r_squared = ?fit.r_squared, rmse = fit.rmse, "fitted OLS");
    Ok(fit)
}

/// Solve `min ||x b - y||` by Householder QR.
/// Fails with the index of the first column that is (numerically) a combination of the ones before it.
pub(crate) fn least_squares(x: &Array2<f64>, y: &Array1<f64>) -> Result<Array1<f64>, usize> {
    let (m, p) = x.dim();
    let mut a = x.clone();
    let mut b = y.clone();

    let norms = x.axis_iter(Axis(1)).map(|c| c.dot(&c).sqrt()).collect::<Vec<_>>();

    for k in 0..p {
        if k >= m { return Err(k) }

        let mut v = a.slice(s![k.., k]).to_owned();
        let norm = v.dot(&v).sqrt();
        if norm <= 1e-10 * norms[k].max(f64::MIN_POSITIVE) { return Err(k) }

        let alpha = if v[0] > 0.0 { -norm } else { norm };
        v[0] -= alpha;
        let vnorm = v.dot(&v).sqrt();
        v /= vnorm;

        // Reflect the trailing block and the right-hand side: H = I - 2 v v^T
        let mut block = a.slice_mut(s![k.., k..]);
        let proj = v.dot(&block);
        for (i, &vi) in v.iter().enumerate() {
            block.row_mut(i).scaled_add(-2.0 * vi, &proj);
        }
        let mut rhs = b.slice_mut(s![k..]);
        let proj = v.dot(&rhs);
        rhs.scaled_add(-2.0 * proj, &v);
    }

    // Back substitution on the upper triangle
    let mut beta = Array1::<f64>::zeros(p);
    for k in (0..p).rev() {
        let tail = a.slice(s![k, k + 1..]).dot(&beta.slice(s![k + 1..]));
        beta[k] = (b[k] - tail) / a[(k, k)];
    }

    Ok(beta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{unit::UnitIdentity, Undefined, Value};

    fn table(columns: &[(&str, Vec<Value>)]) -> AnalysisTable {
        let n = columns[0].1.len();
        let ids = (0..n).map(|i| UnitIdentity::new(&i.to_string(), "v", "d")).collect::<Vec<_>>();
        AnalysisTable::new(ids).with_columns(columns.iter().map(|(name, values)| (*name, values.clone())))
    }

    fn exact_table() -> AnalysisTable {
        let x1 = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let x2 = [2.0, 1.0, 4.0, 3.0, 7.0, 5.0, 8.0, 6.0];
        let y = x1.iter().zip(&x2).map(|(a, b)| 2.0 * a - 3.0 * b + 5.0).collect::<Vec<_>>();
        table(&[
            ("x1", x1.map(Value::Valid).to_vec()),
            ("x2", x2.map(Value::Valid).to_vec()),
            ("y", y.into_iter().map(Value::Valid).collect()),
        ])
    }

    #[test]
    fn recovers_exact_linear_relationship() {
        let fit = fit_ols(&exact_table(), "y", &["x1", "x2"]).unwrap();

        assert!((fit.intercept - 5.0).abs() < 1e-6, "intercept = {}", fit.intercept);
        assert!((fit.coefficients[0] - 2.0).abs() < 1e-6);
        assert!((fit.coefficients[1] + 3.0).abs() < 1e-6);
        assert!((fit.r_squared.unwrap() - 1.0).abs() < 1e-9);
        assert!(fit.rmse < 1e-9);
        assert_eq!(fit.coefficient("x2").map(f64::round), Some(-3.0));
        assert!((fit.predict(&[10.0, 1.0]) - 22.0).abs() < 1e-6);
    }

    #[test]
    fn matches_textbook_simple_regression() {
        // slope = Sxy / Sxx = 3 / 10, intercept = 2.8 - 0.3 * 3
        let t = table(&[
            ("x", [1.0, 2.0, 3.0, 4.0, 5.0].map(Value::Valid).to_vec()),
            ("y", [2.0, 2.0, 4.0, 3.0, 3.0].map(Value::Valid).to_vec()),
        ]);
        let fit = fit_ols(&t, "y", &["x"]).unwrap();

        assert!((fit.coefficients[0] - 0.3).abs() < 1e-10, "slope = {}", fit.coefficients[0]);
        assert!((fit.intercept - 1.9).abs() < 1e-10);
        assert_eq!(fit.rows_used, 5);
        assert_eq!(fit.fitted.len(), 5);
    }

    #[test]
    fn collinear_predictor_is_singular() {
        let t = exact_table();
        let doubled = t.column("x1").unwrap().iter().map(|v| v.map(|x| 2.0 * x)).collect::<Vec<_>>();
        let t = t.with_column("x1_doubled", doubled);

        assert_eq!(
            fit_ols(&t, "y", &["x1", "x1_doubled"]),
            Err(RegressionError::Singular { column: "x1_doubled".into() })
        );
    }

    #[test]
    fn rows_with_undefined_values_are_excluded() {
        let t = exact_table();
        let mut x2 = t.column("x2").unwrap().to_vec();
        x2[0] = Value::Undefined(Undefined::ZeroDenominator);
        let fit = fit_ols(&t.with_column("x2", x2), "y", &["x1", "x2"]).unwrap();

        assert_eq!((fit.rows_used, fit.rows_excluded), (7, 1));
        assert!((fit.intercept - 5.0).abs() < 1e-6);
    }

    #[test]
    fn too_few_rows() {
        let t = table(&[
            ("x", vec![Value::Valid(1.0), Value::Valid(2.0)]),
            ("z", vec![Value::Valid(3.0), Value::Valid(1.0)]),
            ("y", vec![Value::Valid(1.0), Value::Valid(2.0)]),
        ]);
        assert_eq!(
            fit_ols(&t, "y", &["x", "z"]),
            Err(RegressionError::TooFewObservations { rows: 2, params: 3 })
        );
    }

    #[test]
    fn unknown_column() {
        assert_eq!(fit_ols(&exact_table(), "y", &["nope"]), Err(RegressionError::UnknownColumn("nope".into())));
    }
}
