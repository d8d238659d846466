use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{error::Error, stats::correlation::pearson, table::AnalysisTable};

/// Expected direction of a bivariate relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    Positive,
    Negative,
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Sign::Positive => "positive", Sign::Negative => "negative" })
    }
}

/// A sign expectation for the correlation between a variable and the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub label: String,
    pub variable: String,
    pub expected: Sign,
    pub description: String,
}

impl Hypothesis {
    pub fn new(label: &str, variable: &str, expected: Sign, description: &str) -> Self {
        Self { label: label.into(), variable: variable.into(), expected, description: description.into() }
    }

    /// H1 to H4 of the Hsinchu income study.
    pub fn hsinchu() -> Vec<Hypothesis> {
        vec![
            Hypothesis::new("H1", "education_rate", Sign::Positive, "Education raises income"),
            Hypothesis::new("H2", "dist_to_science_park_km", Sign::Negative, "Income falls with distance to the Science Park"),
            Hypothesis::new("H3", "AgingIndex", Sign::Negative, "Older villages earn less"),
            Hypothesis::new("H4", "dist_to_airbase_km", Sign::Positive, "Income rises with distance to the Air Base"),
        ]
    }
}

/// Outcome of one sign check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisCheck {
    pub hypothesis: Hypothesis,
    pub correlation: Option<f64>,
    /// Rows where both columns are defined.
    pub rows_used: usize,
    /// `None` when the correlation is undefined.
    pub supported: Option<bool>,
}

/// Correlate each hypothesis variable with `target` and compare the sign.
/// Each pair uses the rows where both of its columns are defined.
pub fn check_hypotheses(
    table: &AnalysisTable,
    target: &str,
    hypotheses: &[Hypothesis],
) -> Result<Vec<HypothesisCheck>, Error> {
    let y = table.require(target)?;

    hypotheses.iter()
        .map(|h| {
            let (correlation, rows_used) = pearson(table.require(&h.variable)?, y);
            let supported = correlation.map(|r| match h.expected {
                Sign::Positive => r > 0.0,
                Sign::Negative => r < 0.0,
            });
            Ok(HypothesisCheck { hypothesis: h.clone(), correlation, rows_used, supported })
        })
        .collect()
}
