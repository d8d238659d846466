use ahash::AHashMap;
use serde::Serialize;

use crate::{error::Error, table::AnalysisTable};

/// Totals and averages for one parent district.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictSummary {
    pub district: String,
    pub villages: usize,
    pub population: f64,
    pub households: f64,
    /// Column averaged per district.
    pub target: String,
    /// Unweighted mean of the target over defined values.
    pub mean_target: Option<f64>,
    /// Villages whose target is undefined.
    pub excluded: usize,
}

/// Group the table by district, in order of first appearance.
pub fn district_summary(
    table: &AnalysisTable,
    population: &str,
    households: &str,
    target: &str,
) -> Result<Vec<DistrictSummary>, Error> {
    let (population, households, income) = (
        table.require(population)?,
        table.require(households)?,
        table.require(target)?,
    );

    let mut index = AHashMap::<&str, usize>::new();
    let mut districts = Vec::<(DistrictSummary, f64, usize)>::new();

    for (row, identity) in table.identities().iter().enumerate() {
        let i = *index.entry(identity.district.as_ref()).or_insert_with(|| {
            districts.push((
                DistrictSummary {
                    district: identity.district.to_string(),
                    villages: 0,
                    population: 0.0,
                    households: 0.0,
                    target: target.to_string(),
                    mean_target: None,
                    excluded: 0,
                },
                0.0,
                0,
            ));
            districts.len() - 1
        });

        let (summary, income_sum, income_count) = &mut districts[i];
        summary.villages += 1;
        summary.population += population[row].get().unwrap_or_default();
        summary.households += households[row].get().unwrap_or_default();
        match income[row].get() {
            Some(x) => { *income_sum += x; *income_count += 1; }
            None => summary.excluded += 1,
        }
    }

    Ok(districts.into_iter()
        .map(|(summary, sum, count)| DistrictSummary {
            mean_target: (count > 0).then(|| sum / count as f64),
            ..summary
        })
        .collect())
}
