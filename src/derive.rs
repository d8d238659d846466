use std::sync::Arc;

use geo::{Centroid, Point};
use tracing::{info, warn};

use crate::{
    dataset::Dataset,
    table::AnalysisTable,
    unit::{Attribute, BaseAttributes, SpatialUnit},
    Undefined, Value,
};

/// Per-unit indicators computed from the base attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedAttributes {
    pub income_per_capita: Value,
    pub income_per_household: Value,
    pub education_rate: Value,
    pub indigenous_ratio: Value,
    pub household_size: Value,
    pub log_income_pc: Value,
    pub log_pop_dens: Value,
    /// Centroid in the dataset CRS; `None` for an empty geometry.
    pub centroid: Option<Point<f64>>,
}

impl DerivedAttributes {
    /// Column names, in the order of [`DerivedAttributes::values`].
    pub const NAMES: [&'static str; 7] = [
        "income_per_capita",
        "income_per_household",
        "education_rate",
        "indigenous_ratio",
        "household_size",
        "log_income_pc",
        "log_pop_dens",
    ];

    pub fn compute(unit: &SpatialUnit) -> Self {
        let BaseAttributes { population, households, income, tertiary, indigenous, pop_density, .. } = unit.attributes;
        let income_per_capita = income.ratio(population);

        Self {
            income_per_capita,
            income_per_household: income.ratio(households),
            education_rate: tertiary.ratio(population).map(|r| 100.0 * r),
            indigenous_ratio: indigenous.ratio(population).map(|r| 100.0 * r),
            household_size: population.ratio(households),
            log_income_pc: income_per_capita.ln(),
            log_pop_dens: pop_density.map(|d| d + 1.0).ln(),
            centroid: unit.geometry.centroid(),
        }
    }

    pub fn values(&self) -> [Value; 7] {
        [
            self.income_per_capita,
            self.income_per_household,
            self.education_rate,
            self.indigenous_ratio,
            self.household_size,
            self.log_income_pc,
            self.log_pop_dens,
        ]
    }
}

/// Output of the derivation stage.
#[derive(Debug, Clone)]
pub struct Derived {
    /// Base attribute columns followed by the derived columns.
    pub table: AnalysisTable,
    pub centroids: Arc<[Option<Point<f64>>]>,
    /// Derived columns holding undefined values, with counts per reason.
    pub undefined: Vec<UndefinedCount>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct UndefinedCount {
    pub column: &'static str,
    pub count: usize,
    pub reasons: Vec<(Undefined, usize)>,
}

/// Compute every derived attribute for every unit of the dataset.
pub fn derive(dataset: &Dataset) -> Derived {
    let units = dataset.units();
    let derived = units.iter().map(DerivedAttributes::compute).collect::<Vec<_>>();

    let base = Attribute::ALL.iter()
        .map(|&a| (a.column(), units.iter().map(|u| u.attributes.get(a)).collect::<Vec<_>>()));
    let extra = DerivedAttributes::NAMES.iter().enumerate()
        .map(|(i, &name)| (name, derived.iter().map(|d| d.values()[i]).collect::<Vec<_>>()));

    let table = AnalysisTable::new(units.iter().map(|u| u.identity.clone()).collect::<Vec<_>>())
        .with_columns(base.chain(extra));

    let undefined = DerivedAttributes::NAMES.iter()
        .filter_map(|&name| undefined_count(name, table.column(name)?))
        .collect::<Vec<_>>();

    for count in &undefined {
        warn!(column = count.column, undefined = count.count, reasons = ?count.reasons, "undefined derived values");
    }

    let missing_centroids = derived.iter().filter(|d| d.centroid.is_none()).count();
    if missing_centroids > 0 {
        warn!(units = missing_centroids, "units with empty geometry have no centroid");
    }

    info!(units = table.len(), columns = DerivedAttributes::NAMES.len(), "derived attributes");

    Derived {
        table,
        centroids: derived.iter().map(|d| d.centroid).collect(),
        undefined,
    }
}

fn undefined_count(column: &'static str, values: &[Value]) -> Option<UndefinedCount> {
    let mut reasons: Vec<(Undefined, usize)> = Vec::new();
    for reason in values.iter().filter_map(|v| v.reason()) {
        match reasons.iter_mut().find(|(r, _)| *r == reason) {
            Some((_, n)) => *n += 1,
            None => reasons.push((reason, 1)),
        }
    }

    let count = reasons.iter().map(|(_, n)| n).sum();
    (count > 0).then_some(UndefinedCount { column, count, reasons })
}
