//! Spatial autocorrelation diagnostics over contiguity weights.
//!
//! Every diagnostic runs on the subgraph of units that have a defined value
//! and at least one neighbor with a defined value. Units left out this way
//! are reported as islands or as undefined, never silently dropped.

pub mod getis_ord;
pub mod lisa;
pub mod moran;
pub mod normal;
pub mod weights;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{error::DiagnosticsError, Value};

pub use getis_ord::{getis_ord, HotSpotClass, HotSpots};
pub use lisa::{local_moran, LisaCluster, LocalMoran};
pub use moran::{global_moran, GlobalMoran};
pub use weights::{Contiguity, SpatialWeights, WeightsSummary};

/// Smallest subgraph the randomization variance is defined for.
pub const MIN_UNITS: usize = 4;

/// Permutation inference settings. One seeded generator per diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inference {
    pub permutations: usize,
    pub seed: u64,
    /// Significance level for LISA clusters.
    pub alpha: f64,
}

impl Default for Inference {
    fn default() -> Self {
        Self { permutations: 999, seed: 12345, alpha: 0.05 }
    }
}

/// Why a unit was left out of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Omitted {
    /// The analysed value is undefined for this unit.
    Undefined,
    /// No neighbor with a defined value.
    Island,
}

/// The units a diagnostic actually runs on.
#[derive(Debug, Clone)]
pub(crate) struct Subgraph {
    /// Original row of every subgraph unit.
    pub rows: Vec<usize>,
    pub values: Vec<f64>,
    pub weights: SpatialWeights,
    /// Per original row, why it was left out.
    pub omitted: Vec<Option<Omitted>>,
}

impl Subgraph {
    pub fn build(weights: &SpatialWeights, values: &[Value]) -> Result<Self, DiagnosticsError> {
        if values.len() != weights.len() {
            return Err(DiagnosticsError::LengthMismatch { values: values.len(), units: weights.len() });
        }

        let mut omitted = vec![None; values.len()];
        let defined = (0..values.len()).filter(|&i| values[i].is_valid()).collect::<Vec<_>>();
        for (i, v) in values.iter().enumerate() {
            if !v.is_valid() { omitted[i] = Some(Omitted::Undefined) }
        }

        let sub = weights.subset(&defined);
        if sub.links() == 0 {
            return Err(DiagnosticsError::NoNeighbors { units: defined.len() });
        }

        let islands = sub.islands();
        for &k in &islands { omitted[defined[k]] = Some(Omitted::Island) }
        if !islands.is_empty() {
            warn!(
                islands = islands.len(),
                rows = ?islands.iter().map(|&k| defined[k]).collect::<Vec<_>>(),
                "{} islands detected, excluded from local statistics",
                islands.len()
            );
        }

        let keep = (0..defined.len()).filter(|k| !islands.contains(k)).collect::<Vec<_>>();
        let rows = keep.iter().map(|&k| defined[k]).collect::<Vec<_>>();
        if rows.len() < MIN_UNITS {
            return Err(DiagnosticsError::TooFewUnits { found: rows.len(), required: MIN_UNITS });
        }

        let values = rows.iter().filter_map(|&r| values[r].get()).collect::<Vec<_>>();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        if values.iter().all(|&v| (v - mean).abs() <= f64::EPSILON * mean.abs().max(1.0)) {
            return Err(DiagnosticsError::ZeroVariance);
        }

        debug!(units = rows.len(), omitted = omitted.iter().flatten().count(), "diagnostic subgraph");
        Ok(Self { weights: sub.subset(&keep), rows, values, omitted })
    }

    pub fn len(&self) -> usize { self.rows.len() }

    /// Original rows that were islands.
    pub fn islands(&self) -> Vec<usize> {
        self.omitted.iter().enumerate()
            .filter_map(|(i, o)| (*o == Some(Omitted::Island)).then_some(i))
            .collect()
    }

    /// Original rows with an undefined value.
    pub fn undefined(&self) -> usize {
        self.omitted.iter().filter(|o| **o == Some(Omitted::Undefined)).count()
    }
}

/// Fold a permutation count into a pseudo p-value: the smaller tail, `(extreme + 1) / (permutations + 1)`.
pub(crate) fn folded_p(larger: usize, permutations: usize) -> f64 {
    let extreme = larger.min(permutations - larger);
    (extreme + 1) as f64 / (permutations + 1) as f64
}

/// Weights of a `side` x `side` lattice of cells, row-major.
#[cfg(test)]
pub(crate) fn lattice(side: usize, contiguity: Contiguity) -> SpatialWeights {
    let lists = (0..side * side)
        .map(|k| {
            let (r, c) = (k / side, k % side);
            let mut nbrs = Vec::new();
            if c + 1 < side { nbrs.push(k + 1) }
            if r + 1 < side {
                nbrs.push(k + side);
                if contiguity == Contiguity::Queen {
                    if c > 0 { nbrs.push(k + side - 1) }
                    if c + 1 < side { nbrs.push(k + side + 1) }
                }
            }
            nbrs.into_iter().map(|j| j as u32).collect::<Vec<u32>>()
        })
        .collect::<Vec<_>>();
    SpatialWeights::from_neighbors(&lists, contiguity)
}

/// Values of a `side` x `side` lattice from `f(row, col)`.
#[cfg(test)]
pub(crate) fn lattice_values(side: usize, f: impl Fn(usize, usize) -> f64) -> Vec<Value> {
    (0..side * side).map(|k| Value::Valid(f(k / side, k % side))).collect()
}
