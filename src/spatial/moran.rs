use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Serialize;
use tracing::info;

use super::{folded_p, normal, Inference, Subgraph};
use crate::{error::DiagnosticsError, spatial::SpatialWeights, Value};

/// Global Moran's I with analytical and permutation inference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalMoran {
    pub i: f64,
    /// `-1 / (n - 1)`
    pub expected: f64,
    /// Variance under the normality assumption.
    pub variance_norm: f64,
    pub z_norm: f64,
    pub p_norm: f64,
    /// Variance under randomization.
    pub variance_rand: f64,
    pub z_rand: f64,
    pub p_rand: f64,
    /// Folded permutation pseudo p-value.
    pub p_sim: f64,
    pub permutations: usize,
    pub units: usize,
    /// Original rows with no neighbor holding a defined value.
    pub islands: Vec<usize>,
    pub undefined: usize,
}

impl GlobalMoran {
    /// Clustering (positive) or dispersion (negative) at level `alpha`, by the normal approximation.
    pub fn pattern(&self, alpha: f64) -> &'static str {
        match (self.p_norm < alpha, self.i > self.expected) {
            (true, true) => "clustered",
            (true, false) => "dispersed",
            (false, _) => "random",
        }
    }
}

/// `I = n / S0 * (z' W z) / (z' z)` for deviations `z`.
pub(crate) fn statistic(z: &[f64], weights: &SpatialWeights, s0: f64) -> f64 {
    let lag = weights.lag(z);
    let cross = z.iter().zip(&lag).map(|(a, b)| a * b).sum::<f64>();
    let ss = z.iter().map(|a| a * a).sum::<f64>();
    z.len() as f64 / s0 * cross / ss
}

/// Global Moran's I of `values` over `weights`.
pub fn global_moran(weights: &SpatialWeights, values: &[Value], inference: &Inference) -> Result<GlobalMoran, DiagnosticsError> {
    let sub = Subgraph::build(weights, values)?;
    let w = &sub.weights;
    let n = sub.len() as f64;

    let mean = sub.values.iter().sum::<f64>() / n;
    let mut z = sub.values.iter().map(|v| v - mean).collect::<Vec<_>>();

    let (s0, s1, s2) = w.sums();
    let i = statistic(&z, w, s0);
    let expected = -1.0 / (n - 1.0);

    let variance_norm = (n * n * s1 - n * s2 + 3.0 * s0 * s0) / ((n * n - 1.0) * s0 * s0) - expected * expected;

    let m2 = z.iter().map(|v| v * v).sum::<f64>() / n;
    let m4 = z.iter().map(|v| v.powi(4)).sum::<f64>() / n;
    let kurtosis = m4 / (m2 * m2);
    let variance_rand = (n * ((n * n - 3.0 * n + 3.0) * s1 - n * s2 + 3.0 * s0 * s0)
        - kurtosis * ((n * n - n) * s1 - 2.0 * n * s2 + 6.0 * s0 * s0))
        / ((n - 1.0) * (n - 2.0) * (n - 3.0) * s0 * s0)
        - expected * expected;

    let z_norm = (i - expected) / variance_norm.sqrt();
    let z_rand = (i - expected) / variance_rand.sqrt();

    let mut rng = StdRng::seed_from_u64(inference.seed);
    let mut larger = 0;
    for _ in 0..inference.permutations {
        z.shuffle(&mut rng);
        if statistic(&z, w, s0) >= i { larger += 1 }
    }

    let moran = GlobalMoran {
        i,
        expected,
        variance_norm,
        z_norm,
        p_norm: normal::two_sided_p(z_norm),
        variance_rand,
        z_rand,
        p_rand: normal::two_sided_p(z_rand),
        p_sim: folded_p(larger, inference.permutations),
        permutations: inference.permutations,
        units: sub.len(),
        islands: sub.islands(),
        undefined: sub.undefined(),
    };

    info!(
        i = moran.i, z = moran.z_norm, p = moran.p_norm, p_sim = moran.p_sim,
        units = moran.units, islands = moran.islands.len(), "global Moran's I"
    );
    Ok(moran)
}
