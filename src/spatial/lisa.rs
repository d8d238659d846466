use std::{fmt, sync::Arc};

use rand::{rngs::StdRng, seq::index, SeedableRng};
use serde::Serialize;
use tracing::info;

use super::{folded_p, Inference, Omitted, Subgraph};
use crate::{error::DiagnosticsError, spatial::SpatialWeights, Undefined, Value};

/// Moran scatterplot quadrant of a unit, or why it has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LisaCluster {
    HighHigh,
    LowHigh,
    LowLow,
    HighLow,
    NotSignificant,
    Island,
    Undefined,
}

impl LisaCluster {
    pub const ALL: [LisaCluster; 7] = [
        LisaCluster::HighHigh,
        LisaCluster::LowHigh,
        LisaCluster::LowLow,
        LisaCluster::HighLow,
        LisaCluster::NotSignificant,
        LisaCluster::Island,
        LisaCluster::Undefined,
    ];

    /// Quadrant of a standardized value and its spatial lag. Zero counts as low.
    pub fn quadrant(z: f64, lag: f64) -> Self {
        match (z > 0.0, lag > 0.0) {
            (true, true) => LisaCluster::HighHigh,
            (false, true) => LisaCluster::LowHigh,
            (false, false) => LisaCluster::LowLow,
            (true, false) => LisaCluster::HighLow,
        }
    }

    /// Numeric code: 1 = HH, 2 = LH, 3 = LL, 4 = HL, 0 = not significant, none when omitted.
    pub fn code(self) -> Option<u8> {
        match self {
            LisaCluster::HighHigh => Some(1),
            LisaCluster::LowHigh => Some(2),
            LisaCluster::LowLow => Some(3),
            LisaCluster::HighLow => Some(4),
            LisaCluster::NotSignificant => Some(0),
            LisaCluster::Island | LisaCluster::Undefined => None,
        }
    }
}

impl From<Omitted> for LisaCluster {
    fn from(omitted: Omitted) -> Self {
        match omitted {
            Omitted::Undefined => LisaCluster::Undefined,
            Omitted::Island => LisaCluster::Island,
        }
    }
}

impl fmt::Display for LisaCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LisaCluster::HighHigh => "High-High",
            LisaCluster::LowHigh => "Low-High",
            LisaCluster::LowLow => "Low-Low",
            LisaCluster::HighLow => "High-Low",
            LisaCluster::NotSignificant => "Not significant",
            LisaCluster::Island => "Island",
            LisaCluster::Undefined => "Undefined",
        })
    }
}

/// Local Moran's I per unit, indexed by original row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalMoran {
    pub i: Vec<Option<f64>>,
    pub p: Vec<Option<f64>>,
    pub clusters: Vec<LisaCluster>,
    pub alpha: f64,
    pub permutations: usize,
    pub islands: Vec<usize>,
    pub undefined: usize,
}

impl LocalMoran {
    pub fn len(&self) -> usize { self.clusters.len() }

    pub fn is_empty(&self) -> bool { self.clusters.is_empty() }

    /// Number of units in every cluster, in [`LisaCluster::ALL`] order.
    pub fn counts(&self) -> Vec<(LisaCluster, usize)> {
        LisaCluster::ALL.iter()
            .map(|&c| (c, self.clusters.iter().filter(|&&k| k == c).count()))
            .collect()
    }

    /// `lisa_I`, `lisa_p` and `lisa_q` table columns.
    pub fn columns(&self) -> Vec<(&'static str, Arc<[Value]>)> {
        let omitted = Value::Undefined(Undefined::Missing);
        vec![
            ("lisa_I", self.i.iter().map(|&x| x.map_or(omitted, Value::new)).collect()),
            ("lisa_p", self.p.iter().map(|&x| x.map_or(omitted, Value::new)).collect()),
            ("lisa_q", self.clusters.iter().map(|c| c.code().map_or(omitted, |q| Value::Valid(q as f64))).collect()),
        ]
    }
}

/// Local Moran's I with conditional-permutation pseudo p-values.
///
/// Each unit's value is held fixed while its neighbors are drawn at random
/// from the other units; the generator is consumed in unit order.
pub fn local_moran(weights: &SpatialWeights, values: &[Value], inference: &Inference) -> Result<LocalMoran, DiagnosticsError> {
    let sub = Subgraph::build(weights, values)?;
    let w = &sub.weights;
    let n = sub.len();

    let mean = sub.values.iter().sum::<f64>() / n as f64;
    let std = (sub.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64).sqrt();
    let z = sub.values.iter().map(|v| (v - mean) / std).collect::<Vec<_>>();
    let ss = z.iter().map(|v| v * v).sum::<f64>();
    let scale = (n - 1) as f64 / ss;
    let lag = w.lag(&z);

    let mut rng = StdRng::seed_from_u64(inference.seed);
    let mut result = LocalMoran {
        i: vec![None; values.len()],
        p: vec![None; values.len()],
        clusters: sub.omitted.iter().map(|o| o.map_or(LisaCluster::NotSignificant, LisaCluster::from)).collect(),
        alpha: inference.alpha,
        permutations: inference.permutations,
        islands: sub.islands(),
        undefined: sub.undefined(),
    };

    for (k, &row) in sub.rows.iter().enumerate() {
        let local = scale * z[k] * lag[k];
        let nbr_weights = w.neighbors_with_weights(k).map(|(_, wt)| wt).collect::<Vec<_>>();

        let mut larger = 0;
        for _ in 0..inference.permutations {
            let draw = index::sample(&mut rng, n - 1, nbr_weights.len());
            let lag_rand = draw.iter().zip(&nbr_weights)
                .map(|(j, wt)| wt * z[if j >= k { j + 1 } else { j }])
                .sum::<f64>();
            if scale * z[k] * lag_rand >= local { larger += 1 }
        }
        let p = folded_p(larger, inference.permutations);

        result.i[row] = Some(local);
        result.p[row] = Some(p);
        result.clusters[row] = if p <= inference.alpha {
            LisaCluster::quadrant(z[k], lag[k])
        } else {
            LisaCluster::NotSignificant
        };
    }

    let counts = result.counts();
    info!(
        hh = counts[0].1, lh = counts[1].1, ll = counts[2].1, hl = counts[3].1,
        islands = result.islands.len(), alpha = inference.alpha, "local Moran's I"
    );
    Ok(result)
}
