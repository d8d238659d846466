use std::{fmt, sync::Arc};

use rand::{rngs::StdRng, seq::index, SeedableRng};
use serde::Serialize;
use tracing::info;

use super::{folded_p, Inference, Omitted, Subgraph};
use crate::{error::DiagnosticsError, spatial::SpatialWeights, Undefined, Value};

/// Hot spot class of a unit by Gi* z-score and pseudo p-value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HotSpotClass {
    Hot99,
    Hot90,
    NotSignificant,
    Cold90,
    Cold99,
    Island,
    Undefined,
}

impl HotSpotClass {
    pub const ALL: [HotSpotClass; 7] = [
        HotSpotClass::Hot99,
        HotSpotClass::Hot90,
        HotSpotClass::NotSignificant,
        HotSpotClass::Cold90,
        HotSpotClass::Cold99,
        HotSpotClass::Island,
        HotSpotClass::Undefined,
    ];

    /// Both the z-score band and the pseudo p-value must agree. A strong
    /// z-score with a weak p-value (e.g. z = 1.97, p = 0.06) is not significant.
    pub fn classify(z: f64, p: f64) -> Self {
        if z > 1.96 && p < 0.05 {
            HotSpotClass::Hot99
        } else if z > 1.65 && z <= 1.96 && p < 0.10 {
            HotSpotClass::Hot90
        } else if z < -1.96 && p < 0.05 {
            HotSpotClass::Cold99
        } else if z < -1.65 && z >= -1.96 && p < 0.10 {
            HotSpotClass::Cold90
        } else {
            HotSpotClass::NotSignificant
        }
    }

    /// 2, 1, 0, -1, -2 from hottest to coldest; none when omitted.
    pub fn code(self) -> Option<i8> {
        match self {
            HotSpotClass::Hot99 => Some(2),
            HotSpotClass::Hot90 => Some(1),
            HotSpotClass::NotSignificant => Some(0),
            HotSpotClass::Cold90 => Some(-1),
            HotSpotClass::Cold99 => Some(-2),
            HotSpotClass::Island | HotSpotClass::Undefined => None,
        }
    }
}

impl From<Omitted> for HotSpotClass {
    fn from(omitted: Omitted) -> Self {
        match omitted {
            Omitted::Undefined => HotSpotClass::Undefined,
            Omitted::Island => HotSpotClass::Island,
        }
    }
}

impl fmt::Display for HotSpotClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HotSpotClass::Hot99 => "Hot spot (99%)",
            HotSpotClass::Hot90 => "Hot spot (90%)",
            HotSpotClass::NotSignificant => "Not significant",
            HotSpotClass::Cold90 => "Cold spot (90%)",
            HotSpotClass::Cold99 => "Cold spot (99%)",
            HotSpotClass::Island => "Island",
            HotSpotClass::Undefined => "Undefined",
        })
    }
}

/// Getis-Ord Gi* per unit, indexed by original row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotSpots {
    pub z: Vec<Option<f64>>,
    pub p: Vec<Option<f64>>,
    pub classes: Vec<HotSpotClass>,
    pub permutations: usize,
    pub islands: Vec<usize>,
    pub undefined: usize,
}

impl HotSpots {
    pub fn len(&self) -> usize { self.classes.len() }

    pub fn is_empty(&self) -> bool { self.classes.is_empty() }

    /// Number of units in every class, in [`HotSpotClass::ALL`] order.
    pub fn counts(&self) -> Vec<(HotSpotClass, usize)> {
        HotSpotClass::ALL.iter()
            .map(|&c| (c, self.classes.iter().filter(|&&k| k == c).count()))
            .collect()
    }

    /// `gi_z`, `gi_p` and `hotspot` table columns.
    pub fn columns(&self) -> Vec<(&'static str, Arc<[Value]>)> {
        let omitted = Value::Undefined(Undefined::Missing);
        vec![
            ("gi_z", self.z.iter().map(|&x| x.map_or(omitted, Value::new)).collect()),
            ("gi_p", self.p.iter().map(|&x| x.map_or(omitted, Value::new)).collect()),
            ("hotspot", self.classes.iter().map(|c| c.code().map_or(omitted, |q| Value::Valid(q as f64))).collect()),
        ]
    }
}

/// Gi* z-score of a star neighborhood with equal weights `1 / size`.
struct Star {
    n: f64,
    mean: f64,
    s: f64,
}

impl Star {
    /// None when the variance term vanishes: constant values, or a star
    /// neighborhood that covers every unit.
    fn z(&self, sum: f64, size: usize) -> Option<f64> {
        let w = 1.0 / size as f64;
        // W_i = 1, S1_i = size * w^2 = w
        let denom = self.s * ((self.n * w - 1.0) / (self.n - 1.0)).max(0.0).sqrt();
        if denom <= f64::EPSILON * self.s.max(1.0) { return None }
        Some((w * sum - self.mean) / denom)
    }
}

/// Getis-Ord Gi* hot spots with conditional-permutation pseudo p-values.
///
/// The star neighborhood of a unit is itself plus its neighbors. Permutations
/// keep the unit's own value and redraw its neighbors from the other units.
pub fn getis_ord(weights: &SpatialWeights, values: &[Value], inference: &Inference) -> Result<HotSpots, DiagnosticsError> {
    let sub = Subgraph::build(weights, values)?;
    let w = &sub.weights;
    let x = &sub.values;
    let n = sub.len();

    let mean = x.iter().sum::<f64>() / n as f64;
    let s = (x.iter().map(|v| v * v).sum::<f64>() / n as f64 - mean * mean).max(0.0).sqrt();
    let star = Star { n: n as f64, mean, s };

    let mut rng = StdRng::seed_from_u64(inference.seed);
    let mut result = HotSpots {
        z: vec![None; values.len()],
        p: vec![None; values.len()],
        classes: sub.omitted.iter().map(|o| o.map_or(HotSpotClass::NotSignificant, HotSpotClass::from)).collect(),
        permutations: inference.permutations,
        islands: sub.islands(),
        undefined: sub.undefined(),
    };

    for (k, &row) in sub.rows.iter().enumerate() {
        let size = w.neighbor_count(k) + 1;
        let Some(z) = star.z(x[k] + w.neighbors(k).map(|j| x[j]).sum::<f64>(), size) else {
            result.classes[row] = HotSpotClass::Undefined;
            continue;
        };

        let mut larger = 0;
        for _ in 0..inference.permutations {
            let draw = index::sample(&mut rng, n - 1, size - 1);
            let sum = x[k] + draw.iter().map(|j| x[if j >= k { j + 1 } else { j }]).sum::<f64>();
            if star.z(sum, size).is_some_and(|zp| zp >= z) { larger += 1 }
        }
        let p = folded_p(larger, inference.permutations);

        result.z[row] = Some(z);
        result.p[row] = Some(p);
        result.classes[row] = HotSpotClass::classify(z, p);
    }

    let counts = result.counts();
    info!(
        hot99 = counts[0].1, hot90 = counts[1].1, cold90 = counts[3].1, cold99 = counts[4].1,
        islands = result.islands.len(), "Getis-Ord Gi*"
    );
    Ok(result)
}
