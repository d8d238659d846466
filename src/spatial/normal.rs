//! Standard normal distribution helpers.

/// Complementary error function, fractional error below 1.2e-7 everywhere.
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let r = t * (-z * z - 1.265_512_23
        + t * (1.000_023_68
        + t * (0.374_091_96
        + t * (0.096_784_18
        + t * (-0.186_288_06
        + t * (0.278_868_07
        + t * (-1.135_203_98
        + t * (1.488_515_87
        + t * (-0.822_152_23
        + t * 0.170_872_77))))))))).exp();

    if x >= 0.0 { r } else { 2.0 - r }
}

/// CDF of the standard normal distribution.
pub fn cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Two-sided p-value of a z-score.
pub fn two_sided_p(z: f64) -> f64 {
    (2.0 * (1.0 - cdf(z.abs()))).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values() {
        assert!((cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((cdf(1.96) - 0.975_002_1).abs() < 1e-6);
        assert!((cdf(-1.645) - 0.049_985_3).abs() < 1e-6);
        assert!((two_sided_p(1.96) - 0.05).abs() < 1e-4);
        assert!((two_sided_p(-2.575_829) - 0.01).abs() < 1e-5);
    }

    #[test]
    fn symmetric() {
        for x in [0.1, 0.7, 1.3, 2.9, 4.2] {
            assert!((cdf(x) + cdf(-x) - 1.0).abs() < 1e-7);
        }
    }
}
