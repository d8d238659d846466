//! Text and JSON summary reports.

use std::{fmt::Write as _, path::Path};

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    io::fs::{write_atomic, write_string},
    pipeline::{RankedUnit, Report},
};

fn opt(x: Option<f64>, precision: usize) -> String {
    x.map_or("n/a".to_string(), |x| format!("{x:.precision$}"))
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{title}\n{}", "-".repeat(title.chars().count()));
}

fn ranked(out: &mut String, units: &[RankedUnit]) {
    for (i, u) in units.iter().enumerate() {
        let _ = writeln!(out, "  {:>2}. {} ({}, {}): {:.2}", i + 1, u.name, u.district, u.code, u.value);
    }
}

/// Render the report as plain text. Sections with no content are left out.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Village income analysis");
    let _ = writeln!(out, "=======================");
    if let Some(source) = &report.source {
        let _ = writeln!(out, "Source: {}", source.display());
    }
    let _ = writeln!(out, "Units: {}", report.units);
    let _ = writeln!(out, "CRS: {} (analysed in {})", report.source_crs, report.metric_crs);

    if !report.undefined.is_empty() {
        heading(&mut out, "Undefined values");
        for u in &report.undefined {
            let reasons = u.reasons.iter().map(|(r, n)| format!("{r}: {n}")).collect::<Vec<_>>().join(", ");
            let _ = writeln!(out, "  {}: {} ({reasons})", u.column, u.count);
        }
    }

    if !report.summaries.is_empty() {
        heading(&mut out, "Descriptive statistics");
        let _ = writeln!(out, "  {:<24} {:>6} {:>5} {:>12} {:>12} {:>12} {:>12} {:>12}",
            "column", "count", "excl", "mean", "std", "min", "median", "max");
        for s in &report.summaries {
            let _ = writeln!(out, "  {:<24} {:>6} {:>5} {:>12} {:>12} {:>12} {:>12} {:>12}",
                s.column, s.count, s.excluded, opt(s.mean, 3), opt(s.std, 3), opt(s.min, 3), opt(s.median, 3), opt(s.max, 3));
        }
    }

    if let Some(target) = report.summaries.iter().find(|s| s.column == report.target) {
        heading(&mut out, &format!("{} distribution", report.target));
        let _ = writeln!(out, "  mean {}  median {}  std {}", opt(target.mean, 2), opt(target.median, 2), opt(target.std, 2));
        let _ = writeln!(out, "  range {} to {}", opt(target.min, 2), opt(target.max, 2));
    }
    if report.inequality.is_some() {
        let _ = writeln!(out, "  coefficient of variation {}", opt(report.inequality, 3));
    }

    if !report.top.is_empty() {
        heading(&mut out, &format!("Highest {}", report.target));
        ranked(&mut out, &report.top);
        heading(&mut out, &format!("Lowest {}", report.target));
        ranked(&mut out, &report.bottom);
    }

    if !report.districts.is_empty() {
        heading(&mut out, "Districts");
        for d in &report.districts {
            let _ = writeln!(out, "  {:<12} villages {:>4}  population {:>10.0}  households {:>9.0}  mean {} {}",
                d.district, d.villages, d.population, d.households, d.target, opt(d.mean_target, 2));
        }
    }

    if let Some(matrix) = &report.correlation {
        heading(&mut out, &format!("Correlation with {}", report.target));
        let _ = writeln!(out, "  {} rows used, {} excluded", matrix.rows_used, matrix.rows_excluded);
        for (column, r) in matrix.with(&report.target) {
            let _ = writeln!(out, "  {column:<28} {:>8}", opt(r, 3));
        }
        if !matrix.degenerate.is_empty() {
            let _ = writeln!(out, "  zero variance: {}", matrix.degenerate.join(", "));
        }
    }

    if !report.hypotheses.is_empty() {
        heading(&mut out, "Hypotheses");
        for check in &report.hypotheses {
            let h = &check.hypothesis;
            let verdict = match check.supported {
                Some(true) => "supported",
                Some(false) => "not supported",
                None => "undetermined",
            };
            let _ = writeln!(out, "  {} {} (expected {}, {}): r = {} over {} rows, {verdict}",
                h.label, h.variable, h.expected, h.description, opt(check.correlation, 3), check.rows_used);
        }
    }

    if !report.distances.is_empty() {
        heading(&mut out, "Distances");
        for d in &report.distances {
            let s = &d.summary;
            let _ = writeln!(out, "  {} ({}): mean {} km, median {} km, min {} km, max {} km",
                d.landmark, d.column, opt(s.mean, 2), opt(s.median, 2), opt(s.min, 2), opt(s.max, 2));
            let _ = writeln!(out, "  closest:");
            for (i, u) in d.nearest.iter().enumerate() {
                let _ = writeln!(out, "    {:>2}. {} ({}): {:.2} km", i + 1, u.name, u.district, u.value / 1000.0);
            }
        }
    }

    if report.weights.is_some() || report.moran.is_some() {
        heading(&mut out, &format!("Spatial autocorrelation of {}", report.diagnostics_field));
    }
    if let Some(w) = &report.weights {
        let _ = writeln!(out, "  {:?} contiguity: {} units, {} links, neighbors {:.2} mean ({}..{})",
            w.contiguity, w.units, w.links, w.mean_neighbors, w.min_neighbors, w.max_neighbors);
        if !w.islands.is_empty() {
            let _ = writeln!(out, "  {} islands detected: rows {:?}", w.islands.len(), w.islands);
        }
    }
    if let Some(m) = &report.moran {
        let _ = writeln!(out, "  Moran's I = {:.4} (E[I] = {:.4}), {}", m.i, m.expected, m.pattern(0.05));
        let _ = writeln!(out, "    normality:     z = {:.3}, p = {:.4}", m.z_norm, m.p_norm);
        let _ = writeln!(out, "    randomization: z = {:.3}, p = {:.4}", m.z_rand, m.p_rand);
        let _ = writeln!(out, "    permutation:   p = {:.4} ({} permutations)", m.p_sim, m.permutations);
    }
    if let Some(l) = &report.lisa {
        let _ = writeln!(out, "  LISA clusters (p <= {}, {} permutations):", l.alpha, l.permutations);
        for (cluster, n) in l.clusters.iter().filter(|(_, n)| *n > 0) {
            let _ = writeln!(out, "    {:<16} {n}", cluster.to_string());
        }
    }
    if let Some(h) = &report.hotspots {
        let _ = writeln!(out, "  Getis-Ord Gi* ({} permutations):", h.permutations);
        for (class, n) in h.classes.iter().filter(|(_, n)| *n > 0) {
            let _ = writeln!(out, "    {:<16} {n}", class.to_string());
        }
    }

    if let Some(fit) = &report.regression {
        heading(&mut out, &format!("Regression of {}", fit.target));
        let _ = writeln!(out, "  {} rows used, {} excluded", fit.rows_used, fit.rows_excluded);
        let _ = writeln!(out, "  {:<24} {:>14.6}", "intercept", fit.intercept);
        for (name, b) in fit.predictors.iter().zip(&fit.coefficients) {
            let _ = writeln!(out, "  {name:<24} {b:>14.6}");
        }
        let _ = writeln!(out, "  R² {}  adjusted R² {}  RMSE {:.4}", opt(fit.r_squared, 4), opt(fit.adj_r_squared, 4), fit.rmse);
    }

    if !report.failures.is_empty() {
        heading(&mut out, "Stages that failed");
        for failure in &report.failures {
            let _ = writeln!(out, "  {failure}");
        }
    }

    out
}

pub fn write_text(report: &Report, path: &Path) -> Result<()> {
    write_string(path, &render_text(report))
        .with_context(|| format!("[io::report] Failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote text report");
    Ok(())
}

pub fn write_json(report: &Report, path: &Path) -> Result<()> {
    write_atomic(path, |w| Ok(serde_json::to_writer_pretty(w, report)?))
        .with_context(|| format!("[io::report] Failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote JSON report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{crs::Crs, pipeline::StageFailure, stats::Summary};

    fn report() -> Report {
        Report {
            source: None,
            source_crs: Crs::METRIC,
            metric_crs: Crs::METRIC,
            units: 3,
            undefined: Vec::new(),
            target: "income_per_capita".into(),
            summaries: vec![Summary {
                column: "income_per_capita".into(),
                count: 3,
                excluded: 0,
                mean: Some(20.0),
                std: Some(10.0),
                min: Some(10.0),
                q25: Some(15.0),
                median: Some(20.0),
                q75: Some(25.0),
                max: Some(30.0),
            }],
            inequality: Some(0.5),
            top: vec![RankedUnit { code: "002".into(), name: "Guanxin".into(), district: "East".into(), value: 30.0 }],
            bottom: vec![RankedUnit { code: "001".into(), name: "Nanshi".into(), district: "North".into(), value: 10.0 }],
            districts: Vec::new(),
            correlation: None,
            hypotheses: Vec::new(),
            distances: Vec::new(),
            diagnostics_field: "income_per_capita".into(),
            weights: None,
            moran: None,
            lisa: None,
            hotspots: None,
            regression: None,
            failures: vec![StageFailure { stage: "regression".into(), error: "singular design matrix".into() }],
        }
    }

    #[test]
    fn text_lists_rankings_and_failures_and_skips_empty_sections() {
        let text = render_text(&report());
        assert!(text.contains("Units: 3"));
        assert!(text.contains("coefficient of variation 0.500"));
        assert!(text.contains(" 1. Guanxin (East, 002): 30.00"));
        assert!(text.contains("regression: singular design matrix"));
        assert!(!text.contains("Spatial autocorrelation"));
        assert!(!text.contains("Hypotheses"));
    }

    #[test]
    fn json_report_round_trips_through_serde_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_json(&report(), &path).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["units"], 3);
        assert_eq!(parsed["top"][0]["name"], "Guanxin");
        assert!(parsed["moran"].is_null());
    }
}
