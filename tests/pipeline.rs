// End-to-end runs over a synthetic village grid: every stage, every export.

mod common;

use incomescope::{
    spatial::LisaCluster,
    stats::{Hypothesis, Sign},
    AnalysisConfig, Analysis, Stages,
};

#[test]
fn full_run_writes_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let mut analysis = Analysis::from_dataset(common::villages(6), &AnalysisConfig::default(), Stages::ALL).unwrap();
    let written = analysis.export_all(dir.path()).unwrap();

    for name in [
        "villages_enriched.csv",
        "villages_enriched.geojson",
        "descriptive_stats.csv",
        "correlation_matrix.csv",
        "map_income_per_capita.svg",
        "lisa_clusters.svg",
        "hotspots.svg",
        "interactive_map.html",
        "report.txt",
        "report.json",
    ] {
        let path = dir.path().join(name);
        assert!(path.exists(), "{name} missing, failures: {:?}", analysis.report.failures);
        assert!(written.contains(&path), "{name} not reported as written");
    }

    let csv = std::fs::read_to_string(dir.path().join("villages_enriched.csv")).unwrap();
    let header = csv.lines().next().unwrap();
    assert!(header.starts_with("code,name,district,"));
    assert!(header.contains("dist_to_science_park_km"));
    assert!(header.contains("lisa_q"));
    assert!(header.contains("hotspot"));
    assert_eq!(csv.lines().count(), 37);

    let geojson: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("villages_enriched.geojson")).unwrap()).unwrap();
    assert_eq!(geojson["features"].as_array().unwrap().len(), 36);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(report["units"], 36);
    assert!(report["moran"]["i"].as_f64().unwrap() > 0.0);
}

#[test]
fn undefined_values_are_reported_and_excluded() {
    let analysis = Analysis::from_dataset(common::villages(6), &AnalysisConfig::default(), Stages::ALL).unwrap();
    let report = &analysis.report;

    let income = report.undefined.iter().find(|u| u.column == "income_per_capita").unwrap();
    assert_eq!(income.count, 1);

    let summary = report.summaries.iter().find(|s| s.column == "income_per_capita").unwrap();
    assert_eq!((summary.count, summary.excluded), (35, 1));
    assert!(report.top.iter().chain(&report.bottom).all(|u| u.code != "10018035"));

    let lisa = analysis.lisa.as_ref().unwrap();
    assert_eq!(lisa.clusters[35], LisaCluster::Undefined);
}

#[test]
fn clustered_income_is_detected() {
    let analysis = Analysis::from_dataset(common::villages(6), &AnalysisConfig::default(), Stages::ALL).unwrap();
    let moran = analysis.report.moran.as_ref().unwrap();
    assert_eq!(moran.pattern(0.05), "clustered");
    assert!(moran.p_sim < 0.05);

    let top = &analysis.report.top[0];
    assert_eq!(top.district, "North");
}

#[test]
fn runs_are_reproducible() {
    let config = AnalysisConfig::default();
    let a = Analysis::from_dataset(common::villages(6), &config, Stages::ALL).unwrap();
    let b = Analysis::from_dataset(common::villages(6), &config, Stages::ALL).unwrap();
    assert_eq!(a.report, b.report);
}

#[test]
fn distances_stage_skips_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let mut analysis = Analysis::from_dataset(common::villages(5), &AnalysisConfig::default(), Stages::DISTANCES).unwrap();

    assert!(analysis.report.moran.is_none());
    assert!(analysis.report.regression.is_none());
    assert_eq!(analysis.report.distances.len(), 2);
    assert_eq!(analysis.report.hypotheses.len(), 4);
    assert!(analysis.table.has_column("dist_to_airbase_km"));

    let written = analysis.export_distances(dir.path()).unwrap();
    assert_eq!(written.len(), 4);
}

#[test]
fn missing_hypothesis_variable_is_recorded_and_skipped() {
    let mut config = AnalysisConfig::default();
    config.hypotheses.push(Hypothesis::new("H5", "commute_minutes", Sign::Negative, "Long commutes lower income"));

    let analysis = Analysis::from_dataset(common::villages(5), &config, Stages::DISTANCES).unwrap();
    assert_eq!(analysis.report.hypotheses.len(), 4);
    assert!(analysis.report.failures.iter().any(|f| f.stage == "hypothesis H5"));
}

#[test]
fn district_means_follow_the_configured_target() {
    let config = AnalysisConfig { target: "AgingIndex".into(), ..AnalysisConfig::default() };
    let analysis = Analysis::from_dataset(common::villages(6), &config, Stages::ALL).unwrap();

    let north = analysis.report.districts.iter().find(|d| d.district == "North").unwrap();
    let aging = (0..36).filter(|k| k % 6 < 3).map(|k| 60.0 + (k * 29 % 80) as f64).collect::<Vec<_>>();
    let expected = aging.iter().sum::<f64>() / aging.len() as f64;

    assert_eq!(north.target, "AgingIndex");
    assert!((north.mean_target.unwrap() - expected).abs() < 1e-9);
    assert_eq!(north.excluded, 0);
}
