//! The analysis run: load, derive, enrich, analyse, export.
//!
//! Loading and deriving are mandatory and abort the run. Every later stage
//! is optional: a failure is logged, recorded in [`Report::failures`], and the
//! run carries on with what it has.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use anyhow::Context;
use geo::MultiPolygon;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::AnalysisConfig,
    crs::Crs,
    dataset::Dataset,
    derive::{derive, Derived, UndefinedCount},
    distance::{landmark_distances, with_distances, LandmarkDistances},
    error::Error,
    io,
    spatial::{
        getis_ord, global_moran, local_moran, GlobalMoran, HotSpotClass, HotSpots, LisaCluster, LocalMoran,
        SpatialWeights, WeightsSummary,
    },
    stats::{
        bottom_k, check_hypotheses, correlation_matrix, describe_columns, district_summary, fit_ols, top_k,
        CorrelationMatrix, DistrictSummary, HypothesisCheck, OlsFit, Ranked, Summary,
    },
    table::AnalysisTable,
    unit::{Attribute, UnitIdentity},
};

/// Which optional stages to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stages {
    pub distances: bool,
    pub statistics: bool,
    pub diagnostics: bool,
    pub regression: bool,
}

impl Stages {
    pub const ALL: Stages = Stages { distances: true, statistics: true, diagnostics: true, regression: true };

    /// Distances, statistics and hypothesis checks without the spatial diagnostics or regression.
    pub const DISTANCES: Stages = Stages { distances: true, statistics: true, diagnostics: false, regression: false };
}

/// A stage that failed without stopping the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageFailure {
    pub stage: String,
    pub error: String,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.error)
    }
}

/// A ranked unit with its identity, for reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedUnit {
    pub code: String,
    pub name: String,
    pub district: String,
    pub value: f64,
}

impl RankedUnit {
    fn new(identities: &[UnitIdentity], ranked: Ranked) -> Self {
        let identity = &identities[ranked.row];
        Self {
            code: identity.code.to_string(),
            name: identity.name.to_string(),
            district: identity.district.to_string(),
            value: ranked.value,
        }
    }
}

/// Distance summary and closest units for one landmark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceReport {
    pub landmark: String,
    pub column: String,
    pub summary: Summary,
    pub nearest: Vec<RankedUnit>,
}

/// Counts per LISA cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LisaReport {
    pub alpha: f64,
    pub permutations: usize,
    pub clusters: Vec<(LisaCluster, usize)>,
    pub islands: Vec<usize>,
}

/// Counts per hot spot class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotSpotReport {
    pub permutations: usize,
    pub classes: Vec<(HotSpotClass, usize)>,
    pub islands: Vec<usize>,
}

/// Everything a run found, in serializable form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub source: Option<PathBuf>,
    pub source_crs: Crs,
    pub metric_crs: Crs,
    pub units: usize,
    pub undefined: Vec<UndefinedCount>,
    pub target: String,
    pub summaries: Vec<Summary>,
    /// Coefficient of variation of the target.
    pub inequality: Option<f64>,
    pub top: Vec<RankedUnit>,
    pub bottom: Vec<RankedUnit>,
    pub districts: Vec<DistrictSummary>,
    pub correlation: Option<CorrelationMatrix>,
    pub hypotheses: Vec<HypothesisCheck>,
    pub distances: Vec<DistanceReport>,
    pub diagnostics_field: String,
    pub weights: Option<WeightsSummary>,
    pub moran: Option<GlobalMoran>,
    pub lisa: Option<LisaReport>,
    pub hotspots: Option<HotSpotReport>,
    pub regression: Option<OlsFit>,
    pub failures: Vec<StageFailure>,
}

/// The result of a run: the data every stage produced plus the report.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub config: AnalysisConfig,
    pub dataset: Dataset,
    pub derived: Derived,
    /// Derived table enriched with distances and diagnostic columns.
    pub table: AnalysisTable,
    pub distances: Vec<LandmarkDistances>,
    pub lisa: Option<LocalMoran>,
    pub hotspots: Option<HotSpots>,
    pub report: Report,
}

/// Run `f`, turning an error into a recorded failure.
fn optional<T, E: fmt::Display>(
    failures: &mut Vec<StageFailure>,
    stage: &str,
    f: impl FnOnce() -> Result<T, E>,
) -> Option<T> {
    match f() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(stage, error = %e, "stage failed, continuing without it");
            failures.push(StageFailure { stage: stage.to_string(), error: e.to_string() });
            None
        }
    }
}

impl Analysis {
    /// Load the shapefile at `path` and run every stage in `stages`.
    pub fn run(path: &Path, config: &AnalysisConfig, stages: Stages) -> Result<Self, Error> {
        let dataset = Dataset::load(path, &config.schema, config.metric_crs)?;
        let derived = derive(&dataset);
        Ok(Self::analyse(dataset, derived, config, stages))
    }

    /// Run the optional stages over an already loaded dataset.
    pub fn from_dataset(dataset: Dataset, config: &AnalysisConfig, stages: Stages) -> Result<Self, Error> {
        let dataset = dataset.reproject(config.metric_crs)?;
        let derived = derive(&dataset);
        Ok(Self::analyse(dataset, derived, config, stages))
    }

    fn analyse(dataset: Dataset, derived: Derived, config: &AnalysisConfig, stages: Stages) -> Self {
        let mut failures = Vec::new();
        let mut table = derived.table.clone();
        let identities = table.identities().to_vec();
        let ranked = |r: Vec<Ranked>| r.into_iter().map(|r| RankedUnit::new(&identities, r)).collect::<Vec<_>>();

        let mut report = Report {
            source: dataset.source().map(Path::to_path_buf),
            source_crs: dataset.source_crs(),
            metric_crs: dataset.crs(),
            units: dataset.len(),
            undefined: derived.undefined.clone(),
            target: config.target.clone(),
            summaries: Vec::new(),
            inequality: None,
            top: Vec::new(),
            bottom: Vec::new(),
            districts: Vec::new(),
            correlation: None,
            hypotheses: Vec::new(),
            distances: Vec::new(),
            diagnostics_field: config.diagnostics.field.clone(),
            weights: None,
            moran: None,
            lisa: None,
            hotspots: None,
            regression: None,
            failures: Vec::new(),
        };

        // Distances
        let mut distances = Vec::new();
        if stages.distances {
            if let Some(d) = optional(&mut failures, "distances", || {
                landmark_distances(&derived.centroids, &config.landmarks, dataset.crs())
            }) {
                table = with_distances(&table, &d);
                report.distances = d.iter()
                    .map(|d| DistanceReport {
                        landmark: d.landmark.name.clone(),
                        column: d.landmark.km_column(),
                        summary: d.summary(),
                        nearest: ranked(d.nearest(config.ranking_k)),
                    })
                    .collect();
                distances = d;
            }
        }

        // Statistics
        if stages.statistics {
            let describe = config.describe.iter().map(String::as_str).collect::<Vec<_>>();
            report.summaries = optional(&mut failures, "describe", || describe_columns(&table, &describe))
                .unwrap_or_default();

            if let Some(target) = optional(&mut failures, "ranking", || table.require(&config.target)) {
                report.top = ranked(top_k(target, config.ranking_k));
                report.bottom = ranked(bottom_k(target, config.ranking_k));
                report.inequality = crate::stats::describe(&config.target, target).cv();
            }

            report.districts = optional(&mut failures, "districts", || {
                district_summary(&table, Attribute::Population.column(), Attribute::Households.column(), &config.target)
            })
            .unwrap_or_default();

            let mut columns = config.correlation.clone();
            if stages.distances {
                columns.extend(config.landmarks.iter().map(|l| l.km_column()).filter(|c| table.has_column(c)));
            }
            let columns = columns.iter().map(String::as_str).collect::<Vec<_>>();
            report.correlation = optional(&mut failures, "correlation", || correlation_matrix(&table, &columns));

            let (present, missing) = config.hypotheses.iter().cloned()
                .partition::<Vec<_>, _>(|h| table.has_column(&h.variable));
            for h in missing {
                failures.push(StageFailure { stage: format!("hypothesis {}", h.label), error: format!("unknown column {:?}", h.variable) });
                warn!(hypothesis = %h.label, column = %h.variable, "hypothesis variable missing, skipped");
            }
            report.hypotheses = optional(&mut failures, "hypotheses", || check_hypotheses(&table, &config.target, &present))
                .unwrap_or_default();
        }

        // Spatial diagnostics
        let (mut lisa, mut hotspots) = (None, None);
        if stages.diagnostics {
            let geoms = dataset.units().iter().map(|u| u.geometry.clone()).collect::<Vec<MultiPolygon<f64>>>();
            let field = &config.diagnostics.field;
            let inference = &config.diagnostics.inference;

            let weights = optional(&mut failures, "weights", || SpatialWeights::contiguity(&geoms, config.diagnostics.contiguity));
            let values = optional(&mut failures, "diagnostics", || table.require(field).map(<[_]>::to_vec));

            if let (Some(weights), Some(values)) = (weights, values) {
                report.weights = Some(weights.summary());
                report.moran = optional(&mut failures, "global moran", || global_moran(&weights, &values, inference));

                if let Some(l) = optional(&mut failures, "lisa", || local_moran(&weights, &values, inference)) {
                    table = table.with_columns(l.columns());
                    report.lisa = Some(LisaReport {
                        alpha: l.alpha,
                        permutations: l.permutations,
                        clusters: l.counts(),
                        islands: l.islands.clone(),
                    });
                    lisa = Some(l);
                }

                if let Some(g) = optional(&mut failures, "getis-ord", || getis_ord(&weights, &values, inference)) {
                    table = table.with_columns(g.columns());
                    report.hotspots = Some(HotSpotReport {
                        permutations: g.permutations,
                        classes: g.counts(),
                        islands: g.islands.clone(),
                    });
                    hotspots = Some(g);
                }
            }
        }

        // Regression
        if stages.regression {
            let predictors = config.predictors.iter().map(String::as_str).collect::<Vec<_>>();
            report.regression = optional(&mut failures, "regression", || fit_ols(&table, &config.target, &predictors));
        }

        info!(units = report.units, failures = failures.len(), "analysis complete");
        report.failures = failures;

        Self { config: config.clone(), dataset, derived, table, distances, lisa, hotspots, report }
    }

    fn record<T>(&mut self, stage: &str, f: impl FnOnce(&Self) -> anyhow::Result<T>) -> Option<T> {
        match f(self) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(stage, error = %format!("{e:#}"), "export failed, continuing");
                self.report.failures.push(StageFailure { stage: stage.to_string(), error: format!("{e:#}") });
                None
            }
        }
    }

    /// Write every artifact into `dir`. Individual failures are recorded in the report,
    /// which is written last. Returns the paths written.
    pub fn export_all(&mut self, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        written.extend(self.record("export table", |a| a.export_table(dir)));
        written.extend(self.record("export geojson", |a| a.export_geojson(dir)));
        written.extend(self.record("export statistics", |a| a.export_statistics(dir)).into_iter().flatten());
        written.extend(self.record("export maps", |a| a.export_maps(dir)).into_iter().flatten());
        written.extend(self.record("export interactive map", |a| a.export_interactive(&dir.join("interactive_map.html"))));
        written.extend(self.export_reports(dir)?);

        info!(dir = %dir.display(), files = written.len(), failures = self.report.failures.len(), "exported artifacts");
        Ok(written)
    }

    /// Table, GeoJSON and reports only.
    pub fn export_distances(&mut self, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        written.extend(self.record("export table", |a| a.export_table(dir)));
        written.extend(self.record("export geojson", |a| a.export_geojson(dir)));
        written.extend(self.export_reports(dir)?);
        Ok(written)
    }

    pub fn export_table(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let path = dir.join("villages_enriched.csv");
        io::csv::write_table(&self.table, &path)?;
        Ok(path)
    }

    pub fn export_geojson(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let path = dir.join("villages_enriched.geojson");
        io::geojson::write_geojson(&self.dataset, &self.table, self.config.export_crs, &path)?;
        Ok(path)
    }

    /// Descriptive statistics and the correlation matrix.
    pub fn export_statistics(&self, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        let path = dir.join("descriptive_stats.csv");
        io::csv::write_summaries(&self.report.summaries, &path)?;
        written.push(path);

        if let Some(matrix) = &self.report.correlation {
            let path = dir.join("correlation_matrix.csv");
            io::csv::write_correlation(matrix, &path)?;
            written.push(path);
        }
        Ok(written)
    }

    /// Choropleths of the configured columns, plus LISA, hot spot and regression charts when available.
    pub fn export_maps(&self, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for column in &self.config.maps {
            let path = dir.join(format!("map_{column}.svg"));
            io::svg::write_svg(io::svg::choropleth(&self.dataset, &self.table, column)?, &path)?;
            written.push(path);
        }

        let field = &self.config.diagnostics.field;
        if let Some(lisa) = &self.lisa {
            let path = dir.join("lisa_clusters.svg");
            let title = format!("LISA clusters of {field} (p <= {})", lisa.alpha);
            io::svg::write_svg(io::svg::lisa_map(&self.dataset, &self.table, lisa, &title)?, &path)?;
            written.push(path);
        }
        if let Some(spots) = &self.hotspots {
            let path = dir.join("hotspots.svg");
            let title = format!("Getis-Ord Gi* hot spots of {field}");
            io::svg::write_svg(io::svg::hotspot_map(&self.dataset, &self.table, spots, &title)?, &path)?;
            written.push(path);
        }
        if let Some(fit) = &self.report.regression {
            let path = dir.join("regression_scatter.svg");
            io::svg::write_svg(io::svg::regression_scatter(fit)?, &path)?;
            written.push(path);
        }
        Ok(written)
    }

    pub fn export_interactive(&self, path: &Path) -> anyhow::Result<PathBuf> {
        let html = io::html::interactive_map(
            &self.dataset,
            &self.table,
            &self.derived.centroids,
            &self.config.target,
            self.config.ranking_k,
        )?;
        io::html::write_interactive_map(&html, path)?;
        Ok(path.to_path_buf())
    }

    /// Text and JSON reports. Written last so they list every failure.
    pub fn export_reports(&self, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let (text, json) = (dir.join("report.txt"), dir.join("report.json"));
        io::report::write_text(&self.report, &text)?;
        io::report::write_json(&self.report, &json)
            .with_context(|| format!("Failed to write report {}", json.display()))?;
        Ok(vec![text, json])
    }
}
