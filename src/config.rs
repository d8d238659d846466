use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    crs::Crs,
    distance::Landmark,
    error::ConfigError,
    schema::Schema,
    spatial::{Contiguity, Inference},
    stats::Hypothesis,
};

/// Which column the spatial diagnostics run on and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub field: String,
    pub contiguity: Contiguity,
    #[serde(flatten)]
    pub inference: Inference,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            field: "income_per_capita".into(),
            contiguity: Contiguity::Queen,
            inference: Inference::default(),
        }
    }
}

/// Every tunable of an analysis run. Defaults reproduce the Hsinchu City study;
/// a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub schema: Schema,
    /// Planar CRS used for areas, centroids and distances.
    pub metric_crs: Crs,
    /// CRS of exported geometry.
    pub export_crs: Crs,
    pub landmarks: Vec<Landmark>,
    pub describe: Vec<String>,
    pub correlation: Vec<String>,
    pub target: String,
    pub predictors: Vec<String>,
    pub ranking_k: usize,
    pub hypotheses: Vec<Hypothesis>,
    pub diagnostics: DiagnosticsConfig,
    /// Columns drawn as static choropleth maps.
    pub maps: Vec<String>,
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            schema: Schema::default(),
            metric_crs: Crs::METRIC,
            export_crs: Crs::Wgs84,
            landmarks: Landmark::hsinchu(),
            describe: strings(&[
                "POPULATION", "HOUSEHOLD", "SEX_RATIO", "POP_DENS", "AgingIndex", "TERTIARY",
                "INDIGENOUS", "income_per_capita", "income_per_household", "education_rate",
                "indigenous_ratio",
            ]),
            correlation: strings(&[
                "income_per_capita", "education_rate", "AgingIndex", "POP_DENS",
                "indigenous_ratio", "household_size", "SEX_RATIO",
            ]),
            target: "income_per_capita".into(),
            predictors: strings(&["education_rate", "AgingIndex", "POP_DENS", "indigenous_ratio", "household_size"]),
            ranking_k: 5,
            hypotheses: Hypothesis::hsinchu(),
            diagnostics: DiagnosticsConfig::default(),
            maps: strings(&["income_per_capita", "education_rate", "AgingIndex", "POP_DENS"]),
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON config, filling absent keys with defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config = serde_json::from_str::<Self>(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metric_crs.is_geographic() {
            return Err(ConfigError::Invalid(format!("metric_crs {} is geographic", self.metric_crs)));
        }
        if self.ranking_k == 0 {
            return Err(ConfigError::Invalid("ranking_k must be positive".into()));
        }
        if self.predictors.is_empty() {
            return Err(ConfigError::Invalid("at least one predictor is required".into()));
        }
        let alpha = self.diagnostics.inference.alpha;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ConfigError::Invalid(format!("alpha {alpha} is outside (0, 1)")));
        }
        if let Some(dup) = self.landmarks.iter().enumerate()
            .find(|(i, a)| self.landmarks[..*i].iter().any(|b| b.slug == a.slug))
        {
            return Err(ConfigError::Invalid(format!("duplicate landmark slug {:?}", dup.1.slug)));
        }
        Ok(())
    }

    /// Correlation columns followed by every landmark distance in kilometres.
    pub fn correlation_with_distances(&self) -> Vec<String> {
        let mut columns = self.correlation.clone();
        columns.extend(self.landmarks.iter().map(Landmark::km_column));
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.metric_crs.epsg(), 3826);
        assert_eq!(config.diagnostics.inference.permutations, 999);
        assert_eq!(config.hypotheses.len(), 4);
    }

    #[test]
    fn partial_file_is_merged_over_defaults() {
        let file = write_config(r#"{
            "target": "income_per_household",
            "schema": { "income": "INC_TOTAL" },
            "diagnostics": { "contiguity": "rook", "permutations": 99 }
        }"#);
        let config = AnalysisConfig::from_json_file(file.path()).unwrap();

        assert_eq!(config.target, "income_per_household");
        assert_eq!(config.schema.income, "INC_TOTAL");
        assert_eq!(config.schema.code, "VILLCODE");
        assert_eq!(config.diagnostics.contiguity, Contiguity::Rook);
        assert_eq!(config.diagnostics.inference.permutations, 99);
        assert_eq!(config.diagnostics.inference.seed, 12345);
        assert_eq!(config.ranking_k, 5);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let file = write_config(r#"{ "metric_crs": 4326 }"#);
        assert!(matches!(AnalysisConfig::from_json_file(file.path()), Err(ConfigError::Invalid(_))));

        let file = write_config(r#"{ "ranking_k": 0 }"#);
        assert!(matches!(AnalysisConfig::from_json_file(file.path()), Err(ConfigError::Invalid(_))));

        let file = write_config("{ not json");
        assert!(matches!(AnalysisConfig::from_json_file(file.path()), Err(ConfigError::Parse { .. })));

        assert!(matches!(
            AnalysisConfig::from_json_file(Path::new("/nonexistent/config.json")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn distance_columns_extend_correlation() {
        let columns = AnalysisConfig::default().correlation_with_distances();
        assert_eq!(&columns[columns.len() - 2..], ["dist_to_science_park_km", "dist_to_airbase_km"]);
    }
}
