pub mod analyze;
pub mod distances;
pub mod examine;
pub mod map;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use incomescope::AnalysisConfig;
use tracing_subscriber::EnvFilter;

/// Log to stderr at warn, info or debug depending on `-v`. `RUST_LOG` wins when set.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// The config at `path`, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

pub fn output_dir(output: &Option<PathBuf>) -> PathBuf {
    output.clone().unwrap_or_else(|| "./output".into())
}

/// Print the paths written and any stage that failed along the way.
pub fn print_outcome(written: &[PathBuf], failures: &[incomescope::pipeline::StageFailure]) {
    for path in written {
        println!("  wrote {}", path.display());
    }
    if !failures.is_empty() {
        eprintln!("{} stage(s) failed:", failures.len());
        for failure in failures {
            eprintln!("  {failure}");
        }
    }
}
