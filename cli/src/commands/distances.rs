use anyhow::{Context, Result};
use incomescope::{Analysis, Stages};

use super::{load_config, output_dir, print_outcome};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::DistancesArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let out_dir = output_dir(&args.output);

    println!("[distances] loading {}", args.input.display());
    let mut analysis = Analysis::run(&args.input, &config, Stages::DISTANCES)
        .with_context(|| format!("Failed to analyse {}", args.input.display()))?;

    for d in &analysis.report.distances {
        let km = |x: Option<f64>| x.map_or("n/a".to_string(), |x| format!("{x:.2}"));
        println!("[distances] {}: mean {} km, min {} km, max {} km", d.landmark, km(d.summary.mean), km(d.summary.min), km(d.summary.max));
    }
    for check in &analysis.report.hypotheses {
        let r = check.correlation.map_or("n/a".to_string(), |r| format!("{r:.3}"));
        let verdict = match check.supported {
            Some(true) => "supported",
            Some(false) => "not supported",
            None => "undetermined",
        };
        println!("[distances] {} {}: r = {r}, {verdict}", check.hypothesis.label, check.hypothesis.variable);
    }

    let written = analysis.export_distances(&out_dir)?;
    print_outcome(&written, &analysis.report.failures);
    Ok(())
}
