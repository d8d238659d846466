use anyhow::{Context, Result};
use incomescope::{io::report::render_text, Analysis, Stages};

use super::{load_config, output_dir, print_outcome};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::AnalyzeArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(permutations) = args.permutations {
        config.diagnostics.inference.permutations = permutations;
    }
    if let Some(seed) = args.seed {
        config.diagnostics.inference.seed = seed;
    }
    config.validate()?;
    let out_dir = output_dir(&args.output);

    println!("[analyze] loading {}", args.input.display());
    let mut analysis = Analysis::run(&args.input, &config, Stages::ALL)
        .with_context(|| format!("Failed to analyse {}", args.input.display()))?;

    println!("[analyze] writing artifacts to {}", out_dir.display());
    let written = analysis.export_all(&out_dir)?;

    print!("{}", render_text(&analysis.report));
    print_outcome(&written, &analysis.report.failures);
    Ok(())
}
