use anyhow::{Context, Result};
use incomescope::{io::html, Analysis, Stages};

use super::load_config;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::MapArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let out_path = args.output.clone().unwrap_or_else(|| "./output/interactive_map.html".into());
    let column = args.column.clone().unwrap_or_else(|| config.target.clone());

    println!("[map] loading {}", args.input.display());
    let analysis = Analysis::run(&args.input, &config, Stages::DISTANCES)
        .with_context(|| format!("Failed to analyse {}", args.input.display()))?;

    let page = html::interactive_map(&analysis.dataset, &analysis.table, &analysis.derived.centroids, &column, config.ranking_k)?;
    html::write_interactive_map(&page, &out_path)?;

    println!("[map] wrote {}", out_path.display());
    Ok(())
}
