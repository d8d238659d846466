use std::path::PathBuf;

/// Village income and spatial autocorrelation analysis
#[derive(clap::Parser, Debug)]
#[command(name = "incomescope", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Run every stage and write all tables, maps and reports
    Analyze(AnalyzeArgs),

    /// Add landmark distances, check the hypotheses, write the enriched table
    Distances(DistancesArgs),

    /// Write the interactive HTML map
    Map(MapArgs),

    /// Print the fields, geometry types and first records of a shapefile
    Examine(ExamineArgs),
}

#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    /// Village polygon shapefile (.shp with its .dbf sidecar)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output directory, defaults to "./output"
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// JSON analysis config; absent keys keep their defaults
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Override the number of permutations used for pseudo p-values
    #[arg(long)]
    pub permutations: Option<usize>,

    /// Override the permutation seed
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct DistancesArgs {
    /// Village polygon shapefile
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output directory, defaults to "./output"
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// JSON analysis config
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct MapArgs {
    /// Village polygon shapefile
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output HTML file, defaults to "./output/interactive_map.html"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// JSON analysis config
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Column to color by, defaults to the config target
    #[arg(long)]
    pub column: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ExamineArgs {
    /// Shapefile to examine
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Number of sample records to print
    #[arg(short, long, default_value_t = 5)]
    pub n: usize,
}
