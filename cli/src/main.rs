mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{analyze, distances, examine, map};

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    commands::init_tracing(cli.verbose);
    match &cli.command {
        Commands::Analyze(args) => analyze::run(&cli, args),
        Commands::Distances(args) => distances::run(&cli, args),
        Commands::Map(args) => map::run(&cli, args),
        Commands::Examine(args) => examine::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
