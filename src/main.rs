mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use gensum::logging;

fn main() -> Result<()> {
    // Initialize structured logging
    logging::init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Run(args) => commands::run::run(&args),
        Commands::Check(args) => commands::check::run(&args),
        Commands::Tasks(args) => commands::tasks::run(&args),
        Commands::Prune(args) => commands::prune::run(&args),
        Commands::Normalize(args) => commands::normalize::run(&args),
        Commands::Config(args) => commands::config::run(args.command),
    }
}
