use clap::{Parser, Subcommand};

/// gensum - Checksum-gated regeneration of generated sources
///
/// Wraps source generators so they only run when their declared inputs or
/// outputs changed, and verifies that checked-in generated files still match
/// their generators.
#[derive(Parser, Debug)]
#[command(name = "gensum")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Checksum-gated regeneration of generated sources", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Common configuration arguments shared across commands
#[derive(Parser, Debug, Clone)]
pub struct CommonConfigArgs {
    /// Config file path (default: discover gensum.toml upwards from cwd)
    #[arg(short = 'c', long, env = "GENSUM_CONFIG")]
    pub config: Option<String>,

    /// Project root (default: directory containing the config file)
    #[arg(long, env = "GENSUM_ROOT")]
    pub root: Option<String>,

    /// Run generators even when their checksums match
    #[arg(long, env = "GENSUM_RERUN_TASKS")]
    pub rerun_tasks: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run tasks by name (generators, their checksum units, plain tasks, or "check")
    Run(RunArgs),

    /// Verify that no generated file drifted from its saved checksums
    Check(CheckArgs),

    /// List every task name that can be run
    Tasks(TasksArgs),

    /// Remove checksum files of generators that are no longer configured
    Prune(PruneArgs),

    /// Normalize line endings of files in place
    Normalize(NormalizeArgs),

    /// Configuration management utilities
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Task names, e.g. "generateLexer" or "generateLexerChecksumCheck"
    #[arg(required = true)]
    pub tasks: Vec<String>,

    #[command(flatten)]
    pub common: CommonConfigArgs,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub common: CommonConfigArgs,
}

#[derive(Parser, Debug)]
pub struct TasksArgs {
    #[command(flatten)]
    pub common: CommonConfigArgs,
}

#[derive(Parser, Debug)]
pub struct PruneArgs {
    /// Only list the files that would be removed
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub common: CommonConfigArgs,
}

#[derive(Parser, Debug)]
pub struct NormalizeArgs {
    /// Files to rewrite
    #[arg(required = true)]
    pub files: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file and register its generators
    Validate {
        #[command(flatten)]
        common: CommonConfigArgs,
    },
    /// Print an example config file
    Generate,
    /// Show effective configuration
    Show {
        #[command(flatten)]
        common: CommonConfigArgs,
    },
}
