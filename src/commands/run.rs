/// `gensum run` command implementation
///
/// Runs generators, their checksum units and plain tasks by name.
use anyhow::Result;
use tracing::debug;

use super::load_project;
use crate::cli::RunArgs;

pub fn run(args: &RunArgs) -> Result<()> {
    let mut project = load_project(&args.common)?;

    let executed = project.execute(&args.tasks)?;

    let names: Vec<String> = executed.iter().map(|t| t.to_string()).collect();
    debug!("executed {}", names.join(", "));
    Ok(())
}
