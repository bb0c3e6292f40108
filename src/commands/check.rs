use anyhow::Result;

use super::load_project;
use crate::cli::CheckArgs;

pub fn run(args: &CheckArgs) -> Result<()> {
    let project = load_project(&args.common)?;
    project.check_all()?;
    Ok(())
}
