use anyhow::Result;

use super::load_project;
use crate::cli::PruneArgs;

pub fn run(args: &PruneArgs) -> Result<()> {
    let project = load_project(&args.common)?;

    let stale = project.prune(args.dry_run)?;
    if stale.is_empty() {
        println!("No stale checksum files");
        return Ok(());
    }

    let verb = if args.dry_run { "Would remove" } else { "Removed" };
    for path in &stale {
        println!("{} {}", verb, path.display());
    }

    Ok(())
}
