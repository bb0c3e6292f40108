use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::cli::NormalizeArgs;
use gensum::normalize::normalize_line_endings;

pub fn run(args: &NormalizeArgs) -> Result<()> {
    let mut rewritten = 0;

    for file in &args.files {
        if normalize_line_endings(Path::new(file))
            .with_context(|| format!("Failed to normalize {}", file))?
        {
            rewritten += 1;
        }
    }

    info!(
        operation = "normalize",
        entry_count = args.files.len(),
        "rewrote {} of {} file(s)",
        rewritten,
        args.files.len()
    );
    Ok(())
}
