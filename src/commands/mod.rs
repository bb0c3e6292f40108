pub mod check;
pub mod config;
pub mod normalize;
pub mod prune;
pub mod run;
pub mod tasks;

use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::CommonConfigArgs;
use gensum::config_discovery::load_config_with_discovery;
use gensum::generation::Project;

/// Discover, validate and register the project described by the config file
pub fn load_project(common: &CommonConfigArgs) -> Result<Project> {
    let loaded = load_config_with_discovery(common.config.as_deref(), common.root.as_deref())?;

    debug!(
        path = %loaded.config_path.display(),
        root = %loaded.project_root.display(),
        "using config"
    );

    loaded
        .config
        .into_project(&loaded.project_root, common.rerun_tasks)
        .with_context(|| {
            format!(
                "Failed to configure generators from {}",
                loaded.config_path.display()
            )
        })
}
