use anyhow::Result;
use tracing::info;

use super::load_project;
use crate::cli::{CommonConfigArgs, ConfigCommands};
use gensum::config::GensumConfig;
use gensum::config_discovery::load_config_with_discovery;

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Validate { common } => validate(&common),
        ConfigCommands::Generate => generate(),
        ConfigCommands::Show { common } => show(&common),
    }
}

fn validate(common: &CommonConfigArgs) -> Result<()> {
    info!("Validating config file");

    // Registering the project surfaces naming and reference errors too
    let project = load_project(common)?;
    let settings = project.settings();

    println!("✓ Configuration is valid");
    println!("\nSummary:");
    println!("  - Project root: {}", settings.project_root.display());
    println!("  - Checksums directory: {}", settings.checksums_dir.display());
    println!("  - Generators: {}", project.generator_names().len());

    for (i, name) in project.generator_names().iter().enumerate() {
        println!("    {}. {}", i + 1, name);
    }

    Ok(())
}

fn generate() -> Result<()> {
    print!("{}", GensumConfig::example());
    Ok(())
}

fn show(common: &CommonConfigArgs) -> Result<()> {
    info!("Showing effective configuration");

    let loaded = load_config_with_discovery(common.config.as_deref(), common.root.as_deref())?;

    println!("# {}", loaded.config_path.display());
    println!("{}", toml::to_string_pretty(&loaded.config)?);

    Ok(())
}
