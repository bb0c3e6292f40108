use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{GensumConfig, CONFIG_FILE_NAME};

/// Discovers the project configuration by traversing up the directory tree
pub fn discover_config(start_dir: &Path) -> Result<Option<PathBuf>> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Ok(Some(config_path));
        }

        // Try to go up one level
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    Ok(None)
}

/// A loaded configuration together with the project root it applies to
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: GensumConfig,
    pub config_path: PathBuf,
    pub project_root: PathBuf,
}

/// Loads configuration with auto-discovery support
///
/// If `explicit_path` is provided, loads config from that path. Otherwise,
/// auto-discovers config by traversing up the directory tree from cwd. The
/// project root is `root_override` when given, else the config file's
/// directory.
pub fn load_config_with_discovery(
    explicit_path: Option<&str>,
    root_override: Option<&str>,
) -> Result<LoadedConfig> {
    let config_path = match explicit_path {
        Some(path) => PathBuf::from(path),
        None => {
            let current_dir = std::env::current_dir()
                .context("Failed to get current directory for config discovery")?;
            discover_config(&current_dir)?.ok_or_else(|| {
                anyhow::anyhow!(
                    "No {} found in {} or any parent directory",
                    CONFIG_FILE_NAME,
                    current_dir.display()
                )
            })?
        }
    };

    let config = GensumConfig::from_file(&config_path)?;
    config
        .validate()
        .with_context(|| format!("Invalid config file: {}", config_path.display()))?;

    let root = match root_override {
        Some(root) => PathBuf::from(root),
        None => config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let root = if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root
    };
    let project_root = root
        .canonicalize()
        .with_context(|| format!("Failed to resolve project root: {}", root.display()))?;

    Ok(LoadedConfig {
        config,
        config_path,
        project_root,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_config_walks_up() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "").unwrap();
        let nested = temp.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let found = discover_config(&nested).unwrap();
        assert_eq!(found, Some(temp.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn test_explicit_config_sets_root() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "[checksums]\ndir = \"sums\"\n").unwrap();

        let loaded =
            load_config_with_discovery(Some(config_path.to_str().unwrap()), None).unwrap();

        assert_eq!(loaded.project_root, temp.path().canonicalize().unwrap());
        assert_eq!(loaded.config.checksums.dir, "sums");
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "[checksums]\ndir = \"../escape\"\n").unwrap();

        let result = load_config_with_discovery(Some(config_path.to_str().unwrap()), None);
        assert!(result.is_err());
    }
}
