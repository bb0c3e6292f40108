use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::checksum::{InputProperty, PropertyValue, Resolvable};
use crate::error::GensumError;
use crate::generation::{
    CommandGenerator, CommandSpec, CommandTask, Project, Settings, TaskRef, WrapperOptions,
    DEFAULT_CHECKSUMS_DIR,
};

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "gensum.toml";

/// Complete project configuration (loaded from TOML file)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GensumConfig {
    #[serde(default)]
    pub checksums: ChecksumsConfig,

    /// Plain tasks, referenced by generators' `and_then` and `ignore_with_source`
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,

    #[serde(default)]
    pub generators: Vec<GeneratorConfig>,
}

/// Where checksum files are kept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksumsConfig {
    /// Directory relative to the project root
    #[serde(default = "default_checksums_dir")]
    pub dir: String,
}

impl Default for ChecksumsConfig {
    fn default() -> Self {
        Self {
            dir: default_checksums_dir(),
        }
    }
}

/// A plain task running an external command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub name: String,

    /// Program and arguments
    pub command: Vec<String>,

    /// Working directory relative to the project root
    #[serde(default)]
    pub cwd: Option<String>,
}

/// A wrapped generator running an external command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Must end with "Internal"; the base name is what users invoke
    pub name: String,

    pub command: Vec<String>,

    #[serde(default)]
    pub cwd: Option<String>,

    /// Input files or glob patterns, relative to the project root
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Output files or glob patterns, relative to the project root
    #[serde(default)]
    pub outputs: Vec<String>,

    /// String values, or `{ env = "VAR" }` to read an environment variable
    #[serde(default)]
    pub properties: BTreeMap<String, toml::Value>,

    #[serde(default)]
    pub and_then: Vec<String>,

    #[serde(default)]
    pub ignore_with_source: Vec<String>,

    #[serde(default)]
    pub must_run_before: Vec<String>,

    /// Normalize line endings of outputs after generation
    #[serde(default)]
    pub normalize_outputs: bool,
}

fn default_checksums_dir() -> String {
    DEFAULT_CHECKSUMS_DIR.to_string()
}

/// Property read from the environment when fingerprints are computed
#[derive(Debug, Clone)]
pub struct EnvProperty {
    var: String,
}

impl EnvProperty {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Resolvable for EnvProperty {
    fn resolve(&self) -> String {
        // Unset variables still produce a stable value
        std::env::var(&self.var).unwrap_or_else(|_| String::from("<unset>"))
    }
}

/// Convert a TOML property value; only strings and `{ env = "VAR" }` are accepted
fn property_value(
    task: &str,
    name: &str,
    value: &toml::Value,
) -> std::result::Result<PropertyValue, GensumError> {
    match value {
        toml::Value::String(s) => Ok(PropertyValue::Literal(s.clone())),
        toml::Value::Table(table) if table.len() == 1 => match table.get("env") {
            Some(toml::Value::String(var)) => Ok(PropertyValue::deferred(EnvProperty::new(var))),
            _ => Err(GensumError::NonStringProperty {
                task: task.to_string(),
                name: name.to_string(),
            }),
        },
        _ => Err(GensumError::NonStringProperty {
            task: task.to_string(),
            name: name.to_string(),
        }),
    }
}

fn check_checksums_dir(dir: &str) -> std::result::Result<(), GensumError> {
    let path = Path::new(dir);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if dir.is_empty() || escapes {
        return Err(GensumError::ChecksumsDirOutsideRoot(PathBuf::from(dir)));
    }
    Ok(())
}

fn refs(names: &[String]) -> Vec<TaskRef> {
    names.iter().map(|n| TaskRef::new(n.as_str())).collect()
}

fn working_dir(root: &Path, cwd: &Option<String>) -> PathBuf {
    match cwd {
        Some(dir) => root.join(dir),
        None => root.to_path_buf(),
    }
}

impl GensumConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: GensumConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        check_checksums_dir(&self.checksums.dir)?;

        for task in &self.tasks {
            if task.command.is_empty() {
                anyhow::bail!("tasks.command must not be empty: {}", task.name);
            }
        }

        for generator in &self.generators {
            if generator.command.is_empty() {
                anyhow::bail!("generators.command must not be empty: {}", generator.name);
            }
            if generator.outputs.is_empty() {
                anyhow::bail!("generators.outputs must not be empty: {}", generator.name);
            }
            for (name, value) in &generator.properties {
                property_value(&generator.name, name, value)?;
            }
        }

        Ok(())
    }

    /// Register every configured task and generator with a new project
    ///
    /// Tasks are registered before generators so `and_then` and
    /// `ignore_with_source` references resolve.
    pub fn into_project(
        &self,
        root: &Path,
        force_rerun: bool,
    ) -> std::result::Result<Project, GensumError> {
        check_checksums_dir(&self.checksums.dir)?;

        let settings = Settings::new(root)
            .with_checksums_dir(&self.checksums.dir)
            .with_force_rerun(force_rerun);
        let mut project = Project::new(settings);

        for task in &self.tasks {
            let command = CommandSpec::new(task.command.clone(), working_dir(root, &task.cwd));
            project.register_task(Box::new(CommandTask::new(&task.name, command)))?;
        }

        for generator in &self.generators {
            let mut properties = Vec::with_capacity(generator.properties.len());
            for (name, value) in &generator.properties {
                properties.push(InputProperty::new(
                    name.as_str(),
                    property_value(&generator.name, name, value)?,
                ));
            }

            let command =
                CommandSpec::new(generator.command.clone(), working_dir(root, &generator.cwd));
            let wrapped = CommandGenerator::new(&generator.name, command, root)
                .with_properties(properties)
                .with_inputs(generator.inputs.clone())
                .with_outputs(generator.outputs.clone())
                .with_normalized_outputs(generator.normalize_outputs);

            project.wrap(
                Box::new(wrapped),
                WrapperOptions {
                    and_then: refs(&generator.and_then),
                    ignore_with_source: refs(&generator.ignore_with_source),
                    must_run_before: generator.must_run_before.clone(),
                },
            )?;
        }

        project.validate_references()?;
        Ok(project)
    }

    /// Example configuration as TOML string
    pub fn example() -> &'static str {
        EXAMPLE_CONFIG
    }
}

const EXAMPLE_CONFIG: &str = r#"[checksums]
dir = "generation/checksums"

[[tasks]]
name = "formatGenerated"
command = ["rustfmt", "src/generated/lexer.rs"]

[[generators]]
name = "generateLexerInternal"
command = ["python3", "tools/gen_lexer.py"]
inputs = ["grammar/*.g", "tools/gen_lexer.py"]
outputs = ["src/generated/lexer.rs"]
and_then = ["formatGenerated"]
normalize_outputs = true

[generators.properties]
version = "1.0"
python = { env = "PYTHON_VERSION" }
"#;
