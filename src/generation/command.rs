/// Command-backed generators and tasks
///
/// Spawns the configured argv in the project root, relays its output, and
/// expands declared inputs/outputs (globs or literal paths).
use glob::{glob, Pattern};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::task::{Generator, Task, TaskOutcome};
use crate::checksum::InputProperty;
use crate::error::{GensumError, Result};
use crate::normalize;

/// An external command run with a fixed working directory
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub argv: Vec<String>,
    pub cwd: PathBuf,
}

impl CommandSpec {
    pub fn new(argv: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            cwd: cwd.into(),
        }
    }

    /// Run to completion, failing on a non-zero exit code
    fn run(&self, name: &str) -> Result<()> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(GensumError::TaskFailed {
                name: name.to_string(),
                code: -1,
            });
        };

        // Resolve from PATH, falling back to the name as given
        let program_path = which::which(program).unwrap_or_else(|e| {
            debug!("Could not find '{}' in PATH: {}. Trying as-is.", program, e);
            PathBuf::from(program)
        });

        let start = Instant::now();
        let output = Command::new(&program_path)
            .args(args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| GensumError::Spawn {
                name: name.to_string(),
                source,
            })?;

        // Relay output; failures to write to our own streams are not fatal
        let _ = std::io::stdout().write_all(&output.stdout);
        let _ = std::io::stderr().write_all(&output.stderr);

        let code = output.status.code().unwrap_or(-1);
        debug!(
            task = name,
            exit_code = code,
            duration_ms = start.elapsed().as_millis() as u64,
            "command finished"
        );

        if output.status.success() {
            Ok(())
        } else {
            Err(GensumError::TaskFailed {
                name: name.to_string(),
                code,
            })
        }
    }
}

/// Plain task running an external command
#[derive(Debug, Clone)]
pub struct CommandTask {
    name: String,
    command: CommandSpec,
}

impl CommandTask {
    pub fn new(name: impl Into<String>, command: CommandSpec) -> Self {
        Self {
            name: name.into(),
            command,
        }
    }
}

impl Task for CommandTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self) -> Result<TaskOutcome> {
        info!(task = %self.name, "running task");
        self.command.run(&self.name)?;
        Ok(TaskOutcome::DidWork)
    }
}

/// Generator running an external command with declared inputs and outputs
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    name: String,
    command: CommandSpec,
    root: PathBuf,
    properties: Vec<InputProperty>,
    inputs: Vec<String>,
    outputs: Vec<String>,
    normalize_outputs: bool,
}

impl CommandGenerator {
    pub fn new(name: impl Into<String>, command: CommandSpec, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            command,
            root: root.into(),
            properties: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            normalize_outputs: false,
        }
    }

    pub fn with_properties(mut self, properties: Vec<InputProperty>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<String>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<String>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Normalize line endings of existing outputs after the command runs
    pub fn with_normalized_outputs(mut self, normalize_outputs: bool) -> Self {
        self.normalize_outputs = normalize_outputs;
        self
    }

    fn expand_all(&self, patterns: &[String]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for pattern in patterns {
            files.extend(expand_declared(pattern, &self.root)?);
        }
        Ok(files)
    }
}

impl Task for CommandGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self) -> Result<TaskOutcome> {
        info!(task = %self.name, "running generator");
        self.command.run(&self.name)?;

        if self.normalize_outputs {
            for output in self.output_files()? {
                let path = if output.is_absolute() {
                    output
                } else {
                    self.root.join(output)
                };
                if !path.is_file() {
                    warn!(task = %self.name, path = %path.display(), "declared output was not generated");
                    continue;
                }
                normalize::normalize_line_endings(&path)?;
            }
        }

        Ok(TaskOutcome::DidWork)
    }
}

impl Generator for CommandGenerator {
    fn input_properties(&self) -> &[InputProperty] {
        &self.properties
    }

    fn input_files(&self) -> Result<Vec<PathBuf>> {
        self.expand_all(&self.inputs)
    }

    fn output_files(&self) -> Result<Vec<PathBuf>> {
        self.expand_all(&self.outputs)
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Expand a declared entry relative to the project root
///
/// Glob patterns expand to the matching files, sorted. Anything else is taken
/// as a literal path, which may not exist yet.
pub fn expand_declared(pattern: &str, root: &Path) -> Result<Vec<PathBuf>> {
    if !is_glob(pattern) {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let full_pattern = if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        // The root is a literal prefix, never pattern syntax
        let root = Pattern::escape(&root.to_string_lossy());
        Path::new(&root).join(pattern).to_string_lossy().to_string()
    };

    let entries = glob(&full_pattern).map_err(|e| GensumError::InvalidGlob {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            GensumError::io("read glob entry", path, e.into_error())
        })?;

        // Only include files (not directories)
        if path.is_file() {
            paths.push(path);
        }
    }

    // Sort for deterministic ordering
    paths.sort();
    Ok(paths)
}
