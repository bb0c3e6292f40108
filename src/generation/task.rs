/// Task and generator contracts
///
/// Generators are the external collaborators being wrapped; plain tasks are the
/// auxiliary and sibling units that share a generator's gate.
use std::fmt;
use std::path::PathBuf;

use crate::checksum::InputProperty;
use crate::error::Result;

/// Whether an executed task performed meaningful work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    DidWork,
    NoWork,
}

impl TaskOutcome {
    pub fn did_work(self) -> bool {
        matches!(self, TaskOutcome::DidWork)
    }
}

/// A named unit of work
pub trait Task: Send {
    fn name(&self) -> &str;

    fn execute(&mut self) -> Result<TaskOutcome>;
}

/// A source-generating task whose execution is gated by checksums
///
/// Declared files may be absolute or relative to the project root. Files that
/// do not exist yet are valid declarations.
pub trait Generator: Task {
    fn input_properties(&self) -> &[InputProperty];

    fn input_files(&self) -> Result<Vec<PathBuf>>;

    fn output_files(&self) -> Result<Vec<PathBuf>>;
}

/// Reference to a registered plain task by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskRef(String);

impl TaskRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TaskRef {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extra wiring around a wrapped generator
#[derive(Debug, Clone, Default)]
pub struct WrapperOptions {
    /// Tasks run after the generator and before checksums are saved, in order
    pub and_then: Vec<TaskRef>,
    /// Tasks skipped and run in lockstep with the generator
    pub ignore_with_source: Vec<TaskRef>,
    /// Requested tasks that must be scheduled after the wrapped generator
    pub must_run_before: Vec<String>,
}

impl WrapperOptions {
    /// Whether the generator's gate also applies to `task`
    pub fn gates(&self, task: &str) -> bool {
        self.and_then
            .iter()
            .chain(&self.ignore_with_source)
            .any(|t| t.name() == task)
    }
}
