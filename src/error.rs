use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::checksum::{ChecksumDiff, FingerprintMap};

/// Errors raised by the checksum engine and the generation orchestrator.
#[derive(Error, Debug)]
pub enum GensumError {
    #[error("Generator task name must end with '{suffix}': {name}")]
    MissingSuffix { name: String, suffix: &'static str },

    #[error("Input properties must all be strings (property '{name}' of {task})")]
    NonStringProperty { task: String, name: String },

    #[error("Declared file is outside the project root {root}: {path}")]
    OutsideRoot { root: PathBuf, path: PathBuf },

    #[error("Checksums directory must be a relative path inside the project root: {0}")]
    ChecksumsDirOutsideRoot(PathBuf),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Duplicate task name: {0}")]
    DuplicateTask(String),

    #[error("Ordering cycle between requested tasks: {0}")]
    OrderingCycle(String),

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("{0}")]
    Drift(Box<DriftReport>),

    #[error("Checksum verification failed for {} generator(s)", reports.len())]
    VerificationFailed { reports: Vec<DriftReport> },

    #[error("Malformed checksum file {path}: {source}")]
    MalformedChecksums {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize checksums for {path}: {source}")]
    SerializeChecksums {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to spawn task {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Task {name} failed with exit code {code}")]
    TaskFailed { name: String, code: i32 },
}

pub type Result<T> = std::result::Result<T, GensumError>;

impl GensumError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        GensumError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Diagnostic produced when a generator's files drifted from its baseline.
#[derive(Debug, Clone)]
pub struct DriftReport {
    pub base_name: String,
    pub diff: ChecksumDiff,
    pub input_files: Vec<String>,
    pub output_files: Vec<String>,
}

fn write_entries(f: &mut fmt::Formatter<'_>, entries: &FingerprintMap) -> fmt::Result {
    for (key, value) in entries.iter() {
        write!(f, "\n  {}={}", key, value)?;
    }
    Ok(())
}

fn write_files(f: &mut fmt::Formatter<'_>, files: &[String]) -> fmt::Result {
    for file in files {
        write!(f, "\n  {}", file)?;
    }
    Ok(())
}

impl fmt::Display for DriftReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Checksums mismatch for generated files of '{}'; a generated file may have been \
             edited by hand (run '{}' to regenerate)",
            self.base_name, self.base_name
        )?;
        write!(f, "\nCurrent:")?;
        write_entries(f, &self.diff.only_in_current)?;
        write!(f, "\nExpected:")?;
        write_entries(f, &self.diff.only_in_previous)?;
        write!(f, "\nInput files for this generator are:")?;
        write_files(f, &self.input_files)?;
        write!(f, "\nFiles generated by this generator are:")?;
        write_files(f, &self.output_files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_report_lists_both_halves_and_files() {
        let mut current = FingerprintMap::new();
        current.insert("src/gen.rs", "aaaa");
        let mut previous = FingerprintMap::new();
        previous.insert("src/gen.rs", "bbbb");

        let report = DriftReport {
            base_name: "generateLexer".to_string(),
            diff: crate::checksum::diff(&current, &previous),
            input_files: vec!["grammar/lexer.g".to_string()],
            output_files: vec!["src/gen.rs".to_string()],
        };

        let message = report.to_string();
        assert!(message.contains("Current:\n  src/gen.rs=aaaa"));
        assert!(message.contains("Expected:\n  src/gen.rs=bbbb"));
        assert!(message.contains("Input files for this generator are:\n  grammar/lexer.g"));
        assert!(message.contains("Files generated by this generator are:\n  src/gen.rs"));
    }

    #[test]
    fn test_verification_failed_counts_reports() {
        let err = GensumError::VerificationFailed { reports: vec![] };
        assert_eq!(
            err.to_string(),
            "Checksum verification failed for 0 generator(s)"
        );
    }

    #[test]
    fn test_serialize_failure_names_checksum_file() {
        let source = serde_json::from_str::<u8>("not a number").unwrap_err();
        let err = GensumError::SerializeChecksums {
            path: PathBuf::from("generation/checksums/generateLexer.json"),
            source,
        };

        let message = err.to_string();
        assert!(message
            .starts_with("Failed to serialize checksums for generation/checksums/generateLexer.json"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
