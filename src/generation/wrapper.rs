/// Checksum wrapper around a single generator
///
/// Derives the synthesized task names from the generator's name and implements
/// the load, save and check units. The gated pipeline that ties them together
/// lives in [`crate::generation::Project`].
use std::path::Path;
use tracing::{debug, info};

use super::task::{Generator, WrapperOptions};
use crate::checksum::{self, ChecksumComputer, ChecksumStore, FingerprintMap};
use crate::error::{DriftReport, GensumError, Result};

/// Suffix every wrapped generator's name must end with
pub const GENERATOR_SUFFIX: &str = "Internal";

pub const LOAD_SUFFIX: &str = "ChecksumLoad";
pub const SAVE_SUFFIX: &str = "ChecksumSave";
pub const CHECK_SUFFIX: &str = "ChecksumCheck";

/// Strip the generator suffix, rejecting names without it
pub fn base_name(generator_name: &str) -> Result<String> {
    match generator_name.strip_suffix(GENERATOR_SUFFIX) {
        Some(base) if !base.is_empty() => Ok(base.to_string()),
        _ => Err(GensumError::MissingSuffix {
            name: generator_name.to_string(),
            suffix: GENERATOR_SUFFIX,
        }),
    }
}

/// Externally invocable names synthesized for one generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNames {
    pub facade: String,
    pub load: String,
    pub save: String,
    pub check: String,
}

impl TaskNames {
    pub fn new(base: &str) -> Self {
        Self {
            facade: base.to_string(),
            load: format!("{}{}", base, LOAD_SUFFIX),
            save: format!("{}{}", base, SAVE_SUFFIX),
            check: format!("{}{}", base, CHECK_SUFFIX),
        }
    }

    pub fn all(&self) -> [&str; 4] {
        [&self.facade, &self.load, &self.save, &self.check]
    }
}

/// Result of the load unit: the skip/run decision and both maps
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub current: FingerprintMap,
    pub previous: FingerprintMap,
    pub checksum_match: bool,
}

/// A generator together with its checksum units
pub struct WrappedGenerator {
    names: TaskNames,
    generator: Box<dyn Generator>,
    options: WrapperOptions,
}

impl WrappedGenerator {
    pub fn new(generator: Box<dyn Generator>, options: WrapperOptions) -> Result<Self> {
        let base = base_name(generator.name())?;
        Ok(Self {
            names: TaskNames::new(&base),
            generator,
            options,
        })
    }

    pub fn base_name(&self) -> &str {
        &self.names.facade
    }

    pub fn names(&self) -> &TaskNames {
        &self.names
    }

    pub fn options(&self) -> &WrapperOptions {
        &self.options
    }

    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    pub(crate) fn generator_mut(&mut self) -> &mut dyn Generator {
        self.generator.as_mut()
    }

    /// Compute the current map, load the baseline and decide
    pub fn checksum_load(
        &self,
        computer: &ChecksumComputer,
        store: &ChecksumStore,
    ) -> Result<LoadOutcome> {
        let current = computer.compute(self.generator())?;
        let previous = store.load(self.base_name())?;
        let checksum_match = checksum::equal(&current, &previous);

        debug!(
            operation = "load",
            task = %self.names.load,
            checksum_match,
            entry_count = current.len(),
            "checksums loaded"
        );

        Ok(LoadOutcome {
            current,
            previous,
            checksum_match,
        })
    }

    /// Recompute and persist the baseline unconditionally
    pub fn checksum_save(
        &self,
        computer: &ChecksumComputer,
        store: &ChecksumStore,
    ) -> Result<FingerprintMap> {
        let current = computer.compute(self.generator())?;
        let path = store.save(self.base_name(), &current)?;

        info!(
            operation = "save",
            task = %self.names.save,
            path = %path.display(),
            entry_count = current.len(),
            "updated checksums"
        );
        Ok(current)
    }

    /// Fail with a drift report if the files no longer match the baseline
    pub fn checksum_check(
        &self,
        computer: &ChecksumComputer,
        store: &ChecksumStore,
    ) -> Result<()> {
        let load = self.checksum_load(computer, store)?;
        if load.checksum_match {
            debug!(operation = "check", task = %self.names.check, status = "success", "checksums match");
            return Ok(());
        }

        let report = DriftReport {
            base_name: self.base_name().to_string(),
            diff: checksum::diff(&load.current, &load.previous),
            input_files: self.describe(computer, self.generator.input_files()?),
            output_files: self.describe(computer, self.generator.output_files()?),
        };
        Err(GensumError::Drift(Box::new(report)))
    }

    fn describe(&self, computer: &ChecksumComputer, files: Vec<std::path::PathBuf>) -> Vec<String> {
        files
            .iter()
            .map(|file| {
                computer
                    .relative_key(&computer.absolute(file))
                    .unwrap_or_else(|_| display(file))
            })
            .collect()
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
