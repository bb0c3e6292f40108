/// Fingerprint computation
///
/// A fingerprint map captures everything that decides whether a generator has
/// to run: its resolved input properties and a content digest for every
/// declared input and output file.
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::error::{GensumError, Result};
use crate::generation::Generator;

/// Value stored for a declared file that does not exist.
pub const MISSING_FILE: &str = "--";

/// Key prefix for input properties.
pub const PROPERTY_PREFIX: &str = "property:";

/// Sorted map from fingerprint key to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintMap(BTreeMap<String, String>);

impl FingerprintMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FingerprintMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A property value produced on demand, without side effects.
pub trait Resolvable: Send + Sync {
    fn resolve(&self) -> String;
}

impl<F> Resolvable for F
where
    F: Fn() -> String + Send + Sync,
{
    fn resolve(&self) -> String {
        self()
    }
}

/// Value of a declared input property
#[derive(Clone)]
pub enum PropertyValue {
    Literal(String),
    Deferred(Arc<dyn Resolvable>),
}

impl PropertyValue {
    pub fn deferred(value: impl Resolvable + 'static) -> Self {
        PropertyValue::Deferred(Arc::new(value))
    }

    pub fn resolve(&self) -> String {
        match self {
            PropertyValue::Literal(value) => value.clone(),
            PropertyValue::Deferred(resolvable) => resolvable.resolve(),
        }
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            PropertyValue::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Literal(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Literal(value)
    }
}

/// Named input property of a generator
#[derive(Debug, Clone)]
pub struct InputProperty {
    pub name: String,
    pub value: PropertyValue,
}

impl InputProperty {
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Computes fingerprint maps relative to a fixed project root
#[derive(Debug, Clone)]
pub struct ChecksumComputer {
    root: PathBuf,
}

impl ChecksumComputer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: normalize_path(&root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compute the current fingerprint of a generator's declared inputs and outputs
    pub fn compute(&self, generator: &dyn Generator) -> Result<FingerprintMap> {
        let mut files = generator.input_files()?;
        files.extend(generator.output_files()?);
        self.compute_from(generator.input_properties(), &files)
    }

    /// Compute a fingerprint from explicit properties and files
    ///
    /// Relative file paths are resolved against the project root. Declared
    /// directories contribute every regular file beneath them.
    pub fn compute_from(
        &self,
        properties: &[InputProperty],
        files: &[PathBuf],
    ) -> Result<FingerprintMap> {
        let mut map = FingerprintMap::new();

        // Each deferred value is forced exactly once here
        for property in properties {
            map.insert(
                format!("{}{}", PROPERTY_PREFIX, property.name),
                property.value.resolve(),
            );
        }

        // Keyed by relative path, which merges duplicate declarations
        let mut declared: BTreeMap<String, PathBuf> = BTreeMap::new();
        for file in files {
            let path = self.absolute(file);
            if path.is_dir() {
                for entry in WalkDir::new(&path).sort_by_file_name() {
                    let entry = entry
                        .map_err(|e| GensumError::io("walk directory", &path, io::Error::from(e)))?;
                    if entry.file_type().is_file() {
                        declared.insert(self.relative_key(entry.path())?, entry.into_path());
                    }
                }
            } else {
                declared.insert(self.relative_key(&path)?, path);
            }
        }

        for (key, path) in declared {
            let value = if path.is_file() {
                hash_file(&path)?
            } else {
                MISSING_FILE.to_string()
            };
            map.insert(key, value);
        }

        Ok(map)
    }

    /// Resolve a declared path against the project root
    pub fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize_path(path)
        } else {
            normalize_path(&self.root.join(path))
        }
    }

    /// Path relative to the project root, `/`-separated
    pub fn relative_key(&self, path: &Path) -> Result<String> {
        let normalized = normalize_path(path);
        let relative =
            normalized
                .strip_prefix(&self.root)
                .map_err(|_| GensumError::OutsideRoot {
                    root: self.root.clone(),
                    path: path.to_path_buf(),
                })?;

        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Ok(parts.join("/"))
    }
}

/// Hex-encoded SHA-256 of a file's bytes
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| GensumError::io("open", path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| GensumError::io("hash", path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Lexically resolve `.` and `..` components
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}
