/// Persisted checksum files
///
/// One pretty-printed, key-sorted JSON file per wrapped generator, named after
/// the generator's base name.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::fingerprint::FingerprintMap;
use crate::error::{GensumError, Result};

const CHECKSUM_EXTENSION: &str = "json";

/// Reads and writes baseline fingerprint maps
#[derive(Debug, Clone)]
pub struct ChecksumStore {
    dir: PathBuf,
}

impl ChecksumStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the checksum file for a generator
    pub fn path_for(&self, base_name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", base_name, CHECKSUM_EXTENSION))
    }

    /// Load the baseline; an absent file is an empty baseline
    pub fn load(&self, base_name: &str) -> Result<FingerprintMap> {
        let path = self.path_for(base_name);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(operation = "load", task = base_name, status = "miss", "no checksum file");
                return Ok(FingerprintMap::new());
            }
            Err(e) => return Err(GensumError::io("read checksum file", path, e)),
        };

        serde_json::from_str(&content)
            .map_err(|source| GensumError::MalformedChecksums { path, source })
    }

    /// Persist a fingerprint map, overwriting any previous baseline
    pub fn save(&self, base_name: &str, map: &FingerprintMap) -> Result<PathBuf> {
        let path = self.path_for(base_name);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| GensumError::io("create checksums directory", parent, e))?;
        }

        let text = serialize(map).map_err(|source| GensumError::SerializeChecksums {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, text)
            .map_err(|e| GensumError::io("write checksum file", &path, e))?;

        debug!(
            operation = "save",
            task = base_name,
            entry_count = map.len(),
            "checksums written"
        );
        Ok(path)
    }

    /// Base names of every persisted checksum file, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(GensumError::io("read checksums directory", &self.dir, e)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| GensumError::io("read checksums directory", &self.dir, e))?;
            let path = entry.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(CHECKSUM_EXTENSION)
            {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Delete the checksum file of a generator
    pub fn remove(&self, base_name: &str) -> Result<()> {
        let path = self.path_for(base_name);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| GensumError::io("remove checksum file", &path, e))?;
        }
        Ok(())
    }
}

/// Deterministic text form: sorted keys, two-space indent, trailing newline
pub fn serialize(map: &FingerprintMap) -> serde_json::Result<String> {
    let mut text = serde_json::to_string_pretty(map)?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> FingerprintMap {
        let mut map = FingerprintMap::new();
        map.insert("property:version", "1.0");
        map.insert("src/gen/Parser.java", "--");
        map.insert("grammar/Parser.jj", "abc123");
        map
    }

    #[test]
    fn test_load_absent_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = ChecksumStore::new(temp.path().join("checksums"));

        let map = store.load("generateParser").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let store = ChecksumStore::new(temp.path().join("nested/checksums"));

        let path = store.save("generateParser", &sample()).unwrap();
        assert!(path.ends_with("nested/checksums/generateParser.json"));

        let loaded = store.load("generateParser").unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_serialization_is_sorted_with_trailing_newline() {
        let text = serialize(&sample()).unwrap();
        assert_eq!(
            text,
            "{\n  \"grammar/Parser.jj\": \"abc123\",\n  \"property:version\": \"1.0\",\n  \"src/gen/Parser.java\": \"--\"\n}\n"
        );
    }

    #[test]
    fn test_serialization_ignores_construction_order() {
        let reversed: FingerprintMap = vec![
            ("src/gen/Parser.java", "--"),
            ("property:version", "1.0"),
            ("grammar/Parser.jj", "abc123"),
        ]
        .into_iter()
        .collect();

        assert_eq!(serialize(&reversed).unwrap(), serialize(&sample()).unwrap());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let store = ChecksumStore::new(temp.path());
        fs::write(store.path_for("broken"), "{ not json").unwrap();

        let result = store.load("broken");
        assert!(matches!(result, Err(GensumError::MalformedChecksums { .. })));
    }

    #[test]
    fn test_non_string_values_are_malformed() {
        let temp = TempDir::new().unwrap();
        let store = ChecksumStore::new(temp.path());
        fs::write(store.path_for("numbers"), "{\"a.txt\": 42}\n").unwrap();

        assert!(store.load("numbers").is_err());
    }

    #[test]
    fn test_list_and_remove() {
        let temp = TempDir::new().unwrap();
        let store = ChecksumStore::new(temp.path());
        store.save("generateB", &sample()).unwrap();
        store.save("generateA", &sample()).unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.list().unwrap(), vec!["generateA", "generateB"]);

        store.remove("generateA").unwrap();
        assert_eq!(store.list().unwrap(), vec!["generateB"]);
    }
}
