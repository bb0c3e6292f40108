//! In-place rewriting of generated text files
//!
//! Generators use [`rewrite`] to post-process their outputs. Files are only
//! written when their content actually changes, so untouched outputs keep
//! their checksums and timestamps.

use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{GensumError, Result};

/// Convert `\r\n` and lone `\r` line terminators to `\n`
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Rewrite a text file through `transform` with normalized line endings
///
/// Both `\r\n` and a lone `\r` (classic Mac line ending) become `\n`, before
/// and after the transform. Returns whether the file was written.
pub fn rewrite<F>(path: &Path, transform: F) -> Result<bool>
where
    F: FnOnce(String) -> String,
{
    let original = fs::read_to_string(path).map_err(|e| GensumError::io("read", path, e))?;
    let modified = normalize_newlines(&transform(normalize_newlines(&original)));

    if modified == original {
        debug!(path = %path.display(), status = "unchanged", "file not rewritten");
        return Ok(false);
    }

    fs::write(path, modified).map_err(|e| GensumError::io("write", path, e))?;
    debug!(path = %path.display(), status = "success", "file rewritten");
    Ok(true)
}

/// Normalize line endings of a file in place
pub fn normalize_line_endings(path: &Path) -> Result<bool> {
    rewrite(path, |text| text)
}
