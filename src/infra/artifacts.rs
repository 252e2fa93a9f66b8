// ============================================================
// Layer 6 — Artifact I/O
// ============================================================
// JSON read/write for every persisted blob except the network
// weights (those go through burn recorders in checkpoint.rs).
//
// Load failures are split in two so callers can tell them apart:
//   - file absent              → GuesserError::ArtifactMissing
//   - unreadable / bad content → GuesserError::ArtifactCorrupt
//
// Writes create the parent directory first and go through a
// temporary sibling + rename, so a crash mid-write never leaves
// a half-written artifact under the final name.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::error::GuesserError;

/// Serialise `value` as pretty JSON at `path`
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;

    let tmp = path.with_extension("json.partial");
    fs::write(&tmp, json).with_context(|| format!("Cannot write '{}'", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Cannot move '{}' into place", path.display()))?;

    tracing::debug!("Wrote artifact '{}'", path.display());
    Ok(())
}

/// Read and decode the JSON artifact at `path`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, GuesserError> {
    if !path.exists() {
        return Err(GuesserError::ArtifactMissing { path: path.to_path_buf() });
    }
    let body = fs::read_to_string(path).map_err(|e| GuesserError::artifact_corrupt(path, e))?;
    serde_json::from_str(&body).map_err(|e| GuesserError::artifact_corrupt(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_write_then_read() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("blob.json");
        let mut value = BTreeMap::new();
        value.insert("napoleon".to_string(), true);

        write_json(&path, &value).unwrap();
        let back: BTreeMap<String, bool> = read_json(&path).unwrap();
        assert_eq!(back, value);
        assert!(!path.with_extension("json.partial").exists());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_json::<u32>(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, GuesserError::ArtifactMissing { .. }));
    }

    #[test]
    fn test_corrupt_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let err = read_json::<u32>(&path).unwrap_err();
        assert!(matches!(err, GuesserError::ArtifactCorrupt { .. }));
    }
}
