//!
//! src/snapshot.rs  Andrew Belles  Sept 15th, 2025
//!
//! Keeps a preview on disk between the preview and the sync step, so the
//! user can look it over before anything is written
//!

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use tracing::info;

use crate::errors::SyncError;
use crate::types::Resolution;

/// Writes pretty json through a temp file in the target directory, then
/// renames it over `path`. Readers never see a half written file.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), SyncError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(&parent)?;
    serde_json::to_writer_pretty(temp.as_file_mut(), value)?;
    temp.as_file_mut().flush()?;
    temp.persist(path)
        .map_err(|e| SyncError::Io(e.error))?;
    Ok(())
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SyncError> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| SyncError::Parse(format!("{}: {e}", path.display())))
}

pub fn save(path: &Path, resolution: &Resolution) -> Result<(), SyncError> {
    write_json_atomic(path, resolution)?;
    info!(
        path = %path.display(),
        entries = resolution.entries.len(),
        skipped = resolution.skipped.len(),
        "snapshot.saved"
    );
    Ok(())
}

pub fn load(path: &Path) -> Result<Resolution, SyncError> {
    let resolution: Resolution = read_json(path)?;
    info!(path = %path.display(), entries = resolution.entries.len(), "snapshot.loaded");
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CandidateName, PreviewEntry, SkipReason, Skipped, TrackRef};

    fn sample() -> Resolution {
        Resolution {
            entries: vec![PreviewEntry {
                name: CandidateName::parse("Alpha").unwrap(),
                tracks: vec![TrackRef {
                    display_title: "One (First)".into(),
                    uri: "spotify:track:t1".into(),
                }],
            }],
            skipped: vec![
                Skipped {
                    name: CandidateName::parse("Beta").unwrap(),
                    reason: SkipReason::NoArtistMatch,
                },
                Skipped {
                    name: CandidateName::parse("Gamma").unwrap(),
                    reason: SkipReason::EnrichFailed("catalog unavailable: 500".into()),
                },
            ],
        }
    }

    #[test]
    fn saved_preview_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preview.json");

        save(&path, &sample()).unwrap();
        assert_eq!(load(&path).unwrap(), sample());
    }

    #[test]
    fn skip_reasons_are_tagged_in_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.json");
        save(&path, &sample()).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["skipped"][0]["reason"]["reason"], "no_artist_match");
        assert_eq!(raw["skipped"][1]["reason"]["reason"], "enrich_failed");
        assert_eq!(raw["entries"][0]["name"], "Alpha");
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load(&path), Err(SyncError::Parse(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load(&dir.path().join("absent.json")), Err(SyncError::Io(_))));
    }
}
