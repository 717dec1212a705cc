//! Study-folder discovery.
//!
//! Inputs are recognised by file stem, case-insensitively: `dm.csv`,
//! `DM.CSV` and `Dm.csv` all provide the `dm` input.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IngestError, Result};

/// Lists CSV files in a directory, sorted by file name.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    let read_error = |source| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Input tables found in a study folder.
#[derive(Debug, Clone, Default)]
pub struct StudyFiles {
    files: BTreeMap<String, PathBuf>,
}

impl StudyFiles {
    /// Path of an input by lower-case stem, e.g. `"dm"` or `"ds_raw"`.
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.files.get(&name.to_lowercase()).map(PathBuf::as_path)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

pub fn discover_study_files(dir: &Path) -> Result<StudyFiles> {
    let mut files: BTreeMap<String, PathBuf> = BTreeMap::new();
    for path in list_csv_files(dir)? {
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let name = stem.trim().to_lowercase();
        if let Some(existing) = files.get(&name) {
            return Err(IngestError::AmbiguousInput {
                name,
                first: existing.clone(),
                second: path,
            });
        }
        debug!(input = %name, path = %path.display(), "discovered input");
        files.insert(name, path);
    }
    Ok(StudyFiles { files })
}
