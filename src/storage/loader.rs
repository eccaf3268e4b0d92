//! Input directory reader

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::SourceRecord;

/// Records read from an input directory
#[derive(Debug, Default)]
pub struct LoadedSources {
    /// Every record, in file-name order then in-file order
    pub records: Vec<SourceRecord>,

    /// Files that were read successfully
    pub files: Vec<PathBuf>,

    /// Files that could not be read or parsed
    pub skipped: Vec<PathBuf>,
}

/// Reads `*.json` files holding arrays of records
#[derive(Debug, Clone)]
pub struct SourceLoader {
    input_dir: PathBuf,
}

impl SourceLoader {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Load every record file in the input directory
    ///
    /// A missing directory is created and yields an empty batch. A file that
    /// cannot be read or parsed is logged and skipped.
    ///
    /// # Errors
    ///
    /// Fails only when the directory itself cannot be created or listed
    pub fn load(&self) -> Result<LoadedSources> {
        fs::create_dir_all(&self.input_dir).with_context(|| {
            format!("Failed to create input directory: {}", self.input_dir.display())
        })?;

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.input_dir)
            .with_context(|| format!("Failed to list input directory: {}", self.input_dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_json(path))
            .collect();
        paths.sort();

        if paths.is_empty() {
            tracing::warn!(dir = %self.input_dir.display(), "No source files found");
        }

        let mut loaded = LoadedSources::default();
        for path in paths {
            match read_records(&path) {
                Ok(records) => {
                    tracing::debug!(file = %path.display(), count = records.len(), "Loaded source file");
                    loaded.records.extend(records);
                    loaded.files.push(path);
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %format!("{e:#}"), "Skipping unreadable source file");
                    loaded.skipped.push(path);
                }
            }
        }

        Ok(loaded)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn read_records(path: &Path) -> Result<Vec<SourceRecord>> {
    let bytes = fs::read(path).context("Failed to read file")?;
    // Some exports carry a UTF-8 BOM.
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);
    serde_json::from_slice(bytes).context("Failed to parse source array")
}
