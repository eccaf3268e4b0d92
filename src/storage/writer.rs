//! Bucket output
//!
//! Layout under the output directory:
//!
//! ```text
//! no-domain.json
//! unreachable.json
//! duplicates.json
//! 小说.json                  unique records of one type
//! 漫画/精品.json             ... or per primary category, when stored
//! 小说/小说_01.json          a bucket large enough to be sliced
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::models::{Bucket, SourceRecord};
use crate::utils::sanitize_filename;

/// Writes result buckets as JSON files
#[derive(Debug, Clone)]
pub struct BucketWriter {
    output_dir: PathBuf,
    pretty: bool,
    slice: bool,
    slice_size: usize,
    clear_output: bool,
    by_category: bool,
    type_labels: BTreeMap<i64, String>,
}

impl BucketWriter {
    pub fn new(config: &Config) -> Self {
        let output = &config.output;
        Self {
            output_dir: output.output_dir.clone(),
            pretty: output.pretty,
            slice: output.slice,
            slice_size: output.slice_size.max(1),
            clear_output: output.clear_output,
            by_category: config.classify.store_primary_category,
            type_labels: config
                .classify
                .types
                .iter()
                .map(|mapping| (mapping.id, mapping.label.clone()))
                .collect(),
        }
    }

    /// Point the writer at another directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the output directory, emptying it first when configured
    pub fn prepare(&self) -> Result<()> {
        if self.clear_output && self.output_dir.exists() {
            for entry in fs::read_dir(&self.output_dir).with_context(|| {
                format!("Failed to list output directory: {}", self.output_dir.display())
            })? {
                let path = entry?.path();
                if path.is_dir() {
                    fs::remove_dir_all(&path)
                } else {
                    fs::remove_file(&path)
                }
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
            tracing::debug!(dir = %self.output_dir.display(), "Cleared output directory");
        }

        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory: {}", self.output_dir.display())
        })
    }

    /// Write one of the flat buckets at the top of the output directory
    pub fn write_bucket(&self, bucket: Bucket, records: &[SourceRecord]) -> Result<Vec<PathBuf>> {
        let refs: Vec<&SourceRecord> = records.iter().collect();
        self.write_named(&self.output_dir, bucket.as_str(), &refs)
    }

    /// Write the unique bucket split by type label, and by primary category
    /// when primary categories are stored
    pub fn write_unique(&self, records: &[SourceRecord]) -> Result<Vec<PathBuf>> {
        let mut groups: BTreeMap<(String, Option<String>), Vec<&SourceRecord>> = BTreeMap::new();

        for record in records {
            let type_label = self.type_label(record.type_id);
            let category = self.by_category.then(|| {
                record
                    .primary_category
                    .clone()
                    .unwrap_or_else(|| type_label.clone())
            });
            groups.entry((type_label, category)).or_default().push(record);
        }

        let mut written = Vec::new();
        for ((type_label, category), group) in groups {
            let type_name = sanitize_filename(&type_label);
            let paths = match category {
                Some(category) => {
                    let dir = self.output_dir.join(&type_name);
                    self.write_named(&dir, &sanitize_filename(&category), &group)?
                }
                None => self.write_named(&self.output_dir, &type_name, &group)?,
            };
            written.extend(paths);
        }

        Ok(written)
    }

    fn type_label(&self, type_id: i64) -> String {
        self.type_labels
            .get(&type_id)
            .cloned()
            .unwrap_or_else(|| format!("type-{type_id}"))
    }

    /// Write `<dir>/<name>.json`, or `<dir>/<name>/<name>_NN.json` when sliced
    fn write_named(&self, dir: &Path, name: &str, records: &[&SourceRecord]) -> Result<Vec<PathBuf>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let plan = slice_plan(records.len(), self.slice, self.slice_size);
        if plan.len() == 1 {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            let path = dir.join(format!("{name}.json"));
            self.dump(&path, records)?;
            return Ok(vec![path]);
        }

        let slice_dir = dir.join(name);
        fs::create_dir_all(&slice_dir)
            .with_context(|| format!("Failed to create directory: {}", slice_dir.display()))?;

        let mut written = Vec::with_capacity(plan.len());
        for (part, range) in plan.into_iter().enumerate() {
            let path = slice_dir.join(format!("{name}_{:02}.json", part + 1));
            self.dump(&path, &records[range])?;
            written.push(path);
        }

        Ok(written)
    }

    fn dump<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, value)
        } else {
            serde_json::to_writer(&mut writer, value)
        }
        .with_context(|| format!("Failed to write JSON: {}", path.display()))?;

        writer
            .flush()
            .with_context(|| format!("Failed to flush file: {}", path.display()))?;

        tracing::trace!(file = %path.display(), "Wrote bucket file");
        Ok(())
    }
}

/// Ranges of records per output file
///
/// A bucket is sliced only when slicing is on and it holds more than one and a
/// half slices. A trailing remainder of at most half a slice joins the
/// previous file.
pub fn slice_plan(total: usize, slice: bool, slice_size: usize) -> Vec<Range<usize>> {
    let slice_size = slice_size.max(1);

    if !slice || total * 2 <= slice_size * 3 {
        return vec![0..total];
    }

    let mut ranges: Vec<Range<usize>> = (0..total)
        .step_by(slice_size)
        .map(|start| start..(start + slice_size).min(total))
        .collect();

    if let [.., previous, last] = ranges.as_mut_slice() {
        if last.len() * 2 <= slice_size {
            previous.end = last.end;
            ranges.pop();
        }
    }

    ranges
}
