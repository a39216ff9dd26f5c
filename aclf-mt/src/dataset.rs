//! Labeled training directory scanner
//!
//! Expected layout: one sub-directory per label under the root, every file
//! inside a label directory is a training clip.
//!
//! ```text
//! dataset/
//!   dog/    bark1.wav bark2.mp3
//!   siren/  s1.wav
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use aclf_common::{Error, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// One training clip and the label it was filed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSample {
    pub path: PathBuf,
    pub label: String,
}

/// Scan result in deterministic (file-name) order
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub samples: Vec<LabeledSample>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample count per label, sorted by label
    pub fn label_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for sample in &self.samples {
            *counts.entry(sample.label.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Walks a dataset root and collects labeled samples
pub struct DatasetScanner {
    root: PathBuf,
}

impl DatasetScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Collect every sample under the root
    ///
    /// Files directly under the root and directories nested inside a label
    /// directory are skipped with a warning.
    pub fn scan(&self) -> Result<Dataset> {
        if !self.root.exists() {
            return Err(Error::Dataset(format!(
                "dataset directory not found: {}",
                self.root.display()
            )));
        }
        if !self.root.is_dir() {
            return Err(Error::Dataset(format!(
                "dataset path is not a directory: {}",
                self.root.display()
            )));
        }

        let mut samples = Vec::new();
        let mut empty_labels: BTreeMap<String, bool> = BTreeMap::new();

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(2)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| {
                Error::Dataset(format!("cannot read {}: {}", self.root.display(), e))
            })?;
            let is_dir = entry.file_type().is_dir();

            match entry.depth() {
                1 if is_dir => {
                    empty_labels.insert(file_name(entry.path()), true);
                }
                1 => {
                    warn!("Skipping {}: not inside a label directory", entry.path().display());
                }
                _ if is_dir => {
                    warn!("Skipping nested directory {}", entry.path().display());
                }
                _ => {
                    let label = entry
                        .path()
                        .parent()
                        .map(file_name)
                        .unwrap_or_default();
                    empty_labels.insert(label.clone(), false);
                    debug!("Sample {} -> {}", entry.path().display(), label);
                    samples.push(LabeledSample {
                        path: entry.into_path(),
                        label,
                    });
                }
            }
        }

        for (label, empty) in &empty_labels {
            if *empty {
                warn!("Label directory '{}' contains no samples", label);
            }
        }

        Ok(Dataset { samples })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
