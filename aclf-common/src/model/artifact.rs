//! Classifier artifact
//!
//! The fitted model is persisted as a JSON document together with the
//! feature-extractor parameters it was trained with:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "trained_at": "2026-01-01T00:00:00Z",
//!   "training_samples": 12,
//!   "extractor": { "sample_rate": 22050, "max_duration_secs": 3.0,
//!                  "n_fft": 2048, "hop_length": 512, "n_mels": 128 },
//!   "svm": { "c": 1.0, "classes": ["a", "b"],
//!            "machines": [ { "positive": 0, "negative": 1,
//!                            "weights": [ ... 40 values ... ], "bias": 0.0 } ] }
//! }
//! ```
//!
//! Readers reject any `format_version` they do not know.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::LinearSvc;
use crate::features::ExtractorConfig;
use crate::{Error, Result};

/// Current artifact schema version
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Where the trainer writes and the service reads the model by default
pub const DEFAULT_MODEL_PATH: &str = "audio_model.json";

/// Fitted model plus the metadata needed to use it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    /// Number of clips the model was fitted on
    pub training_samples: usize,
    /// Feature transform the model expects
    pub extractor: ExtractorConfig,
    pub svm: LinearSvc,
}

impl ModelArtifact {
    pub fn new(svm: LinearSvc, extractor: ExtractorConfig, training_samples: usize) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            trained_at: Utc::now(),
            training_samples,
            extractor,
            svm,
        }
    }

    /// Read and validate an artifact
    ///
    /// # Errors
    /// `Error::Model` if the file is missing, unreadable, malformed, of an
    /// unknown format version, or structurally inconsistent.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Model(format!("cannot read model artifact {}: {}", path.display(), e))
        })?;

        let artifact: ModelArtifact = serde_json::from_str(&content).map_err(|e| {
            Error::Model(format!("malformed model artifact {}: {}", path.display(), e))
        })?;
        artifact.validate()?;

        info!(
            "Loaded model artifact {} ({} classes, {} training samples, trained {})",
            path.display(),
            artifact.svm.classes().len(),
            artifact.training_samples,
            artifact.trained_at.to_rfc3339()
        );
        Ok(artifact)
    }

    /// Write the artifact, replacing `path` atomically
    ///
    /// The document is written to a temporary file next to `path` and renamed
    /// into place, so readers never observe a partially written model.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(".aclf-model-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;

        info!("Saved model artifact to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(Error::Model(format!(
                "unsupported artifact format version {} (expected {})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        self.extractor
            .validate()
            .map_err(|e| Error::Model(format!("invalid extractor parameters: {e}")))?;
        self.svm.validate()
    }

    pub fn classes(&self) -> &[String] {
        self.svm.classes()
    }
}
