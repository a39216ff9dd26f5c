//! Offline training pipeline
//!
//! scan dataset -> extract features per sample -> fit SVC -> save artifact

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use aclf_common::model::SvmParams;
use aclf_common::{Error, ExtractorConfig, FeatureVector, LinearSvc, MfccPipeline, ModelArtifact, Result};
use tracing::{debug, error, info};

use crate::dataset::{Dataset, DatasetScanner};

/// Summary of a completed training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub samples_per_label: BTreeMap<String, usize>,
    pub total_samples: usize,
    pub output: PathBuf,
    pub elapsed: Duration,
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} samples across {} labels in {:.2}s -> {}",
            self.total_samples,
            self.samples_per_label.len(),
            self.elapsed.as_secs_f64(),
            self.output.display()
        )?;
        for (label, count) in &self.samples_per_label {
            write!(f, "\n  {label}: {count}")?;
        }
        Ok(())
    }
}

/// Ordered `(features, label)` pairs, one per sample
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<String>,
}

impl TrainingSet {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            features: Vec::with_capacity(n),
            labels: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, features: FeatureVector, label: String) {
        self.features.push(features);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Feature extraction plus SVC fitting with fixed settings
pub struct Trainer {
    pipeline: MfccPipeline,
    params: SvmParams,
}

impl Trainer {
    pub fn new(extractor: ExtractorConfig, params: SvmParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            pipeline: MfccPipeline::new(extractor)?,
            params,
        })
    }

    pub fn params(&self) -> &SvmParams {
        &self.params
    }

    /// Feature vector and label for every sample, in dataset order
    ///
    /// # Errors
    /// The first sample that cannot be loaded aborts the whole run.
    pub fn extract_training_set(&self, dataset: &Dataset) -> Result<TrainingSet> {
        let mut set = TrainingSet::with_capacity(dataset.len());

        for (i, sample) in dataset.samples.iter().enumerate() {
            debug!("[{}/{}] {}", i + 1, dataset.len(), sample.path.display());
            let vector = self.pipeline.extract_file(&sample.path).map_err(|e| {
                error!("Feature extraction failed for {}: {}", sample.path.display(), e);
                match e {
                    Error::Io(io) => Error::Dataset(format!(
                        "cannot read sample {}: {}",
                        sample.path.display(),
                        io
                    )),
                    other => other,
                }
            })?;
            set.push(vector, sample.label.clone());
        }

        Ok(set)
    }

    /// Fit a model on `dataset`
    pub fn fit(&self, dataset: &Dataset) -> Result<ModelArtifact> {
        if dataset.is_empty() {
            return Err(Error::InvalidInput("dataset contains no samples".to_string()));
        }

        let set = self.extract_training_set(dataset)?;
        info!("Extracted features for {} samples", set.len());

        let svm = LinearSvc::fit(&set.features, &set.labels, &self.params)?;
        info!(
            "Fitted linear SVC over {} classes ({} binary machines)",
            svm.classes().len(),
            svm.machines().len()
        );

        Ok(ModelArtifact::new(svm, self.pipeline.config().clone(), set.len()))
    }

    /// Full run: scan `dataset_root`, fit, write the artifact to `output`
    pub fn train(&self, dataset_root: &Path, output: &Path) -> Result<TrainingReport> {
        let started = Instant::now();

        let dataset = DatasetScanner::new(dataset_root).scan()?;
        let samples_per_label = dataset.label_counts();
        info!(
            "Scanned {}: {} samples, {} labels",
            dataset_root.display(),
            dataset.len(),
            samples_per_label.len()
        );

        let artifact = self.fit(&dataset)?;
        artifact.save(output)?;

        let report = TrainingReport {
            samples_per_label,
            total_samples: dataset.len(),
            output: output.to_path_buf(),
            elapsed: started.elapsed(),
        };
        info!("Training complete: {}", report);
        Ok(report)
    }
}

impl Default for Trainer {
    fn default() -> Self {
        Self {
            pipeline: MfccPipeline::default(),
            params: SvmParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_c_is_rejected() {
        let params = SvmParams {
            c: 0.0,
            ..Default::default()
        };
        assert!(Trainer::new(ExtractorConfig::default(), params).is_err());
    }

    #[test]
    fn test_empty_dataset_is_invalid_input() {
        let err = Trainer::default().fit(&Dataset::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_training_set_keeps_pairs_aligned() {
        let mut set = TrainingSet::default();
        assert!(set.is_empty());
        set.push(FeatureVector::new(vec![0.0; 40]).unwrap(), "a".to_string());
        set.push(FeatureVector::new(vec![1.0; 40]).unwrap(), "b".to_string());
        assert_eq!(set.len(), 2);
        assert_eq!(set.labels, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(set.features[1].as_slice()[0], 1.0);
    }

    #[test]
    fn test_report_display_lists_labels() {
        let mut samples_per_label = BTreeMap::new();
        samples_per_label.insert("dog".to_string(), 3);
        samples_per_label.insert("siren".to_string(), 2);
        let report = TrainingReport {
            samples_per_label,
            total_samples: 5,
            output: PathBuf::from("audio_model.json"),
            elapsed: Duration::from_millis(1500),
        };

        let text = report.to_string();
        assert!(text.starts_with("5 samples across 2 labels in 1.50s -> audio_model.json"));
        assert!(text.contains("\n  dog: 3"));
        assert!(text.contains("\n  siren: 2"));
    }
}
