//! Classifier model and its on-disk artifact
//!
//! Consumers only rely on the [`Classifier`] capability; the concrete model
//! is a one-vs-one linear support-vector classifier ([`LinearSvc`]) stored in
//! a versioned JSON document ([`ModelArtifact`]).

mod artifact;
mod svm;

pub use artifact::{ModelArtifact, ARTIFACT_FORMAT_VERSION, DEFAULT_MODEL_PATH};
pub use svm::{BinaryMachine, LinearSvc, SvmParams};

use crate::features::FeatureVector;

/// A fitted model mapping a feature vector to one of its training labels
pub trait Classifier: Send + Sync {
    /// Label whose decision region contains `features`
    fn predict(&self, features: &FeatureVector) -> &str;

    /// All labels the model can return, sorted
    fn labels(&self) -> &[String];
}
