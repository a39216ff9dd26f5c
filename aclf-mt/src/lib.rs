//! # aclf Model Trainer (aclf-mt)
//!
//! Builds a classifier artifact from a directory of labeled audio clips.
//! The binary in `main.rs` is a thin CLI over [`Trainer::train`].

pub mod dataset;
pub mod trainer;

pub use dataset::{Dataset, DatasetScanner, LabeledSample};
pub use trainer::{Trainer, TrainingReport, TrainingSet};
