//! # aclf Common Library
//!
//! Shared code for the aclf training and prediction binaries:
//! - Audio loading (decode, downmix, truncate, resample)
//! - MFCC feature extraction
//! - Linear support-vector classifier and its on-disk artifact
//! - Configuration loading
//! - Common error types

pub mod audio;
pub mod config;
pub mod error;
pub mod features;
pub mod model;

pub use audio::{AudioClip, AudioLoader};
pub use error::{Error, Result};
pub use features::{ExtractorConfig, FeatureVector, MfccPipeline, N_MFCC};
pub use model::{Classifier, LinearSvc, ModelArtifact};
