//! MFCC feature extraction
//!
//! Turns an audio file into a fixed-length [`FeatureVector`]: the time-average
//! of 40 mel-frequency cepstral coefficients computed over the first few
//! seconds of the clip.
//!
//! The same [`MfccPipeline`] is used by the trainer and the prediction
//! service. Its parameters ([`ExtractorConfig`]) are stored in the model
//! artifact so both sides always run an identical transform.

mod mel;
mod mfcc;

pub use mel::{hz_to_mel, mel_to_hz, MelFilterbank};
pub use mfcc::MfccExtractor;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::audio::{AudioLoader, DEFAULT_MAX_DURATION_SECS, DEFAULT_SAMPLE_RATE};
use crate::{Error, Result};

/// Number of cepstral coefficients kept per frame (and feature vector length)
pub const N_MFCC: usize = 40;

/// Fixed-length clip descriptor: one time-averaged value per MFCC
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    /// Wrap `values`, rejecting anything that is not exactly [`N_MFCC`] long
    pub fn new(values: Vec<f32>) -> Result<Self> {
        if values.len() != N_MFCC {
            return Err(Error::InvalidInput(format!(
                "feature vector must have {} values, got {}",
                N_MFCC,
                values.len()
            )));
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Values widened to f64 for model arithmetic
    pub fn to_f64(&self) -> Vec<f64> {
        self.0.iter().map(|&v| v as f64).collect()
    }
}

impl TryFrom<Vec<f32>> for FeatureVector {
    type Error = Error;

    fn try_from(values: Vec<f32>) -> Result<Self> {
        Self::new(values)
    }
}

impl From<FeatureVector> for Vec<f32> {
    fn from(vector: FeatureVector) -> Self {
        vector.0
    }
}

/// Parameters of the feature transform
///
/// Defaults: 22.05 kHz analysis rate, 3 s cap, 2048-point FFT, hop 512,
/// 128 mel bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Analysis sample rate; `None` analyses each file at its native rate
    pub sample_rate: Option<u32>,
    /// Only the first `max_duration_secs` of each clip are analysed
    pub max_duration_secs: f64,
    /// FFT window length in samples
    pub n_fft: usize,
    /// Hop between successive frames in samples
    pub hop_length: usize,
    /// Number of mel bands fed to the DCT
    pub n_mels: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            sample_rate: Some(DEFAULT_SAMPLE_RATE),
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
        }
    }
}

impl ExtractorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_fft < 2 || self.n_fft % 2 != 0 {
            return Err(Error::Config(format!(
                "n_fft must be an even number >= 2, got {}",
                self.n_fft
            )));
        }
        if self.hop_length == 0 {
            return Err(Error::Config("hop_length must be > 0".to_string()));
        }
        if self.n_mels < N_MFCC {
            return Err(Error::Config(format!(
                "n_mels must be >= {}, got {}",
                N_MFCC, self.n_mels
            )));
        }
        if !(self.max_duration_secs > 0.0 && self.max_duration_secs.is_finite()) {
            return Err(Error::Config(format!(
                "max_duration_secs must be positive, got {}",
                self.max_duration_secs
            )));
        }
        if self.sample_rate == Some(0) {
            return Err(Error::Config("sample_rate must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Audio file → [`FeatureVector`]
///
/// Immutable after construction and safe to share between threads.
#[derive(Debug)]
pub struct MfccPipeline {
    config: ExtractorConfig,
    loader: AudioLoader,
    extractor: MfccExtractor,
}

impl MfccPipeline {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    /// Callers must have validated `config`
    fn from_valid_config(config: ExtractorConfig) -> Self {
        let loader = AudioLoader::new(config.sample_rate, config.max_duration_secs);
        let extractor = MfccExtractor::new(&config);
        Self {
            config,
            loader,
            extractor,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Load `path` and compute its feature vector
    ///
    /// # Errors
    /// Fails if the file cannot be opened or decoded as audio.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<FeatureVector> {
        let path = path.as_ref();
        let clip = self.loader.load(path)?;
        debug!(
            "Extracting MFCC features from {} ({:.2}s @ {} Hz)",
            path.display(),
            clip.duration_seconds(),
            clip.sample_rate
        );
        self.extractor.extract(&clip)
    }
}

impl Default for MfccPipeline {
    fn default() -> Self {
        let config = ExtractorConfig::default();
        debug_assert!(config.validate().is_ok());
        Self::from_valid_config(config)
    }
}

/// Extract the feature vector of one audio file with default parameters
pub fn extract_features<P: AsRef<Path>>(path: P) -> Result<FeatureVector> {
    MfccPipeline::default().extract_file(path)
}
