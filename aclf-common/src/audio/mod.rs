//! Audio loading
//!
//! Decodes an audio file into a mono clip at the analysis sample rate,
//! keeping at most the first `max_duration_secs` seconds.

mod loader;

pub use loader::{AudioLoader, DEFAULT_MAX_DURATION_SECS, DEFAULT_SAMPLE_RATE};

/// Mono PCM clip ready for feature extraction
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Mono PCM samples (f32, normalized -1.0 to 1.0)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Get duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
