// MFCC extractor
//
// Centered STFT (periodic Hann window) -> power spectrum -> mel bands ->
// decibels (80 dB dynamic range) -> orthonormal DCT-II -> mean over time.

use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::mel::MelFilterbank;
use super::{ExtractorConfig, FeatureVector, N_MFCC};
use crate::audio::AudioClip;
use crate::{Error, Result};

const AMIN: f32 = 1e-10;
const TOP_DB: f32 = 80.0;

/// Computes the time-averaged MFCC vector of a clip
pub struct MfccExtractor {
    n_fft: usize,
    hop_length: usize,
    n_mels: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    /// `[N_MFCC][n_mels]` orthonormal DCT-II basis
    dct: Vec<Vec<f32>>,
    /// Filterbank for the configured analysis rate
    filterbank: Option<MelFilterbank>,
}

impl fmt::Debug for MfccExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MfccExtractor")
            .field("n_fft", &self.n_fft)
            .field("hop_length", &self.hop_length)
            .field("n_mels", &self.n_mels)
            .finish()
    }
}

impl MfccExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        let n_fft = config.n_fft;

        // Periodic Hann window
        let window = (0..n_fft)
            .map(|i| (0.5 - 0.5 * (2.0 * PI * i as f64 / n_fft as f64).cos()) as f32)
            .collect();

        let fft = FftPlanner::<f32>::new().plan_fft_forward(n_fft);

        Self {
            n_fft,
            hop_length: config.hop_length,
            n_mels: config.n_mels,
            window,
            fft,
            dct: dct_basis(N_MFCC, config.n_mels),
            filterbank: config
                .sample_rate
                .map(|sr| MelFilterbank::new(sr, n_fft, config.n_mels)),
        }
    }

    /// Number of STFT frames produced for `n_samples` input samples
    pub fn frame_count(&self, n_samples: usize) -> usize {
        1 + n_samples / self.hop_length
    }

    /// Compute the 40-value feature vector of `clip`
    pub fn extract(&self, clip: &AudioClip) -> Result<FeatureVector> {
        if clip.is_empty() {
            return Err(Error::InvalidInput(
                "cannot extract features from an empty clip".to_string(),
            ));
        }

        let rebuilt;
        let filterbank = match &self.filterbank {
            Some(fb) if fb.sample_rate() == clip.sample_rate => fb,
            _ => {
                rebuilt = MelFilterbank::new(clip.sample_rate, self.n_fft, self.n_mels);
                &rebuilt
            }
        };

        let mel_db = self.log_mel_spectrogram(&clip.samples, filterbank);
        let n_frames = mel_db.len();

        let mut sums = vec![0.0f64; N_MFCC];
        for frame in &mel_db {
            for (sum, basis) in sums.iter_mut().zip(&self.dct) {
                let coeff: f32 = basis.iter().zip(frame).map(|(b, x)| b * x).sum();
                *sum += coeff as f64;
            }
        }

        let means = sums.iter().map(|s| (s / n_frames as f64) as f32).collect();
        FeatureVector::new(means)
    }

    /// Mel power spectrogram in dB, one `n_mels` row per frame
    fn log_mel_spectrogram(&self, samples: &[f32], filterbank: &MelFilterbank) -> Vec<Vec<f32>> {
        let n_frames = self.frame_count(samples.len());
        let n_bins = self.n_fft / 2 + 1;
        let pad = (self.n_fft / 2) as isize;

        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];
        let mut power = vec![0.0f32; n_bins];

        let mut frames = Vec::with_capacity(n_frames);
        let mut max_db = f32::NEG_INFINITY;

        for t in 0..n_frames {
            let start = (t * self.hop_length) as isize - pad;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let idx = start + i as isize;
                let sample = if idx >= 0 && (idx as usize) < samples.len() {
                    samples[idx as usize]
                } else {
                    0.0
                };
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for (p, c) in power.iter_mut().zip(&buffer[..n_bins]) {
                *p = c.norm_sqr();
            }

            let mut mel = vec![0.0f32; self.n_mels];
            filterbank.apply(&power, &mut mel);
            for value in mel.iter_mut() {
                *value = 10.0 * value.max(AMIN).log10();
                max_db = max_db.max(*value);
            }
            frames.push(mel);
        }

        let floor = max_db - TOP_DB;
        for frame in frames.iter_mut() {
            for value in frame.iter_mut() {
                *value = value.max(floor);
            }
        }

        frames
    }
}

/// Orthonormal DCT-II basis, `n_out` rows of length `n_in`
fn dct_basis(n_out: usize, n_in: usize) -> Vec<Vec<f32>> {
    let n = n_in as f64;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_in)
                .map(|i| (scale * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos()) as f32)
                .collect()
        })
        .collect()
}
