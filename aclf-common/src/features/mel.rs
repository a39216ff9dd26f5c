// Mel filterbank
//
// Slaney-style mel scale (linear below 1 kHz, logarithmic above) with
// triangular filters normalized to constant area.

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert a frequency in Hz to the Slaney mel scale
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Inverse of [`hz_to_mel`]
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filterbank mapping `n_fft / 2 + 1` power bins to `n_mels` bands
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    sample_rate: u32,
    n_bins: usize,
    /// Row-major `[n_mels][n_bins]`
    weights: Vec<Vec<f32>>,
}

impl MelFilterbank {
    /// Build a filterbank spanning 0 Hz to Nyquist
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize) -> Self {
        let n_bins = n_fft / 2 + 1;
        let sr = sample_rate as f64;

        let fft_freqs: Vec<f64> = (0..n_bins).map(|k| k as f64 * sr / n_fft as f64).collect();

        let min_mel = hz_to_mel(0.0);
        let max_mel = hz_to_mel(sr / 2.0);
        let mel_points: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(min_mel + (max_mel - min_mel) * i as f64 / (n_mels + 1) as f64))
            .collect();

        let mut weights = Vec::with_capacity(n_mels);
        for m in 0..n_mels {
            let left = mel_points[m];
            let center = mel_points[m + 1];
            let right = mel_points[m + 2];
            let lower_width = center - left;
            let upper_width = right - center;
            let enorm = 2.0 / (right - left);

            let row: Vec<f32> = fft_freqs
                .iter()
                .map(|&f| {
                    let lower = (f - left) / lower_width;
                    let upper = (right - f) / upper_width;
                    (lower.min(upper).max(0.0) * enorm) as f32
                })
                .collect();
            weights.push(row);
        }

        Self {
            sample_rate,
            n_bins,
            weights,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn n_mels(&self) -> usize {
        self.weights.len()
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Project one power spectrum onto the mel bands
    pub fn apply(&self, power: &[f32], out: &mut [f32]) {
        debug_assert_eq!(power.len(), self.n_bins);
        debug_assert_eq!(out.len(), self.weights.len());
        for (band, row) in out.iter_mut().zip(&self.weights) {
            *band = row.iter().zip(power).map(|(w, p)| w * p).sum();
        }
    }

    pub fn band(&self, index: usize) -> &[f32] {
        &self.weights[index]
    }
}
