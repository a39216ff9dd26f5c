// Audio file loader
//
// Decodes any symphonia-supported container into mono f32 PCM, truncated to
// the analysis window and resampled to the analysis rate.

use std::fs::File;
use std::path::Path;

use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use super::AudioClip;
use crate::{Error, Result};

/// Analysis sample rate in Hz (clips are resampled to this rate)
pub const DEFAULT_SAMPLE_RATE: u32 = 22_050;

/// Only the first three seconds of every clip are analysed
pub const DEFAULT_MAX_DURATION_SECS: f64 = 3.0;

/// Highest native sample rate accepted from a file header
pub const MAX_NATIVE_SAMPLE_RATE: u32 = 768_000;

/// Upper bound on the up-front sample buffer reservation
const MAX_PREALLOC_FRAMES: usize = 48_000 * 4;

/// Frames fed to the resampler per call
const RESAMPLE_CHUNK_FRAMES: usize = 1024;

/// Audio file loader with duration cap and optional resampling
#[derive(Debug, Clone)]
pub struct AudioLoader {
    /// Output sample rate; `None` keeps the file's native rate
    target_sample_rate: Option<u32>,
    /// Maximum clip length in seconds
    max_duration_secs: f64,
}

impl Default for AudioLoader {
    fn default() -> Self {
        Self {
            target_sample_rate: Some(DEFAULT_SAMPLE_RATE),
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
        }
    }
}

impl AudioLoader {
    /// Create new audio loader
    pub fn new(target_sample_rate: Option<u32>, max_duration_secs: f64) -> Self {
        Self {
            target_sample_rate,
            max_duration_secs,
        }
    }

    pub fn target_sample_rate(&self) -> Option<u32> {
        self.target_sample_rate
    }

    pub fn max_duration_secs(&self) -> f64 {
        self.max_duration_secs
    }

    /// Load the first `max_duration_secs` of an audio file as a mono clip
    ///
    /// # Errors
    /// * `Error::Io` - file cannot be opened
    /// * `Error::Decode` - unsupported container/codec or corrupt packet
    /// * `Error::EmptyAudio` - file decoded to zero samples
    pub fn load<P: AsRef<Path>>(&self, file_path: P) -> Result<AudioClip> {
        let path = file_path.as_ref();
        let (samples, native_rate) = self.decode_mono(path)?;

        if samples.is_empty() {
            return Err(Error::EmptyAudio(path.to_path_buf()));
        }

        let (samples, sample_rate) = match self.target_sample_rate {
            Some(target) if target != native_rate => {
                debug!(
                    "Resampling {} from {} Hz to {} Hz",
                    path.display(),
                    native_rate,
                    target
                );
                let resampled = resample_mono(path, samples, native_rate, target)?;
                (resampled, target)
            }
            _ => (samples, native_rate),
        };

        if samples.is_empty() {
            return Err(Error::EmptyAudio(path.to_path_buf()));
        }

        Ok(AudioClip::new(samples, sample_rate))
    }

    /// Decode and downmix to mono at the native sample rate
    fn decode_mono(&self, path: &Path) -> Result<(Vec<f32>, u32)> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| Error::decode(path, format!("failed to probe audio format: {e}")))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::decode(path, "no audio tracks found in file"))?;

        let track_id = track.id;
        let native_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| Error::decode(path, "sample rate not specified in codec params"))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Error::decode(path, format!("failed to create decoder: {e}")))?;

        if native_rate == 0 || native_rate > MAX_NATIVE_SAMPLE_RATE {
            return Err(Error::decode(
                path,
                format!("implausible sample rate {native_rate} Hz"),
            ));
        }

        let max_frames = (self.max_duration_secs * native_rate as f64).ceil() as usize;
        let mut mono: Vec<f32> = Vec::with_capacity(max_frames.min(MAX_PREALLOC_FRAMES));

        let mut sample_buf: Option<SampleBuffer<f32>> = None;
        let mut buf_frames = 0usize;
        let mut buf_channels = 0usize;

        while mono.len() < max_frames {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(e) => return Err(Error::decode(path, format!("failed to read packet: {e}"))),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = decoder
                .decode(&packet)
                .map_err(|e| Error::decode(path, format!("failed to decode packet: {e}")))?;

            let spec = *decoded.spec();
            let channels = spec.channels.count().max(1);
            let frames = decoded.capacity();

            if sample_buf.is_none() || frames > buf_frames || channels != buf_channels {
                sample_buf = Some(SampleBuffer::<f32>::new(frames as u64, spec));
                buf_frames = frames;
                buf_channels = channels;
            }
            let Some(buf) = sample_buf.as_mut() else {
                continue;
            };
            buf.copy_interleaved_ref(decoded);

            for frame in buf.samples().chunks(channels) {
                mono.push(frame.iter().sum::<f32>() / channels as f32);
            }
        }

        mono.truncate(max_frames);

        debug!(
            "Decoded {} mono samples @ {} Hz from {}",
            mono.len(),
            native_rate,
            path.display()
        );

        Ok((mono, native_rate))
    }
}

/// Resample mono PCM with rubato sinc interpolation
///
/// Output is aligned with the input (filter delay removed) and holds exactly
/// `ceil(len * target / source)` frames.
fn resample_mono(path: &Path, samples: Vec<f32>, source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if samples.is_empty() || source_rate == target_rate {
        return Ok(samples);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / source_rate as f64;
    let num_frames = samples.len();
    let expected = (num_frames as f64 * ratio).ceil() as usize;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLE_CHUNK_FRAMES, 1)
        .map_err(|e| Error::decode(path, format!("failed to create resampler: {e}")))?;
    let delay = resampler.output_delay();

    let mut resampled: Vec<f32> = Vec::with_capacity(expected + delay);

    let mut chunks = samples.chunks_exact(RESAMPLE_CHUNK_FRAMES);
    for chunk in chunks.by_ref() {
        let output = resampler
            .process(&[chunk], None)
            .map_err(|e| Error::decode(path, format!("resampling failed: {e}")))?;
        resampled.extend_from_slice(&output[0]);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let output = resampler
            .process_partial(Some(&[tail][..]), None)
            .map_err(|e| Error::decode(path, format!("resampling failed: {e}")))?;
        resampled.extend_from_slice(&output[0]);
    }

    // Flush the filter until the delayed end of the signal has come out.
    // Each call consumes one chunk of zeros, which may yield no frames at
    // steep downsampling ratios, so the loop is bounded by input length.
    let max_flushes = ((delay + expected) as f64 / ratio / RESAMPLE_CHUNK_FRAMES as f64).ceil() as usize + 2;
    for _ in 0..max_flushes {
        if resampled.len() >= delay + expected {
            break;
        }
        let output = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| Error::decode(path, format!("resampling failed: {e}")))?;
        resampled.extend_from_slice(&output[0]);
    }

    resampled.drain(..delay.min(resampled.len()));
    resampled.truncate(expected);

    debug!(
        "Resampled {} frames ({} Hz) -> {} frames ({} Hz)",
        num_frames,
        source_rate,
        resampled.len(),
        target_rate
    );

    Ok(resampled)
}
