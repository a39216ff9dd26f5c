//! End-to-end feature extraction tests on generated WAV files

use aclf_common::features::extract_features;
use aclf_common::{Error, ExtractorConfig, MfccPipeline, N_MFCC};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a 16-bit sine tone, identical on every channel
fn write_tone(path: &Path, freq: f32, seconds: f32, sample_rate: u32, channels: u16) -> PathBuf {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (seconds * sample_rate as f32) as usize;
    for i in 0..frames {
        let value = 0.4 * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin();
        let sample = (value * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();
    path.to_path_buf()
}

fn distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
}

#[test]
fn test_vector_length_for_various_inputs() {
    let dir = TempDir::new().unwrap();
    let pipeline = MfccPipeline::default();

    let cases = [
        ("short.wav", 0.05, 22050, 1),
        ("tiny_44k.wav", 0.002, 44100, 1),
        ("tiny_48k_stereo.wav", 0.001, 48000, 2),
        ("one_second.wav", 1.0, 22050, 1),
        ("long.wav", 10.0, 22050, 1),
        ("stereo_44k.wav", 2.0, 44100, 2),
        ("phone_8k.wav", 1.5, 8000, 1),
        ("studio_48k.wav", 3.5, 48000, 2),
    ];

    for (name, seconds, rate, channels) in cases {
        let path = write_tone(&dir.path().join(name), 440.0, seconds, rate, channels);
        let features = pipeline.extract_file(&path).unwrap();
        assert_eq!(features.len(), N_MFCC, "{}", name);
        assert!(
            features.as_slice().iter().all(|v| v.is_finite()),
            "{} produced non-finite values",
            name
        );
    }
}

#[test]
fn test_extraction_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let path = write_tone(&dir.path().join("tone.wav"), 660.0, 2.0, 44100, 2);

    let first = extract_features(&path).unwrap();
    let second = extract_features(&path).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_only_first_three_seconds_matter() {
    let dir = TempDir::new().unwrap();
    let three = write_tone(&dir.path().join("three.wav"), 440.0, 3.0, 22050, 1);
    let nine = write_tone(&dir.path().join("nine.wav"), 440.0, 9.0, 22050, 1);

    let a = extract_features(&three).unwrap();
    let b = extract_features(&nine).unwrap();

    assert_eq!(a, b);
}

#[test]
fn test_channel_layout_does_not_change_features() {
    let dir = TempDir::new().unwrap();
    let mono = write_tone(&dir.path().join("mono.wav"), 440.0, 1.0, 22050, 1);
    let stereo = write_tone(&dir.path().join("stereo.wav"), 440.0, 1.0, 22050, 2);

    let a = extract_features(&mono).unwrap();
    let b = extract_features(&stereo).unwrap();

    assert!(distance(a.as_slice(), b.as_slice()) < 1e-2);
}

#[test]
fn test_distinct_sounds_are_separated() {
    let dir = TempDir::new().unwrap();
    let low_a = write_tone(&dir.path().join("low_a.wav"), 200.0, 1.0, 22050, 1);
    let low_b = write_tone(&dir.path().join("low_b.wav"), 210.0, 1.0, 22050, 1);
    let high = write_tone(&dir.path().join("high.wav"), 4000.0, 1.0, 22050, 1);

    let la = extract_features(&low_a).unwrap();
    let lb = extract_features(&low_b).unwrap();
    let h = extract_features(&high).unwrap();

    assert!(distance(la.as_slice(), lb.as_slice()) < distance(la.as_slice(), h.as_slice()));
}

#[test]
fn test_native_rate_analysis() {
    let dir = TempDir::new().unwrap();
    let path = write_tone(&dir.path().join("tone.wav"), 440.0, 1.0, 16000, 1);
    let pipeline = MfccPipeline::new(ExtractorConfig {
        sample_rate: None,
        ..Default::default()
    })
    .unwrap();

    let features = pipeline.extract_file(&path).unwrap();

    assert_eq!(features.len(), N_MFCC);
}

#[test]
fn test_undecodable_input_is_decode_failure() {
    let dir = TempDir::new().unwrap();
    let bogus = dir.path().join("notes.wav");
    std::fs::write(&bogus, "this is not audio at all").unwrap();

    let err = extract_features(&bogus).unwrap_err();

    assert!(err.is_decode_failure(), "unexpected error: {err}");
}

#[test]
fn test_header_only_wav_is_decode_failure() {
    let dir = TempDir::new().unwrap();
    let path = write_tone(&dir.path().join("empty.wav"), 440.0, 0.0, 22050, 1);

    let err = extract_features(&path).unwrap_err();

    assert!(err.is_decode_failure(), "unexpected error: {err}");
}

#[test]
fn test_missing_file_is_io_error() {
    let err = extract_features("/nonexistent/aclf/clip.wav").unwrap_err();
    assert!(matches!(err, Error::Io(_)), "unexpected error: {err}");
}
