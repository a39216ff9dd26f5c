//! Shared fixtures for aclf-ps integration tests

#![allow(dead_code)]

use std::f32::consts::PI;
use std::io::Cursor;
use std::path::Path;

use aclf_common::model::SvmParams;
use aclf_common::{ExtractorConfig, LinearSvc, MfccPipeline, ModelArtifact};
use aclf_ps::AppState;

pub const BOUNDARY: &str = "aclf-test-boundary";

/// 16-bit mono WAV of a sine tone, entirely in memory
pub fn wav_bytes(freq: f32, seconds: f32, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let n = (seconds * sample_rate as f32) as usize;
        for i in 0..n {
            let v = 0.4 * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin();
            writer.write_sample((v * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Model separating bass tones ("low") from treble tones ("high")
pub fn train_tone_model(scratch: &Path) -> ModelArtifact {
    let pipeline = MfccPipeline::default();
    let mut features = Vec::new();
    let mut labels = Vec::new();

    let clips = [
        ("low", 150.0),
        ("low", 200.0),
        ("low", 250.0),
        ("high", 3000.0),
        ("high", 3500.0),
        ("high", 4000.0),
    ];
    for (i, (label, freq)) in clips.iter().enumerate() {
        let path = scratch.join(format!("train-{i}.wav"));
        std::fs::write(&path, wav_bytes(*freq, 0.5, 22050)).unwrap();
        features.push(pipeline.extract_file(&path).unwrap());
        labels.push(label.to_string());
        std::fs::remove_file(&path).unwrap();
    }

    let svm = LinearSvc::fit(&features, &labels, &SvmParams::default()).unwrap();
    ModelArtifact::new(svm, ExtractorConfig::default(), clips.len())
}

/// Service state over the tone model, spooling uploads into `upload_dir`
pub fn tone_state(upload_dir: &Path) -> AppState {
    let artifact = train_tone_model(upload_dir);
    AppState::from_artifact(artifact, upload_dir.to_path_buf()).unwrap()
}

/// Single-field multipart body
pub fn multipart_body(field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Number of entries left in `dir`
pub fn dir_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
