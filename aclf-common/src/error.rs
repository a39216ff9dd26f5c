//! Common error types for aclf

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for aclf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the training and prediction binaries
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File could not be decoded as audio
    #[error("Audio decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// File decoded but contained no samples
    #[error("Audio file contains no samples: {0}")]
    EmptyAudio(PathBuf),

    /// Classifier artifact missing, corrupt or incompatible
    #[error("Model error: {0}")]
    Model(String),

    /// Training directory layout problem
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid caller input (e.g. wrong feature length, single-class training set)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a decode error for `path`
    pub fn decode(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Error::Decode {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// True for failures caused by the audio payload itself
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Error::Decode { .. } | Error::EmptyAudio(_))
    }
}
