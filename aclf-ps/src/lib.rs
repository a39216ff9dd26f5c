//! # aclf Prediction Service (aclf-ps)
//!
//! HTTP front end for a trained classifier artifact. State is built once in
//! `main` from the artifact and injected into the router; handlers never
//! reach for globals.

pub mod api;
pub mod error;

pub use crate::error::{ApiError, ApiResult};

use std::path::PathBuf;
use std::sync::Arc;

use aclf_common::{Classifier, ExtractorConfig, MfccPipeline, ModelArtifact};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Artifact metadata reported by `GET /model`
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    pub training_samples: usize,
    pub classes: Vec<String>,
    pub extractor: ExtractorConfig,
}

impl From<&ModelArtifact> for ModelInfo {
    fn from(artifact: &ModelArtifact) -> Self {
        Self {
            format_version: artifact.format_version,
            trained_at: artifact.trained_at,
            training_samples: artifact.training_samples,
            classes: artifact.classes().to_vec(),
            extractor: artifact.extractor.clone(),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Fitted model, read-only for the life of the process
    pub classifier: Arc<dyn Classifier>,
    /// Same feature transform the model was trained with
    pub pipeline: Arc<MfccPipeline>,
    pub model_info: Arc<ModelInfo>,
    /// Directory for per-request temporary upload files
    pub upload_dir: PathBuf,
    /// Request body limit; `None` accepts uploads of any size
    pub max_upload_bytes: Option<usize>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        pipeline: Arc<MfccPipeline>,
        model_info: ModelInfo,
        upload_dir: PathBuf,
    ) -> Self {
        Self {
            classifier,
            pipeline,
            model_info: Arc::new(model_info),
            upload_dir,
            max_upload_bytes: None,
            startup_time: Utc::now(),
        }
    }

    /// State serving `artifact`, with a pipeline built from its extractor
    /// parameters
    pub fn from_artifact(artifact: ModelArtifact, upload_dir: PathBuf) -> aclf_common::Result<Self> {
        let pipeline = MfccPipeline::new(artifact.extractor.clone())?;
        let model_info = ModelInfo::from(&artifact);
        Ok(Self::new(
            Arc::new(artifact.svm),
            Arc::new(pipeline),
            model_info,
            upload_dir,
        ))
    }

    pub fn with_max_upload_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_upload_bytes = limit;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = match state.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .merge(api::predict_routes())
        .merge(api::health_routes())
        .merge(api::model_routes())
        .with_state(state)
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
