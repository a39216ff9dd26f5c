//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Build stamp baked in by build.rs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildInfo {
    /// `git describe` output, or the crate version outside a checkout
    pub revision: &'static str,
    /// RFC 3339 UTC
    pub built_at: &'static str,
    pub profile: &'static str,
}

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            revision: env!("ACLF_REVISION"),
            built_at: env!("ACLF_BUILT_AT"),
            profile: env!("ACLF_PROFILE"),
        }
    }
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, built {}, {}", self.revision, self.built_at, self.profile)
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// Module name ("aclf-ps")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Labels the loaded model can return
    pub model_labels: Vec<String>,
    pub build: BuildInfo,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "aclf-ps".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        model_labels: state.classifier.labels().to_vec(),
        build: BuildInfo::current(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
