//! Model metadata endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::{AppState, ModelInfo};

/// GET /model
///
/// Metadata of the artifact the service was started with.
pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(state.model_info.as_ref().clone())
}

pub fn model_routes() -> Router<AppState> {
    Router::new().route("/model", get(model_info))
}
