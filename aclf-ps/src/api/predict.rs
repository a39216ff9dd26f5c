//! Prediction endpoint
//!
//! `POST /predict` with a multipart form whose `file` field carries one audio
//! clip. The upload is spooled to a uniquely named temporary file so the
//! decoder can probe it by extension, then removed when the request ends.

use std::io::Write;
use std::path::Path;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{ApiError, ApiResult, AppState};

/// Name of the multipart field holding the clip
pub const FILE_FIELD: &str = "file";

const UPLOAD_PREFIX: &str = "aclf-upload-";

/// Successful prediction
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: String,
}

struct Upload {
    file_name: Option<String>,
    data: Bytes,
}

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<PredictResponse>> {
    let request_id = Uuid::new_v4();
    let upload = read_upload(multipart?).await?;

    info!(
        "[{}] Prediction request: {} ({} bytes)",
        request_id,
        upload.file_name.as_deref().unwrap_or("<unnamed>"),
        upload.data.len()
    );

    let result = tokio::task::spawn_blocking(move || classify_upload(&state, &upload))
        .await
        .map_err(|e| ApiError::Internal(format!("prediction task failed: {e}")))?;

    match result {
        Ok(prediction) => {
            info!("[{}] Prediction: {}", request_id, prediction);
            Ok(Json(PredictResponse { prediction }))
        }
        Err(e) => {
            warn!("[{}] Prediction failed: {}", request_id, e);
            Err(e)
        }
    }
}

/// First `file` field of the form; other fields are ignored
async fn read_upload(mut multipart: Multipart) -> ApiResult<Upload> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        let data = field.bytes().await?;
        return Ok(Upload { file_name, data });
    }

    Err(ApiError::BadRequest(format!(
        "multipart field '{}' is required",
        FILE_FIELD
    )))
}

/// Spool, extract and classify on the blocking pool
///
/// The temporary file is deleted when it goes out of scope, whether
/// extraction succeeded or not.
fn classify_upload(state: &AppState, upload: &Upload) -> ApiResult<String> {
    let suffix = upload_suffix(upload.file_name.as_deref());
    let mut spool = tempfile::Builder::new()
        .prefix(UPLOAD_PREFIX)
        .suffix(&suffix)
        .tempfile_in(&state.upload_dir)?;
    spool.write_all(&upload.data)?;
    spool.flush()?;

    let features = state.pipeline.extract_file(spool.path())?;
    Ok(state.classifier.predict(&features).to_string())
}

/// `.ext` of the uploaded file name, or empty when there is none
fn upload_suffix(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

pub fn predict_routes() -> Router<AppState> {
    Router::new().route("/predict", post(predict))
}
