//! Crop disease detection endpoint (`POST /crop-detect`).
//!
//! Reads the `file` part of a multipart upload, hands it to the configured
//! analyzer, and wraps the model's text as `{ filename, prediction, success }`.

use agrolens_core::{AgroError, AnalysisRequest, AnalysisResult};
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::server::GatewayState;

/// Multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

/// JSON error body `{ "error": message }`.
///
/// Analysis errors map to 400 or 500 by kind. Upload errors keep the
/// status axum assigned, so an over-limit body stays a 413.
pub struct ApiError {
    status: StatusCode,
    error: AgroError,
}

impl ApiError {
    fn upload(status: StatusCode, message: String) -> Self {
        Self {
            status,
            error: AgroError::InvalidInput(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.error.to_string() }))).into_response()
    }
}

impl From<AgroError> for ApiError {
    fn from(error: AgroError) -> Self {
        let status = if error.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self { status, error }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::upload(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        warn!(status = err.status().as_u16(), error = %err, "Unreadable multipart upload");
        Self::upload(err.status(), err.body_text())
    }
}

/// Handler for `POST /crop-detect`.
pub async fn crop_detect(
    State(state): State<GatewayState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let span = info_span!("crop_detect", request_id = %Uuid::new_v4());
    detect(state, multipart).instrument(span).await.map(Json)
}

async fn detect(
    state: GatewayState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<AnalysisResult, ApiError> {
    let multipart = multipart?;

    let Some(request) = read_file_field(multipart).await? else {
        warn!("Upload without a file part");
        return Err(AgroError::MissingFile.into());
    };
    info!(
        file = %request.filename,
        bytes = request.image_bytes.len(),
        mime = request.effective_mime_type(),
        "Received crop image"
    );

    let prediction = state.analyzer.analyze(&request).await.map_err(|e| {
        error!(analyzer = state.analyzer.name(), error = %e, "Crop analysis failed");
        ApiError::from(e)
    })?;

    info!(chars = prediction.len(), "Crop analysis complete");
    Ok(AnalysisResult::success(request.filename, prediction))
}

/// Pull the first `file` part that carries a filename. Other fields are ignored.
async fn read_file_field(
    mut multipart: Multipart,
) -> Result<Option<AnalysisRequest>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mime_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        let mut request = AnalysisRequest::new(data, filename);
        request.mime_type = mime_type;
        return Ok(Some(request));
    }
    Ok(None)
}
