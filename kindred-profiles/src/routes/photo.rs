use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};
use kindred_shared::middleware::ApiKeyAuth;
use kindred_shared::types::ApiResponse;

use crate::services::photo_service::{self, StoredPhoto};
use crate::AppState;

const FILE_FIELD: &str = "file";

/// POST /upload - multipart with a single `file` part.
pub async fn upload_photo(
    _auth: ApiKeyAuth,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<StoredPhoto>>> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let has_filename = field.file_name().is_some_and(|name| !name.trim().is_empty());
        if !has_filename {
            return Err(AppError::new(ErrorCode::MissingInput, "no file selected"));
        }
        upload = Some(field.bytes().await.map_err(multipart_error)?);
        break;
    }

    let bytes = upload.ok_or_else(|| AppError::new(ErrorCode::MissingInput, "no file part in request"))?;

    let stored = photo_service::ingest(&state.storage, bytes.to_vec(), state.config.image_timeout()).await?;
    Ok(Json(ApiResponse::ok_with_message(stored, "image uploaded")))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::new(ErrorCode::PayloadTooLarge, "upload exceeds the size limit")
    } else {
        AppError::new(ErrorCode::BadRequest, format!("failed to read multipart: {e}"))
    }
}
