use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::state::AppState;

const NO_FILE_MESSAGE: &str = "No file uploaded";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// POST /api/upload
///
/// Stores the first multipart part that carries a non-blank filename and returns
/// its public URL. Other parts are skipped. No type or size checks.
pub async fn handle_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| {
        debug!("Upload request is not multipart: {e}");
        AppError::Validation(NO_FILE_MESSAGE.to_string())
    })?;

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        // Browsers send `filename=""` when the file input is left empty.
        let Some(original_name) = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
        else {
            continue;
        };

        let mut pending = state.uploads.begin(&original_name).await?;
        while let Some(chunk) = field.chunk().await.map_err(malformed)? {
            pending.write(chunk).await?;
        }
        let asset = pending.finish().await?;

        let url = format!(
            "{}/uploads/{}",
            state.public_url.resolve(&headers),
            asset.filename
        );
        info!(
            original = %original_name,
            stored = %asset.filename,
            size = asset.size,
            "File uploaded"
        );

        return Ok(Json(UploadResponse { url }));
    }

    Err(AppError::Validation(NO_FILE_MESSAGE.to_string()))
}

fn malformed(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Malformed multipart body: {e}"))
}
