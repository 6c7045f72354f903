//! Axum route handlers for the Resume API.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::errors::AppError;
use crate::generation::generator::attachment_filename;
use crate::models::ResumeDocument;
use crate::state::AppState;

/// POST /api/resume/generate
///
/// Renders the posted resume to PDF and returns it as a download.
pub async fn handle_generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ResumeDocument>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(document) = payload?;
    let started = Instant::now();
    let public_base = state.public_url.resolve(&headers);

    let pdf = state.generator.generate(&document, &public_base).await?;

    let filename = attachment_filename(&document.personal.name);
    info!(
        filename = %filename,
        bytes = pdf.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Resume PDF served"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        pdf,
    )
        .into_response())
}

/// POST /api/resume/preview
///
/// Same HTML the PDF is printed from, for the live preview pane.
pub async fn handle_preview(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ResumeDocument>, JsonRejection>,
) -> Result<Html<String>, AppError> {
    let Json(document) = payload?;
    let public_base = state.public_url.resolve(&headers);
    let html = state.generator.render_html(&document, &public_base).await?;
    Ok(Html(html))
}
