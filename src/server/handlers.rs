//! Route handlers.

use axum::{
    Json,
    body::Body,
    extract::{Multipart, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tokio::fs::File;
use tracing::info;

use super::AppState;
use super::upload::UploadForm;
use crate::compress::QualityPreset;
use crate::error::Result;
use crate::merge::Merger;
use crate::split::SplitJob;
use crate::storage::{ScopedBody, file_chunks};

/// Multipart field carrying the merge inputs.
pub const MERGE_FIELD: &str = "pdfs";

/// Multipart field carrying the split and compress input.
pub const DOCUMENT_FIELD: &str = "pdf";

/// Multipart field selecting the compression preset.
pub const QUALITY_FIELD: &str = "quality";

const MERGED_FILE_NAME: &str = "merged.pdf";

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// `POST /merge`
pub async fn merge(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let mut scope = state.store.scope();
    let form = UploadForm::receive(multipart, &mut scope, MERGE_FIELD).await?;
    info!("[{}] merge: {} file(s)", scope.id(), form.files().len());

    let inputs = form.load_sources().await?;
    let output = tokio::task::spawn_blocking(move || Merger::merge(inputs)).await??;

    let headers = attachment_headers("application/pdf", MERGED_FILE_NAME, false);
    Ok((headers, output.bytes).into_response())
}

/// `POST /split`
///
/// The archive is streamed while pages are still being extracted. The
/// upload is deleted once the stream ends or the client disconnects.
pub async fn split(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let mut scope = state.store.scope();
    let form = UploadForm::receive(multipart, &mut scope, DOCUMENT_FIELD).await?;
    info!("[{}] split: {} file(s)", scope.id(), form.files().len());

    let sources = form.load_sources().await?;
    let job = tokio::task::spawn_blocking(move || SplitJob::prepare(sources)).await??;
    info!("[{}] splitting {} page(s)", scope.id(), job.page_count());

    let headers = attachment_headers("application/zip", &job.archive_name(), true);
    let body = Body::from_stream(ScopedBody::new(job.stream(), scope));
    Ok((headers, body).into_response())
}

/// `POST /compress`
///
/// Dropping this future (client gone) kills the Ghostscript process and
/// removes the request's files.
pub async fn compress(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let mut scope = state.store.scope();
    let form = UploadForm::receive(multipart, &mut scope, DOCUMENT_FIELD).await?;

    let preset = QualityPreset::from_field(form.field(QUALITY_FIELD))?;
    let input = form.single_file()?;
    info!(
        "[{}] compress: '{}' ({} bytes) with /{}",
        scope.id(),
        input.original_name,
        input.size_bytes,
        preset
    );

    let output = state.compressor.compress(&mut scope, input, preset).await?;
    let file = File::open(&output.path).await?;

    let mut headers = attachment_headers("application/pdf", &output.download_name, true);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(output.size_bytes));
    let body = Body::from_stream(ScopedBody::new(file_chunks(file), scope));
    Ok((headers, body).into_response())
}

/// Content headers for a download named `file_name`.
fn attachment_headers(content_type: &'static str, file_name: &str, quoted: bool) -> HeaderMap {
    let disposition = if quoted {
        format!("attachment; filename=\"{file_name}\"")
    } else {
        format!("attachment; filename={file_name}")
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_bytes(disposition.as_bytes())
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    headers
}
