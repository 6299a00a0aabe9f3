//! Multipart form intake.

use std::collections::HashMap;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use futures::TryStreamExt;
use tracing::debug;

use crate::document::SourceDocument;
use crate::error::{PdfForgeError, Result};
use crate::storage::{RequestScope, UploadArtifact};

impl From<MultipartError> for PdfForgeError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            PdfForgeError::PayloadTooLarge {
                reason: err.body_text(),
            }
        } else {
            PdfForgeError::upload(err.body_text())
        }
    }
}

/// A received multipart form.
///
/// Files in the expected field are streamed to disk through the request
/// scope as they arrive; text fields are kept in memory.
#[derive(Debug, Default)]
pub struct UploadForm {
    files: Vec<UploadArtifact>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Read the whole form, persisting files sent as `file_field`.
    ///
    /// A body without any part reads as an empty form, and a file input
    /// left empty by the browser (no file name) is skipped, so the engines
    /// report the missing files themselves.
    ///
    /// # Errors
    ///
    /// - [`PdfForgeError::PayloadTooLarge`] if the body exceeds the limit.
    /// - [`PdfForgeError::Upload`] if the body is not valid multipart or
    ///   carries a file under any other field name.
    pub async fn receive(
        mut multipart: Multipart,
        scope: &mut RequestScope,
        file_field: &str,
    ) -> Result<Self> {
        let mut form = Self::default();
        let mut parts = 0usize;

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(err) if parts == 0 && err.status() == StatusCode::BAD_REQUEST => {
                    debug!("[{}] no parts in form: {}", scope.id(), err.body_text());
                    break;
                }
                Err(err) => return Err(err.into()),
            };
            parts += 1;

            let name = field.name().unwrap_or_default().to_string();

            match field.file_name().map(str::to_string) {
                Some(file_name) if file_name.is_empty() => {
                    debug!("[{}] skipping empty file input '{}'", scope.id(), name);
                }
                Some(file_name) if name == file_field => {
                    let chunks = field.map_err(PdfForgeError::from);
                    let artifact = scope.persist_stream(&file_name, chunks).await?;
                    form.files.push(artifact);
                }
                Some(file_name) => {
                    return Err(PdfForgeError::upload(format!(
                        "Unexpected file field '{name}' ({file_name}), expected '{file_field}'"
                    )));
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }

        debug!(
            "[{}] received {} file(s), {} field(s)",
            scope.id(),
            form.files.len(),
            form.fields.len()
        );
        Ok(form)
    }

    /// Persisted files in upload order.
    pub fn files(&self) -> &[UploadArtifact] {
        &self.files
    }

    /// Value of a text field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The only uploaded file.
    ///
    /// # Errors
    ///
    /// Returns [`PdfForgeError::InvalidInputCount`] unless exactly one file
    /// was uploaded.
    pub fn single_file(&self) -> Result<&UploadArtifact> {
        match self.files.as_slice() {
            [file] => Ok(file),
            files => Err(PdfForgeError::InvalidInputCount {
                expected: 1,
                received: files.len(),
            }),
        }
    }

    /// Read every file back as a [`SourceDocument`].
    pub async fn load_sources(&self) -> Result<Vec<SourceDocument>> {
        let mut sources = Vec::with_capacity(self.files.len());
        for file in &self.files {
            sources.push(file.load_source().await?);
        }
        Ok(sources)
    }
}
