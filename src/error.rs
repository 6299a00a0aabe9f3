//! Error types for pdfforge.
//!
//! Every operation in the crate reports failures through [`PdfForgeError`].
//! Variants carry enough context for operators (file names, exit statuses,
//! captured stderr) while [`PdfForgeError::public_message`] gives the text
//! that is safe to hand back to an HTTP client.
//!
//! # Error Categories
//!
//! - **Input validation**: wrong file count, unknown quality preset
//! - **Malformed documents**: bytes that cannot be parsed as a PDF
//! - **Process execution**: Ghostscript failures and missing output
//! - **Timeouts**: the compression deadline elapsed
//! - **Internal**: I/O, archive and background task failures

use std::io;
use std::path::PathBuf;

use crate::compress::QualityPreset;

/// Result type alias for pdfforge operations.
pub type Result<T> = std::result::Result<T, PdfForgeError>;

/// Broad category of a [`PdfForgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied the wrong inputs; retrying with correct input works.
    InputValidation,
    /// An uploaded document could not be parsed.
    MalformedDocument,
    /// The external compression tool failed or produced nothing.
    ProcessExecution,
    /// The compression deadline elapsed.
    TimedOut,
    /// Anything else (I/O, archive writer, task failures).
    Internal,
}

/// Main error type for pdfforge operations.
#[derive(Debug, thiserror::Error)]
pub enum PdfForgeError {
    /// Merge needs more documents than were supplied.
    #[error("At least {required} PDF files are required, got {received}")]
    InsufficientInputs {
        /// Minimum number of documents.
        required: usize,
        /// Number of documents received.
        received: usize,
    },

    /// An operation received the wrong number of uploads.
    #[error("Expected exactly {expected} PDF file, got {received}")]
    InvalidInputCount {
        /// Number of documents the operation accepts.
        expected: usize,
        /// Number of documents received.
        received: usize,
    },

    /// The requested quality preset is not in the allow-list.
    #[error("Unknown quality preset '{preset}'. Must be one of: {}", QualityPreset::names().join(", "))]
    InvalidPreset {
        /// The rejected preset string.
        preset: String,
    },

    /// The bytes could not be parsed as a PDF document.
    #[error("Malformed PDF '{name}': {reason}")]
    MalformedDocument {
        /// Name of the offending document.
        name: String,
        /// Parser message.
        reason: String,
    },

    /// A page index outside `[0, page_count)` was requested.
    #[error("Page index {index} is out of range (document has {page_count} pages)")]
    InvalidPageIndex {
        /// Requested 0-based index.
        index: usize,
        /// Number of pages in the document.
        page_count: usize,
    },

    /// One of the merge inputs could not be loaded.
    #[error("Failed to merge PDFs: '{name}' could not be loaded")]
    MergeFailed {
        /// Name of the input that failed.
        name: String,
        /// Underlying load error.
        #[source]
        source: Box<PdfForgeError>,
    },

    /// The document model rejected an operation (broken page tree, save failure).
    #[error("PDF operation failed: {reason}")]
    DocumentOperation {
        /// Description of what went wrong.
        reason: String,
    },

    /// Ghostscript could not be started.
    #[error("Failed to start '{}': {source}", program.display())]
    ProcessSpawn {
        /// Program that was invoked.
        program: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Ghostscript exited with a non-zero status.
    #[error("Compression process exited with {status}")]
    CompressionProcessFailed {
        /// Exit status as reported by the OS.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// Ghostscript reported success but the output file is absent or empty.
    #[error("Compression reported success but produced no output at {}", path.display())]
    OutputMissing {
        /// Expected output location.
        path: PathBuf,
    },

    /// Ghostscript did not finish before the deadline.
    #[error("Compression timed out after {seconds}s")]
    TimedOut {
        /// Deadline in seconds.
        seconds: u64,
    },

    /// The client went away before a stream finished.
    #[error("Operation cancelled: client disconnected")]
    Cancelled,

    /// Writing the split archive failed.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The multipart upload could not be read.
    #[error("Upload error: {reason}")]
    Upload {
        /// Description of what went wrong.
        reason: String,
    },

    /// The request body exceeded the configured limit.
    #[error("Upload too large: {reason}")]
    PayloadTooLarge {
        /// Description from the body reader.
        reason: String,
    },

    /// Invalid server configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// A blocking worker panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<lopdf::Error> for PdfForgeError {
    fn from(err: lopdf::Error) -> Self {
        Self::document_operation(err.to_string())
    }
}

impl PdfForgeError {
    /// Create a MalformedDocument error.
    pub fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a DocumentOperation error.
    pub fn document_operation(reason: impl Into<String>) -> Self {
        Self::DocumentOperation {
            reason: reason.into(),
        }
    }

    /// Create an Upload error.
    pub fn upload(reason: impl Into<String>) -> Self {
        Self::Upload {
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Attach a document name to a MalformedDocument error.
    ///
    /// Other variants are returned unchanged.
    pub fn for_document(self, document: &str) -> Self {
        match self {
            Self::MalformedDocument { reason, .. } => Self::MalformedDocument {
                name: document.to_string(),
                reason,
            },
            other => other,
        }
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientInputs { .. }
            | Self::InvalidInputCount { .. }
            | Self::InvalidPreset { .. }
            | Self::InvalidPageIndex { .. }
            | Self::Upload { .. }
            | Self::PayloadTooLarge { .. } => ErrorKind::InputValidation,
            Self::MalformedDocument { .. } | Self::MergeFailed { .. } => {
                ErrorKind::MalformedDocument
            }
            Self::ProcessSpawn { .. }
            | Self::CompressionProcessFailed { .. }
            | Self::OutputMissing { .. } => ErrorKind::ProcessExecution,
            Self::TimedOut { .. } => ErrorKind::TimedOut,
            Self::DocumentOperation { .. }
            | Self::Cancelled
            | Self::Archive(_)
            | Self::InvalidConfig { .. }
            | Self::Task(_)
            | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Check if the caller can fix this error by changing the request.
    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::InputValidation
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        if let Self::PayloadTooLarge { .. } = self {
            return 413;
        }
        match self.kind() {
            ErrorKind::InputValidation => 400,
            ErrorKind::MalformedDocument => 500,
            ErrorKind::ProcessExecution => 500,
            ErrorKind::TimedOut => 504,
            ErrorKind::Internal => 500,
        }
    }

    /// Process exit code when the error ends the program.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidConfig { .. } => 2,
            _ => 1,
        }
    }

    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientInputs { .. } => "INSUFFICIENT_INPUTS",
            Self::InvalidInputCount { .. } => "INVALID_INPUT_COUNT",
            Self::InvalidPreset { .. } => "INVALID_PRESET",
            Self::MalformedDocument { .. } => "MALFORMED_DOCUMENT",
            Self::InvalidPageIndex { .. } => "INVALID_PAGE_INDEX",
            Self::MergeFailed { .. } => "MERGE_FAILED",
            Self::ProcessSpawn { .. } | Self::CompressionProcessFailed { .. } => {
                "COMPRESSION_FAILED"
            }
            Self::OutputMissing { .. } => "OUTPUT_MISSING",
            Self::TimedOut { .. } => "TIMED_OUT",
            Self::Upload { .. } => "INVALID_UPLOAD",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Message that can be returned to a client.
    ///
    /// Process and filesystem details are replaced by a generic message;
    /// they are only logged.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::InputValidation | ErrorKind::MalformedDocument | ErrorKind::TimedOut => {
                self.to_string()
            }
            ErrorKind::ProcessExecution => match self {
                Self::OutputMissing { .. } => "Output missing".to_string(),
                _ => "Compression failed".to_string(),
            },
            ErrorKind::Internal => "Internal server error".to_string(),
        }
    }
}
