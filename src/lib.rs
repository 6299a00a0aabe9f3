//! pdfforge - merge, split and compress PDF documents over HTTP.
//!
//! This library provides the engines behind the pdfforge server:
//!
//! - [`merge`]: concatenate the pages of several documents
//! - [`split`]: split a document into single pages, streamed as a zip
//! - [`compress`]: re-encode a document with Ghostscript
//! - [`storage`]: per-request temporary files with guaranteed cleanup
//! - [`server`]: the axum router exposing all of the above
//!
//! # Examples
//!
//! ## Merge in memory
//!
//! ```no_run
//! use pdfforge::document::SourceDocument;
//! use pdfforge::merge::Merger;
//!
//! # fn example(a: Vec<u8>, b: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let output = Merger::merge(vec![
//!     SourceDocument::new("a.pdf", a),
//!     SourceDocument::new("b.pdf", b),
//! ])?;
//! println!("Created {} page document", output.statistics.total_pages);
//! # Ok(())
//! # }
//! ```
//!
//! ## Run the server
//!
//! ```no_run
//! use pdfforge::config::Config;
//!
//! # async fn example() -> pdfforge::Result<()> {
//! pdfforge::server::serve(Config::default()).await
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod compress;
pub mod config;
pub mod document;
pub mod error;
pub mod merge;
pub mod server;
pub mod split;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use error::{ErrorKind, PdfForgeError, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
