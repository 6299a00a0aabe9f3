//! Split-and-archive engine.
//!
//! A document is split into one single-page document per page, and each
//! page is written into a zip archive as soon as it is produced. The
//! archive is delivered as an [`ArchiveBody`] stream fed through a bounded
//! channel, so memory use does not grow with the page count: at most one
//! page plus the channel capacity is in flight.
//!
//! Pages are processed strictly in order on a single task. The task
//! suspends on every archive flush and yields to the scheduler every
//! [`YIELD_CADENCE`] pages so large documents do not starve other requests.
//! When the receiving side goes away the task stops at the next page.
//!
//! # Examples
//!
//! ```no_run
//! use pdfforge::document::SourceDocument;
//! use pdfforge::split::SplitJob;
//!
//! # async fn example(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let job = SplitJob::prepare(vec![SourceDocument::new("report.pdf", bytes)])?;
//! println!("{} entries", job.page_count());
//! let zip_bytes = job.collect().await?;
//! # Ok(())
//! # }
//! ```

mod archive;

pub use archive::ArchiveStream;

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::document::{PdfDocument, SourceDocument};
use crate::error::{PdfForgeError, Result};
use archive::SharedBuffer;

/// Pages processed between cooperative yields.
pub const YIELD_CADENCE: usize = 50;

/// Archive chunks buffered between the page task and the response body.
const CHANNEL_CAPACITY: usize = 4;

/// One chunk of archive bytes, or the error that aborted the archive.
pub type ArchiveChunk = io::Result<Vec<u8>>;

/// A loaded document ready to be split.
///
/// Loading happens in [`prepare`](Self::prepare), before any archive byte
/// exists, so unreadable input is reported as an ordinary error response.
#[derive(Debug)]
pub struct SplitJob {
    document: PdfDocument,
    base_name: String,
}

impl SplitJob {
    /// Load the single input document.
    ///
    /// # Errors
    ///
    /// - [`PdfForgeError::InvalidInputCount`] unless exactly one input is supplied.
    /// - [`PdfForgeError::MalformedDocument`] if the input cannot be parsed.
    pub fn prepare(mut inputs: Vec<SourceDocument>) -> Result<Self> {
        if inputs.len() != 1 {
            return Err(PdfForgeError::InvalidInputCount {
                expected: 1,
                received: inputs.len(),
            });
        }
        let input = inputs.remove(0);

        let document = input.load()?;
        debug!("Loaded '{}' ({} pages)", input.name, document.page_count());

        Ok(Self {
            document,
            base_name: input.base_name(),
        })
    }

    /// Number of pages, which is also the number of archive entries.
    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    /// Original file name without extension.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Download name for the archive.
    pub fn archive_name(&self) -> String {
        format!("{}-split.zip", self.base_name)
    }

    /// Entry name for the page at 0-based `index`.
    pub fn entry_name(&self, index: usize) -> String {
        format!("{}-{}.pdf", self.base_name, index + 1)
    }

    /// Build and serialize a single-page document for the page at `index`.
    fn extract_page(&self, index: usize) -> Result<Vec<u8>> {
        let mut single = PdfDocument::new();
        for page in self.document.copy_pages(&[index])? {
            single.append_page(page)?;
        }
        single.save()
    }

    /// Start producing the archive on a background task.
    ///
    /// Dropping the returned body stops page processing.
    pub fn stream(self) -> ArchiveBody {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let base_name = self.base_name.clone();
            match self.pump(&tx).await {
                Ok(entries) => info!("Split '{}' into {} entries", base_name, entries),
                Err(PdfForgeError::Cancelled) => {
                    warn!("Client disconnected while splitting '{}'", base_name);
                }
                Err(err) => {
                    // Bytes may already be on the wire; end the body with an
                    // error so the transfer is aborted instead of completed.
                    error!("Split of '{}' failed mid-stream: {}", base_name, err);
                    let _ = tx.send(Err(io::Error::other(err.to_string()))).await;
                }
            }
        });

        ArchiveBody { rx }
    }

    /// Produce the whole archive in memory.
    pub async fn collect(self) -> Result<Vec<u8>> {
        let mut body = self.stream();
        let mut archive = Vec::new();
        while let Some(chunk) = body.next().await {
            archive.extend_from_slice(&chunk?);
        }
        Ok(archive)
    }

    async fn pump(self, tx: &mpsc::Sender<ArchiveChunk>) -> Result<usize> {
        let buffer = SharedBuffer::default();
        let mut archive = ArchiveStream::new(buffer.clone());
        let page_count = self.page_count();

        for index in 0..page_count {
            if tx.is_closed() {
                return Err(PdfForgeError::Cancelled);
            }

            let bytes = self.extract_page(index)?;
            archive.append(&self.entry_name(index), &bytes)?;
            send_chunk(tx, buffer.take()).await?;

            if (index + 1) % YIELD_CADENCE == 0 {
                debug!("'{}': {}/{} pages archived", self.base_name, index + 1, page_count);
                tokio::task::yield_now().await;
            }
        }

        let entries = archive.finish()?;
        send_chunk(tx, buffer.take()).await?;
        Ok(entries)
    }
}

async fn send_chunk(tx: &mpsc::Sender<ArchiveChunk>, chunk: Vec<u8>) -> Result<()> {
    if chunk.is_empty() {
        return Ok(());
    }
    tx.send(Ok(chunk))
        .await
        .map_err(|_| PdfForgeError::Cancelled)
}

/// Streamed archive bytes, in order.
#[derive(Debug)]
pub struct ArchiveBody {
    rx: mpsc::Receiver<ArchiveChunk>,
}

impl Stream for ArchiveBody {
    type Item = ArchiveChunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
