//! Temporary artifact lifecycle.
//!
//! Every request gets a [`RequestScope`] from the shared [`TempStore`]. All
//! files the request writes (uploads and engine outputs) are created through
//! the scope, and dropping the scope deletes them. Handlers move the scope
//! into the response body with [`ScopedBody`], so deletion happens after the
//! last byte is sent, or when the client goes away mid-transfer.
//!
//! File names are `{request_id}-{uuid}.pdf` (uploads) and
//! `{request_id}-{uuid}-{label}.pdf` (reserved outputs), so concurrent
//! requests never share a path.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::{Pin, pin};
use std::task::{Context, Poll};

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::document::SourceDocument;
use crate::error::{PdfForgeError, Result};
use crate::utils::file_stem;

/// Chunk size used when streaming a file back to a client.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Shared temporary directory.
#[derive(Debug, Clone)]
pub struct TempStore {
    root: PathBuf,
}

impl TempStore {
    /// Open the store, creating `root` if needed.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Directory holding all artifacts.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a new request scope with a fresh request id.
    pub fn scope(&self) -> RequestScope {
        RequestScope {
            id: Uuid::new_v4(),
            root: self.root.clone(),
            tracked: Vec::new(),
        }
    }

    /// Delete files left behind by a previous run.
    ///
    /// Returns the number of files removed.
    pub async fn sweep(&self) -> Result<usize> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => warn!("Could not remove stale file {}: {}", entry.path().display(), err),
            }
        }

        if removed > 0 {
            info!("Removed {} stale file(s) from {}", removed, self.root.display());
        }
        Ok(removed)
    }

    /// Number of files currently in the store.
    pub async fn artifact_count(&self) -> Result<usize> {
        let mut count = 0;
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// The set of temporary files owned by one request.
///
/// Paths are tracked before anything is written to them, so a failed
/// write still gets cleaned up.
#[derive(Debug)]
pub struct RequestScope {
    id: Uuid,
    root: PathBuf,
    tracked: Vec<PathBuf>,
}

impl RequestScope {
    /// Request id shared by every file name in this scope.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Paths this scope will delete.
    pub fn tracked(&self) -> &[PathBuf] {
        &self.tracked
    }

    fn track(&mut self, label: Option<&str>) -> PathBuf {
        let file_name = match label {
            Some(label) => format!("{}-{}-{}.pdf", self.id, Uuid::new_v4(), label),
            None => format!("{}-{}.pdf", self.id, Uuid::new_v4()),
        };
        let path = self.root.join(file_name);
        self.tracked.push(path.clone());
        path
    }

    /// Allocate a path for a file an engine will create.
    ///
    /// The file itself is not created. If it never is, cleanup skips it.
    pub fn reserve(&mut self, label: &str) -> PathBuf {
        self.track(Some(label))
    }

    /// Write an upload held in memory.
    pub async fn persist(&mut self, original_name: &str, bytes: &[u8]) -> Result<UploadArtifact> {
        self.persist_stream(original_name, stream::iter([Ok::<_, io::Error>(bytes)]))
            .await
    }

    /// Write an upload as it arrives.
    ///
    /// # Errors
    ///
    /// Returns the stream's own error if it yields one. The partial file
    /// stays tracked and is deleted with the scope.
    pub async fn persist_stream<S, B, E>(
        &mut self,
        original_name: &str,
        chunks: S,
    ) -> Result<UploadArtifact>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Into<PdfForgeError>,
    {
        let path = self.track(None);
        let mut file = File::create(&path).await?;
        let mut chunks = pin!(chunks);
        let mut size_bytes = 0u64;

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(Into::into)?;
            let chunk = chunk.as_ref();
            file.write_all(chunk).await?;
            size_bytes += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(
            "[{}] stored '{}' ({} bytes) at {}",
            self.id,
            original_name,
            size_bytes,
            path.display()
        );

        Ok(UploadArtifact {
            path,
            original_name: original_name.to_string(),
            size_bytes,
            request_id: self.id,
        })
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        let mut removed = 0;
        for path in self.tracked.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => warn!("[{}] failed to remove {}: {}", self.id, path.display(), err),
            }
        }
        if removed > 0 {
            debug!("[{}] removed {} temp file(s)", self.id, removed);
        }
    }
}

/// An uploaded file persisted in the store.
#[derive(Debug, Clone)]
pub struct UploadArtifact {
    /// Location on disk.
    pub path: PathBuf,
    /// File name supplied by the client.
    pub original_name: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Id of the owning request.
    pub request_id: Uuid,
}

impl UploadArtifact {
    /// Original name without directories or extension.
    pub fn base_name(&self) -> String {
        file_stem(&self.original_name)
    }

    /// Read the whole file.
    pub async fn read(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path).await?)
    }

    /// Read the file into a [`SourceDocument`] carrying the original name.
    pub async fn load_source(&self) -> Result<SourceDocument> {
        Ok(SourceDocument::new(self.original_name.clone(), self.read().await?))
    }
}

/// Stream a file's contents in fixed-size chunks.
pub fn file_chunks(file: File) -> BoxStream<'static, io::Result<Vec<u8>>> {
    stream::unfold(Some(file), |state| async move {
        let mut file = state?;
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        match file.read(&mut chunk).await {
            Ok(0) => None,
            Ok(read) => {
                chunk.truncate(read);
                Some((Ok(chunk), Some(file)))
            }
            Err(err) => Some((Err(err), None)),
        }
    })
    .boxed()
}

/// A response stream that owns a [`RequestScope`].
///
/// The scope, and with it every temp file of the request, is dropped
/// together with the stream.
pub struct ScopedBody<S> {
    inner: S,
    _scope: RequestScope,
}

impl<S> ScopedBody<S> {
    /// Tie `scope` to the lifetime of `inner`.
    pub fn new(inner: S, scope: RequestScope) -> Self {
        Self {
            inner,
            _scope: scope,
        }
    }
}

impl<S: Stream + Unpin> Stream for ScopedBody<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}
