use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::fs;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::QualityPreset;
use crate::document::PdfDocument;
use crate::error::{PdfForgeError, Result};
use crate::storage::{RequestScope, UploadArtifact};

/// Label of the reserved output path.
const OUTPUT_LABEL: &str = "compressed";

/// Progress of a single compression job, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    Queued,
    Running,
    Verifying,
    Succeeded,
    Failed,
    TimedOut,
}

/// A finished compression.
#[derive(Debug, Clone)]
pub struct CompressedOutput {
    /// Output file, owned by the request scope.
    pub path: PathBuf,
    /// Output size in bytes.
    pub size_bytes: u64,
    /// Download name, `{base}-compressed.pdf`.
    pub download_name: String,
}

/// Runs Ghostscript with a deadline and a cap on concurrent processes.
///
/// Jobs beyond the cap wait for a permit; they are never rejected.
#[derive(Debug, Clone)]
pub struct Compressor {
    program: PathBuf,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl Compressor {
    /// Create a compressor running `program` with at most `max_jobs`
    /// processes at a time.
    pub fn new(program: impl Into<PathBuf>, timeout: Duration, max_jobs: usize) -> Self {
        Self {
            program: program.into(),
            timeout,
            permits: Arc::new(Semaphore::new(max_jobs.max(1))),
        }
    }

    /// Permits currently free.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Compress `input` with `preset`.
    ///
    /// The output path is reserved in `scope` before the process starts, so
    /// a partial output is deleted with the scope on every path.
    ///
    /// # Errors
    ///
    /// - [`PdfForgeError::MalformedDocument`] if `input` is not a readable PDF.
    /// - [`PdfForgeError::ProcessSpawn`] if Ghostscript cannot be started.
    /// - [`PdfForgeError::CompressionProcessFailed`] on a non-zero exit.
    /// - [`PdfForgeError::OutputMissing`] if the output is absent or empty.
    /// - [`PdfForgeError::TimedOut`] if the deadline elapses; the process is killed.
    pub async fn compress(
        &self,
        scope: &mut RequestScope,
        input: &UploadArtifact,
        preset: QualityPreset,
    ) -> Result<CompressedOutput> {
        let start = Instant::now();

        let bytes = input.read().await?;
        let name = input.original_name.clone();
        tokio::task::spawn_blocking(move || {
            PdfDocument::load(&bytes)
                .map(drop)
                .map_err(|err| err.for_document(&name))
        })
        .await??;

        let output = scope.reserve(OUTPUT_LABEL);
        let mut job = CompressionJob::new(scope.id(), input, output.clone(), preset, self.timeout);

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| PdfForgeError::document_operation(format!("Job queue closed: {e}")))?;
        job.transition(JobState::Running);

        let size_bytes = match self.run(&mut job).await {
            Ok(size_bytes) => size_bytes,
            Err(err) => {
                job.transition(match err {
                    PdfForgeError::TimedOut { .. } => JobState::TimedOut,
                    _ => JobState::Failed,
                });
                return Err(err);
            }
        };
        job.transition(JobState::Succeeded);

        info!(
            "[{}] compressed '{}' with /{}: {:.1} KB -> {:.1} KB in {:.2}s",
            job.request_id,
            job.name,
            preset,
            input.size_bytes as f64 / 1024.0,
            size_bytes as f64 / 1024.0,
            start.elapsed().as_secs_f64()
        );

        Ok(CompressedOutput {
            path: output,
            size_bytes,
            download_name: format!("{}-compressed.pdf", input.base_name()),
        })
    }

    async fn run(&self, job: &mut CompressionJob) -> Result<u64> {
        let child = Command::new(&self.program)
            .args(job.preset.ghostscript_args(&job.input, &job.output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PdfForgeError::ProcessSpawn {
                program: self.program.clone(),
                source,
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let finished = tokio::time::timeout(job.deadline, child.wait_with_output())
            .await
            .map_err(|_| {
                warn!(
                    "[{}] '{}' exceeded {:?}, killing process",
                    job.request_id, job.name, job.deadline
                );
                PdfForgeError::TimedOut {
                    seconds: job.deadline.as_secs(),
                }
            })??;

        if !finished.status.success() {
            let stderr = String::from_utf8_lossy(&finished.stderr).trim().to_string();
            error!(
                "[{}] Ghostscript failed for '{}' ({}): {}",
                job.request_id, job.name, finished.status, stderr
            );
            return Err(PdfForgeError::CompressionProcessFailed {
                status: finished.status.to_string(),
                stderr,
            });
        }

        job.transition(JobState::Verifying);
        match fs::metadata(&job.output).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(meta.len()),
            _ => Err(PdfForgeError::OutputMissing {
                path: job.output.clone(),
            }),
        }
    }
}

/// One Ghostscript run: input and output artifacts, preset and deadline.
#[derive(Debug)]
struct CompressionJob {
    request_id: Uuid,
    name: String,
    input: PathBuf,
    output: PathBuf,
    preset: QualityPreset,
    deadline: Duration,
    state: JobState,
}

impl CompressionJob {
    fn new(
        request_id: Uuid,
        input: &UploadArtifact,
        output: PathBuf,
        preset: QualityPreset,
        deadline: Duration,
    ) -> Self {
        debug!("[{}] queued '{}' (/{})", request_id, input.original_name, preset);
        Self {
            request_id,
            name: input.original_name.clone(),
            input: input.path.clone(),
            output,
            preset,
            deadline,
            state: JobState::Queued,
        }
    }

    fn transition(&mut self, next: JobState) {
        debug!(
            "[{}] '{}': {:?} -> {:?}",
            self.request_id, self.name, self.state, next
        );
        self.state = next;
    }
}
