use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::document::{PdfDocument, SourceDocument};
use crate::error::{PdfForgeError, Result};
use crate::utils::format_file_size;

/// Minimum number of documents a merge accepts.
pub const MIN_MERGE_INPUTS: usize = 2;

/// Statistics about a merge operation.
#[derive(Debug, Clone)]
pub struct MergeStatistics {
    /// Number of documents merged.
    pub files_merged: usize,
    /// Pages in the merged document.
    pub total_pages: usize,
    /// Combined size of the inputs in bytes.
    pub input_size: u64,
    /// Size of the merged document in bytes.
    pub output_size: u64,
    /// Wall time spent loading, copying and saving.
    pub merge_time: Duration,
}

impl MergeStatistics {
    /// Format the combined input size.
    pub fn format_input_size(&self) -> String {
        format_file_size(self.input_size)
    }

    /// Format the merged document size.
    pub fn format_output_size(&self) -> String {
        format_file_size(self.output_size)
    }
}

/// A merged document and how it was produced.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// Serialized merged document.
    pub bytes: Vec<u8>,
    /// Statistics about the merge.
    pub statistics: MergeStatistics,
}

/// Concatenates the pages of several documents into one.
pub struct Merger;

impl Merger {
    /// Merge `inputs` into a single document.
    ///
    /// Pages keep their order within each input, and inputs keep the order
    /// in which they were supplied.
    ///
    /// # Errors
    ///
    /// - [`PdfForgeError::InsufficientInputs`] if fewer than two inputs are
    ///   supplied; nothing is loaded in that case.
    /// - [`PdfForgeError::MergeFailed`] if any input cannot be loaded; no
    ///   partial output is produced.
    pub fn merge(inputs: Vec<SourceDocument>) -> Result<MergeOutput> {
        if inputs.len() < MIN_MERGE_INPUTS {
            return Err(PdfForgeError::InsufficientInputs {
                required: MIN_MERGE_INPUTS,
                received: inputs.len(),
            });
        }

        let start = Instant::now();
        let input_size = inputs.iter().map(|input| input.bytes.len() as u64).sum();
        let mut merged = PdfDocument::new();

        for (idx, input) in inputs.iter().enumerate() {
            let source = input.load().map_err(|err| PdfForgeError::MergeFailed {
                name: input.name.clone(),
                source: Box::new(err),
            })?;

            let page_count = source.page_count();
            let indices: Vec<usize> = (0..page_count).collect();
            for page in source.copy_pages(&indices)? {
                merged.append_page(page)?;
            }

            debug!(
                "[{}/{}] {}: {} pages added",
                idx + 1,
                inputs.len(),
                input.name,
                page_count
            );
        }

        merged.compress();
        let total_pages = merged.page_count();
        let bytes = merged.save()?;

        let statistics = MergeStatistics {
            files_merged: inputs.len(),
            total_pages,
            input_size,
            output_size: bytes.len() as u64,
            merge_time: start.elapsed(),
        };

        info!(
            "Merged {} file(s) into {} pages ({} -> {}) in {:.2}s",
            statistics.files_merged,
            statistics.total_pages,
            statistics.format_input_size(),
            statistics.format_output_size(),
            statistics.merge_time.as_secs_f64()
        );

        Ok(MergeOutput { bytes, statistics })
    }
}
