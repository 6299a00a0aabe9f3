//! Compression pipeline.
//!
//! Re-encodes an uploaded document with Ghostscript using one of four
//! [`QualityPreset`]s. The process is started with an argument vector (no
//! shell), bounded by a deadline, and limited to a fixed number of
//! concurrent instances.

mod pipeline;
mod preset;

pub use pipeline::{CompressedOutput, Compressor};
pub use preset::QualityPreset;
