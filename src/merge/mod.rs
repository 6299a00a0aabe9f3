//! Merge engine.
//!
//! Concatenates the pages of two or more uploaded documents into a single
//! document, preserving both input order and page order.

mod merger;

pub use merger::{MIN_MERGE_INPUTS, MergeOutput, MergeStatistics, Merger};
