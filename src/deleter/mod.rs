//! Batch deletion engine
//!
//! This module executes deletion plans against the remote, including:
//! - Chunking plans into bulk submissions
//! - Async job polling with a bounded budget
//! - Per-path outcome classification
//! - Shared pacing through a rate gate
//! - Cancellation between chunks

mod executor;
mod rate_gate;

pub use executor::{
    classify_results, BatchDeleter, ChunkReport, ChunkState, DeleteSettings, DeleteSummary,
    MISSING_RESULT,
};
pub use rate_gate::RateGate;
