//! Storage traits and error types
//!
//! This module defines the trait interfaces for the checkpoint store and the
//! inventory store, and their shared error type.

use crate::model::{CheckpointSnapshot, Entry, FolderRef, PathOutcome, ResumeState};
use crate::storage::ScanRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Scan not found: {0}")]
    ScanNotFound(i64),

    /// The persisted checkpoint cannot be trusted. Start fresh or investigate.
    #[error("Checkpoint is corrupt: {0}")]
    CheckpointCorrupt(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable persistence of a single named crawl checkpoint
///
/// Implementations must make `save_checkpoint` atomic: after a crash a
/// subsequent `load_checkpoint` returns either the previous checkpoint or the
/// new one, never a mix.
pub trait CheckpointStore {
    /// Loads the checkpoint, if one exists
    ///
    /// Returns `StorageError::CheckpointCorrupt` when the stored cursor does
    /// not agree with the stored entry lists.
    fn load_checkpoint(&self) -> StorageResult<Option<ResumeState>>;

    /// Atomically replaces the checkpoint with the given snapshot
    fn save_checkpoint(&mut self, snapshot: &CheckpointSnapshot<'_>) -> StorageResult<()>;

    /// Removes the checkpoint (no-op if none exists)
    fn clear_checkpoint(&mut self) -> StorageResult<()>;
}

/// Persistence for completed scans and delete runs
pub trait InventoryStore {
    // ===== Scans =====

    /// Records a completed scan and its full inventory in one transaction
    ///
    /// # Returns
    ///
    /// The ID of the new scan
    fn record_scan(
        &mut self,
        root_path: &str,
        config_hash: &str,
        entries: &[Entry],
        folders: &[FolderRef],
    ) -> StorageResult<i64>;

    /// Gets the most recent scan
    fn get_latest_scan(&self) -> StorageResult<Option<ScanRecord>>;

    /// Loads every file entry of a scan in listing order
    fn load_entries(&self, scan_id: i64) -> StorageResult<Vec<Entry>>;

    /// Loads every folder of a scan in listing order
    fn load_folders(&self, scan_id: i64) -> StorageResult<Vec<FolderRef>>;

    // ===== Delete runs =====

    /// Records the itemized outcomes of a delete run
    ///
    /// # Returns
    ///
    /// The ID of the new delete run
    fn record_delete_run(&mut self, plan_source: &str, outcomes: &[PathOutcome])
        -> StorageResult<i64>;

    /// Loads the outcomes of a delete run in plan order
    fn load_delete_outcomes(&self, run_id: i64) -> StorageResult<Vec<PathOutcome>>;
}
