//! Crawl checkpoint types
//!
//! A checkpoint records the continuation cursor together with the exact
//! entry and folder lists that were accumulated up to that cursor. The two
//! are only ever written together.

use crate::model::{Entry, FolderRef};
use chrono::{DateTime, Utc};

/// Persisted resumption metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlCheckpoint {
    /// Listing root the cursor belongs to
    pub root_path: String,

    /// Continuation cursor that resumes after the last absorbed page
    pub cursor: String,

    /// Number of file entries captured with this cursor
    pub entries_so_far: usize,

    /// Number of folders captured with this cursor
    pub folders_so_far: usize,

    /// When the checkpoint was written
    pub saved_at: DateTime<Utc>,
}

/// Immutable view of crawl progress handed to a checkpoint store
#[derive(Debug, Clone, Copy)]
pub struct CheckpointSnapshot<'a> {
    pub root_path: &'a str,
    pub cursor: &'a str,
    pub entries: &'a [Entry],
    pub folders: &'a [FolderRef],
}

impl CheckpointSnapshot<'_> {
    /// Builds the metadata record for this snapshot
    pub fn to_checkpoint(&self, saved_at: DateTime<Utc>) -> CrawlCheckpoint {
        CrawlCheckpoint {
            root_path: self.root_path.to_string(),
            cursor: self.cursor.to_string(),
            entries_so_far: self.entries.len(),
            folders_so_far: self.folders.len(),
            saved_at,
        }
    }
}

/// Everything needed to resume a crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeState {
    pub checkpoint: CrawlCheckpoint,
    pub entries: Vec<Entry>,
    pub folders: Vec<FolderRef>,
}

impl ResumeState {
    /// Returns true if the stored lists match the counts recorded with the cursor
    pub fn is_consistent(&self) -> bool {
        self.entries.len() == self.checkpoint.entries_so_far
            && self.folders.len() == self.checkpoint.folders_so_far
            && !self.checkpoint.cursor.is_empty()
    }
}
