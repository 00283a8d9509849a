//! Append-only accumulation of listing pages

use crate::model::{CheckpointSnapshot, Entry, FolderRef, RemoteRecord, ResumeState};

/// Grows the inventory page by page and tracks checkpoint boundaries
#[derive(Debug)]
pub struct Accumulator {
    entries: Vec<Entry>,
    folders: Vec<FolderRef>,
    interval: usize,
}

impl Accumulator {
    /// Creates an empty accumulator that signals every `interval` files
    pub fn new(interval: usize) -> Self {
        Self {
            entries: Vec::new(),
            folders: Vec::new(),
            interval: interval.max(1),
        }
    }

    /// Continues from a persisted checkpoint
    pub fn resume(state: ResumeState, interval: usize) -> Self {
        Self {
            entries: state.entries,
            folders: state.folders,
            interval: interval.max(1),
        }
    }

    /// Absorbs one page of records
    ///
    /// Returns true if the file count crossed a multiple of the checkpoint
    /// interval while absorbing this page.
    pub fn absorb(&mut self, records: Vec<RemoteRecord>) -> bool {
        let before = self.entries.len();

        for record in records {
            match record {
                RemoteRecord::File(entry) => self.entries.push(entry),
                RemoteRecord::Folder(folder) => self.folders.push(folder),
                RemoteRecord::Deleted { .. } => {}
            }
        }

        self.entries.len() / self.interval > before / self.interval
    }

    /// Immutable view of everything absorbed so far, paired with `cursor`
    pub fn snapshot<'a>(&'a self, root_path: &'a str, cursor: &'a str) -> CheckpointSnapshot<'a> {
        CheckpointSnapshot {
            root_path,
            cursor,
            entries: &self.entries,
            folders: &self.folders,
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    /// Consumes the accumulator, yielding the final inventory
    pub fn into_inventory(self) -> (Vec<Entry>, Vec<FolderRef>) {
        (self.entries, self.folders)
    }
}
