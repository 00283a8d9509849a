//! Data model shared by the crawler, the duplicate resolver and the deleter
//!
//! # Components
//!
//! - `Entry` / `FolderRef`: immutable snapshots of remote files and folders
//! - `RemoteRecord`: the tagged record kinds a listing page yields
//! - `CrawlCheckpoint` / `ResumeState`: persisted crawl progress
//! - `ItemOutcome` / `PathOutcome`: per-path results of a delete run

mod checkpoint;
mod entry;
mod outcome;

pub use checkpoint::{CheckpointSnapshot, CrawlCheckpoint, ResumeState};
pub use entry::{
    derive_extension, parse_timestamp, top_level_folder, Entry, FolderRef, RemoteRecord,
    NO_EXTENSION,
};
pub use outcome::{ItemOutcome, PathOutcome};
