//! Storage module for persisting crawl and cleanup data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Atomic crawl checkpoints for resumption
//! - Completed scan inventories
//! - Itemized delete-run outcomes

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{CheckpointStore, InventoryStore, StorageError, StorageResult};

/// Represents a completed scan in the database
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub id: i64,
    pub root_path: String,
    pub finished_at: String,
    pub config_hash: String,
    pub file_count: u64,
    pub folder_count: u64,
    pub total_bytes: u64,
}
