//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Cloudsweep database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Single-row crawl checkpoint metadata
CREATE TABLE IF NOT EXISTS checkpoint (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    root_path TEXT NOT NULL,
    cursor TEXT NOT NULL,
    entries_so_far INTEGER NOT NULL,
    folders_so_far INTEGER NOT NULL,
    saved_at TEXT NOT NULL
);

-- Entries captured with the checkpoint, in listing order
CREATE TABLE IF NOT EXISTS checkpoint_entries (
    seq INTEGER PRIMARY KEY,
    path TEXT NOT NULL,
    name TEXT NOT NULL,
    size INTEGER NOT NULL,
    modified_at TEXT,
    content_hash TEXT
);

-- Folders captured with the checkpoint, in listing order
CREATE TABLE IF NOT EXISTS checkpoint_folders (
    seq INTEGER PRIMARY KEY,
    path TEXT NOT NULL,
    name TEXT NOT NULL
);

-- Completed scans
CREATE TABLE IF NOT EXISTS scans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    root_path TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    file_count INTEGER NOT NULL,
    folder_count INTEGER NOT NULL,
    total_bytes INTEGER NOT NULL
);

-- Inventory of each scan
CREATE TABLE IF NOT EXISTS entries (
    scan_id INTEGER NOT NULL REFERENCES scans(id),
    seq INTEGER NOT NULL,
    path TEXT NOT NULL,
    name TEXT NOT NULL,
    size INTEGER NOT NULL,
    modified_at TEXT,
    content_hash TEXT,
    extension TEXT NOT NULL,
    PRIMARY KEY (scan_id, seq)
);

CREATE INDEX IF NOT EXISTS idx_entries_hash ON entries(scan_id, content_hash);

CREATE TABLE IF NOT EXISTS folders (
    scan_id INTEGER NOT NULL REFERENCES scans(id),
    seq INTEGER NOT NULL,
    path TEXT NOT NULL,
    name TEXT NOT NULL,
    PRIMARY KEY (scan_id, seq)
);

-- Delete runs and their itemized outcomes
CREATE TABLE IF NOT EXISTS delete_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    plan_source TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    deleted INTEGER NOT NULL,
    already_absent INTEGER NOT NULL,
    failed INTEGER NOT NULL,
    timed_out INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS delete_outcomes (
    run_id INTEGER NOT NULL REFERENCES delete_runs(id),
    seq INTEGER NOT NULL,
    path TEXT NOT NULL,
    outcome TEXT NOT NULL,
    reason TEXT,
    PRIMARY KEY (run_id, seq)
);

CREATE INDEX IF NOT EXISTS idx_delete_outcomes_outcome ON delete_outcomes(run_id, outcome);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
