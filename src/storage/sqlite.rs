//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the
//! `CheckpointStore` and `InventoryStore` traits. Every multi-row write runs
//! inside a single transaction.

use crate::model::{
    parse_timestamp, CheckpointSnapshot, CrawlCheckpoint, Entry, FolderRef, ItemOutcome,
    PathOutcome, ResumeState,
};
use crate::storage::traits::{CheckpointStore, InventoryStore, StorageError, StorageResult};
use crate::storage::schema::initialize_schema;
use crate::storage::ScanRecord;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

/// Raw entry columns as read from either entry table
type EntryRow = (i64, String, String, i64, Option<String>, Option<String>);

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn to_sql_int(value: u64) -> StorageResult<i64> {
    i64::try_from(value)
        .map_err(|_| StorageError::Database(format!("{} exceeds SQLite integer range", value)))
}

fn entry_from_row(row: EntryRow) -> Result<Entry, String> {
    let (_, path, name, size, modified_at, content_hash) = row;
    let size = u64::try_from(size).map_err(|_| format!("negative size {} for {}", size, path))?;
    let modified_at = modified_at.as_deref().and_then(parse_timestamp);
    Ok(Entry::new(path, name, size, modified_at, content_hash))
}

/// Returns how many leading rows of `table` already match `paths`
///
/// Rows that are not a prefix of the new snapshot are discarded so the table
/// can be rewritten from scratch.
fn reusable_prefix(tx: &Transaction<'_>, table: &str, paths: &[&str]) -> StorageResult<usize> {
    let stored: i64 = tx.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;
    let stored = stored as usize;

    if stored == 0 {
        return Ok(0);
    }

    let last_path: Option<String> = tx
        .query_row(
            &format!("SELECT path FROM {} WHERE seq = ?1", table),
            params![stored as i64 - 1],
            |row| row.get(0),
        )
        .optional()?;

    let matches = stored <= paths.len() && last_path.as_deref() == Some(paths[stored - 1]);
    if matches {
        Ok(stored)
    } else {
        tx.execute(&format!("DELETE FROM {}", table), [])?;
        Ok(0)
    }
}

fn insert_checkpoint_entries(
    tx: &Transaction<'_>,
    entries: &[Entry],
    offset: usize,
) -> StorageResult<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO checkpoint_entries (seq, path, name, size, modified_at, content_hash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (seq, entry) in entries.iter().enumerate().skip(offset) {
        stmt.execute(params![
            seq as i64,
            entry.path,
            entry.name,
            to_sql_int(entry.size)?,
            entry.modified_at.map(|t| t.to_rfc3339()),
            entry.content_hash,
        ])?;
    }
    Ok(())
}

fn insert_checkpoint_folders(
    tx: &Transaction<'_>,
    folders: &[FolderRef],
    offset: usize,
) -> StorageResult<()> {
    let mut stmt =
        tx.prepare_cached("INSERT INTO checkpoint_folders (seq, path, name) VALUES (?1, ?2, ?3)")?;
    for (seq, folder) in folders.iter().enumerate().skip(offset) {
        stmt.execute(params![seq as i64, folder.path, folder.name])?;
    }
    Ok(())
}

fn outcome_from_db(outcome: &str, reason: Option<String>) -> ItemOutcome {
    match outcome {
        "deleted" => ItemOutcome::Deleted,
        "already_absent" => ItemOutcome::AlreadyAbsent,
        "timeout" => ItemOutcome::Timeout,
        "failed" => ItemOutcome::Failed(reason.unwrap_or_default()),
        other => ItemOutcome::Failed(format!("unrecognized stored outcome '{}'", other)),
    }
}

impl CheckpointStore for SqliteStorage {
    fn load_checkpoint(&self) -> StorageResult<Option<ResumeState>> {
        let meta = self
            .conn
            .query_row(
                "SELECT root_path, cursor, entries_so_far, folders_so_far, saved_at
                 FROM checkpoint WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((root_path, cursor, entries_so_far, folders_so_far, saved_at)) = meta else {
            return Ok(None);
        };

        let saved_at = saved_at
            .parse::<DateTime<Utc>>()
            .map_err(|e| StorageError::CheckpointCorrupt(format!("bad saved_at: {}", e)))?;
        let entries_so_far = usize::try_from(entries_so_far).map_err(|_| {
            StorageError::CheckpointCorrupt(format!("negative entry count {}", entries_so_far))
        })?;
        let folders_so_far = usize::try_from(folders_so_far).map_err(|_| {
            StorageError::CheckpointCorrupt(format!("negative folder count {}", folders_so_far))
        })?;

        let mut stmt = self.conn.prepare(
            "SELECT seq, path, name, size, modified_at, content_hash
             FROM checkpoint_entries ORDER BY seq",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<Result<Vec<EntryRow>, _>>()?;

        let mut entries = Vec::with_capacity(rows.len());
        for (idx, row) in rows.into_iter().enumerate() {
            if row.0 != idx as i64 {
                return Err(StorageError::CheckpointCorrupt(format!(
                    "entry sequence gap at {} (found {})",
                    idx, row.0
                )));
            }
            entries.push(entry_from_row(row).map_err(StorageError::CheckpointCorrupt)?);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT path, name FROM checkpoint_folders ORDER BY seq")?;
        let folders = stmt
            .query_map([], |row| {
                Ok(FolderRef {
                    path: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let state = ResumeState {
            checkpoint: CrawlCheckpoint {
                root_path,
                cursor,
                entries_so_far,
                folders_so_far,
                saved_at,
            },
            entries,
            folders,
        };

        if !state.is_consistent() {
            return Err(StorageError::CheckpointCorrupt(format!(
                "cursor was recorded with {} entries and {} folders, but {} and {} are stored",
                state.checkpoint.entries_so_far,
                state.checkpoint.folders_so_far,
                state.entries.len(),
                state.folders.len()
            )));
        }

        Ok(Some(state))
    }

    fn save_checkpoint(&mut self, snapshot: &CheckpointSnapshot<'_>) -> StorageResult<()> {
        let checkpoint = snapshot.to_checkpoint(Utc::now());
        let tx = self.conn.transaction()?;

        let entry_paths: Vec<&str> = snapshot.entries.iter().map(|e| e.path.as_str()).collect();
        let entry_offset = reusable_prefix(&tx, "checkpoint_entries", &entry_paths)?;
        insert_checkpoint_entries(&tx, snapshot.entries, entry_offset)?;

        let folder_paths: Vec<&str> = snapshot.folders.iter().map(|f| f.path.as_str()).collect();
        let folder_offset = reusable_prefix(&tx, "checkpoint_folders", &folder_paths)?;
        insert_checkpoint_folders(&tx, snapshot.folders, folder_offset)?;

        tx.execute(
            "INSERT INTO checkpoint
                (id, root_path, cursor, entries_so_far, folders_so_far, saved_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                root_path = excluded.root_path,
                cursor = excluded.cursor,
                entries_so_far = excluded.entries_so_far,
                folders_so_far = excluded.folders_so_far,
                saved_at = excluded.saved_at",
            params![
                checkpoint.root_path,
                checkpoint.cursor,
                checkpoint.entries_so_far as i64,
                checkpoint.folders_so_far as i64,
                checkpoint.saved_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;

        tracing::debug!(
            "Checkpoint saved: {} entries ({} new), {} folders",
            checkpoint.entries_so_far,
            checkpoint.entries_so_far - entry_offset,
            checkpoint.folders_so_far
        );
        Ok(())
    }

    fn clear_checkpoint(&mut self) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM checkpoint", [])?;
        tx.execute("DELETE FROM checkpoint_entries", [])?;
        tx.execute("DELETE FROM checkpoint_folders", [])?;
        tx.commit()?;
        Ok(())
    }
}

impl InventoryStore for SqliteStorage {
    // ===== Scans =====

    fn record_scan(
        &mut self,
        root_path: &str,
        config_hash: &str,
        entries: &[Entry],
        folders: &[FolderRef],
    ) -> StorageResult<i64> {
        let total_bytes = entries.iter().map(|e| e.size).fold(0u64, u64::saturating_add);
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO scans (root_path, finished_at, config_hash, file_count, folder_count, total_bytes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                root_path,
                now,
                config_hash,
                entries.len() as i64,
                folders.len() as i64,
                to_sql_int(total_bytes)?,
            ],
        )?;
        let scan_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO entries (scan_id, seq, path, name, size, modified_at, content_hash, extension)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for (seq, entry) in entries.iter().enumerate() {
                stmt.execute(params![
                    scan_id,
                    seq as i64,
                    entry.path,
                    entry.name,
                    to_sql_int(entry.size)?,
                    entry.modified_at.map(|t| t.to_rfc3339()),
                    entry.content_hash,
                    entry.extension,
                ])?;
            }

            let mut stmt = tx.prepare_cached(
                "INSERT INTO folders (scan_id, seq, path, name) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (seq, folder) in folders.iter().enumerate() {
                stmt.execute(params![scan_id, seq as i64, folder.path, folder.name])?;
            }
        }

        tx.commit()?;
        Ok(scan_id)
    }

    fn get_latest_scan(&self) -> StorageResult<Option<ScanRecord>> {
        let scan = self
            .conn
            .query_row(
                "SELECT id, root_path, finished_at, config_hash, file_count, folder_count, total_bytes
                 FROM scans ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(ScanRecord {
                        id: row.get(0)?,
                        root_path: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        file_count: row.get::<_, i64>(4)?.max(0) as u64,
                        folder_count: row.get::<_, i64>(5)?.max(0) as u64,
                        total_bytes: row.get::<_, i64>(6)?.max(0) as u64,
                    })
                },
            )
            .optional()?;

        Ok(scan)
    }

    fn load_entries(&self, scan_id: i64) -> StorageResult<Vec<Entry>> {
        let exists: Option<i64> = self
            .conn
            .query_row("SELECT id FROM scans WHERE id = ?1", params![scan_id], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Err(StorageError::ScanNotFound(scan_id));
        }

        let mut stmt = self.conn.prepare(
            "SELECT seq, path, name, size, modified_at, content_hash
             FROM entries WHERE scan_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt
            .query_map(params![scan_id], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<Result<Vec<EntryRow>, _>>()?;

        rows.into_iter()
            .map(|row| entry_from_row(row).map_err(StorageError::Database))
            .collect()
    }

    fn load_folders(&self, scan_id: i64) -> StorageResult<Vec<FolderRef>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path, name FROM folders WHERE scan_id = ?1 ORDER BY seq")?;
        let folders = stmt
            .query_map(params![scan_id], |row| {
                Ok(FolderRef {
                    path: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(folders)
    }

    // ===== Delete runs =====

    fn record_delete_run(
        &mut self,
        plan_source: &str,
        outcomes: &[PathOutcome],
    ) -> StorageResult<i64> {
        let count = |want: &str| {
            outcomes
                .iter()
                .filter(|o| o.outcome.to_db_string() == want)
                .count() as i64
        };
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO delete_runs (plan_source, finished_at, deleted, already_absent, failed, timed_out)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                plan_source,
                now,
                count("deleted"),
                count("already_absent"),
                count("failed"),
                count("timeout"),
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO delete_outcomes (run_id, seq, path, outcome, reason)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (seq, item) in outcomes.iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    seq as i64,
                    item.path,
                    item.outcome.to_db_string(),
                    item.outcome.reason(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(run_id)
    }

    fn load_delete_outcomes(&self, run_id: i64) -> StorageResult<Vec<PathOutcome>> {
        let mut stmt = self.conn.prepare(
            "SELECT path, outcome, reason FROM delete_outcomes WHERE run_id = ?1 ORDER BY seq",
        )?;
        let outcomes = stmt
            .query_map(params![run_id], |row| {
                let path: String = row.get(0)?;
                let outcome: String = row.get(1)?;
                let reason: Option<String> = row.get(2)?;
                Ok(PathOutcome::new(path, outcome_from_db(&outcome, reason)))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(outcomes)
    }
}
