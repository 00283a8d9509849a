//! Remote file and folder records

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extension sentinel for names without a usable extension
pub const NO_EXTENSION: &str = "(none)";

/// One file in the remote store, as observed at scan time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Slash-delimited, case-preserving display path
    pub path: String,

    /// Final path component
    pub name: String,

    /// Size in bytes
    pub size: u64,

    /// Client modification time; `None` when absent or unparseable
    pub modified_at: Option<DateTime<Utc>>,

    /// Opaque content fingerprint; `None` means unknown, not unique
    pub content_hash: Option<String>,

    /// Lower-cased extension including the dot, or `NO_EXTENSION`
    pub extension: String,
}

impl Entry {
    /// Creates an entry, deriving its extension from `name`
    pub fn new(
        path: impl Into<String>,
        name: impl Into<String>,
        size: u64,
        modified_at: Option<DateTime<Utc>>,
        content_hash: Option<String>,
    ) -> Self {
        let name = name.into();
        let extension = derive_extension(&name);
        Self {
            path: path.into(),
            name,
            size,
            modified_at,
            content_hash,
            extension,
        }
    }

    /// Top-level folder this entry lives under (see [`top_level_folder`])
    pub fn top_level_folder(&self) -> String {
        top_level_folder(&self.path)
    }

    /// Returns true if the entry sits under any of the given path prefixes
    pub fn is_under_any(&self, prefixes: &[String]) -> bool {
        prefixes.iter().any(|p| self.path.starts_with(p.as_str()))
    }
}

/// A folder in the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRef {
    pub path: String,
    pub name: String,
}

/// A single record from a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRecord {
    File(Entry),
    Folder(FolderRef),
    /// Tombstone for an entry removed since the cursor was issued
    Deleted { path: String },
}

/// Derives the lower-cased extension of a file name
///
/// Leading dots do not start an extension (`.bashrc` has none) and a
/// trailing dot yields none.
pub fn derive_extension(name: &str) -> String {
    let stem_start = name.len() - name.trim_start_matches('.').len();
    match name[stem_start..].rfind('.') {
        Some(idx) if stem_start + idx + 1 < name.len() => {
            name[stem_start + idx..].to_lowercase()
        }
        _ => NO_EXTENSION.to_string(),
    }
}

/// Returns `/` plus the first path segment, or `/` for files at the root
pub fn top_level_folder(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    match trimmed.split_once('/') {
        Some((first, _)) if !first.is_empty() => format!("/{}", first),
        _ => "/".to_string(),
    }
}

/// Parses a remote timestamp, degrading to `None` on malformed input
///
/// Accepts RFC 3339 and naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    tracing::debug!("Unparseable timestamp '{}', treating age as unknown", raw);
    None
}
