//! Per-path results of a batch delete run

use std::fmt;

/// Final outcome for one path in a deletion plan
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemOutcome {
    /// The remote confirmed the delete
    Deleted,

    /// The path no longer existed; the desired end state already holds
    AlreadyAbsent,

    /// The delete failed for the given reason
    Failed(String),

    /// The async job never reported completion within the poll budget
    Timeout,
}

impl ItemOutcome {
    /// Returns true if the path is known to be gone
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Deleted | Self::AlreadyAbsent)
    }

    /// Returns true if a retry of this path is worthwhile
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Timeout)
    }

    /// Short label used for database storage
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Deleted => "deleted",
            Self::AlreadyAbsent => "already_absent",
            Self::Failed(_) => "failed",
            Self::Timeout => "timeout",
        }
    }

    /// Failure reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed: {}", reason),
            other => f.write_str(other.to_db_string()),
        }
    }
}

/// Outcome attributed to a specific path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathOutcome {
    pub path: String,
    pub outcome: ItemOutcome,
}

impl PathOutcome {
    pub fn new(path: impl Into<String>, outcome: ItemOutcome) -> Self {
        Self {
            path: path.into(),
            outcome,
        }
    }
}
