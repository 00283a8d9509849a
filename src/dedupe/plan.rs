//! Deletion plans and the plan file format
//!
//! A plan file is newline-delimited UTF-8 paths with no escaping. Blank
//! lines are skipped on read and a trailing carriage return is stripped, so
//! files edited on Windows still load.

use crate::SweepError;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// One path scheduled for deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanItem {
    pub path: String,
    pub fingerprint: String,
    /// The copy that survives
    pub kept_path: String,
    pub size: u64,
}

/// Ordered, duplicate-free list of paths to delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    pub items: Vec<PlanItem>,
}

impl DeletionPlan {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn paths(&self) -> Vec<String> {
        self.items.iter().map(|item| item.path.clone()).collect()
    }

    /// Sum of the sizes of every planned deletion
    pub fn reclaimable_bytes(&self) -> u64 {
        self.items
            .iter()
            .map(|item| item.size)
            .fold(0, u64::saturating_add)
    }
}

fn plan_error(path: &Path, source: io::Error) -> SweepError {
    SweepError::PlanFile {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes one path per line
///
/// Paths that could not be read back unchanged (embedded line breaks or
/// blank paths) are rejected before anything is written.
pub fn write_plan_file(path: &Path, paths: &[String]) -> crate::Result<()> {
    if let Some(bad) = paths
        .iter()
        .find(|p| p.contains('\n') || p.contains('\r') || p.trim().is_empty())
    {
        return Err(plan_error(
            path,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path {:?} cannot be stored in a plan file", bad),
            ),
        ));
    }

    let file = File::create(path).map_err(|e| plan_error(path, e))?;
    let mut writer = BufWriter::new(file);
    for p in paths {
        writeln!(writer, "{}", p).map_err(|e| plan_error(path, e))?;
    }
    writer.flush().map_err(|e| plan_error(path, e))?;

    tracing::info!("Wrote {} paths to {}", paths.len(), path.display());
    Ok(())
}

/// Reads a plan file back into paths, in file order
pub fn read_plan_file(path: &Path) -> crate::Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| plan_error(path, e))?;

    let paths = content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect();

    Ok(paths)
}
