//! Plain-text summaries for the terminal
//!
//! Each formatter returns a `String` so callers decide where it goes.

use crate::dedupe::{DeletionPlan, DuplicateReport};
use crate::deleter::DeleteSummary;
use crate::inventory::{AgeBucket, InventoryIndex, Tally};
use crate::output::format_bytes;
use crate::storage::ScanRecord;
use std::fmt::Write;

fn tally_line(out: &mut String, label: &str, tally: &Tally) {
    let _ = writeln!(
        out,
        "  {:<40} {:>10} files  {:>12}",
        label,
        tally.count,
        format_bytes(tally.bytes)
    );
}

/// Formats the inventory breakdowns of a scan
pub fn format_inventory(scan: &ScanRecord, index: &InventoryIndex<'_>, rows: usize) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Scan #{} finished {}", scan.id, scan.finished_at);
    let _ = writeln!(
        out,
        "{} files, {} folders, {}",
        index.total.count,
        scan.folder_count,
        format_bytes(index.total.bytes)
    );

    out.push_str("\nBy top-level folder:\n");
    for (folder, tally) in index.folders_by_bytes().iter().take(rows) {
        tally_line(&mut out, folder, tally);
    }

    out.push_str("\nBy extension:\n");
    for (ext, tally) in index.extensions_by_bytes().iter().take(rows) {
        tally_line(&mut out, ext, tally);
    }

    out.push_str("\nBy age:\n");
    for bucket in AgeBucket::ALL {
        if let Some(tally) = index.by_age.get(&bucket) {
            tally_line(&mut out, bucket.label(), tally);
        }
    }
    if index.unknown_age.count > 0 {
        tally_line(&mut out, "unknown", &index.unknown_age);
    }

    let _ = writeln!(
        out,
        "\nFingerprints: {} shared by 2+ files, {} files without one",
        index.duplicate_fingerprints(),
        index.unhashed.count
    );

    out.push_str("\nLargest files:\n");
    for entry in index.largest.iter().take(rows) {
        let _ = writeln!(out, "  {:>12}  {}", format_bytes(entry.size), entry.path);
    }

    if !index.stale_large.is_empty() {
        out.push_str("\nLarge files untouched for 3+ years:\n");
        for entry in index.stale_large.iter().take(rows) {
            let _ = writeln!(out, "  {:>12}  {}", format_bytes(entry.size), entry.path);
        }
    }

    out
}

/// Formats duplicate analysis
pub fn format_duplicates(report: &DuplicateReport<'_, '_>, rows: usize) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} duplicate groups, {} redundant copies, {} reclaimable",
        report.ranked.len(),
        report.redundant.count,
        format_bytes(report.redundant.bytes)
    );

    out.push_str("\nLargest groups:\n");
    for ranked in report.ranked.iter().take(rows) {
        let example = ranked
            .group
            .members
            .first()
            .map(|e| e.path.as_str())
            .unwrap_or("");
        let _ = writeln!(
            out,
            "  {:>12}  {} copies  {}",
            format_bytes(ranked.wasted_bytes),
            ranked.group.members.len(),
            example
        );
    }

    out.push_str("\nRedundant copies by folder:\n");
    let mut folders: Vec<_> = report.by_folder.iter().collect();
    folders.sort_by(|a, b| b.1.bytes.cmp(&a.1.bytes));
    for (folder, tally) in folders.into_iter().take(rows) {
        tally_line(&mut out, folder, tally);
    }

    out.push_str("\nRedundant copies by extension:\n");
    let mut exts: Vec<_> = report.by_extension.iter().collect();
    exts.sort_by(|a, b| b.1.bytes.cmp(&a.1.bytes));
    for (ext, tally) in exts.into_iter().take(rows) {
        tally_line(&mut out, ext, tally);
    }

    if !report.anomalies.is_empty() {
        let _ = writeln!(
            out,
            "\n{} groups have members of differing sizes",
            report.anomalies.len()
        );
    }

    out
}

/// Formats a deletion plan preview
pub fn format_plan(target: &str, plan: &DeletionPlan, rows: usize) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Target '{}': {} paths to delete, {} reclaimable",
        target,
        plan.len(),
        format_bytes(plan.reclaimable_bytes())
    );
    for item in plan.items.iter().take(rows) {
        let _ = writeln!(out, "  {}  (kept: {})", item.path, item.kept_path);
    }
    if plan.len() > rows {
        let _ = writeln!(out, "  ... and {} more", plan.len() - rows);
    }

    out
}

/// Formats the result of a delete run
pub fn format_delete_summary(summary: &DeleteSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} deleted, {} already absent, {} failed, {} timed out",
        summary.deleted, summary.already_absent, summary.failed, summary.timed_out
    );
    if !summary.not_attempted.is_empty() {
        let _ = writeln!(
            out,
            "{} paths not attempted (cancelled)",
            summary.not_attempted.len()
        );
    }

    for item in summary.outcomes.iter().filter(|o| o.outcome.is_retryable()).take(20) {
        let _ = writeln!(out, "  {}: {}", item.path, item.outcome);
    }

    out
}
