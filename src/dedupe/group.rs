//! Duplicate groups keyed by content fingerprint

use crate::inventory::index_by_fingerprint;
use crate::model::Entry;

/// Two or more files sharing a content fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup<'a> {
    pub fingerprint: &'a str,
    /// Members ordered by path
    pub members: Vec<&'a Entry>,
}

/// Members of one group that disagree on size
///
/// Identical fingerprints with differing sizes point at a fingerprint
/// collision or a stale listing; the group is still reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeAnomaly {
    pub fingerprint: String,
    pub min_size: u64,
    pub max_size: u64,
}

impl<'a> DuplicateGroup<'a> {
    pub fn total_bytes(&self) -> u64 {
        self.members.iter().map(|e| e.size).fold(0, u64::saturating_add)
    }

    /// Bytes freed by deleting every member except `kept_path`
    pub fn reclaimable_bytes(&self, kept_path: &str) -> u64 {
        self.members
            .iter()
            .filter(|e| e.path != kept_path)
            .map(|e| e.size)
            .fold(0, u64::saturating_add)
    }

    /// Total size minus the first member's size
    ///
    /// Only equals the real saving when all members have the same size. Kept
    /// to compare against older reports.
    pub fn legacy_wasted_bytes(&self) -> u64 {
        let first = self.members.first().map(|e| e.size).unwrap_or(0);
        self.total_bytes().saturating_sub(first)
    }

    pub fn size_anomaly(&self) -> Option<SizeAnomaly> {
        let min_size = self.members.iter().map(|e| e.size).min()?;
        let max_size = self.members.iter().map(|e| e.size).max()?;
        (min_size != max_size).then(|| SizeAnomaly {
            fingerprint: self.fingerprint.to_string(),
            min_size,
            max_size,
        })
    }
}

/// Groups entries by fingerprint, keeping groups of two or more
///
/// Groups are ordered by fingerprint and members by path, so the output is
/// deterministic regardless of listing order.
pub fn group_duplicates(entries: &[Entry]) -> Vec<DuplicateGroup<'_>> {
    let mut groups: Vec<DuplicateGroup<'_>> = index_by_fingerprint(entries)
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(fingerprint, mut members)| {
            members.sort_by(|a, b| a.path.cmp(&b.path));
            DuplicateGroup {
                fingerprint,
                members,
            }
        })
        .collect();

    groups.sort_by(|a, b| a.fingerprint.cmp(b.fingerprint));
    groups
}
