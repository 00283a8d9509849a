//! Duplicate analysis across a whole scan

use crate::dedupe::{DuplicateGroup, SizeAnomaly};
use crate::inventory::Tally;
use std::collections::BTreeMap;

/// One group with its wasted space under the default keep policy
#[derive(Debug, Clone)]
pub struct RankedGroup<'g, 'a> {
    pub group: &'g DuplicateGroup<'a>,
    pub wasted_bytes: u64,
}

/// Where duplicate space goes
#[derive(Debug, Clone)]
pub struct DuplicateReport<'g, 'a> {
    /// Groups ordered by wasted bytes, largest first
    pub ranked: Vec<RankedGroup<'g, 'a>>,
    /// Redundant copies (every member but the kept one)
    pub redundant: Tally,
    /// Redundant copies by top-level folder
    pub by_folder: BTreeMap<String, Tally>,
    /// Redundant copies by extension
    pub by_extension: BTreeMap<String, Tally>,
    pub anomalies: Vec<SizeAnomaly>,
}

/// Ranks groups and breaks redundant copies down by folder and extension
///
/// The first member of each group (smallest path) is treated as the copy to
/// keep; everything else is counted as redundant.
pub fn duplicate_report<'g, 'a>(groups: &'g [DuplicateGroup<'a>]) -> DuplicateReport<'g, 'a> {
    let mut redundant = Tally::default();
    let mut by_folder: BTreeMap<String, Tally> = BTreeMap::new();
    let mut by_extension: BTreeMap<String, Tally> = BTreeMap::new();
    let mut anomalies = Vec::new();
    let mut ranked = Vec::with_capacity(groups.len());

    for group in groups {
        let Some(keeper) = group.members.first() else {
            continue;
        };

        for copy in group.members.iter().skip(1) {
            redundant.add(copy.size);
            by_folder
                .entry(copy.top_level_folder())
                .or_default()
                .add(copy.size);
            by_extension
                .entry(copy.extension.clone())
                .or_default()
                .add(copy.size);
        }

        if let Some(anomaly) = group.size_anomaly() {
            tracing::warn!(
                "Fingerprint {} has members of differing sizes ({} to {} bytes)",
                anomaly.fingerprint,
                anomaly.min_size,
                anomaly.max_size
            );
            anomalies.push(anomaly);
        }

        ranked.push(RankedGroup {
            group,
            wasted_bytes: group.reclaimable_bytes(&keeper.path),
        });
    }

    ranked.sort_by(|a, b| {
        b.wasted_bytes
            .cmp(&a.wasted_bytes)
            .then_with(|| a.group.fingerprint.cmp(b.group.fingerprint))
    });

    DuplicateReport {
        ranked,
        redundant,
        by_folder,
        by_extension,
        anomalies,
    }
}
