//! Duplicate resolution
//!
//! This module contains the duplicate-resolution engine, including:
//! - Grouping entries by content fingerprint
//! - Keep policies and policy chains
//! - Scoped resolution of groups into a deletion plan
//! - The plan file format
//! - Duplicate space analysis

mod group;
mod plan;
mod policy;
mod report;
mod resolver;

pub use group::{group_duplicates, DuplicateGroup, SizeAnomaly};
pub use plan::{read_plan_file, write_plan_file, DeletionPlan, PlanItem};
pub use policy::{
    strategy_policy, Chain, EarliestModified, KeepPolicy, Lexicographic, PathRule, ShortestPath,
};
pub use report::{duplicate_report, DuplicateReport, RankedGroup};
pub use resolver::{resolve, TargetScope};

use crate::config::TargetConfig;
use crate::model::Entry;

/// Builds the deletion plan for a configured target
///
/// Groups `entries` by fingerprint, keeps one copy per group according to
/// the target's rules and plans every other in-scope copy for deletion.
pub fn plan_target(entries: &[Entry], target: &TargetConfig) -> DeletionPlan {
    let groups = group_duplicates(entries);
    let scope = TargetScope::new(target.prefixes.clone());
    let policy = Chain::for_target(target);

    tracing::info!(
        "Planning target '{}' over {} duplicate groups ({})",
        target.name,
        groups.len(),
        policy.describe()
    );
    resolve(&groups, &scope, &policy)
}
