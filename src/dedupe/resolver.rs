//! Turns duplicate groups into a deletion plan

use crate::dedupe::{DeletionPlan, DuplicateGroup, KeepPolicy, Lexicographic, PlanItem};
use crate::model::Entry;
use std::collections::HashSet;

/// Path prefixes whose duplicates may be deleted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetScope {
    prefixes: Vec<String>,
}

impl TargetScope {
    /// Restricts deletions to paths under `prefixes`; empty matches everything
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    pub fn everything() -> Self {
        Self::default()
    }

    pub fn contains(&self, entry: &Entry) -> bool {
        self.prefixes.is_empty() || entry.is_under_any(&self.prefixes)
    }
}

/// Builds a deletion plan
///
/// The policy sees the whole group, including copies outside the scope, so
/// an in-scope copy is only deleted when the keeper lives somewhere else or
/// is another in-scope copy. If the policy returns no keeper the
/// lexicographically smallest path is kept.
///
/// Every path appears at most once and no kept path is ever planned.
pub fn resolve(
    groups: &[DuplicateGroup<'_>],
    scope: &TargetScope,
    policy: &dyn KeepPolicy,
) -> DeletionPlan {
    let decisions: Vec<(&DuplicateGroup<'_>, &Entry)> = groups
        .iter()
        .filter(|group| group.members.iter().any(|e| scope.contains(e)))
        .filter_map(|group| {
            let keeper = policy
                .keep(&group.members)
                .or_else(|| Lexicographic.keep(&group.members))?;
            Some((group, keeper))
        })
        .collect();

    let kept: HashSet<&str> = decisions.iter().map(|(_, k)| k.path.as_str()).collect();
    let mut planned: HashSet<&str> = HashSet::new();
    let mut plan = DeletionPlan::default();

    for (group, keeper) in &decisions {
        for member in &group.members {
            let path = member.path.as_str();
            if kept.contains(path) || !scope.contains(member) || !planned.insert(path) {
                continue;
            }
            plan.items.push(PlanItem {
                path: member.path.clone(),
                fingerprint: group.fingerprint.to_string(),
                kept_path: keeper.path.clone(),
                size: member.size,
            });
        }
    }

    tracing::debug!(
        "Resolved {} groups into {} deletions with policy '{}'",
        decisions.len(),
        plan.len(),
        policy.describe()
    );
    plan
}
