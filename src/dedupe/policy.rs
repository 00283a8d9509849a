//! Keep policies for duplicate groups
//!
//! A policy looks at every member of a group and picks the one copy that
//! survives. Policies are pure: the same members in any order yield the same
//! choice.

use crate::config::{KeepStrategy, TargetConfig};
use crate::model::Entry;
use std::cmp::Ordering;

/// Chooses which member of a duplicate group to keep
pub trait KeepPolicy: Send + Sync {
    /// Returns the member to keep, or `None` if the policy has no opinion
    fn keep<'e>(&self, members: &[&'e Entry]) -> Option<&'e Entry>;

    /// Short human-readable description
    fn describe(&self) -> String;
}

/// Keeps the lexicographically smallest path
#[derive(Debug, Clone, Copy, Default)]
pub struct Lexicographic;

impl KeepPolicy for Lexicographic {
    fn keep<'e>(&self, members: &[&'e Entry]) -> Option<&'e Entry> {
        members.iter().copied().min_by(|a, b| a.path.cmp(&b.path))
    }

    fn describe(&self) -> String {
        "lexicographic".to_string()
    }
}

/// Keeps the shortest path, ties broken lexicographically
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortestPath;

impl KeepPolicy for ShortestPath {
    fn keep<'e>(&self, members: &[&'e Entry]) -> Option<&'e Entry> {
        members.iter().copied().min_by(|a, b| shortest_first(a, b))
    }

    fn describe(&self) -> String {
        "shortest-path".to_string()
    }
}

/// Keeps the earliest modified copy
///
/// Members without a timestamp lose to any dated member. Ties fall back to
/// the shortest path, then lexicographic order.
#[derive(Debug, Clone, Copy, Default)]
pub struct EarliestModified;

impl KeepPolicy for EarliestModified {
    fn keep<'e>(&self, members: &[&'e Entry]) -> Option<&'e Entry> {
        members.iter().copied().min_by(|a, b| {
            a.modified_at
                .is_none()
                .cmp(&b.modified_at.is_none())
                .then_with(|| a.modified_at.cmp(&b.modified_at))
                .then_with(|| shortest_first(a, b))
        })
    }

    fn describe(&self) -> String {
        "earliest-modified".to_string()
    }
}

fn shortest_first(a: &Entry, b: &Entry) -> Ordering {
    a.path
        .chars()
        .count()
        .cmp(&b.path.chars().count())
        .then_with(|| a.path.cmp(&b.path))
}

/// A path condition that narrows the candidates for keeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRule {
    /// Prefer members under any of these prefixes
    PreferPrefix(Vec<String>),
    /// Prefer members outside all of these prefixes
    AvoidPrefix(Vec<String>),
    /// Prefer members whose path contains any of these fragments
    PreferContaining(Vec<String>),
}

impl PathRule {
    fn matches(&self, entry: &Entry) -> bool {
        match self {
            Self::PreferPrefix(prefixes) => entry.is_under_any(prefixes),
            Self::AvoidPrefix(prefixes) => !entry.is_under_any(prefixes),
            Self::PreferContaining(fragments) => {
                fragments.iter().any(|f| entry.path.contains(f.as_str()))
            }
        }
    }

    /// Members satisfying the rule (possibly none)
    pub fn narrow<'e>(&self, candidates: &[&'e Entry]) -> Vec<&'e Entry> {
        candidates
            .iter()
            .copied()
            .filter(|e| self.matches(e))
            .collect()
    }
}

impl KeepPolicy for PathRule {
    fn keep<'e>(&self, members: &[&'e Entry]) -> Option<&'e Entry> {
        Lexicographic.keep(&self.narrow(members))
    }

    fn describe(&self) -> String {
        match self {
            Self::PreferPrefix(p) => format!("prefer under {}", p.join(", ")),
            Self::AvoidPrefix(p) => format!("avoid {}", p.join(", ")),
            Self::PreferContaining(f) => format!("prefer containing {}", f.join(", ")),
        }
    }
}

/// Applies rules in order, then a final tie-break
///
/// Each rule narrows the candidate set when at least one candidate satisfies
/// it and is skipped otherwise, so a group is never left without a keeper.
pub struct Chain {
    rules: Vec<PathRule>,
    then: Box<dyn KeepPolicy>,
}

impl Chain {
    pub fn new(rules: Vec<PathRule>, then: Box<dyn KeepPolicy>) -> Self {
        Self { rules, then }
    }

    /// Builds the chain described by a `[[target]]` table
    pub fn for_target(target: &TargetConfig) -> Self {
        let mut rules: Vec<PathRule> = target
            .prefer_under
            .iter()
            .map(|p| PathRule::PreferPrefix(vec![p.clone()]))
            .collect();
        rules.extend(
            target
                .prefer_containing
                .iter()
                .map(|f| PathRule::PreferContaining(vec![f.clone()])),
        );
        if !target.avoid_under.is_empty() {
            rules.push(PathRule::AvoidPrefix(target.avoid_under.clone()));
        }

        Self::new(rules, strategy_policy(target.keep))
    }
}

impl KeepPolicy for Chain {
    fn keep<'e>(&self, members: &[&'e Entry]) -> Option<&'e Entry> {
        let mut candidates = members.to_vec();
        for rule in &self.rules {
            let narrowed = rule.narrow(&candidates);
            if !narrowed.is_empty() {
                candidates = narrowed;
            }
        }
        self.then.keep(&candidates)
    }

    fn describe(&self) -> String {
        let mut parts: Vec<String> = self.rules.iter().map(|r| r.describe()).collect();
        parts.push(self.then.describe());
        parts.join(" > ")
    }
}

/// Policy for a configured final tie-break
pub fn strategy_policy(strategy: KeepStrategy) -> Box<dyn KeepPolicy> {
    match strategy {
        KeepStrategy::Lexicographic => Box::new(Lexicographic),
        KeepStrategy::ShortestPath => Box::new(ShortestPath),
        KeepStrategy::EarliestModified => Box::new(EarliestModified),
    }
}
