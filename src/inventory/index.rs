//! Single-pass inventory index
//!
//! Builds every breakdown the reports need in one walk over the entries.
//! The index borrows from the entry slice and never copies entries.

use crate::inventory::AgeBucket;
use crate::model::Entry;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// Files older than this many days count as stale
pub const STALE_AGE_DAYS: i64 = 1095;

/// Stale files must be strictly larger than this to be listed
pub const STALE_MIN_BYTES: u64 = 1024 * 1024;

/// Count and byte total of a group of files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub count: u64,
    pub bytes: u64,
}

impl Tally {
    pub fn add(&mut self, size: u64) {
        self.count += 1;
        self.bytes = self.bytes.saturating_add(size);
    }
}

/// Groups entries by content fingerprint, skipping entries without one
///
/// Entries with an absent fingerprint are unknown, not unique, so they are
/// never grouped with anything.
pub fn index_by_fingerprint(entries: &[Entry]) -> HashMap<&str, Vec<&Entry>> {
    let mut map: HashMap<&str, Vec<&Entry>> = HashMap::new();
    for entry in entries {
        if let Some(hash) = entry.content_hash.as_deref() {
            map.entry(hash).or_default().push(entry);
        }
    }
    map
}

/// Aggregated view of a scan
#[derive(Debug)]
pub struct InventoryIndex<'a> {
    pub total: Tally,
    pub by_extension: BTreeMap<&'a str, Tally>,
    pub by_folder: BTreeMap<String, Tally>,
    pub by_age: BTreeMap<AgeBucket, Tally>,
    /// Files with no usable modification time
    pub unknown_age: Tally,
    /// Files the remote reported no fingerprint for
    pub unhashed: Tally,
    pub by_fingerprint: HashMap<&'a str, Vec<&'a Entry>>,
    /// Largest files, biggest first
    pub largest: Vec<&'a Entry>,
    /// Files at least three years old and over 1 MiB, biggest first
    pub stale_large: Vec<&'a Entry>,
}

impl<'a> InventoryIndex<'a> {
    /// Builds the index
    ///
    /// # Arguments
    ///
    /// * `entries` - The scanned files
    /// * `now` - Reference time for age buckets
    /// * `top_n` - Length of the `largest` and `stale_large` lists
    pub fn build(entries: &'a [Entry], now: DateTime<Utc>, top_n: usize) -> Self {
        let mut total = Tally::default();
        let mut by_extension: BTreeMap<&'a str, Tally> = BTreeMap::new();
        let mut by_folder: BTreeMap<String, Tally> = BTreeMap::new();
        let mut by_age: BTreeMap<AgeBucket, Tally> = BTreeMap::new();
        let mut unknown_age = Tally::default();
        let mut unhashed = Tally::default();
        let mut stale = Vec::new();

        for entry in entries {
            total.add(entry.size);
            by_extension
                .entry(entry.extension.as_str())
                .or_default()
                .add(entry.size);
            by_folder
                .entry(entry.top_level_folder())
                .or_default()
                .add(entry.size);

            match entry.modified_at {
                Some(modified) => {
                    let days = (now - modified).num_days();
                    by_age
                        .entry(AgeBucket::from_days(days))
                        .or_default()
                        .add(entry.size);
                    if days >= STALE_AGE_DAYS && entry.size > STALE_MIN_BYTES {
                        stale.push(entry);
                    }
                }
                None => unknown_age.add(entry.size),
            }

            if entry.content_hash.is_none() {
                unhashed.add(entry.size);
            }
        }

        Self {
            total,
            by_extension,
            by_folder,
            by_age,
            unknown_age,
            unhashed,
            by_fingerprint: index_by_fingerprint(entries),
            largest: top_by_size(entries.iter().collect(), top_n),
            stale_large: top_by_size(stale, top_n),
        }
    }

    /// Extensions ordered by bytes, largest first
    pub fn extensions_by_bytes(&self) -> Vec<(&'a str, Tally)> {
        let mut rows: Vec<_> = self.by_extension.iter().map(|(k, v)| (*k, *v)).collect();
        rows.sort_by(|a, b| b.1.bytes.cmp(&a.1.bytes).then_with(|| a.0.cmp(b.0)));
        rows
    }

    /// Top-level folders ordered by bytes, largest first
    pub fn folders_by_bytes(&self) -> Vec<(&str, Tally)> {
        let mut rows: Vec<_> = self
            .by_folder
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        rows.sort_by(|a, b| b.1.bytes.cmp(&a.1.bytes).then_with(|| a.0.cmp(b.0)));
        rows
    }

    /// Number of fingerprints shared by two or more files
    pub fn duplicate_fingerprints(&self) -> usize {
        self.by_fingerprint.values().filter(|v| v.len() > 1).count()
    }
}

/// Keeps the `n` largest entries, ties broken by path
fn top_by_size(mut entries: Vec<&Entry>, n: usize) -> Vec<&Entry> {
    let order = |a: &&Entry, b: &&Entry| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path));
    if n == 0 {
        return Vec::new();
    }
    if entries.len() > n {
        entries.select_nth_unstable_by(n - 1, order);
        entries.truncate(n);
    }
    entries.sort_by(order);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn entry(path: &str, size: u64, age_days: Option<i64>, hash: Option<&str>) -> Entry {
        let name = path.rsplit('/').next().unwrap_or(path);
        Entry::new(
            path,
            name,
            size,
            age_days.map(|d| now() - Duration::days(d)),
            hash.map(String::from),
        )
    }

    #[test]
    fn test_breakdowns() {
        let entries = vec![
            entry("/Photos/a.JPG", 100, Some(10), Some("h1")),
            entry("/Photos/b.jpg", 50, Some(400), Some("h1")),
            entry("/Docs/c.pdf", 7, None, None),
            entry("/root.txt", 3, Some(-2), Some("h2")),
        ];
        let index = InventoryIndex::build(&entries, now(), 10);

        assert_eq!(index.total, Tally { count: 4, bytes: 160 });
        assert_eq!(index.by_extension[".jpg"], Tally { count: 2, bytes: 150 });
        assert_eq!(index.by_folder["/Photos"].count, 2);
        assert_eq!(index.by_folder["/"].bytes, 3);
        assert_eq!(index.by_age[&AgeBucket::UnderMonth].count, 2);
        assert_eq!(index.by_age[&AgeBucket::OneToTwoYears].count, 1);
        assert_eq!(index.unknown_age, Tally { count: 1, bytes: 7 });
        assert_eq!(index.unhashed.count, 1);
        assert_eq!(index.by_fingerprint["h1"].len(), 2);
        assert_eq!(index.duplicate_fingerprints(), 1);
    }

    #[test]
    fn test_largest_and_stale() {
        let mb = 1024 * 1024;
        let entries = vec![
            entry("/old/big.zip", 5 * mb, Some(1200), None),
            entry("/old/exact.zip", mb, Some(2000), None),
            entry("/old/bigger.zip", 9 * mb, Some(1095), None),
            entry("/new/huge.iso", 20 * mb, Some(1), None),
            entry("/old/unknown.bin", 30 * mb, None, None),
        ];
        let index = InventoryIndex::build(&entries, now(), 2);

        let largest: Vec<&str> = index.largest.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(largest, vec!["/old/unknown.bin", "/new/huge.iso"]);

        let stale: Vec<&str> = index.stale_large.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(stale, vec!["/old/bigger.zip", "/old/big.zip"]);
    }

    #[test]
    fn test_sorted_views() {
        let entries = vec![
            entry("/a/x.txt", 1, None, None),
            entry("/b/y.mov", 10, None, None),
            entry("/b/z", 5, None, None),
        ];
        let index = InventoryIndex::build(&entries, now(), 0);

        let exts: Vec<&str> = index.extensions_by_bytes().iter().map(|r| r.0).collect();
        assert_eq!(exts, vec![".mov", "(none)", ".txt"]);
        assert_eq!(index.folders_by_bytes()[0], ("/b", Tally { count: 2, bytes: 15 }));
        assert!(index.largest.is_empty());
    }
}
