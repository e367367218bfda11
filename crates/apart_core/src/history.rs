//! The set of finished jobs shown as history.
//!
//! Records are kept ordered by finish time, newest first, and the set never
//! holds two records that are similar to each other. Worker job ids restart
//! with every worker, so a restored record may share its id with a new job;
//! records are therefore addressed by a [`HistoryKey`] handed out on insert.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use crate::FinishedJob;

/// Positions in `existing` holding records that `record` supersedes.
pub fn reconcile<'a>(
    record: &FinishedJob,
    existing: impl IntoIterator<Item = &'a FinishedJob>,
) -> Vec<usize> {
    existing
        .into_iter()
        .enumerate()
        .filter(|(_, other)| record.is_similar_to(other))
        .map(|(index, _)| index)
        .collect()
}

/// Handle of one record for the lifetime of the UI process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HistoryKey(u64);

impl HistoryKey {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HistoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Accepts `3` as well as the displayed `#3`.
impl FromStr for HistoryKey {
    type Err = ParseIntError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let digits = text.strip_prefix('#').unwrap_or(text);
        digits.parse().map(HistoryKey)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinishedSet {
    next_key: u64,
    entries: Vec<(HistoryKey, FinishedJob)>,
}

impl FinishedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from stored records, letting later records supersede
    /// earlier similar ones.
    pub fn from_records(records: impl IntoIterator<Item = FinishedJob>) -> Self {
        let mut records: Vec<_> = records.into_iter().collect();
        records.sort_by_key(FinishedJob::finish);
        let mut set = Self::new();
        for record in records {
            set.insert(record);
        }
        set
    }

    /// Inserts `record` after evicting every similar record; returns the
    /// evicted ones, newest first.
    pub fn insert(&mut self, record: FinishedJob) -> Vec<FinishedJob> {
        let superseded = reconcile(&record, self.iter());
        let mut evicted = Vec::with_capacity(superseded.len());
        for index in superseded.into_iter().rev() {
            evicted.push(self.entries.remove(index).1);
        }
        evicted.reverse();

        self.next_key += 1;
        let key = HistoryKey(self.next_key);
        let pos = self
            .entries
            .partition_point(|(_, job)| job.finish() >= record.finish());
        self.entries.insert(pos, (key, record));
        evicted
    }

    pub fn remove(&mut self, key: HistoryKey) -> Option<FinishedJob> {
        let pos = self.entries.iter().position(|(k, _)| *k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Drops every record whose destination is the deleted image file.
    pub fn remove_image(&mut self, file: &str) -> Vec<FinishedJob> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|(_, job)| job.destination() == file);
        self.entries = kept;
        removed.into_iter().map(|(_, job)| job).collect()
    }

    pub fn get(&self, key: HistoryKey) -> Option<&FinishedJob> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, job)| job)
    }

    /// Key of the newest record carrying the worker job id `id`.
    pub fn key_of(&self, id: &str) -> Option<HistoryKey> {
        self.entries
            .iter()
            .find(|(_, job)| job.id() == id)
            .map(|(key, _)| *key)
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &FinishedJob> {
        self.entries.iter().map(|(_, job)| job)
    }

    /// Newest first, with the key each record is addressed by.
    pub fn entries(&self) -> impl Iterator<Item = (HistoryKey, &FinishedJob)> {
        self.entries.iter().map(|(key, job)| (*key, job))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
