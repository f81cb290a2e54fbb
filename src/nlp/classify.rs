//! Grouping of phrase candidates by the number of entity markers they carry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::nlp::markers;

/// Phrases keyed by marker count. Keys iterate in ascending order and each
/// phrase list keeps document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhraseBucket(BTreeMap<usize, Vec<String>>);

impl PhraseBucket {
    pub fn get(&self, entity_count: usize) -> Option<&[String]> {
        self.0.get(&entity_count).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.0.iter().map(|(count, phrases)| (*count, phrases.as_slice()))
    }

    pub fn entity_counts(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total phrases across all buckets.
    pub fn phrase_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Occurrences per entity count.
    pub fn counts(&self) -> BTreeMap<usize, usize> {
        self.0
            .iter()
            .map(|(count, phrases)| (*count, phrases.len()))
            .collect()
    }
}

impl From<BTreeMap<usize, Vec<String>>> for PhraseBucket {
    fn from(map: BTreeMap<usize, Vec<String>>) -> Self {
        Self(map)
    }
}

impl FromIterator<(usize, Vec<String>)> for PhraseBucket {
    fn from_iter<I: IntoIterator<Item = (usize, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Bucket phrase candidates by marker count, trimming each and restoring the
/// period consumed by the splitter. Zero-marker phrases land in bucket 0.
pub fn classify<I, S>(candidates: I) -> PhraseBucket
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut buckets: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for candidate in candidates {
        let candidate = candidate.as_ref();
        let count = markers::count_markers(candidate);
        buckets
            .entry(count)
            .or_default()
            .push(format!("{}.", candidate.trim()));
    }
    PhraseBucket(buckets)
}

/// Occurrences per entity count.
pub fn count(bucket: &PhraseBucket) -> BTreeMap<usize, usize> {
    bucket.counts()
}
