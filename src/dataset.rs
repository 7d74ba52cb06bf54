use crate::types::{IncomingBatch, Observation, TimestampedObservations};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The full persisted document for one domain:
/// resource/zone key -> timestamp key -> observation.
///
/// Append-only per key: once a timestamp key exists under a resource, later
/// merges never replace it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    entries: BTreeMap<String, TimestampedObservations>,
}

/// Outcome counts of a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    pub skipped: usize,
}

impl MergeStats {
    pub fn absorb(&mut self, other: MergeStats) {
        self.added += other.added;
        self.skipped += other.skipped;
    }
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> crate::error::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Make sure every configured resource/zone has an entry, so merges never
    /// hit a missing key on the first run for a new zone.
    pub fn ensure_entries<'a, I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for key in keys {
            self.entries.entry(key.to_string()).or_default();
        }
    }

    pub fn get(&self, resource: &str) -> Option<&TimestampedObservations> {
        self.entries.get(resource)
    }

    pub fn observation(&self, resource: &str, timestamp: &str) -> Option<&Observation> {
        self.entries.get(resource).and_then(|obs| obs.get(timestamp))
    }

    /// True when any resource already holds `timestamp`.
    pub fn contains_timestamp(&self, timestamp: &str) -> bool {
        self.entries.values().any(|obs| obs.contains_key(timestamp))
    }

    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert one resource's observations, first write wins.
    pub fn merge_resource(
        &mut self,
        resource: &str,
        incoming: TimestampedObservations,
    ) -> MergeStats {
        let existing = self.entries.entry(resource.to_string()).or_default();
        let mut stats = MergeStats::default();
        for (timestamp, observation) in incoming {
            if existing.contains_key(&timestamp) {
                stats.skipped += 1;
            } else {
                existing.insert(timestamp, observation);
                stats.added += 1;
            }
        }
        stats
    }

    /// Merge a whole batch in place.
    pub fn merge_batch(&mut self, incoming: IncomingBatch) -> MergeStats {
        let mut stats = MergeStats::default();
        for (resource, observations) in incoming {
            stats.absorb(self.merge_resource(&resource, observations));
        }
        stats
    }
}

/// Pure form of [`Dataset::merge_batch`]: returns the updated dataset.
pub fn merge(mut existing: Dataset, incoming: IncomingBatch) -> Dataset {
    existing.merge_batch(incoming);
    existing
}
