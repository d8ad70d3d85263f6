use indexmap::IndexMap;
use serde::Serialize;

/// Per-unit command usage, merged after the parallel map.
///
/// Keyed by canonical command name. Counting never influences resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UsageTally {
    counts: IndexMap<String, u64>,
}

impl UsageTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_usage(&mut self, name: &str) {
        *self.counts.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: UsageTally) {
        for (name, count) in other.counts {
            *self.counts.entry(name).or_insert(0) += count;
        }
    }

    pub fn count(&self, name: &str) -> u64 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /// Order by name so merged tallies serialize the same way every run.
    pub fn sorted(mut self) -> Self {
        self.counts.sort_keys();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
