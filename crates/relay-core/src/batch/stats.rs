use indexmap::IndexMap;
use serde::Serialize;

use crate::pipeline::PassStats;

/// `statistics-report.json`: volume and per-pass timing of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchStatistics {
    pub files_processed: u64,
    /// Files that produced a module
    pub files_transformed: u64,
    pub files_with_errors: u64,
    pub total_lines: u64,
    pub generated_lines: u64,
    /// Keyed by pass name, in pipeline order
    pub passes: IndexMap<String, PassStats>,
    pub threads: usize,
    pub chunk_size: usize,
    pub duration_ms: u64,
}

impl BatchStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one unit's pass statistics into the totals.
    pub fn record_passes<'p>(&mut self, stats: impl IntoIterator<Item = &'p PassStats>) {
        for pass in stats {
            self.passes
                .entry(pass.pass_name.clone())
                .or_insert_with(|| PassStats::new(pass.pass_name.clone()))
                .merge(pass);
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.files_processed == 0 {
            0.0
        } else {
            ((self.files_processed - self.files_with_errors) as f64) / (self.files_processed as f64)
        }
    }
}
