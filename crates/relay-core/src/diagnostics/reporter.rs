use parking_lot::Mutex;

use super::{Diagnostic, ReportThresholds, TranspilationReport};

/// Run-wide diagnostic sink, safe to share between batch workers.
///
/// Recovery happens inside each unit, before its diagnostics reach the sink.
#[derive(Default)]
pub struct DiagnosticReporter {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one diagnostic. Never fails.
    pub fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().push(diagnostic);
    }

    /// Append a worker's diagnostics under a single lock.
    pub fn report_all(&self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.lock().extend(diagnostics);
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.lock().iter().filter(|d| d.is_error()).count()
    }

    /// Consume the sink into the final report.
    pub fn finish(self, files: usize, thresholds: &ReportThresholds) -> TranspilationReport {
        TranspilationReport::from_diagnostics(self.diagnostics.into_inner(), files, thresholds)
    }
}
