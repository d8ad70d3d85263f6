use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Diagnostic, DiagnosticCategory, Severity};

/// Counts above which a category earns a recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportThresholds {
    pub warnings: usize,
    pub errors: usize,
}

impl Default for ReportThresholds {
    fn default() -> Self {
        Self {
            warnings: 10,
            errors: 0,
        }
    }
}

impl ReportThresholds {
    fn for_category(&self, category: DiagnosticCategory) -> usize {
        match category.severity() {
            Severity::Error => self.errors,
            Severity::Warning => self.warnings,
        }
    }
}

/// Batch-level summary of every diagnostic raised in a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranspilationReport {
    pub generated_at: DateTime<Utc>,
    pub files: usize,
    pub counts_by_severity: IndexMap<Severity, usize>,
    pub counts_by_category: IndexMap<DiagnosticCategory, usize>,
    pub recommendations: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl TranspilationReport {
    pub fn from_diagnostics(
        mut diagnostics: Vec<Diagnostic>,
        files: usize,
        thresholds: &ReportThresholds,
    ) -> Self {
        diagnostics.sort_by(|a, b| {
            (&a.file, a.line, a.column, a.category).cmp(&(&b.file, b.line, b.column, b.category))
        });

        let mut counts_by_severity = IndexMap::new();
        counts_by_severity.insert(Severity::Error, 0);
        counts_by_severity.insert(Severity::Warning, 0);
        let mut counts_by_category: IndexMap<DiagnosticCategory, usize> = IndexMap::new();

        for d in &diagnostics {
            *counts_by_severity.entry(d.severity).or_insert(0) += 1;
            *counts_by_category.entry(d.category).or_insert(0) += 1;
        }
        counts_by_category.sort_keys();

        let recommendations = counts_by_category
            .iter()
            .filter(|(category, count)| **count > thresholds.for_category(**category))
            .map(|(category, count)| recommendation(*category, *count))
            .collect();

        Self {
            generated_at: Utc::now(),
            files,
            counts_by_severity,
            counts_by_category,
            recommendations,
            diagnostics,
        }
    }

    pub fn error_count(&self) -> usize {
        self.counts_by_severity.get(&Severity::Error).copied().unwrap_or(0)
    }

    pub fn warning_count(&self) -> usize {
        self.counts_by_severity.get(&Severity::Warning).copied().unwrap_or(0)
    }

    pub fn count(&self, category: DiagnosticCategory) -> usize {
        self.counts_by_category.get(&category).copied().unwrap_or(0)
    }
}

fn recommendation(category: DiagnosticCategory, count: usize) -> String {
    let advice = match category {
        DiagnosticCategory::Lexical => "inspect source encoding and unterminated literals",
        DiagnosticCategory::UnmatchedStructure | DiagnosticCategory::MalformedConstruct => {
            "fix the control-flow structure in the listed files"
        }
        DiagnosticCategory::InvalidIndex => "review literal array indices below one",
        DiagnosticCategory::Internal => "report the failing files; they produced no output",
        DiagnosticCategory::UnresolvedCommand => "implement these before shipping",
        DiagnosticCategory::UnresolvedMethod => "check for missing or renamed method files",
        DiagnosticCategory::PlaceholderCommand => "complete the stubbed command implementations",
        DiagnosticCategory::DeprecatedCommand => "migrate away from deprecated commands",
        DiagnosticCategory::ImportCollision => "rename the colliding commands or methods",
        DiagnosticCategory::Validation => "review the generated modules flagged as malformed",
    };
    let noun = match category.severity() {
        Severity::Error => "errors",
        Severity::Warning => "warnings",
    };
    format!("{count} {category} {noun}: {advice}")
}
