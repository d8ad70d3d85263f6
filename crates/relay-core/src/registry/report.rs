use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use super::{CommandCategory, CommandRegistry, UsageTally};
use crate::diagnostics::{Diagnostic, DiagnosticCategory};

/// One registered command joined with its usage in this run
#[derive(Debug, Clone, Serialize)]
pub struct CommandUsageEntry {
    pub name: String,
    pub identifier: String,
    pub category: CommandCategory,
    pub family: String,
    pub module_location: Option<String>,
    pub usage_count: u64,
}

/// `command-registry-report.json`
#[derive(Debug, Clone, Serialize)]
pub struct RegistryReport {
    pub generated_at: DateTime<Utc>,
    pub total_commands: usize,
    pub counts_by_category: IndexMap<CommandCategory, usize>,
    pub commands: Vec<CommandUsageEntry>,
    /// Registered but never called
    pub unused: Vec<String>,
    /// Called but not registered, with call counts
    pub unresolved: BTreeMap<String, u64>,
    pub total_calls: u64,
}

impl RegistryReport {
    pub fn build(registry: &CommandRegistry, usage: &UsageTally, diagnostics: &[Diagnostic]) -> Self {
        let mut commands: Vec<CommandUsageEntry> = registry
            .iter()
            .map(|command| CommandUsageEntry {
                name: command.canonical_name.clone(),
                identifier: command.generated_identifier.clone(),
                category: command.category,
                family: command.family.clone(),
                module_location: command
                    .module_location
                    .as_ref()
                    .map(|p| p.display().to_string()),
                usage_count: usage.count(&command.canonical_name),
            })
            .collect();
        commands.sort_by(|a, b| a.name.cmp(&b.name));

        let unused = commands
            .iter()
            .filter(|entry| entry.usage_count == 0)
            .map(|entry| entry.name.clone())
            .collect();

        let mut unresolved = BTreeMap::new();
        for diagnostic in diagnostics {
            if diagnostic.category == DiagnosticCategory::UnresolvedCommand {
                if let Some(name) = &diagnostic.subject {
                    *unresolved.entry(name.clone()).or_insert(0) += 1;
                }
            }
        }

        Self {
            generated_at: Utc::now(),
            total_commands: registry.len(),
            counts_by_category: registry.category_counts(),
            commands,
            unused,
            unresolved,
            total_calls: usage.total(),
        }
    }
}
