use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticCategory};
use crate::registry::method_identifier;
use crate::unit::SourceFile;

/// A method callable from its siblings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodEntry {
    pub name: String,
    pub identifier: String,
    /// Generated module path relative to the output root
    pub output_path: PathBuf,
}

/// Every method of the batch, looked up by name ignoring case
#[derive(Debug, Clone, Default)]
pub struct MethodIndex {
    entries: Vec<MethodEntry>,
    by_name: HashMap<String, usize>,
    max_words: usize,
    diagnostics: Vec<Diagnostic>,
}

impl MethodIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `sources` in order; later duplicates are dropped with a warning.
    pub fn build(sources: &[SourceFile]) -> Self {
        let mut index = Self::new();
        let mut identifiers: HashMap<String, usize> = HashMap::new();

        for source in sources {
            let entry = MethodEntry {
                name: source.method_name.clone(),
                identifier: method_identifier(&source.method_name),
                output_path: source.output_path.clone(),
            };
            let key = entry.name.to_lowercase();

            let existing = index
                .by_name
                .get(&key)
                .or_else(|| identifiers.get(&entry.identifier))
                .copied();
            if let Some(existing) = existing {
                let kept = &index.entries[existing];
                index.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCategory::ImportCollision,
                        format!(
                            "method '{}' collides with '{}' ({})",
                            entry.name,
                            kept.name,
                            kept.output_path.display()
                        ),
                    )
                    .in_file(source.display_name())
                    .with_subject(entry.name.clone()),
                );
                continue;
            }

            let position = index.entries.len();
            index.max_words = index.max_words.max(entry.name.split_whitespace().count());
            index.by_name.insert(key, position);
            identifiers.insert(entry.identifier.clone(), position);
            index.entries.push(entry);
        }

        debug!(methods = index.entries.len(), "indexed methods");
        index
    }

    pub fn lookup(&self, name: &str) -> Option<&MethodEntry> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&position| &self.entries[position])
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(paths: &[&str]) -> Vec<SourceFile> {
        paths.iter().map(|p| SourceFile::from_relative(*p, "js")).collect()
    }

    #[test]
    fn test_lookup_ignores_case() {
        let index = MethodIndex::build(&sources(&["Init.4dm", "util/Format Date.4dm"]));
        assert_eq!(index.len(), 2);
        let entry = index.lookup("format date").unwrap();
        assert_eq!(entry.identifier, "Format_Date");
        assert_eq!(entry.output_path, PathBuf::from("util/Format Date.js"));
        assert_eq!(index.max_words(), 2);
    }

    #[test]
    fn test_duplicate_names_reported() {
        let index = MethodIndex::build(&sources(&["a/Init.4dm", "b/init.4dm", "Do-It.4dm", "Do_It.4dm"]));
        assert_eq!(index.len(), 2);
        assert_eq!(index.diagnostics().len(), 2);
        assert!(index
            .diagnostics()
            .iter()
            .all(|d| d.category == DiagnosticCategory::ImportCollision));
        assert_eq!(index.lookup("INIT").unwrap().output_path, PathBuf::from("a/Init.js"));
    }
}
