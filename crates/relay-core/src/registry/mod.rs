/*!
# Command Registry

Catalogue of the runtime command library, built once per batch and then
shared read-only by every worker.

Construction happens in two phases. Discovery walks the command directory
(one descriptor per module file), then classification assigns each
descriptor a [`CommandCategory`]. The trivial inline commands are
registered even when the directory does not contain them.

Usage counting lives outside the registry in per-unit [`UsageTally`]
values, reduced after the parallel map.
*/

mod classify;
mod discovery;
mod report;
mod sanitize;
mod usage;

pub use classify::{classify, trivial_form, CommandCategory, InlineForm, MIN_BODY_LINES, TRIVIAL_COMMANDS};
pub use discovery::{command_name, discover_commands, DiscoveredCommand, DEFAULT_FAMILY};
pub use report::{CommandUsageEntry, RegistryReport};
pub use sanitize::{generated_identifier, method_identifier};
pub use usage::UsageTally;

pub(crate) use discovery::has_extension;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::diagnostics::{Diagnostic, DiagnosticCategory};
use crate::{Result, TranspileConfig};

/// Everything the transpiler needs to know about one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDescriptor {
    /// Name as written in source, e.g. `ALL RECORDS`
    pub canonical_name: String,
    pub generated_identifier: String,
    pub category: CommandCategory,
    pub family: String,
    /// Module path relative to the command root; `None` for built-in inline commands
    pub module_location: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<InlineForm>,
}

impl CommandDescriptor {
    pub fn new(
        name: impl Into<String>,
        category: CommandCategory,
        family: impl Into<String>,
        module_location: Option<PathBuf>,
    ) -> Self {
        let canonical_name = name.into();
        let inline = match category {
            CommandCategory::SimpleInline => trivial_form(&canonical_name),
            _ => None,
        };
        Self {
            generated_identifier: generated_identifier(&canonical_name),
            canonical_name,
            category,
            family: family.into(),
            module_location,
            inline,
        }
    }

    /// An implemented command living at `<family>/<IDENT>.js`.
    pub fn implemented(name: &str, family: &str) -> Self {
        let location = PathBuf::from(family).join(format!("{}.js", generated_identifier(name)));
        Self::new(name, CommandCategory::Implemented, family, Some(location))
    }

    fn from_discovered(found: DiscoveredCommand) -> Self {
        let category = classify(&found.name, &found.content);
        Self::new(found.name, category, found.family, Some(found.location))
    }

    fn inline_default(name: &str) -> Self {
        Self::new(name, CommandCategory::SimpleInline, DEFAULT_FAMILY, None)
    }

    pub fn word_count(&self) -> usize {
        self.canonical_name.split_whitespace().count()
    }
}

/// Immutable command catalogue
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: Vec<CommandDescriptor>,
    by_name: HashMap<String, usize>,
    by_identifier: HashMap<String, usize>,
    max_words: usize,
    diagnostics: Vec<Diagnostic>,
}

impl CommandRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Discover and classify the command library under `root`.
    pub fn discover(root: &Path, config: &TranspileConfig) -> Result<Self> {
        let registry = RegistryBuilder::new()
            .inline_defaults(config.inline_defaults)
            .discover(root, &config.command_extensions)?
            .build();

        info!(
            root = %root.display(),
            commands = registry.len(),
            collisions = registry.diagnostics.len(),
            "built command registry"
        );
        Ok(registry)
    }

    /// Exact name first, then the sanitized identifier.
    pub fn lookup(&self, name: &str) -> Option<&CommandDescriptor> {
        self.by_name
            .get(name)
            .or_else(|| self.by_identifier.get(&generated_identifier(name)))
            .map(|&index| &self.commands[index])
    }

    pub fn generated_identifier(&self, name: &str) -> String {
        generated_identifier(name)
    }

    /// Word count of the longest registered name; bounds longest-match scans.
    pub fn max_words(&self) -> usize {
        self.max_words
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of commands per category, every category present.
    pub fn category_counts(&self) -> IndexMap<CommandCategory, usize> {
        let mut counts: IndexMap<CommandCategory, usize> =
            CommandCategory::ALL.iter().map(|c| (*c, 0)).collect();
        for command in &self.commands {
            *counts.entry(command.category).or_insert(0) += 1;
        }
        counts
    }

    /// Collision warnings raised while building.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Collects descriptors, then freezes them into a [`CommandRegistry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    commands: Vec<CommandDescriptor>,
    inline_defaults: bool,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            inline_defaults: true,
        }
    }

    pub fn with_command(mut self, command: CommandDescriptor) -> Self {
        self.commands.push(command);
        self
    }

    /// Register the trivial inline commands missing from disk.
    pub fn inline_defaults(mut self, enabled: bool) -> Self {
        self.inline_defaults = enabled;
        self
    }

    pub fn discover(mut self, root: &Path, extensions: &[String]) -> Result<Self> {
        self.commands.extend(
            discover_commands(root, extensions)?
                .into_iter()
                .map(CommandDescriptor::from_discovered),
        );
        Ok(self)
    }

    /// Index the descriptors. The first descriptor for an identifier wins;
    /// later ones are dropped with an `ImportCollision` warning.
    pub fn build(mut self) -> CommandRegistry {
        if self.inline_defaults {
            for (name, _) in TRIVIAL_COMMANDS {
                let ident = generated_identifier(name);
                if !self.commands.iter().any(|c| c.generated_identifier == ident) {
                    self.commands.push(CommandDescriptor::inline_default(name));
                }
            }
        }

        let mut registry = CommandRegistry::default();
        for command in self.commands {
            if let Some(&existing) = registry.by_identifier.get(&command.generated_identifier) {
                let kept = &registry.commands[existing];
                let mut diagnostic = Diagnostic::new(
                    DiagnosticCategory::ImportCollision,
                    format!(
                        "command '{}' maps to identifier {} already used by '{}'",
                        command.canonical_name, command.generated_identifier, kept.canonical_name
                    ),
                )
                .with_subject(command.canonical_name.clone());
                if let Some(location) = &command.module_location {
                    diagnostic = diagnostic.in_file(location.display().to_string());
                }
                registry.diagnostics.push(diagnostic);
                continue;
            }

            let index = registry.commands.len();
            registry.max_words = registry.max_words.max(command.word_count());
            registry.by_name.insert(command.canonical_name.clone(), index);
            registry.by_identifier.insert(command.generated_identifier.clone(), index);
            registry.commands.push(command);
        }

        debug!(
            commands = registry.commands.len(),
            max_words = registry.max_words,
            "indexed command registry"
        );
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample() -> CommandRegistry {
        CommandRegistry::builder()
            .with_command(CommandDescriptor::implemented("ALL", "db"))
            .with_command(CommandDescriptor::implemented("ALL RECORDS", "db"))
            .with_command(CommandDescriptor::implemented("Length", "string"))
            .build()
    }

    #[test]
    fn test_lookup_exact_then_sanitized() {
        let registry = sample();
        assert_eq!(registry.lookup("ALL RECORDS").map(|c| c.generated_identifier.as_str()), Some("ALL_RECORDS"));
        assert_eq!(registry.lookup("all records").map(|c| c.canonical_name.as_str()), Some("ALL RECORDS"));
        assert_eq!(registry.lookup("LENGTH").map(|c| c.canonical_name.as_str()), Some("Length"));
        assert!(registry.lookup("ALERT").is_none());
    }

    #[test]
    fn test_inline_defaults_registered() {
        let registry = sample();
        let pi = registry.lookup("Pi").unwrap();
        assert_eq!(pi.category, CommandCategory::SimpleInline);
        assert_eq!(pi.inline, Some(InlineForm::Constant("Math.PI")));
        assert!(pi.module_location.is_none());

        let bare = CommandRegistry::builder().inline_defaults(false).build();
        assert!(bare.is_empty());
    }

    #[test]
    fn test_max_words() {
        let registry = CommandRegistry::builder()
            .inline_defaults(false)
            .with_command(CommandDescriptor::implemented("Find in array", "array"))
            .build();
        assert_eq!(registry.max_words(), 3);
    }

    #[test]
    fn test_collision_first_wins() {
        let registry = CommandRegistry::builder()
            .inline_defaults(false)
            .with_command(CommandDescriptor::implemented("ALL RECORDS", "db"))
            .with_command(CommandDescriptor::implemented("all_records", "legacy"))
            .build();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("all_records").unwrap().family, "db");
        assert_eq!(registry.diagnostics().len(), 1);
        assert_eq!(registry.diagnostics()[0].category, DiagnosticCategory::ImportCollision);
        assert_eq!(registry.diagnostics()[0].subject.as_deref(), Some("all_records"));
    }

    #[test]
    fn test_category_counts_cover_all_categories() {
        let counts = sample().category_counts();
        assert_eq!(counts.len(), CommandCategory::ALL.len());
        assert_eq!(counts[&CommandCategory::Implemented], 3);
        assert_eq!(counts[&CommandCategory::SimpleInline], TRIVIAL_COMMANDS.len());
    }

    #[test]
    fn test_discover_classifies() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("ui"))?;
        fs::write(
            dir.path().join("ui/ALERT.js"),
            "export default function ALERT(processContext, message) {\n  const text = String(message);\n  processContext.ui.alert(text);\n}\n",
        )?;
        fs::write(dir.path().join("ui/BEEP.js"), "export default function BEEP() {}\n")?;
        fs::write(dir.path().join("Abs.js"), "export default Math.abs;\n")?;

        let registry = CommandRegistry::discover(dir.path(), &TranspileConfig::default())?;
        assert_eq!(registry.lookup("ALERT").unwrap().category, CommandCategory::Implemented);
        assert_eq!(registry.lookup("BEEP").unwrap().category, CommandCategory::Placeholder);
        let abs = registry.lookup("Abs").unwrap();
        assert_eq!(abs.category, CommandCategory::SimpleInline);
        assert_eq!(abs.module_location, Some(PathBuf::from("Abs.js")));
        assert!(registry.diagnostics().is_empty());
        Ok(())
    }
}
