/*!
# Import Resolution and Module Generation

Turns a transformed unit into a finished ES module:

- [`MethodIndex`]: every method in the batch, for sibling calls
- [`ImportResolver`]: one relative import per distinct identifier
- [`ModuleGenerator`]: header, imports and the exported function wrapper
- [`validate_body`]: well-formedness checks on the generated body

References to commands and methods are both [`ModuleRef`]s: a pure function
of the callee and the caller's output location.
*/

mod imports;
mod methods;
mod module;
mod validate;

pub use imports::{ImportResolver, ImportStatement};
pub use methods::{MethodEntry, MethodIndex};
pub use module::{GeneratedModule, ModuleGenerator};
pub use validate::validate_body;

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::registry::CommandDescriptor;
use crate::TranspileConfig;

/// A resolved callee and how the caller imports it
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ModuleRef {
    pub source_name: String,
    pub generated_identifier: String,
    /// Module path relative to the output root
    pub target: PathBuf,
    /// Import specifier relative to the caller
    pub import_path: String,
}

pub type CommandRef = ModuleRef;
pub type MethodRef = ModuleRef;

impl ModuleRef {
    /// Reference to an imported command; `None` for commands without a module.
    pub fn command(descriptor: &CommandDescriptor, config: &TranspileConfig, caller: &Path) -> Option<Self> {
        let location = descriptor.module_location.as_ref()?;
        let target = config.command_import_root.join(location);
        Some(Self {
            source_name: descriptor.canonical_name.clone(),
            generated_identifier: descriptor.generated_identifier.clone(),
            import_path: relative_import(caller, &target),
            target,
        })
    }

    pub fn method(entry: &MethodEntry, caller: &Path) -> Self {
        Self {
            source_name: entry.name.clone(),
            generated_identifier: entry.identifier.clone(),
            import_path: relative_import(caller, &entry.output_path),
            target: entry.output_path.clone(),
        }
    }
}

/// Import specifier for `to`, as seen from the module at `from`.
///
/// Both paths are relative to the output root. The result always starts
/// with `./` or `../` and uses `/` separators.
pub fn relative_import(from: &Path, to: &Path) -> String {
    let from_dir = normal_components(from.parent().unwrap_or(Path::new("")));
    let target = normal_components(to);

    let limit = target.len().saturating_sub(1);
    let common = from_dir
        .iter()
        .zip(&target[..limit])
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); from_dir.len() - common];
    parts.extend(target[common..].iter().cloned());
    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{joined}")
    }
}

fn normal_components(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CommandCategory;

    #[test]
    fn test_relative_import() {
        let alert = Path::new("runtime/commands/ui/ALERT.js");
        assert_eq!(relative_import(Path::new("Init.js"), alert), "./runtime/commands/ui/ALERT.js");
        assert_eq!(relative_import(Path::new("util/Format.js"), alert), "../runtime/commands/ui/ALERT.js");
        assert_eq!(relative_import(Path::new("util/a.js"), Path::new("util/b.js")), "./b.js");
        assert_eq!(relative_import(Path::new("a/b/c.js"), Path::new("a/d/e.js")), "../d/e.js");
    }

    #[test]
    fn test_command_ref_is_deterministic() {
        let config = TranspileConfig::default();
        let descriptor = CommandDescriptor::implemented("ALL RECORDS", "db");
        let caller = Path::new("Customers/Load.js");
        let first = ModuleRef::command(&descriptor, &config, caller).unwrap();
        let second = ModuleRef::command(&descriptor, &config, caller).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.generated_identifier, "ALL_RECORDS");
        assert_eq!(first.import_path, "../runtime/commands/db/ALL_RECORDS.js");
    }

    #[test]
    fn test_inline_command_has_no_ref() {
        let descriptor = CommandDescriptor::new("Pi", CommandCategory::SimpleInline, "general", None);
        assert!(ModuleRef::command(&descriptor, &TranspileConfig::default(), Path::new("A.js")).is_none());
    }
}
