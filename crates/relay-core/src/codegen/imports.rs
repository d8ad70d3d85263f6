use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use super::ModuleRef;
use crate::diagnostics::{Diagnostic, DiagnosticCategory};

/// `import IDENT from "./path.js";`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportStatement {
    pub identifier: String,
    pub path: String,
}

impl ImportStatement {
    pub fn render(&self) -> String {
        let path = serde_json::to_string(&self.path).unwrap_or_else(|_| format!("\"{}\"", self.path));
        format!("import {} from {path};", self.identifier)
    }
}

/// Computes the import block of one module
pub struct ImportResolver<'a> {
    caller: &'a Path,
    function_name: &'a str,
}

impl<'a> ImportResolver<'a> {
    /// `caller` is the module's output path, `function_name` its exported function.
    pub fn new(caller: &'a Path, function_name: &'a str) -> Self {
        Self {
            caller,
            function_name,
        }
    }

    /// One import per distinct identifier, sorted by identifier.
    ///
    /// References to the caller itself are dropped. When two targets share
    /// an identifier, or an import would shadow the exported function, the
    /// first target wins and the rest are reported.
    pub fn resolve<'r>(&self, refs: impl IntoIterator<Item = &'r ModuleRef>) -> (Vec<ImportStatement>, Vec<Diagnostic>) {
        let mut chosen: BTreeMap<&str, &ModuleRef> = BTreeMap::new();
        let mut diagnostics = Vec::new();

        for reference in refs {
            if reference.target == self.caller {
                continue;
            }
            if reference.generated_identifier == self.function_name {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCategory::ImportCollision,
                        format!(
                            "import of '{}' would shadow the exported function {}",
                            reference.source_name, self.function_name
                        ),
                    )
                    .with_subject(reference.source_name.clone()),
                );
                continue;
            }
            match chosen.get(reference.generated_identifier.as_str()) {
                Some(kept) if kept.target != reference.target => {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticCategory::ImportCollision,
                            format!(
                                "'{}' and '{}' both import as {}",
                                kept.source_name, reference.source_name, reference.generated_identifier
                            ),
                        )
                        .with_subject(reference.source_name.clone()),
                    );
                }
                Some(_) => {}
                None => {
                    chosen.insert(&reference.generated_identifier, reference);
                }
            }
        }

        let imports = chosen
            .into_values()
            .map(|reference| ImportStatement {
                identifier: reference.generated_identifier.clone(),
                path: reference.import_path.clone(),
            })
            .collect();
        (imports, diagnostics)
    }
}
