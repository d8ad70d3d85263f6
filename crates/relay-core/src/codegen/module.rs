use std::path::PathBuf;

use serde::Serialize;

use super::{ImportResolver, ImportStatement};
use crate::lexer::{tokenize, TokenKind};
use crate::position_map::PositionMap;
use crate::registry::method_identifier;
use crate::unit::TranslationUnit;
use crate::{TranspileConfig, CONTEXT_IDENT};

/// Return slot of every method
const RETURN_SLOT: &str = "$0";

/// One finished ES module
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedModule {
    /// Input-relative source path
    pub source_path: String,
    /// Output-relative module path
    pub output_path: PathBuf,
    pub function_name: String,
    pub imports: Vec<ImportStatement>,
    pub code: String,
    #[serde(skip)]
    pub position_map: PositionMap,
}

impl GeneratedModule {
    pub fn line_count(&self) -> usize {
        crate::unit::line_count(&self.code)
    }
}

/// Wraps a transformed body into an exported function
pub struct ModuleGenerator<'a> {
    config: &'a TranspileConfig,
}

impl<'a> ModuleGenerator<'a> {
    pub fn new(config: &'a TranspileConfig) -> Self {
        Self { config }
    }

    /// `processContext, $1, ..., $N`
    pub fn parameter_list(&self) -> String {
        std::iter::once(CONTEXT_IDENT.to_string())
            .chain((1..=self.config.parameter_count).map(|n| format!("${n}")))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Build the module for `unit` around `body`, the fully transformed text.
    ///
    /// Import problems are reported on the unit.
    pub fn generate(&self, unit: &mut TranslationUnit, body: &str) -> GeneratedModule {
        let function_name = method_identifier(&unit.source.method_name);
        let output_path = unit.source.output_path.clone();

        let (imports, diagnostics) = ImportResolver::new(&output_path, &function_name)
            .resolve(unit.resolved_commands.iter().chain(unit.resolved_methods.iter()));
        for diagnostic in diagnostics {
            unit.report(diagnostic);
        }

        let uses_return = tokenize(body)
            .iter()
            .any(|t| t.is(TokenKind::Identifier) && t.text == RETURN_SLOT);

        let mut header = vec![format!(
            "// Generated by relay from {}. Do not edit.",
            unit.source.display_name()
        )];
        header.extend(imports.iter().map(ImportStatement::render));
        header.push(String::new());
        header.push(format!(
            "export default function {function_name}({}) {{",
            self.parameter_list()
        ));
        if uses_return && !unit.declared.contains(RETURN_SLOT) {
            header.push(format!("let {RETURN_SLOT};"));
        }

        let mut code = header.join("\n");
        code.push('\n');
        code.push_str(body.strip_suffix('\n').unwrap_or(body));
        code.push('\n');
        if uses_return {
            code.push_str(&format!("return {RETURN_SLOT};\n"));
        }
        code.push_str("}\n");

        let mut position_map = PositionMap::from_aligned_lines(
            unit.source.display_name(),
            output_path.to_string_lossy(),
            &unit.raw_text,
            body,
        );
        position_map.shift_generated(header.len());

        GeneratedModule {
            source_path: unit.source.display_name(),
            output_path,
            function_name,
            imports,
            code,
            position_map,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::ModuleRef;
    use crate::registry::CommandDescriptor;
    use crate::unit::SourceFile;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn test_module_layout() {
        let config = TranspileConfig::default().with_parameter_count(2);
        let source = "$0:=Length:C16($1)\nALERT:C41($0)";
        let body = "$0=LENGTH(processContext, $1)\nALERT(processContext, $0)";
        let mut unit = TranslationUnit::new(SourceFile::from_relative("util/Size.4dm", "js"), source);
        for (name, family) in [("Length", "string"), ("ALERT", "ui")] {
            let descriptor = CommandDescriptor::implemented(name, family);
            let reference = ModuleRef::command(&descriptor, &config, Path::new("util/Size.js")).unwrap();
            unit.resolved_commands.insert(reference);
        }

        let module = ModuleGenerator::new(&config).generate(&mut unit, body);
        assert_eq!(
            module.code,
            "// Generated by relay from util/Size.4dm. Do not edit.\n\
             import ALERT from \"../runtime/commands/ui/ALERT.js\";\n\
             import LENGTH from \"../runtime/commands/string/LENGTH.js\";\n\
             \n\
             export default function Size(processContext, $1, $2) {\n\
             let $0;\n\
             $0=LENGTH(processContext, $1)\n\
             ALERT(processContext, $0)\n\
             return $0;\n\
             }\n"
        );
        assert_eq!(module.position_map.original_line(7), Some(1));
        assert_eq!(module.position_map.original_line(8), Some(2));
    }

    #[test]
    fn test_declared_return_slot_not_redeclared() {
        let config = TranspileConfig::default().with_parameter_count(0);
        let mut unit = TranslationUnit::new(SourceFile::from_relative("Zero.4dm", "js"), "C_LONGINT($0)\n$0:=1");
        unit.declared.insert("$0".to_string());
        let module = ModuleGenerator::new(&config).generate(&mut unit, "let $0 = 0;\n$0=1");
        assert_eq!(
            module.code,
            "// Generated by relay from Zero.4dm. Do not edit.\n\
             \n\
             export default function Zero(processContext) {\n\
             let $0 = 0;\n\
             $0=1\n\
             return $0;\n\
             }\n"
        );
    }
}
