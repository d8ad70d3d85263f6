/*!
# Transpiler

Single-file entry point: one source text in, one generated module plus
its diagnostics out. Shared state (registry, method index, configuration)
is borrowed, so one `Transpiler` serves every worker of a batch.
*/

use std::fs;

use tracing::{debug, instrument};

use crate::codegen::{validate_body, GeneratedModule, MethodIndex, ModuleGenerator};
use crate::diagnostics::{Diagnostic, DiagnosticCategory, Recovery};
use crate::pipeline::{restore_blocks, PassContext, PassStats, Pipeline};
use crate::registry::{CommandRegistry, UsageTally};
use crate::unit::{SourceFile, TranslationUnit};
use crate::TranspileConfig;

/// Everything one unit produced
#[derive(Debug)]
pub struct UnitOutcome {
    pub source: SourceFile,
    /// `None` only when the source could not be read
    pub module: Option<GeneratedModule>,
    pub diagnostics: Vec<Diagnostic>,
    pub usage: UsageTally,
    pub stats: Vec<PassStats>,
    pub source_lines: usize,
}

impl UnitOutcome {
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    /// Outcome of a unit that never reached the pipeline.
    pub fn failed(source: SourceFile, diagnostic: Diagnostic) -> Self {
        let diagnostic = diagnostic.in_file(source.display_name());
        Self {
            source,
            module: None,
            diagnostics: vec![diagnostic],
            usage: UsageTally::new(),
            stats: Vec::new(),
            source_lines: 0,
        }
    }
}

pub struct Transpiler<'a> {
    pipeline: Pipeline,
    registry: &'a CommandRegistry,
    methods: &'a MethodIndex,
    recovery: Recovery,
    config: &'a TranspileConfig,
}

impl<'a> Transpiler<'a> {
    pub fn new(registry: &'a CommandRegistry, methods: &'a MethodIndex, config: &'a TranspileConfig) -> Self {
        Self {
            pipeline: Pipeline::standard(),
            registry,
            methods,
            recovery: Recovery::standard(),
            config,
        }
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_recovery(mut self, recovery: Recovery) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn recovery(&self) -> &Recovery {
        &self.recovery
    }

    /// Read `source` from disk and transpile it.
    pub fn transpile_file(&self, source: SourceFile) -> UnitOutcome {
        match fs::read_to_string(&source.path) {
            Ok(text) => self.transpile(source, &text),
            Err(err) => {
                let message = format!("cannot read {}: {err}", source.path.display());
                UnitOutcome::failed(source, Diagnostic::new(DiagnosticCategory::Internal, message))
            }
        }
    }

    #[instrument(skip_all, fields(file = %source.display_name()))]
    pub fn transpile(&self, source: SourceFile, text: &str) -> UnitOutcome {
        let mut unit = TranslationUnit::new(source, text);
        let ctx = PassContext::new(self.registry, self.methods, &self.recovery, self.config);

        self.pipeline.run(&mut unit, &ctx);

        for diagnostic in validate_body(&unit.tokens) {
            unit.report(diagnostic);
        }

        let body = restore_blocks(&unit.text, &unit.blocks);
        let module = ModuleGenerator::new(self.config).generate(&mut unit, &body);

        debug!(
            diagnostics = unit.diagnostics.len(),
            imports = module.imports.len(),
            "unit transpiled"
        );

        UnitOutcome {
            source_lines: unit.line_count(),
            source: unit.source,
            module: Some(module),
            diagnostics: unit.diagnostics,
            usage: unit.usage,
            stats: unit.stats,
        }
    }
}

/// Transpile a standalone snippet with an empty method index.
pub fn transpile_snippet(registry: &CommandRegistry, config: &TranspileConfig, name: &str, text: &str) -> UnitOutcome {
    let methods = MethodIndex::default();
    let source = SourceFile::from_relative(format!("{name}.4dm"), &config.output_extension);
    Transpiler::new(registry, &methods, config).transpile(source, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CommandDescriptor;
    use pretty_assertions::assert_eq;

    fn registry() -> CommandRegistry {
        CommandRegistry::builder()
            .with_command(CommandDescriptor::implemented("ALERT", "ui"))
            .with_command(CommandDescriptor::implemented("Size of array", "array"))
            .build()
    }

    #[test]
    fn test_end_to_end_body() {
        let config = TranspileConfig::default().with_parameter_count(1);
        let source = "\
C_LONGINT($i)
ARRAY TEXT($names;0)
For ($i;1;Size of array:C274($names))
  If ($names{$i}=\"\")
    ALERT:C41(\"empty at \"+String($i))
  End if
End for";
        let outcome = transpile_snippet(&registry(), &config, "Scan", source);
        let module = outcome.module.unwrap();
        assert_eq!(
            module.code,
            "\
// Generated by relay from Scan.4dm. Do not edit.
import ALERT from \"./runtime/commands/ui/ALERT.js\";
import SIZE_OF_ARRAY from \"./runtime/commands/array/SIZE_OF_ARRAY.js\";

export default function Scan(processContext, $1) {
let $i = 0;
let $names = [];
for (let $i = 1; $i <= SIZE_OF_ARRAY(processContext, $names); $i++) {
  if ($names[$i]===\"\") {
    ALERT(processContext, \"empty at \"+String($i))
  }
}
}
"
        );
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        assert_eq!(outcome.usage.count("ALERT"), 1);
        assert_eq!(outcome.stats.len(), 6);
    }

    #[test]
    fn test_query_block_survives_pipeline() {
        let config = TranspileConfig::default().with_parameter_count(0);
        let source = "Begin SQL\n  SELECT * FROM People WHERE name = 'x';\nEnd SQL\n$ok:=True";
        let outcome = transpile_snippet(&registry(), &config, "Query", source);
        let code = outcome.module.unwrap().code;
        assert!(code.contains("processContext.executeBlock(\"SQL\", `\n  SELECT * FROM People WHERE name = 'x';\n`)"));
        assert!(code.contains("$ok=true"));
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    }

    #[test]
    fn test_missing_file_is_internal_error() {
        let registry = registry();
        let methods = MethodIndex::default();
        let config = TranspileConfig::default();
        let outcome = Transpiler::new(&registry, &methods, &config)
            .transpile_file(SourceFile::from_relative("does/not/exist.4dm", "js"));
        assert!(outcome.module.is_none());
        assert_eq!(outcome.error_count(), 1);
        assert_eq!(outcome.diagnostics[0].category, DiagnosticCategory::Internal);
    }
}
