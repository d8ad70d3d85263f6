/*!
# Translation Units

A [`TranslationUnit`] is the per-file working state: created from one
source file, mutated by the pipeline, and discarded once its generated
module and diagnostics have been collected. Units are never shared between
workers.
*/

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use crate::codegen::{CommandRef, MethodRef};
use crate::diagnostics::Diagnostic;
use crate::lexer::{Lexer, Token};
use crate::pipeline::{PassStats, ProtectedBlock};
use crate::registry::UsageTally;

/// Where a method comes from and where its module goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path the text is read from
    pub path: PathBuf,
    /// Path relative to the input root
    pub relative_path: PathBuf,
    /// Method name, the file stem
    pub method_name: String,
    /// Generated module path relative to the output root
    pub output_path: PathBuf,
}

impl SourceFile {
    pub fn new(root: &Path, path: &Path, output_extension: &str) -> Self {
        let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        Self {
            path: path.to_path_buf(),
            ..Self::from_relative(relative_path, output_extension)
        }
    }

    /// A source addressed only by its input-relative path.
    pub fn from_relative(relative_path: impl Into<PathBuf>, output_extension: &str) -> Self {
        let relative_path = relative_path.into();
        let method_name = relative_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            path: relative_path.clone(),
            output_path: relative_path.with_extension(output_extension),
            relative_path,
            method_name,
        }
    }

    /// Input-relative path with `/` separators, used in diagnostics and headers.
    pub fn display_name(&self) -> String {
        self.relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Working state of one file moving through the pipeline
#[derive(Debug)]
pub struct TranslationUnit {
    pub source: SourceFile,
    pub raw_text: String,
    pub tokens: Vec<Token>,
    /// Current text; each pass replaces it
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
    pub resolved_commands: BTreeSet<CommandRef>,
    pub resolved_methods: BTreeSet<MethodRef>,
    pub usage: UsageTally,
    /// Locals declared so far, so later declarations are not repeated
    pub declared: HashSet<String>,
    pub blocks: Vec<ProtectedBlock>,
    pub stats: Vec<PassStats>,
}

impl TranslationUnit {
    /// Scan `raw_text` and record its lexical errors.
    pub fn new(source: SourceFile, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let lexed = Lexer::new(&raw_text).tokenize();

        let mut unit = Self {
            source,
            text: raw_text.clone(),
            raw_text,
            tokens: lexed.tokens,
            diagnostics: Vec::new(),
            resolved_commands: BTreeSet::new(),
            resolved_methods: BTreeSet::new(),
            usage: UsageTally::new(),
            declared: HashSet::new(),
            blocks: Vec::new(),
            stats: Vec::new(),
        };
        for error in &lexed.errors {
            unit.report(Diagnostic::from_lex_error(error));
        }
        unit
    }

    /// Attach the diagnostic to this file and keep it.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        let file = self.source.display_name();
        self.diagnostics.push(diagnostic.in_file(file));
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.len() - self.error_count()
    }

    /// Lines in the raw source; every pass keeps the working text at this count.
    pub fn line_count(&self) -> usize {
        line_count(&self.raw_text)
    }
}

/// Number of lines, not counting an empty line after a trailing newline.
pub fn line_count(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let trimmed = text.strip_suffix('\n').unwrap_or(text);
    trimmed.split('\n').count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticCategory;

    #[test]
    fn test_source_file_paths() {
        let root = Path::new("/project/Methods");
        let file = SourceFile::new(root, Path::new("/project/Methods/util/Format Date.4dm"), "js");
        assert_eq!(file.method_name, "Format Date");
        assert_eq!(file.relative_path, PathBuf::from("util/Format Date.4dm"));
        assert_eq!(file.output_path, PathBuf::from("util/Format Date.js"));
        assert_eq!(file.display_name(), "util/Format Date.4dm");
    }

    #[test]
    fn test_lexical_errors_become_diagnostics() {
        let unit = TranslationUnit::new(
            SourceFile::from_relative("Broken.4dm", "js"),
            "$a:=1\n$b:=\"never closed\n",
        );
        assert_eq!(unit.diagnostics.len(), 1);
        let d = &unit.diagnostics[0];
        assert_eq!(d.category, DiagnosticCategory::Lexical);
        assert_eq!(d.file.as_deref(), Some("Broken.4dm"));
        assert_eq!((d.line, d.column), (2, 5));
        assert_eq!(unit.error_count(), 1);
    }

    #[test]
    fn test_line_count() {
        assert_eq!(line_count(""), 0);
        assert_eq!(line_count("a"), 1);
        assert_eq!(line_count("a\n"), 1);
        assert_eq!(line_count("a\n\nb"), 3);
    }
}
