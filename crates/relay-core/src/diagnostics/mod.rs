/*!
# Diagnostics

Structured errors and warnings raised by every stage, plus the recovery
strategies that let a file keep producing output after one construct
fails, and the batch-level report they aggregate into.

Error-severity diagnostics stop the transformation of one construct. They
never abort the file or the batch. Warnings never interrupt anything.
*/

mod recovery;
mod report;
mod reporter;

pub use recovery::{InertPlaceholder, Recovery, RecoveryStrategy, UnresolvedCommandStandIn};
pub use report::{ReportThresholds, TranspilationReport};
pub use reporter::DiagnosticReporter;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lexer::LexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Error,
    Warning,
}

/// Closed set of diagnostic categories. Each category has a fixed severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCategory {
    /// Unscannable character or unterminated literal
    Lexical,
    /// Structure opener without closer, or the reverse
    UnmatchedStructure,
    /// Structure whose header cannot be rewritten
    MalformedConstruct,
    /// Literal array index below one
    InvalidIndex,
    /// A unit failed outside the pipeline (panic, unreadable file)
    Internal,
    UnresolvedCommand,
    UnresolvedMethod,
    /// Call to a command whose implementation is a stub
    PlaceholderCommand,
    DeprecatedCommand,
    /// Two distinct names behind one generated identifier
    ImportCollision,
    /// Generated output failed a well-formedness check
    Validation,
}

impl DiagnosticCategory {
    pub const ALL: [DiagnosticCategory; 11] = [
        Self::Lexical,
        Self::UnmatchedStructure,
        Self::MalformedConstruct,
        Self::InvalidIndex,
        Self::Internal,
        Self::UnresolvedCommand,
        Self::UnresolvedMethod,
        Self::PlaceholderCommand,
        Self::DeprecatedCommand,
        Self::ImportCollision,
        Self::Validation,
    ];

    pub fn severity(self) -> Severity {
        match self {
            Self::Lexical
            | Self::UnmatchedStructure
            | Self::MalformedConstruct
            | Self::InvalidIndex
            | Self::Internal => Severity::Error,
            Self::UnresolvedCommand
            | Self::UnresolvedMethod
            | Self::PlaceholderCommand
            | Self::DeprecatedCommand
            | Self::ImportCollision
            | Self::Validation => Severity::Warning,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::UnmatchedStructure => "unmatched-structure",
            Self::MalformedConstruct => "malformed-construct",
            Self::InvalidIndex => "invalid-index",
            Self::Internal => "internal",
            Self::UnresolvedCommand => "unresolved-command",
            Self::UnresolvedMethod => "unresolved-method",
            Self::PlaceholderCommand => "placeholder-command",
            Self::DeprecatedCommand => "deprecated-command",
            Self::ImportCollision => "import-collision",
            Self::Validation => "validation",
        }
    }
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A positioned message from one pipeline stage.
///
/// Built with the builder methods, then handed to a unit or reporter; it is
/// not changed after that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: DiagnosticCategory,
    pub message: String,
    pub file: Option<String>,
    pub line: usize,
    pub column: usize,
    /// The construct the diagnostic is about (command name, source line...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovered_with: Option<String>,
}

impl Diagnostic {
    pub fn new(category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Self {
            severity: category.severity(),
            category,
            message: message.into(),
            file: None,
            line: 0,
            column: 0,
            subject: None,
            recovered_with: None,
        }
    }

    pub fn from_lex_error(error: &LexError) -> Self {
        let (line, column) = error.position();
        Self::new(DiagnosticCategory::Lexical, error.to_string()).at(line, column)
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn recovered_with(mut self, stand_in: Option<String>) -> Self {
        self.recovered_with = stand_in;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.file {
            Some(file) => write!(f, "{file}:{}:{}: ", self.line, self.column)?,
            None => write!(f, "{}:{}: ", self.line, self.column)?,
        }
        write!(f, "{level}[{}]: {}", self.category, self.message)
    }
}
