//! # Relay Core
//!
//! Transpilation engine that turns 4GL method sources into ES modules:
//! - Lexical analysis with string/comment-aware tokens
//! - Context-aware textual replacement driven by the token stream
//! - An ordered pipeline of structural rewrite passes
//! - A command registry classifying the runtime command library
//! - Import resolution and module generation
//! - Diagnostics, recovery stand-ins, and batch reports
//!
//! A batch run builds the [`CommandRegistry`] once, then maps every source
//! file through the [`Transpiler`] in parallel (see [`batch`]).

#![warn(clippy::all)]

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod batch;
pub mod codegen;
pub mod diagnostics;
pub mod lexer;
pub mod pipeline;
pub mod position_map;
pub mod registry;
pub mod replacer;
pub mod transpiler;
pub mod unit;

// Re-export commonly used types
pub use batch::{BatchOutcome, BatchTranspiler};
pub use codegen::{GeneratedModule, MethodIndex, ModuleRef};
pub use diagnostics::{
    Diagnostic, DiagnosticCategory, DiagnosticReporter, Recovery, ReportThresholds, Severity,
    TranspilationReport,
};
pub use lexer::{tokenize, LexError, Lexer, Token, TokenKind};
pub use pipeline::{Pass, PassContext, Pipeline};
pub use position_map::PositionMap;
pub use registry::{CommandCategory, CommandDescriptor, CommandRegistry, UsageTally};
pub use replacer::{replace, Replacer};
pub use transpiler::{transpile_snippet, Transpiler, UnitOutcome};
pub use unit::{SourceFile, TranslationUnit};

/// Relay version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the execution context threaded through every generated call.
pub const CONTEXT_IDENT: &str = "processContext";

/// Initialize tracing for Relay components
pub fn init_tracing() {
    init_tracing_with("relay_core=info");
}

/// Initialize tracing with `directive` on top of `RUST_LOG`.
pub fn init_tracing_with(directive: &str) {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = directive.parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Transpiler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranspileConfig {
    /// Number of positional parameters on every generated function
    pub parameter_count: usize,
    /// Splice recovery stand-ins for failed constructs
    pub recovery: bool,
    /// Number of source files handed to a worker at once
    pub chunk_size: usize,
    /// Worker threads (0 = available parallelism)
    pub threads: usize,
    /// Extensions of method source files
    pub source_extensions: Vec<String>,
    /// Extensions of command implementation modules
    pub command_extensions: Vec<String>,
    /// Where command modules live, relative to the output root
    pub command_import_root: PathBuf,
    /// Extension of generated modules
    pub output_extension: String,
    /// Write a position map next to each generated module
    pub emit_position_maps: bool,
    /// Register the trivial inline commands even if absent from disk
    pub inline_defaults: bool,
    /// Recommendation thresholds for the final report
    pub thresholds: ReportThresholds,
}

impl Default for TranspileConfig {
    fn default() -> Self {
        Self {
            parameter_count: 10,
            recovery: true,
            chunk_size: 64,
            threads: 0,
            source_extensions: vec!["4dm".to_string()],
            command_extensions: vec!["js".to_string(), "mjs".to_string()],
            command_import_root: PathBuf::from("runtime/commands"),
            output_extension: "js".to_string(),
            emit_position_maps: false,
            inline_defaults: true,
            thresholds: ReportThresholds::default(),
        }
    }
}

impl TranspileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter_count(mut self, count: usize) -> Self {
        self.parameter_count = count;
        self
    }

    pub fn with_recovery(mut self, enabled: bool) -> Self {
        self.recovery = enabled;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_command_import_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.command_import_root = root.into();
        self
    }

    pub fn with_position_maps(mut self, enabled: bool) -> Self {
        self.emit_position_maps = enabled;
        self
    }

    /// Reject settings the batch driver cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RelayError::Config("chunk size must be at least 1".to_string()));
        }
        if self.source_extensions.is_empty() {
            return Err(RelayError::Config("no source extensions configured".to_string()));
        }
        Ok(())
    }
}

/// Error types for Relay operations
#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    /// Filesystem error with the offending path
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input directory missing
    #[error("Directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    /// Report or position map serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RelayError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for Relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
