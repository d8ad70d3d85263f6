/*!
# Syntax Transformation Pipeline

Ordered text-to-text passes over a [`TranslationUnit`]. Each pass sees the
current text and its token stream, records diagnostics on the unit, and
returns the new text. The pipeline re-tokenizes between passes.

Every pass keeps the line count of the text, so source line `n` is still
line `n` when the code generator wraps the body.

## Passes

1. [`QueryBlockPass`]: `Begin X … End X` regions become opaque placeholders
2. [`OperatorPass`]: operators, literals, system variables, table references
3. [`ControlFlowPass`]: `If`/`For`/`While`/`Repeat`/`Case of` via a stack matcher
4. [`ArrayIndexPass`]: one-based `name{n}` to zero-based `name[n-1]`
5. [`DeclarationPass`]: typed declarations to `let` bindings
6. [`CallPass`]: command and method calls resolved against the registry
*/

mod arrays;
mod calls;
mod control_flow;
mod declarations;
mod operators;
mod query_blocks;

pub use arrays::ArrayIndexPass;
pub use calls::CallPass;
pub use control_flow::ControlFlowPass;
pub use declarations::{zero_value, DeclarationPass};
pub use operators::OperatorPass;
pub use query_blocks::{restore_blocks, ProtectedBlock, QueryBlockPass};

use std::ops::Range;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

use crate::codegen::MethodIndex;
use crate::diagnostics::{Diagnostic, Recovery};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::registry::CommandRegistry;
use crate::unit::{line_count, TranslationUnit};
use crate::TranspileConfig;

/// One rewrite step of the pipeline
pub trait Pass: Send + Sync {
    /// Human-readable name for this pass
    fn name(&self) -> &'static str;

    /// Cheap pre-check; a pass that does not match is skipped for the unit
    fn matches(&self, text: &str) -> bool {
        let _ = text;
        true
    }

    /// Rewrite `text` (scanned as `tokens`), reporting into `unit`.
    ///
    /// The result must have the same number of lines as `text`.
    fn transform(
        &self,
        text: &str,
        tokens: &[Token],
        unit: &mut TranslationUnit,
        ctx: &PassContext<'_>,
    ) -> String;
}

/// Read-only run state shared by every unit
#[derive(Clone, Copy)]
pub struct PassContext<'a> {
    pub registry: &'a CommandRegistry,
    pub methods: &'a MethodIndex,
    pub recovery: &'a Recovery,
    pub config: &'a TranspileConfig,
}

impl<'a> PassContext<'a> {
    pub fn new(
        registry: &'a CommandRegistry,
        methods: &'a MethodIndex,
        recovery: &'a Recovery,
        config: &'a TranspileConfig,
    ) -> Self {
        Self {
            registry,
            methods,
            recovery,
            config,
        }
    }

    /// Stand-in text for a failed construct, if recovery is on and has a strategy.
    pub fn recover(&self, diagnostic: &Diagnostic) -> Option<String> {
        if !self.config.recovery {
            return None;
        }
        self.recovery.attempt(diagnostic)
    }
}

/// Pass execution statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassStats {
    pub pass_name: String,
    /// Units the pass ran on
    pub applications: u64,
    /// Units whose text the pass changed
    pub transformations: u64,
    pub diagnostics: u64,
    pub total_time_us: u64,
}

impl PassStats {
    pub fn new(pass_name: impl Into<String>) -> Self {
        Self {
            pass_name: pass_name.into(),
            ..Self::default()
        }
    }

    pub fn merge(&mut self, other: &PassStats) {
        self.applications += other.applications;
        self.transformations += other.transformations;
        self.diagnostics += other.diagnostics;
        self.total_time_us += other.total_time_us;
    }
}

/// The ordered pass list
pub struct Pipeline {
    passes: Vec<Box<dyn Pass>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// The six standard passes in dependency order.
    pub fn standard() -> Self {
        Self::new()
            .with_pass(Box::new(QueryBlockPass))
            .with_pass(Box::new(OperatorPass::new()))
            .with_pass(Box::new(ControlFlowPass))
            .with_pass(Box::new(ArrayIndexPass))
            .with_pass(Box::new(DeclarationPass))
            .with_pass(Box::new(CallPass))
    }

    pub fn with_pass(mut self, pass: Box<dyn Pass>) -> Self {
        self.passes.push(pass);
        self
    }

    /// Run every pass over the unit's working text.
    pub fn run(&self, unit: &mut TranslationUnit, ctx: &PassContext<'_>) {
        for pass in &self.passes {
            let mut stats = PassStats::new(pass.name());
            if !pass.matches(&unit.text) {
                unit.stats.push(stats);
                continue;
            }

            let started = Instant::now();
            let before_diagnostics = unit.diagnostics.len();
            let text = std::mem::take(&mut unit.text);
            let tokens = std::mem::take(&mut unit.tokens);

            let output = pass.transform(&text, &tokens, unit, ctx);

            stats.applications = 1;
            stats.diagnostics = (unit.diagnostics.len() - before_diagnostics) as u64;
            stats.total_time_us = started.elapsed().as_micros() as u64;

            if output == text {
                unit.text = text;
                unit.tokens = tokens;
            } else {
                stats.transformations = 1;
                if line_count(&output) != line_count(&text) {
                    warn!(
                        pass = pass.name(),
                        file = %unit.source.display_name(),
                        "pass changed the line count"
                    );
                }
                unit.tokens = tokenize(&output);
                unit.text = output;
            }

            debug!(
                pass = pass.name(),
                file = %unit.source.display_name(),
                changed = stats.transformations == 1,
                diagnostics = stats.diagnostics,
                "pass complete"
            );
            unit.stats.push(stats);
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

/// Replacement of one byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Range<usize>,
    pub replacement: String,
}

impl Edit {
    pub fn new(span: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }
}

/// Apply non-overlapping edits. An edit overlapping an earlier one is dropped.
pub fn apply_edits(text: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.span.start, e.span.end));
    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.span.start < cursor {
            continue;
        }
        output.push_str(&text[cursor..edit.span.start]);
        output.push_str(&edit.replacement);
        cursor = edit.span.end;
    }
    output.push_str(&text[cursor..]);
    output
}

/// One line of text and the significant tokens that start on it
#[derive(Debug, Clone)]
pub struct LineView {
    /// 1-based
    pub number: usize,
    pub start: usize,
    /// Byte offset of the line end, excluding the newline
    pub end: usize,
    /// Indices into the token slice
    pub tokens: Vec<usize>,
}

impl LineView {
    pub fn text<'t>(&self, source: &'t str) -> &'t str {
        &source[self.start..self.end]
    }

    /// Leading whitespace
    pub fn indent<'t>(&self, source: &'t str) -> &'t str {
        let text = self.text(source);
        &text[..text.len() - text.trim_start().len()]
    }

    /// Text after the last significant token: trailing comment and blanks.
    pub fn trailer<'t>(&self, source: &'t str, tokens: &[Token]) -> &'t str {
        match self.tokens.last() {
            Some(&last) => {
                let from = tokens[last].span.end.min(self.end);
                &source[from..self.end]
            }
            None => "",
        }
    }

    pub fn first<'t>(&self, tokens: &'t [Token]) -> Option<&'t Token> {
        self.tokens.first().map(|&i| &tokens[i])
    }

    pub fn nth<'t>(&self, tokens: &'t [Token], n: usize) -> Option<&'t Token> {
        self.tokens.get(n).map(|&i| &tokens[i])
    }

    pub fn is_blank(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Split `text` into lines, assigning each significant token to the line it starts on.
pub fn split_lines(text: &str, tokens: &[Token]) -> Vec<LineView> {
    let mut lines = Vec::new();
    let mut start = 0;
    for (number, line) in text.split('\n').enumerate() {
        lines.push(LineView {
            number: number + 1,
            start,
            end: start + line.len(),
            tokens: Vec::new(),
        });
        start += line.len() + 1;
    }

    let mut current = 0;
    for (index, token) in tokens.iter().enumerate() {
        if token.is_trivia() || token.is(TokenKind::EndOfInput) {
            continue;
        }
        while current + 1 < lines.len() && token.span.start > lines[current].end {
            current += 1;
        }
        lines[current].tokens.push(index);
    }
    lines
}

/// Position (within `indices`) of the token closing the group opened at `open`.
pub fn find_closing(tokens: &[Token], indices: &[usize], open: usize, opener: &str, closer: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (position, &index) in indices.iter().enumerate().skip(open) {
        let token = &tokens[index];
        if token.is_punct(opener) {
            depth += 1;
        } else if token.is_punct(closer) {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(position);
            }
        }
    }
    None
}

/// Source text from the start of token `from` to the end of token `to`.
pub fn slice<'t>(text: &'t str, tokens: &[Token], from: usize, to: usize) -> &'t str {
    &text[tokens[from].span.start..tokens[to].span.end]
}
