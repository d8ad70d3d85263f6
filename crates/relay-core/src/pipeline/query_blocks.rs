//! `Begin X … End X` regions (embedded SQL and similar) are opaque to every
//! later pass. They are swapped for a placeholder identifier here and put
//! back as a runtime call after the last pass.

use serde::Serialize;

use super::{split_lines, Edit, Pass, PassContext};
use crate::diagnostics::{Diagnostic, DiagnosticCategory};
use crate::lexer::{Token, TokenKind};
use crate::unit::TranslationUnit;
use crate::CONTEXT_IDENT;

const PLACEHOLDER_PREFIX: &str = "__RELAY_BLOCK_";

/// A protected region awaiting restoration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectedBlock {
    pub placeholder: String,
    /// The `X` of `Begin X`
    pub kind: String,
    /// Lines between the opener and the closer
    pub body: String,
    /// Lines the region spans, opener and closer included
    pub line_span: usize,
    pub start_line: usize,
}

impl ProtectedBlock {
    /// `processContext.executeBlock("X", `…`)` spanning `line_span` lines.
    pub fn render(&self) -> String {
        let kind = serde_json::to_string(&self.kind).unwrap_or_else(|_| format!("\"{}\"", self.kind));
        let literal = match self.line_span {
            0 | 1 => format!("`{}`", escape_template(&self.body)),
            2 => "`\n`".to_string(),
            _ => format!("`\n{}\n`", escape_template(&self.body)),
        };
        format!("{CONTEXT_IDENT}.executeBlock({kind}, {literal})")
    }
}

fn escape_template(body: &str) -> String {
    body.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

pub struct QueryBlockPass;

impl Pass for QueryBlockPass {
    fn name(&self) -> &'static str {
        "query-blocks"
    }

    fn matches(&self, text: &str) -> bool {
        text.to_ascii_lowercase().contains("begin")
    }

    fn transform(
        &self,
        text: &str,
        tokens: &[Token],
        unit: &mut TranslationUnit,
        _ctx: &PassContext<'_>,
    ) -> String {
        let lines = split_lines(text, tokens);
        let mut edits = Vec::new();
        let mut index = 0;

        while index < lines.len() {
            let line = &lines[index];
            let Some(kind) = opener_kind(line.first(tokens), line.nth(tokens, 1)) else {
                index += 1;
                continue;
            };

            let closer = lines[index + 1..]
                .iter()
                .position(|candidate| is_closer(candidate.text(text), &kind))
                .map(|offset| index + 1 + offset);

            let Some(close) = closer else {
                let opener = line.first(tokens).map(|t| (t.line, t.column)).unwrap_or((line.number, 1));
                unit.report(
                    Diagnostic::new(
                        DiagnosticCategory::UnmatchedStructure,
                        format!("Begin {kind} without End {kind}"),
                    )
                    .at(opener.0, opener.1)
                    .with_subject(line.text(text).trim().to_string()),
                );
                index += 1;
                continue;
            };

            let placeholder = format!("{PLACEHOLDER_PREFIX}{}__", unit.blocks.len());
            let body_start = (line.end + 1).min(lines[close].start);
            let body_end = lines[close].start.saturating_sub(1).max(body_start);
            let line_span = close - index + 1;

            let region_start = line.start + line.indent(text).len();
            let region_end = lines[close].end;
            let padding = "\n".repeat(line_span - 1);
            edits.push(Edit::new(region_start..region_end, format!("{placeholder}{padding}")));

            unit.blocks.push(ProtectedBlock {
                placeholder,
                kind,
                body: text[body_start..body_end].to_string(),
                line_span,
                start_line: line.number,
            });
            index = close + 1;
        }

        super::apply_edits(text, edits)
    }
}

fn opener_kind(first: Option<&Token>, second: Option<&Token>) -> Option<String> {
    match (first, second) {
        (Some(begin), Some(kind)) if begin.is_keyword("begin") && kind.is_word() => {
            Some(kind.text.clone())
        }
        _ => None,
    }
}

/// Closers are matched on raw text: the block body may contain quotes the
/// lexer would read as an unterminated string.
fn is_closer(line: &str, kind: &str) -> bool {
    let mut words = line.split_whitespace();
    matches!(
        (words.next(), words.next()),
        (Some(end), Some(name)) if end.eq_ignore_ascii_case("end") && name.eq_ignore_ascii_case(kind)
    )
}

/// Put every protected block back in place of its placeholder and padding.
pub fn restore_blocks(text: &str, blocks: &[ProtectedBlock]) -> String {
    let mut output = text.to_string();
    for block in blocks {
        let Some(at) = find_placeholder(&output, &block.placeholder) else {
            continue;
        };
        let mut end = at + block.placeholder.len();
        for _ in 1..block.line_span {
            if output[end..].starts_with('\n') {
                end += 1;
            }
        }
        output.replace_range(at..end, &block.render());
    }
    output
}

fn find_placeholder(text: &str, placeholder: &str) -> Option<usize> {
    crate::lexer::tokenize(text)
        .into_iter()
        .find(|t| t.is(TokenKind::Identifier) && t.text == placeholder)
        .map(|t| t.span.start)
}
