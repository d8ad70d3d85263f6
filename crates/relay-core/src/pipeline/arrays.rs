//! One-based `name{n}` element access to zero-based `name[n-1]`.
//!
//! A `{` is an index only when glued to an identifier or to the `}` of a
//! preceding index (`$grid{2}{3}`). Braces anywhere else belong to blocks
//! written by earlier passes.

use std::collections::HashSet;

use super::{apply_edits, Edit, Pass, PassContext};
use crate::diagnostics::{Diagnostic, DiagnosticCategory};
use crate::lexer::{Token, TokenKind};
use crate::unit::TranslationUnit;

pub struct ArrayIndexPass;

impl Pass for ArrayIndexPass {
    fn name(&self) -> &'static str {
        "array-indices"
    }

    fn matches(&self, text: &str) -> bool {
        text.contains('{')
    }

    fn transform(
        &self,
        text: &str,
        tokens: &[Token],
        unit: &mut TranslationUnit,
        _ctx: &PassContext<'_>,
    ) -> String {
        let significant: Vec<usize> = (0..tokens.len())
            .filter(|&i| !tokens[i].is_trivia() && !tokens[i].is(TokenKind::EndOfInput))
            .collect();
        let mut edits = Vec::new();
        let mut index_closers = HashSet::new();

        for (position, &index) in significant.iter().enumerate() {
            let token = &tokens[index];
            if !token.is_punct("{") || position == 0 {
                continue;
            }
            let previous = &tokens[significant[position - 1]];
            let glued = previous.span.end == token.span.start;
            let indexes = glued
                && (previous.is(TokenKind::Identifier) || index_closers.contains(&significant[position - 1]));
            if !indexes {
                continue;
            }

            let Some(close) = matching_brace(tokens, &significant, position) else {
                unit.report(
                    Diagnostic::new(DiagnosticCategory::UnmatchedStructure, "unclosed array index")
                        .at(token.line, token.column)
                        .with_subject(previous.text.clone()),
                );
                continue;
            };
            index_closers.insert(significant[close]);

            let inner = &significant[position + 1..close];
            match literal_index(tokens, inner) {
                Some(n) if n >= 1 => {
                    let span = token.span.start..tokens[significant[close]].span.end;
                    edits.push(Edit::new(span, format!("[{}]", n - 1)));
                }
                Some(n) => {
                    unit.report(
                        Diagnostic::new(
                            DiagnosticCategory::InvalidIndex,
                            format!("array index {n} is below the first element"),
                        )
                        .at(token.line, token.column)
                        .with_subject(format!("{}{{{n}}}", previous.text)),
                    );
                }
                None => {
                    edits.push(Edit::new(token.span.clone(), "["));
                    edits.push(Edit::new(tokens[significant[close]].span.clone(), "]"));
                }
            }
        }

        apply_edits(text, edits)
    }
}

fn matching_brace(tokens: &[Token], significant: &[usize], open: usize) -> Option<usize> {
    let line = tokens[significant[open]].line;
    let mut depth = 0usize;
    for (position, &index) in significant.iter().enumerate().skip(open) {
        let token = &tokens[index];
        if token.line != line {
            return None;
        }
        if token.is_punct("{") {
            depth += 1;
        } else if token.is_punct("}") {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(position);
            }
        }
    }
    None
}

/// An integer literal index, optionally negated.
fn literal_index(tokens: &[Token], inner: &[usize]) -> Option<i64> {
    match inner {
        [number] => integer(&tokens[*number]),
        [minus, number] if tokens[*minus].is_op("-") => integer(&tokens[*number]).map(|n| -n),
        _ => None,
    }
}

fn integer(token: &Token) -> Option<i64> {
    if !token.is(TokenKind::Number) || token.text.contains('.') {
        return None;
    }
    token.text.parse().ok()
}
