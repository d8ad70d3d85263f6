//! Command and method calls resolved against the registry.
//!
//! A call name is a run of words on one line separated only by blanks, so
//! `Records in selection:C76([People])` names a three-word command. A
//! trailing `:Cnnn` tag marks a command; untagged runs are matched against
//! sibling methods and registered commands, longest suffix first, with the
//! method winning a tie.
//!
//! Every resolved call receives the process context as its first argument,
//! and the `;` separators of its argument list become `,`.

use std::collections::HashSet;

use super::declarations::is_command_tag;
use super::{apply_edits, Edit, Pass, PassContext};
use crate::codegen::ModuleRef;
use crate::diagnostics::{Diagnostic, DiagnosticCategory};
use crate::lexer::{is_statement_keyword, Token, TokenKind};
use crate::registry::{CommandCategory, CommandDescriptor, InlineForm};
use crate::unit::TranslationUnit;
use crate::CONTEXT_IDENT;

/// Target globals that are called directly and never resolved.
const TARGET_GLOBALS: &[&str] = &[
    "Math", "Date", "String", "Number", "Boolean", "Array", "Object", "JSON", "parseInt",
    "parseFloat", "isNaN", CONTEXT_IDENT,
];

/// What a resolved name turns into
enum Callee {
    /// `name(processContext, …)`
    Call(String),
    /// `f(…)` without the process context
    Function(&'static str),
    /// A whole expression replacing the call
    Constant(&'static str),
}

pub struct CallPass;

impl Pass for CallPass {
    fn name(&self) -> &'static str {
        "calls"
    }

    fn transform(
        &self,
        text: &str,
        tokens: &[Token],
        unit: &mut TranslationUnit,
        ctx: &PassContext<'_>,
    ) -> String {
        let significant: Vec<usize> = (0..tokens.len())
            .filter(|&i| !tokens[i].is_trivia() && !tokens[i].is(TokenKind::EndOfInput))
            .collect();
        let mut scan = CallScan {
            text,
            tokens,
            significant: &significant,
            edits: Vec::new(),
            call_parens: HashSet::new(),
            plain_parens: HashSet::new(),
        };

        let mut parens: Vec<bool> = Vec::new();
        let mut position = 0;
        while position < significant.len() {
            let index = significant[position];
            let token = &tokens[index];

            if token.is_punct("(") {
                let after_identifier = position > 0 && tokens[significant[position - 1]].is(TokenKind::Identifier);
                parens.push(
                    scan.call_parens.contains(&index) || (after_identifier && !scan.plain_parens.contains(&index)),
                );
            } else if token.is_punct(")") {
                parens.pop();
            } else if token.is_punct(";") && parens.last() == Some(&true) {
                scan.edits.push(Edit::new(token.span.clone(), ","));
            } else if token.is_word() {
                position = scan.call_at(position, unit, ctx);
                continue;
            }
            position += 1;
        }

        apply_edits(text, scan.edits)
    }
}

struct CallScan<'s> {
    text: &'s str,
    tokens: &'s [Token],
    significant: &'s [usize],
    edits: Vec<Edit>,
    /// Parens opened by a rewritten call
    call_parens: HashSet<usize>,
    /// Parens of calls left as written
    plain_parens: HashSet<usize>,
}

impl<'s> CallScan<'s> {
    fn token(&self, position: usize) -> Option<&'s Token> {
        self.significant.get(position).map(|&i| &self.tokens[i])
    }

    /// Handle the word run starting at `start`; returns the position to resume at.
    fn call_at(&mut self, start: usize, unit: &mut TranslationUnit, ctx: &PassContext<'_>) -> usize {
        let Some(first) = self.token(start) else {
            return start + 1;
        };
        if first.text.starts_with('$') {
            return start + 1;
        }
        if start > 0 && self.token(start - 1).is_some_and(|t| t.is_punct(".")) {
            return start + 1;
        }
        if first.is_keyword("new") {
            return start + 2;
        }

        let words = self.word_run(start);
        let last = start + words.len() - 1;

        if let Some(tag) = self.tag_after(last) {
            self.tagged_call(start, last, tag, unit, ctx);
            return tag + 1;
        }
        self.untagged_call(start, last, unit, ctx);
        last + 1
    }

    /// Positions of consecutive words from `start`, joined by blanks on one line.
    fn word_run(&self, start: usize) -> Vec<usize> {
        let mut run = vec![start];
        let mut position = start + 1;
        while let (Some(previous), Some(token)) = (self.token(position - 1), self.token(position)) {
            let gap = &self.text[previous.span.end..token.span.start];
            let blank = !gap.is_empty() && gap.chars().all(|c| c == ' ' || c == '\t');
            if !token.is_word() || token.text.starts_with('$') || !blank {
                break;
            }
            run.push(position);
            position += 1;
        }
        run
    }

    /// Position of a `Cnnn` tag glued as `:Cnnn` to the word at `last`.
    fn tag_after(&self, last: usize) -> Option<usize> {
        let word = self.token(last)?;
        let colon = self.token(last + 1)?;
        let tag = self.token(last + 2)?;
        let glued = word.span.end == colon.span.start && colon.span.end == tag.span.start;
        (glued && colon.is_punct(":") && tag.is(TokenKind::Identifier) && is_command_tag(&tag.text))
            .then_some(last + 2)
    }

    fn name(&self, from: usize, to: usize) -> String {
        (from..=to)
            .filter_map(|p| self.token(p))
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn tagged_call(&mut self, start: usize, last: usize, tag: usize, unit: &mut TranslationUnit, ctx: &PassContext<'_>) {
        let mut first = start;
        while first < last && self.token(first).is_some_and(|t| is_statement_keyword(&t.text)) {
            first += 1;
        }

        let longest = first.max((last + 1).saturating_sub(ctx.registry.max_words().max(1)));
        for from in longest..=last {
            if let Some(command) = ctx.registry.lookup(&self.name(from, last)) {
                let callee = self.command_callee(command, from, unit, ctx);
                self.emit(from, tag, callee);
                return;
            }
        }

        let name = self.name(first, last);
        let Some(anchor) = self.token(first) else {
            return;
        };
        let diagnostic = Diagnostic::new(
            DiagnosticCategory::UnresolvedCommand,
            format!("unknown command '{name}'"),
        )
        .at(anchor.line, anchor.column)
        .with_subject(name);

        let stand_in = ctx.recover(&diagnostic);
        match &stand_in {
            Some(callee) => self.emit(first, tag, Callee::Call(callee.clone())),
            None => self.leave_as_written(tag),
        }
        unit.report(diagnostic.recovered_with(stand_in));
    }

    fn untagged_call(&mut self, start: usize, last: usize, unit: &mut TranslationUnit, ctx: &PassContext<'_>) {
        let opens_paren = self.token(last + 1).is_some_and(|t| t.is_punct("("));

        let limit = ctx.registry.max_words().max(ctx.methods.max_words()).max(1);
        for from in start.max((last + 1).saturating_sub(limit))..=last {
            if (from..=last).all(|p| self.token(p).is_some_and(|t| t.is(TokenKind::Keyword))) {
                continue;
            }
            let name = self.name(from, last);

            // A bare method name is a call with no arguments wherever it appears.
            if let Some(method) = ctx.methods.lookup(&name) {
                unit.resolved_methods
                    .insert(ModuleRef::method(method, &unit.source.output_path));
                self.emit(from, last, Callee::Call(method.identifier.clone()));
                return;
            }
            if let Some(command) = ctx.registry.lookup(&name) {
                let constant = matches!(command.inline, Some(InlineForm::Constant(_)));
                if opens_paren || constant {
                    let callee = self.command_callee(command, from, unit, ctx);
                    self.emit(from, last, callee);
                    return;
                }
            }
        }

        let Some(word) = self.token(last) else {
            return;
        };
        if opens_paren && word.is(TokenKind::Identifier) && !TARGET_GLOBALS.contains(&word.text.as_str()) {
            let name = self.name(start, last);
            unit.report(
                Diagnostic::new(
                    DiagnosticCategory::UnresolvedMethod,
                    format!("no command or method named '{name}'"),
                )
                .at(word.line, word.column)
                .with_subject(name),
            );
            self.leave_as_written(last);
        }
    }

    /// Record the use of `command` and pick its callee.
    fn command_callee(
        &self,
        command: &CommandDescriptor,
        from: usize,
        unit: &mut TranslationUnit,
        ctx: &PassContext<'_>,
    ) -> Callee {
        unit.usage.record_usage(&command.canonical_name);

        let flagged = match command.category {
            CommandCategory::Placeholder => Some((DiagnosticCategory::PlaceholderCommand, "is not implemented yet")),
            CommandCategory::Deprecated => Some((DiagnosticCategory::DeprecatedCommand, "is deprecated")),
            _ => None,
        };
        if let (Some((category, what)), Some(anchor)) = (flagged, self.token(from)) {
            unit.report(
                Diagnostic::new(category, format!("command '{}' {what}", command.canonical_name))
                    .at(anchor.line, anchor.column)
                    .with_subject(command.canonical_name.clone()),
            );
        }

        if command.category.is_imported() {
            if let Some(reference) = ModuleRef::command(command, ctx.config, &unit.source.output_path) {
                unit.resolved_commands.insert(reference);
            }
        }

        match (command.category, command.inline) {
            (CommandCategory::SimpleInline, Some(InlineForm::Constant(expr))) => Callee::Constant(expr),
            (CommandCategory::SimpleInline, Some(InlineForm::Function(function))) => Callee::Function(function),
            (CommandCategory::RuntimeOnly, _) => {
                Callee::Call(format!("{CONTEXT_IDENT}.runtime.{}", command.generated_identifier))
            }
            _ => Callee::Call(command.generated_identifier.clone()),
        }
    }

    /// Rewrite the name spanning `from..=head`, plus its argument list opener.
    fn emit(&mut self, from: usize, head: usize, callee: Callee) {
        let (Some(first), Some(head_token)) = (self.token(from), self.token(head)) else {
            return;
        };
        let name_start = first.span.start;
        let open = self
            .token(head + 1)
            .filter(|t| t.is_punct("(") && t.line == head_token.line)
            .map(|t| (head + 1, t));
        let empty = open.is_some() && self.token(head + 2).is_some_and(|t| t.is_punct(")"));

        match (callee, open) {
            (Callee::Call(name), Some((position, paren))) => {
                let separator = if empty { "" } else { ", " };
                self.edits.push(Edit::new(
                    name_start..paren.span.end,
                    format!("{name}({CONTEXT_IDENT}{separator}"),
                ));
                self.call_parens.insert(self.significant[position]);
            }
            (Callee::Call(name), None) => {
                self.edits.push(Edit::new(
                    name_start..head_token.span.end,
                    format!("{name}({CONTEXT_IDENT})"),
                ));
            }
            (Callee::Function(function), Some((position, _))) => {
                self.edits.push(Edit::new(name_start..head_token.span.end, function));
                self.call_parens.insert(self.significant[position]);
            }
            (Callee::Function(function), None) => {
                self.edits.push(Edit::new(name_start..head_token.span.end, format!("{function}()")));
            }
            (Callee::Constant(expr), Some(_)) if empty => {
                let end = self.token(head + 2).map_or(head_token.span.end, |close| close.span.end);
                self.edits.push(Edit::new(name_start..end, expr));
            }
            (Callee::Constant(expr), _) => {
                self.edits.push(Edit::new(name_start..head_token.span.end, expr));
            }
        }
    }

    fn leave_as_written(&mut self, head: usize) {
        if self.token(head + 1).is_some_and(|t| t.is_punct("(")) {
            self.plain_parens.insert(self.significant[head + 1]);
        }
    }
}
