//! Well-formedness checks on a generated body, run before query blocks are
//! restored. Problems are warnings; the module is still written.

use crate::diagnostics::{Diagnostic, DiagnosticCategory};
use crate::lexer::{Token, TokenKind};

/// Source words that never start a line of generated code.
const SOURCE_LINE_STARTS: &[&str] = &["if", "else", "end", "for", "while", "repeat", "until"];

pub fn validate_body(tokens: &[Token]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    check_balance(tokens, &mut diagnostics);
    check_leftovers(tokens, &mut diagnostics);
    diagnostics
}

/// Report the first delimiter that does not pair up.
fn check_balance(tokens: &[Token], diagnostics: &mut Vec<Diagnostic>) {
    let mut open: Vec<&Token> = Vec::new();
    for token in tokens.iter().filter(|t| t.is(TokenKind::Punctuation)) {
        let expected = match token.text.as_str() {
            "(" | "[" | "{" => {
                open.push(token);
                continue;
            }
            ")" => "(",
            "]" => "[",
            "}" => "{",
            _ => continue,
        };
        match open.pop() {
            Some(opener) if opener.text == expected => {}
            _ => {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCategory::Validation,
                        format!("unbalanced '{}' in generated code", token.text),
                    )
                    .at(token.line, token.column),
                );
                return;
            }
        }
    }
    if let Some(opener) = open.first() {
        diagnostics.push(
            Diagnostic::new(
                DiagnosticCategory::Validation,
                format!("unclosed '{}' in generated code", opener.text),
            )
            .at(opener.line, opener.column),
        );
    }
}

/// Source-only tokens that survived the pipeline.
fn check_leftovers(tokens: &[Token], diagnostics: &mut Vec<Diagnostic>) {
    let mut line_start = true;
    for token in tokens {
        if token.is(TokenKind::Whitespace) {
            line_start |= token.has_newline();
            continue;
        }
        if token.is(TokenKind::Comment) {
            continue;
        }

        if token.is_op(":=") {
            diagnostics.push(
                Diagnostic::new(DiagnosticCategory::Validation, "source assignment operator left in output")
                    .at(token.line, token.column),
            );
        } else if line_start && is_source_line_start(token) {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCategory::Validation,
                    format!("source statement '{}' left in output", token.text),
                )
                .at(token.line, token.column)
                .with_subject(token.text.clone()),
            );
        }
        line_start = false;
    }
}

/// A structural keyword in source spelling: the target only uses lowercase.
fn is_source_line_start(token: &Token) -> bool {
    if token.kind != TokenKind::Keyword {
        return false;
    }
    let lower = token.text.to_ascii_lowercase();
    SOURCE_LINE_STARTS.contains(&lower.as_str())
        && (token.text != lower || matches!(lower.as_str(), "end" | "repeat" | "until"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn test_clean_body() {
        let body = "if ($a) {\n  ALERT(processContext, \"}\")\n} else {\n}\n// End if";
        assert!(validate_body(&tokenize(body)).is_empty());
    }

    #[test]
    fn test_unbalanced_delimiters() {
        let diagnostics = validate_body(&tokenize("if ($a) {\n$b = ($c\n}"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].category, DiagnosticCategory::Validation);
        assert_eq!(diagnostics[0].line, 3);

        let diagnostics = validate_body(&tokenize("while (x) {\n"));
        assert_eq!(diagnostics[0].message, "unclosed '{' in generated code");
    }

    #[test]
    fn test_leftover_source_tokens() {
        let diagnostics = validate_body(&tokenize("If ($a)\n$b:=1\nEnd if"));
        let lines: Vec<usize> = diagnostics.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }
}
