//! Typed declarations lowered to `let` bindings with zero values.
//!
//! Three source forms are recognized, each on a line of its own:
//!
//! - `C_LONGINT($a; $b)`, optionally tagged `C_LONGINT:C283($a; $b)`
//! - `ARRAY TEXT($names; 0)`
//! - `var $a; $b : Integer`
//!
//! Positional parameters (`$1` up to the configured count) are already
//! function parameters and are never declared again. Neither is a name the
//! unit has declared before.

use super::{find_closing, slice, split_lines, LineView, Pass, PassContext};
use crate::lexer::{Token, TokenKind};
use crate::unit::TranslationUnit;

/// Zero value for a declared type name (`LONGINT`, `C_TEXT`, `Collection`...).
pub fn zero_value(type_name: &str) -> &'static str {
    let lower = type_name.trim().to_ascii_lowercase();
    let name = lower.strip_prefix("c_").unwrap_or(&lower);
    match name {
        "text" | "string" | "alpha" => "\"\"",
        "longint" | "integer" | "real" | "number" => "0",
        "boolean" => "false",
        "date" | "time" => "new Date()",
        "pointer" => "null",
        "object" => "{}",
        "collection" | "array" => "[]",
        _ => "null",
    }
}

/// `$n` with `1 <= n <= count`
fn is_parameter(name: &str, count: usize) -> bool {
    name.strip_prefix('$')
        .and_then(|digits| digits.parse::<usize>().ok())
        .is_some_and(|n| n >= 1 && n <= count)
}

enum Declaration {
    /// `let` bindings, one zero value per name
    Typed { names: Vec<String>, zero: String },
    /// A one-dimensional array; plain assignment when already declared
    Array { name: String },
}

pub struct DeclarationPass;

impl Pass for DeclarationPass {
    fn name(&self) -> &'static str {
        "declarations"
    }

    fn transform(
        &self,
        text: &str,
        tokens: &[Token],
        unit: &mut TranslationUnit,
        ctx: &PassContext<'_>,
    ) -> String {
        let parameters = ctx.config.parameter_count;
        split_lines(text, tokens)
            .iter()
            .map(|line| {
                let original = line.text(text);
                let Some(declaration) = parse(text, tokens, line) else {
                    return original.to_string();
                };
                let lowered = match declaration {
                    Declaration::Typed { names, zero } => {
                        let bindings: Vec<String> = names
                            .into_iter()
                            .filter(|name| !is_parameter(name, parameters))
                            .filter(|name| unit.declared.insert(name.clone()))
                            .map(|name| format!("{name} = {zero}"))
                            .collect();
                        if bindings.is_empty() {
                            String::new()
                        } else {
                            format!("let {};", bindings.join(", "))
                        }
                    }
                    Declaration::Array { name } => {
                        if unit.declared.insert(name.clone()) {
                            format!("let {name} = [];")
                        } else {
                            format!("{name} = [];")
                        }
                    }
                };
                format!("{}{lowered}{}", line.indent(text), line.trailer(text, tokens))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn parse(text: &str, tokens: &[Token], line: &LineView) -> Option<Declaration> {
    let first = line.first(tokens)?;
    if first.is_keyword("var") {
        return parse_var(text, tokens, line);
    }
    if !first.is(TokenKind::Identifier) {
        return None;
    }

    if first.text.eq_ignore_ascii_case("array") {
        let type_token = line.nth(tokens, 1)?;
        if !type_token.is_word() {
            return None;
        }
        let arguments = call_arguments(text, tokens, line, skip_tag(tokens, line, 2))?;
        let name = arguments.first().filter(|name| is_name(name))?.clone();
        return Some(Declaration::Array { name });
    }

    let upper = first.text.to_ascii_uppercase();
    if upper.len() > 2 && upper.starts_with("C_") {
        let arguments = call_arguments(text, tokens, line, skip_tag(tokens, line, 1))?;
        let names = arguments.into_iter().filter(|name| is_name(name)).collect();
        return Some(Declaration::Typed {
            names,
            zero: zero_value(&first.text).to_string(),
        });
    }
    None
}

/// `var a; b : Type [= init]`
fn parse_var(text: &str, tokens: &[Token], line: &LineView) -> Option<Declaration> {
    let ids = &line.tokens[1..];
    let colon = ids.iter().position(|&i| tokens[i].is_punct(":"));
    let assign = ids.iter().position(|&i| tokens[i].is_op("="));
    let names_end = colon.or(assign).unwrap_or(ids.len());

    let mut names = Vec::new();
    for chunk in ids[..names_end].split(|&i| tokens[i].is_punct(";")) {
        match chunk {
            [single] if tokens[*single].is(TokenKind::Identifier) => names.push(tokens[*single].text.clone()),
            _ => return None,
        }
    }

    let zero = match (colon, assign) {
        (_, Some(at)) if at + 1 < ids.len() => slice(text, tokens, ids[at + 1], ids[ids.len() - 1])
            .trim()
            .to_string(),
        (_, Some(_)) => return None,
        (Some(at), None) if at + 1 < ids.len() => {
            zero_value(slice(text, tokens, ids[at + 1], ids[ids.len() - 1])).to_string()
        }
        _ => "null".to_string(),
    };
    Some(Declaration::Typed { names, zero })
}

/// Position after an optional `:Cnnn` tag glued to the token before `at`.
fn skip_tag(tokens: &[Token], line: &LineView, at: usize) -> usize {
    match (line.nth(tokens, at), line.nth(tokens, at + 1)) {
        (Some(colon), Some(tag)) if colon.is_punct(":") && is_command_tag(&tag.text) => at + 2,
        _ => at,
    }
}

pub(crate) fn is_command_tag(text: &str) -> bool {
    text.len() > 1
        && text.starts_with(['C', 'c'])
        && text[1..].chars().all(|c| c.is_ascii_digit())
}

/// Top-level `;`-separated arguments of a parenthesized list ending the line.
fn call_arguments(text: &str, tokens: &[Token], line: &LineView, open: usize) -> Option<Vec<String>> {
    let ids = &line.tokens;
    if !line.nth(tokens, open)?.is_punct("(") {
        return None;
    }
    let close = find_closing(tokens, ids, open, "(", ")")?;
    if close != ids.len() - 1 {
        return None;
    }

    let mut arguments = Vec::new();
    let mut depth = 0usize;
    let mut start = open + 1;
    for position in open + 1..close {
        let token = &tokens[ids[position]];
        if token.is_punct("(") {
            depth += 1;
        } else if token.is_punct(")") {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_punct(";") {
            arguments.push(argument_text(text, tokens, &ids[start..position]));
            start = position + 1;
        }
    }
    if start < close {
        arguments.push(argument_text(text, tokens, &ids[start..close]));
    }
    Some(arguments)
}

fn argument_text(text: &str, tokens: &[Token], ids: &[usize]) -> String {
    match (ids.first(), ids.last()) {
        (Some(&first), Some(&last)) => slice(text, tokens, first, last).trim().to_string(),
        _ => String::new(),
    }
}

fn is_name(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::MethodIndex;
    use crate::diagnostics::Recovery;
    use crate::registry::CommandRegistry;
    use crate::unit::SourceFile;
    use crate::TranspileConfig;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> (String, TranslationUnit) {
        let registry = CommandRegistry::default();
        let methods = MethodIndex::default();
        let recovery = Recovery::standard();
        let config = TranspileConfig::default();
        let ctx = PassContext::new(&registry, &methods, &recovery, &config);
        let mut unit = TranslationUnit::new(SourceFile::from_relative("D.4dm", "js"), src);
        let tokens = unit.tokens.clone();
        let out = DeclarationPass.transform(src, &tokens, &mut unit, &ctx);
        (out, unit)
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(zero_value("C_TEXT"), "\"\"");
        assert_eq!(zero_value("LONGINT"), "0");
        assert_eq!(zero_value("c_real"), "0");
        assert_eq!(zero_value("C_BOOLEAN"), "false");
        assert_eq!(zero_value("C_DATE"), "new Date()");
        assert_eq!(zero_value("Time"), "new Date()");
        assert_eq!(zero_value("C_POINTER"), "null");
        assert_eq!(zero_value("C_OBJECT"), "{}");
        assert_eq!(zero_value("Collection"), "[]");
        assert_eq!(zero_value("C_BLOB"), "null");
    }

    #[test]
    fn test_macro_declarations() {
        let (out, unit) = run("C_LONGINT($i;$j)\n  C_TEXT:C284($name) // who");
        assert_eq!(out, "let $i = 0, $j = 0;\n  let $name = \"\"; // who");
        assert!(unit.declared.contains("$name"));
    }

    #[test]
    fn test_parameters_and_repeats_skipped() {
        let (out, _) = run("C_TEXT($1;$2)\nC_LONGINT($0;$i)\nC_LONGINT($i)\nC_TEXT($11)");
        assert_eq!(out, "\nlet $0 = 0, $i = 0;\n\nlet $11 = \"\";");
    }

    #[test]
    fn test_arrays() {
        let (out, _) = run("ARRAY TEXT($names;0)\nARRAY LONGINT:C221($ids;10)\nARRAY TEXT($names;5)");
        assert_eq!(out, "let $names = [];\nlet $ids = [];\n$names = [];");
    }

    #[test]
    fn test_var_forms() {
        let (out, _) = run("var $a; $b : Integer\nvar $c : Collection\nvar $d : Text = \"x\"\nvar $e");
        assert_eq!(
            out,
            "let $a = 0, $b = 0;\nlet $c = [];\nlet $d = \"x\";\nlet $e = null;"
        );
    }

    #[test]
    fn test_non_declarations_untouched() {
        let src = "$a=C_helper\nALERT:C41(\"C_TEXT($x)\")\nC_LONGINT($a) + 1";
        assert_eq!(run(src).0, src);
    }
}
