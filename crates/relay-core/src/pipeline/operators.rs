//! Operator, literal and variable-reference normalization.
//!
//! Structural references are rewritten first (`<>name`, `[Table]Field`),
//! then a single [`Replacer`] walk maps operator and literal tokens.

use super::{apply_edits, Edit, Pass, PassContext};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::replacer::Replacer;
use crate::unit::TranslationUnit;
use crate::CONTEXT_IDENT;

/// Process-wide variables the runtime context owns
pub const SYSTEM_VARIABLES: &[&str] = &["OK", "Document", "Error"];

pub struct OperatorPass {
    replacer: Replacer,
}

impl OperatorPass {
    pub fn new() -> Self {
        let mut replacer = Replacer::new()
            .rule(":=", "=")
            .rule("=", "===")
            .rule("#", "!==")
            .rule("&", "&&")
            .rule("|", "||")
            .rule("^", "**")
            .rule("True", "true")
            .rule("False", "false")
            .rule("Null", "null")
            .skip_member_access(true);
        for name in SYSTEM_VARIABLES {
            replacer = replacer.rule(*name, format!("{CONTEXT_IDENT}.{name}"));
        }
        Self { replacer }
    }
}

impl Default for OperatorPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for OperatorPass {
    fn name(&self) -> &'static str {
        "operators"
    }

    fn transform(
        &self,
        text: &str,
        tokens: &[Token],
        _unit: &mut TranslationUnit,
        _ctx: &PassContext<'_>,
    ) -> String {
        let edits = reference_edits(text, tokens);
        if edits.is_empty() {
            return self.replacer.apply_tokens(text, tokens);
        }
        let rewritten = apply_edits(text, edits);
        self.replacer.apply_tokens(&rewritten, &tokenize(&rewritten))
    }
}

/// Edits for interprocess variables and table/field references.
fn reference_edits(text: &str, tokens: &[Token]) -> Vec<Edit> {
    let mut edits = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];

        // <>name
        if token.is_op("<") {
            if let (Some(gt), Some(name)) = (tokens.get(i + 1), tokens.get(i + 2)) {
                if gt.is_op(">")
                    && name.is_word()
                    && token.span.end == gt.span.start
                    && gt.span.end == name.span.start
                {
                    edits.push(Edit::new(
                        token.span.start..name.span.end,
                        format!("{CONTEXT_IDENT}.interprocess.{}", name.text),
                    ));
                    i += 3;
                    continue;
                }
            }
        }

        // [Table] and [Table]Field
        if token.is_punct("[") && !follows_value(tokens, i) {
            if let Some((close, table)) = table_name(text, tokens, i) {
                let mut end = tokens[close].span.end;
                let mut reference = table_reference(&table);
                let mut next = close + 1;
                if let Some(field) = tokens.get(close + 1) {
                    if field.is(TokenKind::Identifier) && field.span.start == end {
                        reference.push('.');
                        reference.push_str(&field.text);
                        end = field.span.end;
                        next += 1;
                    }
                }
                edits.push(Edit::new(token.span.start..end, reference));
                i = next;
                continue;
            }
        }

        i += 1;
    }
    edits
}

/// Whether the `[` at `open` indexes a value written before it on the same line.
fn follows_value(tokens: &[Token], open: usize) -> bool {
    let previous = tokens[..open]
        .iter()
        .rev()
        .find(|t| !(t.is(TokenKind::Whitespace) && !t.has_newline()));
    previous.is_some_and(|t| match t.kind {
        TokenKind::Identifier | TokenKind::Number | TokenKind::String => true,
        TokenKind::Punctuation => matches!(t.text.as_str(), "]" | ")" | "}"),
        _ => false,
    })
}

/// `[` at `open` followed by words on one line and `]`: the table name.
fn table_name(text: &str, tokens: &[Token], open: usize) -> Option<(usize, String)> {
    let mut saw_word = false;
    for (index, token) in tokens.iter().enumerate().skip(open + 1) {
        match token.kind {
            TokenKind::Identifier | TokenKind::Keyword | TokenKind::Number => saw_word = true,
            TokenKind::Whitespace if !token.has_newline() => {}
            TokenKind::Punctuation if token.text == "]" && saw_word => {
                let name = text[tokens[open].span.end..token.span.start].trim().to_string();
                return Some((index, name));
            }
            _ => return None,
        }
    }
    None
}

fn table_reference(table: &str) -> String {
    let plain = table
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && table.chars().all(|c| c.is_alphanumeric() || c == '_');
    if plain {
        format!("{CONTEXT_IDENT}.db.{table}")
    } else {
        let quoted = serde_json::to_string(table).unwrap_or_else(|_| format!("\"{table}\""));
        format!("{CONTEXT_IDENT}.db[{quoted}]")
    }
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

    fn run(src: &str) -> String {
        let registry = CommandRegistry::default();
        let methods = MethodIndex::default();
        let recovery = Recovery::standard();
        let config = TranspileConfig::default();
        let ctx = PassContext::new(&registry, &methods, &recovery, &config);
        let mut unit = TranslationUnit::new(SourceFile::from_relative("O.4dm", "js"), src);
        let tokens = unit.tokens.clone();
        OperatorPass::new().transform(src, &tokens, &mut unit, &ctx)
    }

    #[test]
    fn test_operators() {
        assert_eq!(run("$a:=($b=1) & ($c#2) | $d^2"), "$a=($b===1) && ($c!==2) || $d**2");
    }

    #[test]
    fn test_comparisons_untouched() {
        assert_eq!(run("$a:=$b<=$c"), "$a=$b<=$c");
    }

    #[test]
    fn test_literals_and_system_variables() {
        assert_eq!(
            run("If (OK=1)\n$done:=True\n$p:=Null\n$x:=$obj.OK"),
            "If (processContext.OK===1)\n$done=true\n$p=null\n$x=$obj.OK"
        );
    }

    #[test]
    fn test_quoted_system_variable_kept() {
        assert_eq!(run("ALERT:C41(\"OK\")"), "ALERT:C41(\"OK\")");
    }

    #[test]
    fn test_interprocess_variable() {
        assert_eq!(run("<>gCount:=<>gCount+1"), "processContext.interprocess.gCount=processContext.interprocess.gCount+1");
    }

    #[test]
    fn test_table_and_field_references() {
        assert_eq!(
            run("ALL RECORDS:C47([Customers])\n$n:=[Customers]Name"),
            "ALL RECORDS:C47(processContext.db.Customers)\n$n=processContext.db.Customers.Name"
        );
        assert_eq!(
            run("$v:=[Sales Lines]Total"),
            "$v=processContext.db[\"Sales Lines\"].Total"
        );
    }

    #[test]
    fn test_element_access_is_not_a_table() {
        assert_eq!(
            run("$v:=$col[$i]\n$z:=$col[1]\n$k:=$obj[\"k\"]\n$m:=$rows[$i][2]"),
            "$v=$col[$i]\n$z=$col[1]\n$k=$obj[\"k\"]\n$m=$rows[$i][2]"
        );
        assert_eq!(run("$w:=Split($s)[1]"), "$w=Split($s)[1]");
    }

    #[test]
    fn test_table_at_line_start_after_value() {
        assert_eq!(
            run("$a:=$b\n[Customers]Name:=\"x\""),
            "$a=$b\nprocessContext.db.Customers.Name=\"x\""
        );
    }

    #[test]
    fn test_ok_field_is_member_access() {
        assert_eq!(run("$v:=[Log]OK"), "$v=processContext.db.Log.OK");
    }
}
