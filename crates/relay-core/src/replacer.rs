/*!
# Context-Aware Replacer

Token-exact substitution that uses the token stream as a mask. Only
identifier, keyword and operator tokens are candidates. Strings, comments
and the gaps left by line comments are copied byte for byte.

```rust
use relay_core::replace;

let out = replace("If (OK=1) ALERT:C41(\"OK\")", "OK", "processContext.OK");
assert_eq!(out, "If (processContext.OK=1) ALERT:C41(\"OK\")");
```
*/

use crate::lexer::{tokenize, Token, TokenKind};

/// Replace every identifier/keyword/operator token whose text is `pattern`.
pub fn replace(source: &str, pattern: &str, replacement: &str) -> String {
    Replacer::new().rule(pattern, replacement).apply(source)
}

/// A table of token substitutions applied in one walk.
///
/// Each token is rewritten at most once, so rules whose outputs overlap other
/// rules' patterns (`:=` → `=` next to `=` → `===`) do not cascade.
#[derive(Debug, Clone, Default)]
pub struct Replacer {
    rules: Vec<(String, String)>,
    skip_member_access: bool,
}

impl Replacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.rules.push((pattern.into(), replacement.into()));
        self
    }

    /// Leave tokens directly after a `.` alone (`obj.OK` is a property).
    pub fn skip_member_access(mut self, skip: bool) -> Self {
        self.skip_member_access = skip;
        self
    }

    pub fn apply(&self, source: &str) -> String {
        self.apply_tokens(source, &tokenize(source))
    }

    /// Apply against an existing token stream of `source`.
    pub fn apply_tokens(&self, source: &str, tokens: &[Token]) -> String {
        let mut output = String::with_capacity(source.len());
        let mut cursor = 0;
        let mut previous: Option<&Token> = None;

        for token in tokens {
            // gap = line comment, copied verbatim
            output.push_str(&source[cursor..token.span.start]);
            cursor = token.span.end;

            let after_dot = previous.is_some_and(|p| p.is_punct(".") && p.span.end == token.span.start);
            let replacement = if self.is_candidate(token) && !(self.skip_member_access && after_dot) {
                self.rules
                    .iter()
                    .find(|(pattern, _)| *pattern == token.text)
                    .map(|(_, replacement)| replacement.as_str())
            } else {
                None
            };
            output.push_str(replacement.unwrap_or(&token.text));

            if !token.is_trivia() {
                previous = Some(token);
            }
        }
        output.push_str(&source[cursor..]);
        output
    }

    fn is_candidate(&self, token: &Token) -> bool {
        matches!(
            token.kind,
            TokenKind::Identifier | TokenKind::Keyword | TokenKind::Operator
        )
    }
}
