/*!
# Lexical Analyzer

Turns source text into a gap-free token stream. String literals and block
comments are single tokens, so later stages can treat their contents as
opaque. Line comments produce no token at all; their span is simply the gap
between two tokens.

Scanning is total: unknown characters become one-character `Unknown` tokens
and unterminated literals run to end of input. Both are reported as
[`LexError`]s alongside the tokens.
*/

mod keywords;
mod token;

pub use keywords::{is_keyword, is_statement_keyword};
pub use token::{Token, TokenKind};

use thiserror::Error;

/// Multi-character operators, checked before their one-character prefixes.
const MULTI_CHAR_OPERATORS: &[&str] = &["==", "!=", "<=", ">=", ":="];

const OPERATOR_CHARS: &str = "+-*/\\%^<>=#&|!~";
const PUNCTUATION_CHARS: &str = "()[]{};,.:";

/// Lexical errors, positioned where scanning of the construct began.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unexpected character {ch:?}")]
    UnexpectedChar { ch: char, line: usize, column: usize },

    #[error("unterminated string literal")]
    UnterminatedString { line: usize, column: usize },

    #[error("unterminated block comment")]
    UnterminatedComment { line: usize, column: usize },
}

impl LexError {
    pub fn position(&self) -> (usize, usize) {
        match self {
            Self::UnexpectedChar { line, column, .. }
            | Self::UnterminatedString { line, column }
            | Self::UnterminatedComment { line, column } => (*line, *column),
        }
    }
}

/// Tokens plus the errors met while producing them.
#[derive(Debug, Clone, Default)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

/// Tokenize `source`, discarding lexical errors.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize().tokens
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> LexOutput {
        while let Some(c) = self.peek() {
            let start = self.pos;
            let (line, column) = (self.line, self.column);

            let (kind, literal) = match c {
                c if c.is_whitespace() => {
                    self.eat_while(char::is_whitespace);
                    (TokenKind::Whitespace, None)
                }
                '/' if self.peek_nth(1) == Some('/') => {
                    // line comment: consumed, no token
                    self.eat_while(|c| c != '\n');
                    continue;
                }
                '/' if self.peek_nth(1) == Some('*') => {
                    self.block_comment(line, column);
                    (TokenKind::Comment, None)
                }
                '"' | '\'' => {
                    let literal = self.string(c, line, column);
                    (TokenKind::String, Some(literal))
                }
                c if c.is_ascii_digit() => {
                    self.number();
                    (TokenKind::Number, Some(self.src[start..self.pos].to_string()))
                }
                c if is_ident_start(c) => {
                    self.bump();
                    self.eat_while(is_ident_continue);
                    if is_keyword(&self.src[start..self.pos]) {
                        (TokenKind::Keyword, None)
                    } else {
                        (TokenKind::Identifier, None)
                    }
                }
                _ => (self.symbol(c, line, column), None),
            };

            self.push(kind, start, line, column, literal);
        }

        let (line, column) = (self.line, self.column);
        self.push(TokenKind::EndOfInput, self.pos, line, column, None);

        LexOutput {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, line: usize, column: usize, literal: Option<String>) {
        self.tokens.push(Token {
            kind,
            text: self.src[start..self.pos].to_string(),
            literal,
            line,
            column,
            span: start..self.pos,
        });
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.bump();
        }
    }

    /// Scan a quoted literal and return its unquoted contents.
    fn string(&mut self, quote: char, line: usize, column: usize) -> String {
        self.bump();
        let content_start = self.pos;
        loop {
            match self.peek() {
                None => {
                    self.errors.push(LexError::UnterminatedString { line, column });
                    return self.src[content_start..].to_string();
                }
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some(c) if c == quote => {
                    let content = self.src[content_start..self.pos].to_string();
                    self.bump();
                    return content;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn block_comment(&mut self, line: usize, column: usize) {
        self.bump();
        self.bump();
        loop {
            match self.peek() {
                None => {
                    self.errors.push(LexError::UnterminatedComment { line, column });
                    return;
                }
                Some('*') if self.peek_nth(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    return;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Digits with at most one decimal point, which must be followed by a digit.
    fn number(&mut self) {
        self.eat_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
        }
    }

    fn symbol(&mut self, c: char, line: usize, column: usize) -> TokenKind {
        if let Some(next) = self.peek_nth(1) {
            let pair: String = [c, next].iter().collect();
            if MULTI_CHAR_OPERATORS.contains(&pair.as_str()) {
                self.bump();
                self.bump();
                return TokenKind::Operator;
            }
        }

        self.bump();
        if OPERATOR_CHARS.contains(c) {
            TokenKind::Operator
        } else if PUNCTUATION_CHARS.contains(c) {
            TokenKind::Punctuation
        } else {
            self.errors.push(LexError::UnexpectedChar { ch: c, line, column });
            TokenKind::Unknown
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
