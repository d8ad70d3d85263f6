use std::ops::Range;

use serde::Serialize;

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    /// Quoted string (`"..."` or `'...'`).
    String,
    /// Block comment (`/* ... */`). Line comments produce no token.
    Comment,
    /// Integer or decimal literal.
    Number,
    Identifier,
    Keyword,
    Operator,
    Punctuation,
    /// Spaces, tabs and newlines between tokens.
    Whitespace,
    /// A single character the lexer could not classify.
    Unknown,
    EndOfInput,
}

/// A single token with its kind, text, and source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// String contents without quotes, or the digits of a number.
    pub literal: Option<String>,
    /// 1-based line of the first character.
    pub line: usize,
    /// 1-based column of the first character.
    pub column: usize,
    /// Byte range in the scanned text.
    pub span: Range<usize>,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Whitespace and comments: never part of a construct.
    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text.eq_ignore_ascii_case(word)
    }

    pub fn is_punct(&self, text: &str) -> bool {
        self.kind == TokenKind::Punctuation && self.text == text
    }

    pub fn is_op(&self, text: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == text
    }

    /// Identifier or keyword: anything that can be a word of a command name.
    pub fn is_word(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::Keyword)
    }

    pub fn has_newline(&self) -> bool {
        self.text.contains('\n')
    }
}
