//! Keyword table shared by source and generated text.
//!
//! The pipeline re-tokenizes its own output, so the table holds both the
//! source language's structural words and the target's reserved words.
//! Matching is ASCII case-insensitive.

const KEYWORDS: &[&str] = &[
    // source language
    "begin", "break", "case", "continue", "else", "end", "false", "for", "function", "if", "null",
    "of", "repeat", "return", "step", "this", "to", "true", "until", "var", "while",
    // target language
    "async", "await", "catch", "class", "const", "default", "delete", "do", "export", "finally",
    "from", "import", "in", "instanceof", "let", "new", "switch", "throw", "try", "typeof",
    "void", "yield",
];

/// Words that open a statement and can never start a command name.
const STATEMENT_KEYWORDS: &[&str] = &[
    "await", "case", "const", "do", "else", "for", "if", "let", "new", "return", "throw",
    "typeof", "until", "var", "void", "while",
];

pub fn is_keyword(word: &str) -> bool {
    word.is_ascii() && KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

pub fn is_statement_keyword(word: &str) -> bool {
    STATEMENT_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_ignore_case() {
        assert!(is_keyword("If"));
        assert!(is_keyword("END"));
        assert!(is_keyword("let"));
        assert!(!is_keyword("ALERT"));
        assert!(!is_keyword("$if"));
    }

    #[test]
    fn test_statement_keywords_are_keywords() {
        for word in STATEMENT_KEYWORDS {
            assert!(is_keyword(word), "{word} missing from keyword table");
        }
    }
}
