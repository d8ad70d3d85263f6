//! Target-legal identifiers for command and method names.
//!
//! The mapping is deterministic but not injective: `ALL RECORDS` and
//! `ALL_RECORDS` share an identifier. The registry and the import resolver
//! report such collisions instead of renaming anything.

/// Target reserved words a method name must not shadow.
const RESERVED: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "import", "in", "instanceof", "let", "new", "null", "return", "super", "switch",
    "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Command identifier: uppercase, non-alphanumerics to `_`, leading digit escaped.
pub fn generated_identifier(name: &str) -> String {
    sanitize(name, true)
}

/// Method identifier: case kept, otherwise like [`generated_identifier`].
pub fn method_identifier(name: &str) -> String {
    let mut ident = sanitize(name, false);
    if RESERVED.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

fn sanitize(name: &str, upper: bool) -> String {
    let mut ident: String = name
        .trim()
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() && upper => c.to_ascii_uppercase(),
            c if c.is_ascii_alphanumeric() => c,
            _ => '_',
        })
        .collect();

    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_identifiers() {
        assert_eq!(generated_identifier("ALL RECORDS"), "ALL_RECORDS");
        assert_eq!(generated_identifier("Find in array"), "FIND_IN_ARRAY");
        assert_eq!(generated_identifier("  Current date "), "CURRENT_DATE");
        assert_eq!(generated_identifier("OB SET-ARRAY"), "OB_SET_ARRAY");
        assert_eq!(generated_identifier("4D Version"), "_4D_VERSION");
        assert_eq!(generated_identifier(""), "_");
    }

    #[test]
    fn test_non_ascii_becomes_underscore() {
        assert_eq!(generated_identifier("Créer"), "CR_ER");
    }

    #[test]
    fn test_method_identifiers_keep_case() {
        assert_eq!(method_identifier("Util Format Date"), "Util_Format_Date");
        assert_eq!(method_identifier("1stRun"), "_1stRun");
        assert_eq!(method_identifier("delete"), "delete_");
    }

    #[test]
    fn test_known_collision() {
        assert_eq!(generated_identifier("ALL RECORDS"), generated_identifier("all_records"));
    }
}
