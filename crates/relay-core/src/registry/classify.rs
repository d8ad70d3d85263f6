/*!
# Command Classification

Pure mapping from a command implementation's name and source text to a
[`CommandCategory`]. Precedence, first match wins:

1. trivial commands (pure math/constant wrappers) → `SimpleInline`
2. `@deprecated` marker → `Deprecated`
3. `@runtime-only` marker → `RuntimeOnly`
4. no exported callable, a body under [`MIN_BODY_LINES`], or a
   not-implemented marker → `Placeholder`
5. otherwise → `Implemented`
*/

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::sanitize::generated_identifier;

/// Code lines (not blank, not comment-only) below which a module is a stub.
pub const MIN_BODY_LINES: usize = 3;

static EXPORTED_CALLABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*export\s+default\b|module\.exports\s*=").expect("valid export pattern")
});

static NOT_IMPLEMENTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)@placeholder\b|not\s+implemented").expect("valid placeholder pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandCategory {
    /// Real implementation, imported and called
    Implemented,
    /// Stub module; imported and called, but each use is flagged
    Placeholder,
    /// Provided by the runtime object, no import
    RuntimeOnly,
    /// Imported and called, each use is flagged
    Deprecated,
    /// Emitted as an inline expression
    SimpleInline,
}

impl CommandCategory {
    pub const ALL: [CommandCategory; 5] = [
        Self::Implemented,
        Self::Placeholder,
        Self::RuntimeOnly,
        Self::Deprecated,
        Self::SimpleInline,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Implemented => "implemented",
            Self::Placeholder => "placeholder",
            Self::RuntimeOnly => "runtime-only",
            Self::Deprecated => "deprecated",
            Self::SimpleInline => "simple-inline",
        }
    }

    /// Calls to this command go through an imported module.
    pub fn is_imported(self) -> bool {
        matches!(self, Self::Implemented | Self::Placeholder | Self::Deprecated)
    }
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a simple-inline command is emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "expr", rename_all = "kebab-case")]
pub enum InlineForm {
    /// Whole call replaced by an expression: `Pi` → `Math.PI`
    Constant(&'static str),
    /// Callee replaced, arguments kept, no context injected: `Abs(x)` → `Math.abs(x)`
    Function(&'static str),
}

/// Commands always emitted inline, whatever their module contains.
pub const TRIVIAL_COMMANDS: &[(&str, InlineForm)] = &[
    ("True", InlineForm::Constant("true")),
    ("False", InlineForm::Constant("false")),
    ("Pi", InlineForm::Constant("Math.PI")),
    ("Random", InlineForm::Constant("Math.floor(Math.random() * 32768)")),
    ("Abs", InlineForm::Function("Math.abs")),
    ("Int", InlineForm::Function("Math.floor")),
    ("Square root", InlineForm::Function("Math.sqrt")),
    ("Exp", InlineForm::Function("Math.exp")),
    ("Log", InlineForm::Function("Math.log")),
    ("Sin", InlineForm::Function("Math.sin")),
    ("Cos", InlineForm::Function("Math.cos")),
    ("Tan", InlineForm::Function("Math.tan")),
    ("Arctan", InlineForm::Function("Math.atan")),
];

/// Inline form for a trivial command, matched on the generated identifier.
pub fn trivial_form(name: &str) -> Option<InlineForm> {
    let ident = generated_identifier(name);
    TRIVIAL_COMMANDS
        .iter()
        .find(|(trivial, _)| generated_identifier(trivial) == ident)
        .map(|(_, form)| *form)
}

pub fn classify(name: &str, content: &str) -> CommandCategory {
    if trivial_form(name).is_some() {
        return CommandCategory::SimpleInline;
    }
    if content.contains("@deprecated") {
        return CommandCategory::Deprecated;
    }
    if content.contains("@runtime-only") {
        return CommandCategory::RuntimeOnly;
    }
    if !EXPORTED_CALLABLE.is_match(content)
        || code_lines(content) < MIN_BODY_LINES
        || NOT_IMPLEMENTED.is_match(content)
    {
        return CommandCategory::Placeholder;
    }
    CommandCategory::Implemented
}

fn code_lines(content: &str) -> usize {
    content
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with("//")
                && !line.starts_with("/*")
                && !line.starts_with('*')
        })
        .count()
}
