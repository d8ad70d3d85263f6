/*!
# Control-Flow Restructuring

Line-oriented stack matcher for the block statements:

| source                              | target                          |
|-------------------------------------|---------------------------------|
| `If (c)` / `Else` / `End if`        | `if (c) {` / `} else {` / `}`   |
| `For ($i:=a To b [Step s])`         | `for (let $i = a; $i <= b; …) {`|
| `For ($i; a; b [; s])`              | same                            |
| `For each ($v; $col)` / `End for each` | `for (let $v of $col) {` / `}` |
| `While (c)` / `End while`           | `while (c) {` / `}`             |
| `Repeat` / `Until (c)`              | `do {` / `} while (!(c));`      |
| `Case of` / `: (c)` / `Else` / `End case` | `if … else if … else` chain |

Each opener pairs with the nearest unmatched closer of the same kind. A
closer that skips over deeper openers leaves those openers unmatched. A
construct is rewritten only once its closer is found; unmatched and
malformed constructs keep their lines as written, or have them commented
out when recovery is enabled.
*/

use super::{find_closing, slice, split_lines, LineView, Pass, PassContext};
use crate::diagnostics::{Diagnostic, DiagnosticCategory};
use crate::lexer::Token;
use crate::unit::TranslationUnit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Construct {
    If,
    For,
    ForEach,
    While,
    Repeat,
    Case,
}

impl Construct {
    fn opener(self) -> &'static str {
        match self {
            Self::If => "If",
            Self::For => "For",
            Self::ForEach => "For each",
            Self::While => "While",
            Self::Repeat => "Repeat",
            Self::Case => "Case of",
        }
    }

    fn closer(self) -> &'static str {
        match self {
            Self::If => "End if",
            Self::For => "End for",
            Self::ForEach => "End for each",
            Self::While => "End while",
            Self::Repeat => "Until",
            Self::Case => "End case",
        }
    }
}

#[derive(Debug)]
enum LineKind {
    /// Opener with its rewritten header, or why the header is malformed
    Open(Construct, Result<String, String>),
    Else,
    /// Case branch condition
    Branch(Option<String>),
    /// Closer; `Until` carries its condition
    Close(Construct, Option<Result<String, String>>),
    Other,
}

#[derive(Debug)]
struct Frame {
    construct: Construct,
    open: usize,
    header: Result<String, String>,
    else_line: Option<usize>,
    branches: Vec<(usize, Option<String>)>,
    problem: Option<String>,
}

impl Frame {
    /// Every structural line of the construct except the closer.
    fn lines(&self) -> Vec<usize> {
        let mut lines = vec![self.open];
        lines.extend(self.branches.iter().map(|(line, _)| *line));
        lines.extend(self.else_line);
        lines.sort_unstable();
        lines
    }
}

pub struct ControlFlowPass;

impl Pass for ControlFlowPass {
    fn name(&self) -> &'static str {
        "control-flow"
    }

    fn transform(
        &self,
        text: &str,
        tokens: &[Token],
        unit: &mut TranslationUnit,
        ctx: &PassContext<'_>,
    ) -> String {
        let lines = split_lines(text, tokens);
        let mut matcher = Matcher {
            text,
            tokens,
            lines: &lines,
            rewrites: vec![None; lines.len()],
            stack: Vec::new(),
            unit,
            ctx,
        };

        for index in 0..lines.len() {
            let kind = classify(text, tokens, &lines[index]);
            matcher.step(index, kind);
        }
        while let Some(frame) = matcher.stack.pop() {
            matcher.unmatched_opener(frame);
        }

        let rewrites = matcher.rewrites;
        lines
            .iter()
            .zip(rewrites)
            .map(|(line, rewrite)| match rewrite {
                Some(rewritten) => rewritten,
                None => line.text(text).to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

struct Matcher<'p, 'u, 'c> {
    text: &'p str,
    tokens: &'p [Token],
    lines: &'p [LineView],
    rewrites: Vec<Option<String>>,
    stack: Vec<Frame>,
    unit: &'u mut TranslationUnit,
    ctx: &'u PassContext<'c>,
}

impl Matcher<'_, '_, '_> {
    fn step(&mut self, index: usize, kind: LineKind) {
        match kind {
            LineKind::Open(construct, header) => self.stack.push(Frame {
                construct,
                open: index,
                header,
                else_line: None,
                branches: Vec::new(),
                problem: None,
            }),
            LineKind::Else => {
                let top = self.stack.last().map(|f| f.construct);
                if !matches!(top, Some(Construct::If | Construct::Case)) {
                    self.stray_line(index, "Else outside If or Case of");
                } else if let Some(frame) = self.stack.last_mut() {
                    if frame.else_line.is_some() {
                        frame.problem.get_or_insert_with(|| "second Else in one block".to_string());
                    }
                    frame.else_line = Some(index);
                }
            }
            LineKind::Branch(condition) => {
                let top = self.stack.last().map(|f| f.construct);
                if top != Some(Construct::Case) {
                    self.stray_line(index, "case branch outside Case of");
                } else if let Some(frame) = self.stack.last_mut() {
                    if condition.is_none() {
                        frame.problem.get_or_insert_with(|| "case branch without a condition".to_string());
                    } else if frame.else_line.is_some() {
                        frame.problem.get_or_insert_with(|| "case branch after Else".to_string());
                    }
                    frame.branches.push((index, condition));
                }
            }
            LineKind::Close(construct, condition) => self.close(index, construct, condition),
            LineKind::Other => {}
        }
    }

    fn close(&mut self, index: usize, construct: Construct, condition: Option<Result<String, String>>) {
        let Some(depth) = self.stack.iter().rposition(|f| f.construct == construct) else {
            let diagnostic = Diagnostic::new(
                DiagnosticCategory::UnmatchedStructure,
                format!("{} without {}", construct.closer(), construct.opener()),
            );
            self.fail(diagnostic, index, &[index]);
            return;
        };

        while self.stack.len() > depth + 1 {
            if let Some(inner) = self.stack.pop() {
                self.unmatched_opener(inner);
            }
        }
        let Some(mut frame) = self.stack.pop() else {
            return;
        };

        if let Some(Err(reason)) = &condition {
            frame.problem.get_or_insert_with(|| reason.clone());
        }
        if let Err(reason) = &frame.header {
            frame.problem.get_or_insert_with(|| reason.clone());
        }

        if let Some(problem) = frame.problem.take() {
            let mut lines = frame.lines();
            lines.push(index);
            let diagnostic = Diagnostic::new(
                DiagnosticCategory::MalformedConstruct,
                format!("malformed {}: {problem}", construct.opener()),
            );
            self.fail(diagnostic, frame.open, &lines);
            return;
        }

        let until = condition.and_then(Result::ok);
        self.rewrite_matched(frame, index, until);
    }

    fn rewrite_matched(&mut self, frame: Frame, close: usize, until: Option<String>) {
        let header = frame.header.unwrap_or_default();
        match frame.construct {
            Construct::If => {
                self.set(frame.open, header);
                if let Some(line) = frame.else_line {
                    self.set(line, "} else {".to_string());
                }
                self.set(close, "}".to_string());
            }
            Construct::For | Construct::ForEach | Construct::While => {
                self.set(frame.open, header);
                self.set(close, "}".to_string());
            }
            Construct::Repeat => {
                self.set(frame.open, header);
                self.set(close, format!("}} while (!({}));", until.unwrap_or_default()));
            }
            Construct::Case => {
                self.set(frame.open, String::new());
                for (position, (line, condition)) in frame.branches.iter().enumerate() {
                    let condition = condition.as_deref().unwrap_or_default();
                    if position == 0 {
                        self.set(*line, format!("if ({condition}) {{"));
                    } else {
                        self.set(*line, format!("}} else if ({condition}) {{"));
                    }
                }
                let has_branches = !frame.branches.is_empty();
                if let Some(line) = frame.else_line {
                    self.set(line, if has_branches { "} else {" } else { "{" }.to_string());
                }
                let closer = if has_branches || frame.else_line.is_some() { "}" } else { "" };
                self.set(close, closer.to_string());
            }
        }
    }

    fn unmatched_opener(&mut self, frame: Frame) {
        let diagnostic = Diagnostic::new(
            DiagnosticCategory::UnmatchedStructure,
            format!("{} without {}", frame.construct.opener(), frame.construct.closer()),
        );
        let lines = frame.lines();
        self.fail(diagnostic, frame.open, &lines);
    }

    fn stray_line(&mut self, index: usize, reason: &str) {
        let diagnostic = Diagnostic::new(DiagnosticCategory::MalformedConstruct, reason.to_string());
        self.fail(diagnostic, index, &[index]);
    }

    /// Report a failed construct positioned at `anchor` and recover its `lines`.
    fn fail(&mut self, diagnostic: Diagnostic, anchor: usize, lines: &[usize]) {
        let anchor_line = &self.lines[anchor];
        let (line, column) = anchor_line
            .first(self.tokens)
            .map(|t| (t.line, t.column))
            .unwrap_or((anchor_line.number, 1));
        let diagnostic = diagnostic
            .at(line, column)
            .with_subject(anchor_line.text(self.text).trim().to_string());

        let mut anchor_stand_in = None;
        for &index in lines {
            let view = &self.lines[index];
            let probe = Diagnostic {
                subject: Some(view.text(self.text).trim().to_string()),
                ..diagnostic.clone()
            };
            if let Some(stand_in) = self.ctx.recover(&probe) {
                self.rewrites[index] = Some(format!("{}{stand_in}", view.indent(self.text)));
                if index == anchor {
                    anchor_stand_in = Some(stand_in);
                }
            }
        }
        self.unit.report(diagnostic.recovered_with(anchor_stand_in));
    }

    /// Replace the line's tokens with `rewritten`, keeping indent and trailing comment.
    fn set(&mut self, index: usize, rewritten: String) {
        let view = &self.lines[index];
        let indent = view.indent(self.text);
        let trailer = view.trailer(self.text, self.tokens);
        self.rewrites[index] = Some(format!("{indent}{rewritten}{trailer}"));
    }
}

fn classify(text: &str, tokens: &[Token], line: &LineView) -> LineKind {
    let Some(first) = line.first(tokens) else {
        return LineKind::Other;
    };
    let second = line.nth(tokens, 1);

    if first.is_keyword("if") {
        return LineKind::Open(Construct::If, condition(text, tokens, line, 1).map(|c| format!("if ({c}) {{")));
    }
    if first.is_keyword("while") {
        return LineKind::Open(
            Construct::While,
            condition(text, tokens, line, 1).map(|c| format!("while ({c}) {{")),
        );
    }
    if first.is_keyword("for") {
        if second.is_some_and(is_each) {
            return LineKind::Open(Construct::ForEach, for_each_header(text, tokens, line));
        }
        return LineKind::Open(Construct::For, for_header(text, tokens, line));
    }
    if first.is_keyword("repeat") {
        let header = match second {
            None => Ok("do {".to_string()),
            Some(_) => Err("unexpected text after Repeat".to_string()),
        };
        return LineKind::Open(Construct::Repeat, header);
    }
    if first.is_keyword("case") && second.is_some_and(|t| t.is_keyword("of")) {
        return LineKind::Open(Construct::Case, Ok(String::new()));
    }
    if first.is_keyword("else") && second.is_none() {
        return LineKind::Else;
    }
    if first.is_keyword("until") {
        return LineKind::Close(Construct::Repeat, Some(condition(text, tokens, line, 1)));
    }
    if first.is_punct(":") {
        return LineKind::Branch(condition(text, tokens, line, 1).ok());
    }
    if first.is_keyword("end") && line.tokens.len() == 2 {
        let construct = match second.map(|t| t.text.to_ascii_lowercase()).as_deref() {
            Some("if") => Some(Construct::If),
            Some("for") => Some(Construct::For),
            Some("while") => Some(Construct::While),
            Some("case") => Some(Construct::Case),
            _ => None,
        };
        if let Some(construct) = construct {
            return LineKind::Close(construct, None);
        }
    }
    if first.is_keyword("end")
        && line.tokens.len() == 3
        && second.is_some_and(|t| t.is_keyword("for"))
        && line.nth(tokens, 2).is_some_and(is_each)
    {
        return LineKind::Close(Construct::ForEach, None);
    }
    LineKind::Other
}

fn is_each(token: &Token) -> bool {
    token.is_word() && token.text.eq_ignore_ascii_case("each")
}

/// Parenthesized condition starting at the `from`-th token of the line.
///
/// `(c)` yields `c`; `(a) & (b)` yields the whole expression.
fn condition(text: &str, tokens: &[Token], line: &LineView, from: usize) -> Result<String, String> {
    let ids = &line.tokens;
    if !line.nth(tokens, from).is_some_and(|t| t.is_punct("(")) {
        return Err("condition must be parenthesized".to_string());
    }
    if !balanced(tokens, &ids[from..]) {
        return Err("unbalanced parentheses".to_string());
    }

    let last = ids.len() - 1;
    let close = find_closing(tokens, ids, from, "(", ")").ok_or("unbalanced parentheses")?;
    let expression = if close == last {
        if close == from + 1 {
            return Err("empty condition".to_string());
        }
        slice(text, tokens, ids[from + 1], ids[close - 1])
    } else {
        slice(text, tokens, ids[from], ids[last])
    };
    Ok(expression.trim().to_string())
}

fn balanced(tokens: &[Token], ids: &[usize]) -> bool {
    let mut depth = 0i64;
    for &index in ids {
        let token = &tokens[index];
        if token.is_punct("(") {
            depth += 1;
        } else if token.is_punct(")") {
            depth -= 1;
            if depth < 0 {
                return false;
            }
        }
    }
    depth == 0
}

/// `for` header from either loop form.
fn for_header(text: &str, tokens: &[Token], line: &LineView) -> Result<String, String> {
    let ids = &line.tokens;
    if !line.nth(tokens, 1).is_some_and(|t| t.is_punct("(")) {
        return Err("For header must be parenthesized".to_string());
    }
    let close = find_closing(tokens, ids, 1, "(", ")").ok_or("unbalanced parentheses")?;
    if close != ids.len() - 1 {
        return Err("unexpected text after For header".to_string());
    }
    let inner = &ids[2..close];
    if inner.is_empty() {
        return Err("empty For header".to_string());
    }

    let top_level = top_level_positions(tokens, inner);
    let parts = if !top_level.iter().any(|&p| tokens[inner[p]].is_punct(";")) {
        counted_form(text, tokens, inner, &top_level)?
    } else {
        let parts = split_arguments(text, tokens, inner, &top_level);
        if !(3..=4).contains(&parts.len()) {
            return Err("expected 3 or 4 parts in For header".to_string());
        }
        LoopParts {
            variable: parts[0].clone(),
            from: parts[1].clone(),
            to: parts[2].clone(),
            step: parts.get(3).cloned(),
        }
    };
    parts.render()
}

/// `for … of` header from `For each ($item; $collection)`.
fn for_each_header(text: &str, tokens: &[Token], line: &LineView) -> Result<String, String> {
    let ids = &line.tokens;
    if !line.nth(tokens, 2).is_some_and(|t| t.is_punct("(")) {
        return Err("For each header must be parenthesized".to_string());
    }
    let close = find_closing(tokens, ids, 2, "(", ")").ok_or("unbalanced parentheses")?;
    if close != ids.len() - 1 {
        return Err("unexpected text after For each header".to_string());
    }
    let inner = &ids[3..close];
    let parts = split_arguments(text, tokens, inner, &top_level_positions(tokens, inner));
    match parts.as_slice() {
        [item, collection] if !item.is_empty() && !collection.is_empty() => {
            Ok(format!("for (let {item} of {collection}) {{"))
        }
        [_, _, _, ..] => Err("For each with begin and end bounds is not supported".to_string()),
        _ => Err("expected item and collection in For each header".to_string()),
    }
}

/// Split `inner` at its top-level `;` separators.
fn split_arguments(text: &str, tokens: &[Token], inner: &[usize], top_level: &[usize]) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0;
    for &separator in top_level.iter().filter(|&&p| tokens[inner[p]].is_punct(";")) {
        parts.push(span_text(text, tokens, &inner[start..separator]));
        start = separator + 1;
    }
    parts.push(span_text(text, tokens, &inner[start..]));
    parts
}

struct LoopParts {
    variable: String,
    from: String,
    to: String,
    step: Option<String>,
}

impl LoopParts {
    fn render(&self) -> Result<String, String> {
        if self.variable.is_empty() || self.from.is_empty() || self.to.is_empty() {
            return Err("incomplete For header".to_string());
        }
        let v = &self.variable;
        let step = self.step.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let descending = step.is_some_and(|s| s.starts_with('-'));
        let compare = if descending { ">=" } else { "<=" };
        let advance = match step {
            None | Some("1") => format!("{v}++"),
            Some("-1") => format!("{v}--"),
            Some(step) => format!("{v} += {step}"),
        };
        Ok(format!(
            "for (let {v} = {}; {v} {compare} {}; {advance}) {{",
            self.from, self.to
        ))
    }
}

/// `v = a To b [Step s]` (the assignment was already normalized to `=`).
fn counted_form(text: &str, tokens: &[Token], inner: &[usize], top_level: &[usize]) -> Result<LoopParts, String> {
    let find = |pred: fn(&Token) -> bool| top_level.iter().copied().find(|&p| pred(&tokens[inner[p]]));
    let assign = find(|t| t.is_op("=")).ok_or("missing loop variable assignment")?;
    let to = find(|t| t.is_keyword("to")).ok_or("missing To")?;
    let step = find(|t| t.is_keyword("step"));
    if !(assign < to && step.map_or(true, |s| s > to)) {
        return Err("For header parts out of order".to_string());
    }

    let to_end = step.unwrap_or(inner.len());
    Ok(LoopParts {
        variable: span_text(text, tokens, &inner[..assign]),
        from: span_text(text, tokens, &inner[assign + 1..to]),
        to: span_text(text, tokens, &inner[to + 1..to_end]),
        step: step.map(|s| span_text(text, tokens, &inner[s + 1..])),
    })
}

/// Positions in `ids` at parenthesis depth zero.
fn top_level_positions(tokens: &[Token], ids: &[usize]) -> Vec<usize> {
    let mut depth = 0usize;
    let mut positions = Vec::new();
    for (position, &index) in ids.iter().enumerate() {
        let token = &tokens[index];
        if token.is_punct("(") || token.is_punct("[") || token.is_punct("{") {
            depth += 1;
        } else if token.is_punct(")") || token.is_punct("]") || token.is_punct("}") {
            depth = depth.saturating_sub(1);
        } else if depth == 0 {
            positions.push(position);
        }
    }
    positions
}

fn span_text(text: &str, tokens: &[Token], ids: &[usize]) -> String {
    match (ids.first(), ids.last()) {
        (Some(&first), Some(&last)) => slice(text, tokens, first, last).trim().to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::MethodIndex;
    use crate::diagnostics::Recovery;
    use crate::registry::CommandRegistry;
    use crate::unit::{line_count, SourceFile};
    use crate::TranspileConfig;
    use pretty_assertions::assert_eq;

    fn run_with(src: &str, recovery: bool) -> (String, TranslationUnit) {
        let registry = CommandRegistry::default();
        let methods = MethodIndex::default();
        let strategies = Recovery::standard();
        let config = TranspileConfig::default().with_recovery(recovery);
        let ctx = PassContext::new(&registry, &methods, &strategies, &config);
        let mut unit = TranslationUnit::new(SourceFile::from_relative("C.4dm", "js"), src);
        let tokens = unit.tokens.clone();
        let out = ControlFlowPass.transform(src, &tokens, &mut unit, &ctx);
        assert_eq!(line_count(&out), line_count(src));
        (out, unit)
    }

    fn run(src: &str) -> String {
        let (out, unit) = run_with(src, true);
        assert!(unit.diagnostics.is_empty(), "{:?}", unit.diagnostics);
        out
    }

    #[test]
    fn test_nested_if_else() {
        let src = "If ($a===1)\n  If ($b===2) // inner\n    $c=3\n  Else\n    $c=4\n  End if\nEnd if";
        assert_eq!(
            run(src),
            "if ($a===1) {\n  if ($b===2) { // inner\n    $c=3\n  } else {\n    $c=4\n  }\n}"
        );
    }

    #[test]
    fn test_compound_condition_kept_whole() {
        assert_eq!(run("If ($a) && ($b)\nEnd if"), "if (($a) && ($b)) {\n}");
    }

    #[test]
    fn test_for_loops() {
        assert_eq!(
            run("For ($i=1 To 10)\nEnd for"),
            "for (let $i = 1; $i <= 10; $i++) {\n}"
        );
        assert_eq!(
            run("For ($i=Size of array:C274($arr) To 1 Step -1)\nEnd for"),
            "for (let $i = Size of array:C274($arr); $i >= 1; $i--) {\n}"
        );
        assert_eq!(
            run("For ($i; 0; $n; 2)\nEnd for"),
            "for (let $i = 0; $i <= $n; $i += 2) {\n}"
        );
    }

    #[test]
    fn test_while_and_repeat() {
        assert_eq!(
            run("While ($i<10)\n$i=$i+1\nEnd while"),
            "while ($i<10) {\n$i=$i+1\n}"
        );
        assert_eq!(
            run("Repeat\n$i=$i+1\nUntil ($i===10)"),
            "do {\n$i=$i+1\n} while (!($i===10));"
        );
    }

    #[test]
    fn test_case_of() {
        let src = "Case of\n: ($a===1)\n  $b=1\n: ($a===2)\n  $b=2\nElse\n  $b=0\nEnd case";
        assert_eq!(
            run(src),
            "\nif ($a===1) {\n  $b=1\n} else if ($a===2) {\n  $b=2\n} else {\n  $b=0\n}"
        );
    }

    #[test]
    fn test_case_without_branches() {
        assert_eq!(run("Case of\nEnd case"), "\n");
        assert_eq!(run("Case of\nElse\n$b=0\nEnd case"), "\n{\n$b=0\n}");
    }

    #[test]
    fn test_unmatched_opener_recovered() {
        let (out, unit) = run_with("If ($a)\n$b=1", true);
        assert_eq!(out, "// [relay:unmatched-structure] If ($a)\n$b=1");
        assert_eq!(unit.diagnostics.len(), 1);
        let d = &unit.diagnostics[0];
        assert_eq!(d.category, DiagnosticCategory::UnmatchedStructure);
        assert_eq!((d.line, d.column), (1, 1));
        assert!(d.recovered_with.is_some());
    }

    #[test]
    fn test_unmatched_left_untouched_without_recovery() {
        let src = "If ($a)\n$b=1\nEnd while";
        let (out, unit) = run_with(src, false);
        assert_eq!(out, src);
        assert_eq!(unit.diagnostics.len(), 2);
        assert!(unit.diagnostics.iter().all(|d| d.recovered_with.is_none()));
    }

    #[test]
    fn test_closer_skipping_inner_opener() {
        let (out, unit) = run_with("If ($a)\n  While ($b)\nEnd if", true);
        assert_eq!(out, "if ($a) {\n  // [relay:unmatched-structure] While ($b)\n}");
        assert_eq!(unit.diagnostics.len(), 1);
        assert_eq!(unit.diagnostics[0].line, 2);
        assert_eq!(unit.diagnostics[0].column, 3);
    }

    #[test]
    fn test_malformed_header() {
        let (out, unit) = run_with("If $a\n$b=1\nEnd if", true);
        assert_eq!(
            out,
            "// [relay:malformed-construct] If $a\n$b=1\n// [relay:malformed-construct] End if"
        );
        assert_eq!(unit.diagnostics[0].category, DiagnosticCategory::MalformedConstruct);
    }

    #[test]
    fn test_for_each_loop() {
        let src = "For each ($item; $col)\n  For ($i; 1; 2)\n  End for\nEnd for each";
        assert_eq!(
            run(src),
            "for (let $item of $col) {\n  for (let $i = 1; $i <= 2; $i++) {\n  }\n}"
        );
        assert_eq!(
            run("FOR EACH ($line; $doc.lines)\nEND FOR EACH"),
            "for (let $line of $doc.lines) {\n}"
        );
    }

    #[test]
    fn test_for_each_bounds_rejected() {
        let (out, unit) = run_with("For each ($item; $col; 2; 5)\nEnd for each", true);
        assert_eq!(
            out,
            "// [relay:malformed-construct] For each ($item; $col; 2; 5)\n\
             // [relay:malformed-construct] End for each"
        );
        assert_eq!(unit.diagnostics.len(), 1);
        assert_eq!(unit.diagnostics[0].category, DiagnosticCategory::MalformedConstruct);
    }

    #[test]
    fn test_end_for_each_does_not_close_for() {
        let (_, unit) = run_with("For ($i; 1; 2)\nEnd for each", false);
        let categories: Vec<DiagnosticCategory> = unit.diagnostics.iter().map(|d| d.category).collect();
        assert_eq!(
            categories,
            vec![DiagnosticCategory::UnmatchedStructure, DiagnosticCategory::UnmatchedStructure]
        );
    }
}
