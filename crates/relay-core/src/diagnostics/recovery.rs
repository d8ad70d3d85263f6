/*!
# Recovery Strategies

A recovery strategy produces substitute text for a construct that could not
be transformed, so the rest of the file still comes out. Strategies are
looked up by diagnostic category.
*/

use std::collections::HashMap;

use crate::CONTEXT_IDENT;

use super::{Diagnostic, DiagnosticCategory};

/// Produces stand-in text for a failed construct
pub trait RecoveryStrategy: Send + Sync {
    /// Human-readable name for this strategy
    fn name(&self) -> &'static str;

    /// Substitute text to splice in place of the diagnostic's subject
    fn recover(&self, diagnostic: &Diagnostic) -> Option<String>;
}

/// Replaces an unresolved command name with a callee that warns at run time.
///
/// `SEND PACKET:C103($doc; $text)` becomes
/// `processContext.unresolvedCommand("SEND PACKET")(processContext, $doc, $text)`;
/// the call pass supplies the argument list.
pub struct UnresolvedCommandStandIn;

impl RecoveryStrategy for UnresolvedCommandStandIn {
    fn name(&self) -> &'static str {
        "UnresolvedCommandStandIn"
    }

    fn recover(&self, diagnostic: &Diagnostic) -> Option<String> {
        let name = diagnostic.subject.as_deref()?;
        let quoted = serde_json::to_string(name).ok()?;
        Some(format!("{CONTEXT_IDENT}.unresolvedCommand({quoted})"))
    }
}

/// Comments out the failed construct with a visible marker.
///
/// Every line of the subject is kept, so line numbers do not move.
pub struct InertPlaceholder;

impl InertPlaceholder {
    pub fn render(category: DiagnosticCategory, subject: &str) -> String {
        subject
            .split('\n')
            .map(|line| format!("// [relay:{category}] {}", line.trim_end()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl RecoveryStrategy for InertPlaceholder {
    fn name(&self) -> &'static str {
        "InertPlaceholder"
    }

    fn recover(&self, diagnostic: &Diagnostic) -> Option<String> {
        let subject = diagnostic.subject.as_deref()?;
        Some(Self::render(diagnostic.category, subject))
    }
}

/// Strategy table keyed by diagnostic category
pub struct Recovery {
    strategies: HashMap<DiagnosticCategory, Box<dyn RecoveryStrategy>>,
}

impl Recovery {
    /// No strategies: every construct is left as written.
    pub fn disabled() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    pub fn standard() -> Self {
        Self::disabled()
            .with_strategy(DiagnosticCategory::UnresolvedCommand, Box::new(UnresolvedCommandStandIn))
            .with_strategy(DiagnosticCategory::UnmatchedStructure, Box::new(InertPlaceholder))
            .with_strategy(DiagnosticCategory::MalformedConstruct, Box::new(InertPlaceholder))
    }

    pub fn with_strategy(
        mut self,
        category: DiagnosticCategory,
        strategy: Box<dyn RecoveryStrategy>,
    ) -> Self {
        self.strategies.insert(category, strategy);
        self
    }

    pub fn attempt(&self, diagnostic: &Diagnostic) -> Option<String> {
        self.strategies
            .get(&diagnostic.category)
            .and_then(|strategy| strategy.recover(diagnostic))
    }
}

impl Default for Recovery {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_command_stand_in() {
        let recovery = Recovery::standard();
        let d = Diagnostic::new(DiagnosticCategory::UnresolvedCommand, "unresolved command")
            .with_subject("SEND PACKET");
        assert_eq!(
            recovery.attempt(&d).as_deref(),
            Some("processContext.unresolvedCommand(\"SEND PACKET\")")
        );
    }

    #[test]
    fn test_inert_placeholder_keeps_line_count() {
        let d = Diagnostic::new(DiagnosticCategory::UnmatchedStructure, "If without End if")
            .with_subject("If ($a === \"x\ny\")");
        let text = Recovery::standard().attempt(&d).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().all(|l| l.starts_with("// [relay:unmatched-structure]")));
    }

    #[test]
    fn test_no_strategy_for_warnings_without_stand_in() {
        let recovery = Recovery::standard();
        let d = Diagnostic::new(DiagnosticCategory::UnresolvedMethod, "unknown method")
            .with_subject("Foo");
        assert_eq!(recovery.attempt(&d), None);
        let unresolved = Diagnostic::new(DiagnosticCategory::UnresolvedCommand, "unresolved command")
            .with_subject("BEEP");
        assert_eq!(Recovery::disabled().attempt(&unresolved), None);
    }

    #[test]
    fn test_missing_subject_yields_nothing() {
        let d = Diagnostic::new(DiagnosticCategory::UnresolvedCommand, "unresolved command");
        assert_eq!(Recovery::standard().attempt(&d), None);
    }
}
