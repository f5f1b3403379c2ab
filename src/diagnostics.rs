//! Diagnostic sink (C6).
//!
//! A monotonic recorder: `fatal` appends a diagnostic and never removes or
//! mutates one afterward. The driver polls `has_errors()` between phases and
//! aborts before the next phase if anything was recorded (see SPEC_FULL.md §7).

use crate::ast::Pos;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub pos: Pos,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} ***ERROR*** {}", self.pos.line, self.pos.col, self.message)
    }
}

#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        DiagnosticSink::default()
    }

    pub fn fatal(&mut self, pos: Pos, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            pos,
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Renders every recorded diagnostic as `line:col ***ERROR*** message`, one
    /// per line, in recording order.
    pub fn render(&self) -> String {
        self.diagnostics
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_exactly_as_spec_requires() {
        let mut sink = DiagnosticSink::new();
        sink.fatal(Pos::SYNTHETIC, "No main function");
        assert_eq!(sink.render(), "0:0 ***ERROR*** No main function");
    }

    #[test]
    fn is_monotonic_and_ordered() {
        let mut sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        sink.fatal(Pos::new(3, 5), "Undeclared identifier");
        sink.fatal(Pos::new(4, 1), "Type mismatch");
        assert!(sink.has_errors());
        assert_eq!(sink.diagnostics().len(), 2);
        assert_eq!(sink.diagnostics()[0].message, "Undeclared identifier");
        assert_eq!(sink.diagnostics()[1].message, "Type mismatch");
    }
}
