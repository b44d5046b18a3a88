//! Diagnostic rendering for terminals.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;

/// Formats a diagnostic into a string for some output target.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a rustc-like layout:
///
/// ```text
/// error[R201]: routing did not converge after 200 passes
///   --> net `data[3]`
///    = note: 2 wires still claimed by more than one net
///    = help: relax pin constraints or raise max_passes
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes for the severity header.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn header(&self, severity: Severity) -> String {
        if !self.color {
            return severity.to_string();
        }
        let ansi = match severity {
            Severity::Error => "\x1b[1;31m",
            Severity::Warning => "\x1b[1;33m",
            Severity::Note => "\x1b[1;36m",
        };
        format!("{ansi}{severity}\x1b[0m")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!(
            "{}[{}]: {}\n",
            self.header(diag.severity),
            diag.code,
            diag.message
        );
        if let Some(subject) = &diag.subject {
            out.push_str(&format!("  --> {subject}\n"));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};

    #[test]
    fn render_error_with_subject() {
        let diag = Diagnostic::error(
            DiagnosticCode::new(Category::Routing, 201),
            "routing did not converge after 1 pass",
        )
        .with_subject("net `b`");

        let output = TerminalRenderer::new(false).render(&diag);
        assert!(output.starts_with("error[R201]: routing did not converge after 1 pass\n"));
        assert!(output.contains("  --> net `b`\n"));
    }

    #[test]
    fn render_notes_and_help() {
        let diag = Diagnostic::warning(DiagnosticCode::new(Category::Input, 110), "no such port")
            .with_note("constraint ignored")
            .with_help("check the port name");

        let output = TerminalRenderer::new(false).render(&diag);
        assert!(output.contains("warning[I110]: no such port"));
        assert!(output.contains("= note: constraint ignored"));
        assert!(output.contains("= help: check the port name"));
        assert!(!output.contains("-->"));
    }

    #[test]
    fn color_wraps_header_only() {
        let diag = Diagnostic::error(DiagnosticCode::new(Category::Placement, 101), "x");
        let output = TerminalRenderer::new(true).render(&diag);
        assert!(output.starts_with("\x1b[1;31merror\x1b[0m[P101]"));
    }
}
