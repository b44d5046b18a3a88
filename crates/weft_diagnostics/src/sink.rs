//! Diagnostic accumulator for a single pipeline run.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::cell::{Cell, RefCell};

/// Accumulates diagnostics emitted during a run.
///
/// The pipeline is single-threaded and each phase owns the sink while it
/// runs, so interior mutability through `RefCell` is sufficient.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: RefCell<Vec<Diagnostic>>,
    error_count: Cell<usize>,
    warning_count: Cell<usize>,
}

impl DiagnosticSink {
    /// Creates a new empty diagnostic sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a diagnostic into the sink.
    pub fn emit(&self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => self.error_count.set(self.error_count.get() + 1),
            Severity::Warning => self.warning_count.set(self.warning_count.get() + 1),
            Severity::Note => {}
        }
        self.diagnostics.borrow_mut().push(diag);
    }

    /// Returns `true` if any error-severity diagnostics have been emitted.
    pub fn has_errors(&self) -> bool {
        self.error_count.get() > 0
    }

    /// Returns the number of errors emitted so far.
    pub fn error_count(&self) -> usize {
        self.error_count.get()
    }

    /// Returns the number of warnings emitted so far.
    pub fn warning_count(&self) -> usize {
        self.warning_count.get()
    }

    /// Returns the first error emitted, if any.
    pub fn first_error(&self) -> Option<Diagnostic> {
        self.diagnostics
            .borrow()
            .iter()
            .find(|d| d.severity == Severity::Error)
            .cloned()
    }

    /// Takes all accumulated diagnostics, leaving the sink empty.
    ///
    /// Counters are not reset; they describe the whole run.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    /// Returns a snapshot of all accumulated diagnostics without draining.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }
}
