//! User-facing diagnostics for the place-and-route pipeline.
//!
//! Infeasible inputs, illegal constraints, and routing convergence failures
//! are reported as structured [`Diagnostic`]s with a phase-specific code
//! (`I101`, `R201`, ...). The [`DiagnosticSink`] accumulates them for the run
//! and [`TerminalRenderer`] formats them for a terminal.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
