//! Diagnostic severity levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a diagnostic is. Ordered from least to most severe.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Severity {
    /// Informational, e.g. a constraint naming a port that was pruned away.
    Note,
    /// Suspicious input that the pipeline tolerates.
    Warning,
    /// The run cannot produce a configuration.
    Error,
}

impl Severity {
    /// Returns `true` if this severity stops the pipeline.
    pub fn is_fatal(self) -> bool {
        self == Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}
