//! Diagnostic codes keyed by pipeline phase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The pipeline phase a diagnostic originates from.
///
/// The phase determines the code prefix letter: `I101` is an input problem,
/// `R201` a routing failure.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Netlist, constraint, and run-parameter problems found before placement.
    Input,
    /// Placement infeasibility and legality failures.
    Placement,
    /// Routing failures, including non-convergence.
    Routing,
    /// Configuration assembly problems (malformed parameters).
    Assembly,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Input => 'I',
            Category::Placement => 'P',
            Category::Routing => 'R',
            Category::Assembly => 'A',
        }
    }
}

/// A category prefix plus a number, displayed as e.g. `P102`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The originating phase.
    pub category: Category,
    /// The numeric identifier within the phase.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_prefixes() {
        assert_eq!(Category::Input.prefix(), 'I');
        assert_eq!(Category::Placement.prefix(), 'P');
        assert_eq!(Category::Routing.prefix(), 'R');
        assert_eq!(Category::Assembly.prefix(), 'A');
    }

    #[test]
    fn display_pads_number() {
        assert_eq!(DiagnosticCode::new(Category::Routing, 201).to_string(), "R201");
        assert_eq!(DiagnosticCode::new(Category::Input, 7).to_string(), "I007");
    }

    #[test]
    fn codes_order_by_phase_first() {
        let input = DiagnosticCode::new(Category::Input, 900);
        let routing = DiagnosticCode::new(Category::Routing, 1);
        assert!(input < routing);
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagnosticCode::new(Category::Placement, 101);
        let json = serde_json::to_string(&code).unwrap();
        let back: DiagnosticCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }
}
