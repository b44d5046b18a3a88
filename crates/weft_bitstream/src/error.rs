//! Configuration assembly errors.

use weft_diagnostics::{Category, Diagnostic, DiagnosticCode};
use weft_fabric::TileId;

/// Why a placed and routed design could not be turned into bits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    /// An instance of the top model has no site.
    #[error("{0} is not placed")]
    Unplaced(String),

    /// A parameter could not be read as a field of the expected width.
    #[error("parameter `{param}` of {instance} is not a {width}-bit value: {value}")]
    MalformedParam {
        /// The instance carrying the parameter.
        instance: String,
        /// Parameter name.
        param: String,
        /// Expected field width.
        width: usize,
        /// The offending value, as written.
        value: String,
    },

    /// A PLL named a feedback path that does not exist.
    #[error("unknown FEEDBACK_PATH `{value}` on {instance}")]
    UnknownFeedbackPath {
        /// The PLL instance.
        instance: String,
        /// The offending value.
        value: String,
    },

    /// An I/O standard has no bank setting on this device.
    #[error("device has no setting for I/O standard `{standard}` in bank {bank} (used by {instance})")]
    UnknownIoStandard {
        /// The pad instance.
        instance: String,
        /// Requested standard.
        standard: String,
        /// Bank of the pad's site.
        bank: u32,
    },

    /// The fabric lacks the option bits a placed cell needs.
    #[error("{tile} has no configuration bits `{name}`")]
    MissingBits {
        /// Tile searched.
        tile: TileId,
        /// Template or field name.
        name: String,
    },

    /// Two flip-flops in one logic tile want opposite clock edges.
    #[error("{first} and {second} in {tile} disagree on clock polarity")]
    MixedClockPolarity {
        /// The shared tile.
        tile: TileId,
        /// The flip-flop that set the tile's polarity.
        first: String,
        /// The flip-flop that disagrees.
        second: String,
    },
}

impl AssemblyError {
    /// Returns the diagnostic code for this error.
    pub fn code(&self) -> DiagnosticCode {
        let number = match self {
            AssemblyError::Unplaced(_) => 101,
            AssemblyError::MalformedParam { .. } => 102,
            AssemblyError::UnknownFeedbackPath { .. } => 103,
            AssemblyError::UnknownIoStandard { .. } => 104,
            AssemblyError::MissingBits { .. } => 105,
            AssemblyError::MixedClockPolarity { .. } => 106,
        };
        DiagnosticCode::new(Category::Assembly, number)
    }

    /// Converts this error into a user-facing diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.code(), self.to_string());
        match self {
            AssemblyError::MalformedParam { instance, .. }
            | AssemblyError::UnknownFeedbackPath { instance, .. }
            | AssemblyError::UnknownIoStandard { instance, .. } => diag.with_subject(instance.clone()),
            AssemblyError::MixedClockPolarity { tile, .. } => diag
                .with_subject(tile.to_string())
                .with_note("all flip-flops of a logic tile share one clock polarity bit"),
            _ => diag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_assembly_category() {
        let err = AssemblyError::UnknownFeedbackPath {
            instance: "inst4 (SB_PLL40_CORE)".into(),
            value: "LOOP".into(),
        };
        assert_eq!(err.code().to_string(), "A103");
        let diag = err.to_diagnostic();
        assert_eq!(diag.subject.as_deref(), Some("inst4 (SB_PLL40_CORE)"));
        assert!(diag.message.contains("`LOOP`"));
    }

    #[test]
    fn mixed_polarity_points_at_the_tile() {
        let err = AssemblyError::MixedClockPolarity {
            tile: TileId::from_raw(6),
            first: "inst1 (ICESTORM_LC)".into(),
            second: "inst2 (ICESTORM_LC)".into(),
        };
        assert_eq!(err.code().to_string(), "A106");
        assert_eq!(err.to_diagnostic().subject.as_deref(), Some("t6"));
    }
}
