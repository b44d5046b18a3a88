//! Errors of a whole flow run.

use weft_bitstream::AssemblyError;
use weft_config::ConfigError;
use weft_diagnostics::{Category, Diagnostic, DiagnosticCode};
use weft_fabric::FabricError;
use weft_pnr::PnrError;

/// Any error that stops a flow run, tagged by the phase it came from.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// The run configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The device could not be built.
    #[error("device: {0}")]
    Fabric(#[from] FabricError),

    /// Placement, routing, or one of their input checks failed.
    #[error(transparent)]
    Pnr(#[from] PnrError),

    /// The placed and routed design could not be turned into bits.
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

impl FlowError {
    /// Converts this error into a user-facing diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            FlowError::Config(err) => {
                Diagnostic::error(DiagnosticCode::new(Category::Input, 130), err.to_string())
                    .with_subject(weft_config::CONFIG_FILE)
            }
            FlowError::Fabric(err) => {
                let diag =
                    Diagnostic::error(DiagnosticCode::new(Category::Input, 131), err.to_string());
                match err {
                    FabricError::UnknownDevice(_) => diag.with_help(format!(
                        "known devices: {}",
                        weft_fabric::device_names().collect::<Vec<_>>().join(", ")
                    )),
                    _ => diag,
                }
            }
            FlowError::Pnr(err) => err.to_diagnostic(),
            FlowError::Assembly(err) => err.to_diagnostic(),
        }
    }
}
