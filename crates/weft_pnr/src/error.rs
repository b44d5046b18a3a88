//! Fatal place-and-route errors.

use weft_diagnostics::{Category, Diagnostic, DiagnosticCode};
use weft_fabric::{CellKind, SiteId, TileId};
use weft_netlist::NetlistError;

/// Everything that can stop placement or routing.
///
/// Each variant maps onto a coded [`Diagnostic`] through
/// [`PnrError::to_diagnostic`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PnrError {
    /// The annealing seed was zero.
    #[error("seed must be a positive integer")]
    InvalidSeed,

    /// The routing pass limit was zero.
    #[error("max passes must be at least 1")]
    InvalidPassCount,

    /// The design has no top model.
    #[error("design has no top model")]
    MissingTop,

    /// The netlist failed its well-formedness check.
    #[error("invalid netlist: {0}")]
    InvalidNetlist(#[from] NetlistError),

    /// No package of that name exists on the device.
    #[error("device has no package `{0}`")]
    UnknownPackage(String),

    /// A pin constraint named a pin the package does not have.
    #[error("package `{package}` has no pin `{pin}`")]
    UnknownPin {
        /// The requested pin.
        pin: String,
        /// The package searched.
        package: String,
    },

    /// Two ports were constrained to the same package pin.
    #[error("pin `{pin}` is assigned to both `{first}` and `{second}`")]
    DuplicatePin {
        /// The contested pin.
        pin: String,
        /// The port that claimed it first.
        first: String,
        /// The port that claimed it second.
        second: String,
    },

    /// A pin constraint named a port the top model does not have.
    #[error("top model has no port `{0}`")]
    UnknownPort(String),

    /// A constrained port is not tied to an I/O pad instance.
    #[error("port `{0}` is not connected to an I/O pad")]
    PortNotOnPad(String),

    /// An instance was locked to a site of the wrong kind.
    #[error("{instance} is a {kind} cell and cannot be placed on {site}, a {site_kind} site")]
    IllegalLock {
        /// The locked instance.
        instance: String,
        /// Its kind.
        kind: CellKind,
        /// The requested site.
        site: SiteId,
        /// The kind of that site.
        site_kind: CellKind,
    },

    /// Two instances were locked to the same site.
    #[error("{site} is claimed by both {first} and {second}")]
    DuplicateLock {
        /// The contested site.
        site: SiteId,
        /// The instance that claimed it first.
        first: String,
        /// The instance that claimed it second.
        second: String,
    },

    /// A route-only instance carries no location.
    #[error("{0} has no `loc` attribute")]
    MissingLocation(String),

    /// A route-only location is not a cell number of the device.
    #[error("{instance} has malformed location `{value}`")]
    MalformedLocation {
        /// The instance.
        instance: String,
        /// The attribute value as written.
        value: String,
    },

    /// The design needs more sites of a kind than the device has.
    #[error("design needs {demand} {kind} sites but the device has {supply}")]
    Infeasible {
        /// The exhausted kind.
        kind: CellKind,
        /// Instances of that kind.
        demand: usize,
        /// Sites of that kind.
        supply: usize,
    },

    /// An I/O instance cannot sit in any bank without mixing standards.
    #[error("bank {bank} cannot mix I/O standards `{first}` and `{second}`")]
    BankConflict {
        /// The bank.
        bank: u32,
        /// The standard already in the bank.
        first: String,
        /// The standard that does not fit.
        second: String,
    },

    /// No column has a free run long enough for a carry chain.
    #[error("carry chain of {len} cells starting at {head} does not fit in any column")]
    ChainDoesNotFit {
        /// The first instance of the chain.
        head: String,
        /// The number of cells in the chain.
        len: usize,
    },

    /// A carry input is tied high, which no fabric wire can supply.
    #[error("carry input of {0} is tied high")]
    CarryInTiedHigh(String),

    /// Two logic cells cannot share a tile because they disagree on the
    /// tile's shared clock, enable, reset, or clock polarity.
    #[error("{first} and {second} cannot share {tile}: they need different {signal}")]
    TileConflict {
        /// The tile both were put in.
        tile: TileId,
        /// The shared resource they disagree on.
        signal: &'static str,
        /// One of the cells.
        first: String,
        /// The other cell.
        second: String,
    },

    /// No tile accepts a logic cell alongside the cells already placed.
    #[error("no logic tile can take {0} next to the cells already placed")]
    NoCompatibleTile(String),

    /// A locked member of a carry chain leaves no legal spot for the rest.
    #[error("carry chain starting at {head} cannot line up with locked member {instance}")]
    ChainLockConflict {
        /// The first instance of the chain.
        head: String,
        /// The locked member that does not fit.
        instance: String,
    },

    /// The finished placement violates a legality rule.
    #[error("illegal placement: {0}")]
    IllegalPlacement(String),

    /// A sink is not reachable from its net's driver at all.
    #[error("no path for net `{net}` from {from} to {to}")]
    NoPath {
        /// The net being routed.
        net: String,
        /// The driver wire.
        from: String,
        /// The unreachable sink wire.
        to: String,
    },

    /// A constant net still has sinks at routing time.
    #[error("constant net `{0}` still has sinks and cannot be routed")]
    UnrealizedConstant(String),

    /// Routing did not converge within the pass limit.
    #[error("routing failed after {passes} passes: net `{net}` is on one of {overused} overused wires")]
    Unroutable {
        /// The lowest-id net on an overused wire.
        net: String,
        /// Passes run.
        passes: usize,
        /// Wires still claimed by more than one net.
        overused: usize,
    },
}

impl PnrError {
    /// Returns the diagnostic code for this error.
    pub fn code(&self) -> DiagnosticCode {
        let (category, number) = match self {
            PnrError::InvalidSeed => (Category::Input, 101),
            PnrError::InvalidPassCount => (Category::Input, 102),
            PnrError::MissingTop => (Category::Input, 103),
            PnrError::InvalidNetlist(_) => (Category::Input, 104),
            PnrError::UnknownPackage(_) => (Category::Input, 105),
            PnrError::UnknownPort(_) => (Category::Input, 110),
            PnrError::UnknownPin { .. } => (Category::Input, 111),
            PnrError::DuplicatePin { .. } => (Category::Input, 112),
            PnrError::PortNotOnPad(_) => (Category::Input, 113),
            PnrError::MissingLocation(_) => (Category::Input, 120),
            PnrError::MalformedLocation { .. } => (Category::Input, 121),
            PnrError::CarryInTiedHigh(_) => (Category::Input, 122),
            PnrError::Infeasible { .. } => (Category::Placement, 101),
            PnrError::IllegalLock { .. } => (Category::Placement, 102),
            PnrError::DuplicateLock { .. } => (Category::Placement, 103),
            PnrError::BankConflict { .. } => (Category::Placement, 104),
            PnrError::ChainDoesNotFit { .. } => (Category::Placement, 105),
            PnrError::IllegalPlacement(_) => (Category::Placement, 106),
            PnrError::TileConflict { .. } => (Category::Placement, 107),
            PnrError::NoCompatibleTile(_) => (Category::Placement, 108),
            PnrError::ChainLockConflict { .. } => (Category::Placement, 109),
            PnrError::Unroutable { .. } => (Category::Routing, 201),
            PnrError::NoPath { .. } => (Category::Routing, 202),
            PnrError::UnrealizedConstant(_) => (Category::Routing, 203),
        };
        DiagnosticCode::new(category, number)
    }

    /// Converts this error into a user-facing diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.code(), self.to_string());
        match self {
            PnrError::InvalidSeed => diag.with_help("pass a seed of 1 or more"),
            PnrError::Infeasible { kind, .. } => diag
                .with_subject(format!("{kind} sites"))
                .with_help("choose a larger device"),
            PnrError::Unroutable { net, passes, .. } => diag
                .with_subject(format!("net `{net}`"))
                .with_note(format!("congestion remained after {passes} negotiation passes"))
                .with_help("raise the pass limit or try another seed"),
            PnrError::NoPath { net, .. } => diag.with_subject(format!("net `{net}`")),
            PnrError::UnknownPort(port) | PnrError::PortNotOnPad(port) => {
                diag.with_subject(format!("port `{port}`"))
            }
            PnrError::UnknownPin { pin, .. } | PnrError::DuplicatePin { pin, .. } => {
                diag.with_subject(format!("pin `{pin}`"))
            }
            PnrError::BankConflict { bank, .. } => diag.with_subject(format!("bank {bank}")),
            PnrError::TileConflict { tile, .. } => diag
                .with_subject(tile.to_string())
                .with_note("the cells of a logic tile share one clock, enable, and reset"),
            PnrError::NoCompatibleTile(_) => {
                diag.with_help("split clock domains less finely or choose a larger device")
            }
            PnrError::UnrealizedConstant(net) => diag
                .with_subject(format!("net `{net}`"))
                .with_help("run constant realization before routing"),
            _ => diag,
        }
    }
}
