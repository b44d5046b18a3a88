//! Errors reported by netlist construction and checking.

/// A problem with the structure of a netlist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetlistError {
    /// Two models share a name.
    #[error("model name `{0}` conflicts with another defined model")]
    DuplicateModel(String),

    /// A model without a primitive kind was instantiated.
    #[error("model `{0}` is not a fabric primitive and cannot be instantiated")]
    NotAPrimitive(String),

    /// A net has no connections.
    #[error("net `{0}` has no connections")]
    Unconnected(String),

    /// A net has no driver, or more than one.
    #[error("net `{net}` has {drivers} drivers, expected exactly one")]
    DriverCount {
        /// The net name.
        net: String,
        /// Number of drivers found, counting a constant as one.
        drivers: usize,
    },

    /// A net drives nothing.
    #[error("net `{0}` has no inputs")]
    NoInput(String),

    /// A bidirectional port outside a pad connection.
    #[error("bidirectional port `{port}` on net `{net}` is not connected to a package pin")]
    IllegalBidir {
        /// The port name.
        port: String,
        /// The net name.
        net: String,
    },
}
