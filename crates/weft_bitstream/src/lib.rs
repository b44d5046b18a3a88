//! Configuration assembly for the weft flow.
//!
//! [`assemble`] walks a placed and routed design and writes the option bits
//! of every placed cell and the selection bits of every used switch into a
//! [`Configuration`]. Serializing that map to a device bitstream format is
//! left to the consumer, which reads it through [`Configuration::iter`] and
//! [`Configuration::extra_bits`].
//!
//! Cell options are read from instance parameters:
//!
//! | Cell | Parameters | Bits |
//! |---|---|---|
//! | logic | `LUT_INIT`, `CARRY_ENABLE`, `DFF_ENABLE`, `SET_NORESET`, `ASYNC_SR` | `LC_<slot>` |
//! | logic | `NEG_CLK` of flip-flops | tile-wide `NegClk` |
//! | I/O | `PIN_TYPE`, `PULLUP` | `IOB_<slot>.PINTYPE`, `IOB_<slot>.PULLUP` |
//! | I/O | `IO_STANDARD` | extra bit `IO_STANDARD.<std>.bank<n>` |
//! | RAM | `READ_MODE`, `WRITE_MODE`, `INIT_0`..`INIT_F` | control tile, data tile below |
//! | PLL | `DIVR`, `DIVF`, `DIVQ`, `FILTER_RANGE`, `FEEDBACK_PATH` | per-bit cell fields |

#![warn(missing_docs)]

pub mod assemble;
pub mod configuration;
pub mod error;

pub use assemble::assemble;
pub use configuration::Configuration;
pub use error::AssemblyError;
