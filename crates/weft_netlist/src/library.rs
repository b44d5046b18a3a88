//! Library models for the fabric primitives.
//!
//! A packed netlist instantiates exactly these models. Each carries its
//! [`CellKind`], its port list, and the parameter defaults that
//! configuration assembly falls back to.

use crate::constant::Const;
use crate::design::Design;
use crate::error::NetlistError;
use crate::port::Direction;
use weft_fabric::CellKind;

/// Packed logic cell: LUT4, flip-flop, and carry.
pub const LOGIC_CELL: &str = "ICESTORM_LC";
/// I/O pad buffer.
pub const IO_CELL: &str = "SB_IO";
/// Global buffer.
pub const GLOBAL_BUFFER: &str = "SB_GB";
/// Block RAM.
pub const RAM_CELL: &str = "SB_RAM40_4K";
/// Warm-boot controller.
pub const WARMBOOT_CELL: &str = "SB_WARMBOOT";
/// Phase-locked loop.
pub const PLL_CELL: &str = "SB_PLL40_CORE";

/// The I/O standard an `SB_IO` uses unless told otherwise.
pub const DEFAULT_IO_STANDARD: &str = "SB_LVCMOS";

/// Adds the six primitive models to `design`.
pub fn add_fabric_library(design: &mut Design) -> Result<(), NetlistError> {
    use Direction::{In, InOut, Out};

    let lc = design.add_model(LOGIC_CELL, Some(CellKind::Logic))?;
    for name in ["I0", "I1", "I2", "I3", "CIN", "CLK", "CEN", "SR"] {
        design.add_model_port(lc, name, In);
    }
    for name in ["O", "COUT"] {
        design.add_model_port(lc, name, Out);
    }
    design.set_model_param(lc, "LUT_INIT", Const::from_u64(0, 16));
    for name in [
        "NEG_CLK",
        "CARRY_ENABLE",
        "DFF_ENABLE",
        "SET_NORESET",
        "ASYNC_SR",
    ] {
        design.set_model_param(lc, name, Const::from_u64(0, 1));
    }

    let io = design.add_model(IO_CELL, Some(CellKind::Io))?;
    design.add_model_port(io, "PACKAGE_PIN", InOut);
    for name in ["D_OUT_0", "OUTPUT_ENABLE"] {
        design.add_model_port(io, name, In);
    }
    design.add_model_port(io, "D_IN_0", Out);
    design.set_model_param(io, "PIN_TYPE", Const::from_u64(0, 6));
    design.set_model_param(io, "PULLUP", Const::from_u64(0, 1));
    design.set_model_param(io, "IO_STANDARD", Const::string(DEFAULT_IO_STANDARD));

    let gb = design.add_model(GLOBAL_BUFFER, Some(CellKind::GlobalBuffer))?;
    design.add_model_port(gb, "USER_SIGNAL_TO_GLOBAL_BUFFER", In);
    design.add_model_port(gb, "GLOBAL_BUFFER_OUTPUT", Out);

    let ram = design.add_model(RAM_CELL, Some(CellKind::Ram))?;
    for bus in ["WDATA", "RADDR", "WADDR"] {
        for i in 0..4 {
            design.add_model_port(ram, format!("{bus}_{i}"), In);
        }
    }
    for name in ["WE", "RE", "WCLK", "RCLK"] {
        design.add_model_port(ram, name, In);
    }
    for i in 0..4 {
        design.add_model_port(ram, format!("RDATA_{i}"), Out);
    }
    design.set_model_param(ram, "READ_MODE", Const::from_u64(0, 2));
    design.set_model_param(ram, "WRITE_MODE", Const::from_u64(0, 2));
    for i in 0..16 {
        design.set_model_param(ram, format!("INIT_{i:X}"), Const::from_u64(0, 256));
    }

    let wb = design.add_model(WARMBOOT_CELL, Some(CellKind::WarmBoot))?;
    for name in ["BOOT", "S0", "S1"] {
        design.add_model_port(wb, name, In);
    }

    let pll = design.add_model(PLL_CELL, Some(CellKind::Pll))?;
    design.add_model_port(pll, "PACKAGEPIN", InOut);
    design.add_model_port(pll, "REFERENCECLK", In);
    design.add_model_port(pll, "PLLOUTCORE", Out);
    for (name, width) in [("DIVR", 4), ("DIVF", 7), ("DIVQ", 3), ("FILTER_RANGE", 3)] {
        design.set_model_param(pll, name, Const::from_u64(0, width));
    }
    design.set_model_param(pll, "FEEDBACK_PATH", Const::string("SIMPLE"));

    Ok(())
}
