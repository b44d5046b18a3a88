//! Constant net realization.
//!
//! The fabric has no wire that carries a fixed level, so every constant
//! net that still feeds a cell is turned into ordinary logic before
//! placement. A LUT input tied to a level is folded into the truth table.
//! An enable tied high, or a reset or carry input tied low, is left
//! unconnected, which reads the same. Every other sink moves onto a net
//! driven by a logic cell whose LUT outputs the level.

use crate::error::PnrError;
use crate::state::Placement;
use weft_fabric::{CellKind, Fabric};
use weft_netlist::library::LOGIC_CELL;
use weft_netlist::{Const, Design, InstanceId, ModelId, NetId, NetlistError, PortId};

const LUT_INPUTS: [&str; 4] = ["I0", "I1", "I2", "I3"];
const LUT_BITS: usize = 16;

/// What [`realize_constants`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealizedConstants {
    /// Pins folded into LUT tables or left unconnected.
    pub absorbed: usize,
    /// Logic cells added to drive a level.
    pub drivers: Vec<InstanceId>,
}

/// Rewrites the constant nets of `top` so that no cell input hangs off one.
///
/// Constant nets left without connections are removed. At most one driver
/// cell per level is added; its net is named `$false` or `$true`.
pub fn realize_constants(design: &mut Design, top: ModelId) -> Result<RealizedConstants, PnrError> {
    let mut nets: Vec<NetId> = design
        .model(top)
        .nets()
        .values()
        .copied()
        .filter(|&n| design.net(n).is_constant())
        .collect();
    nets.sort_unstable();

    let mut done = RealizedConstants::default();
    let mut level_nets: [Option<NetId>; 2] = [None, None];
    for net in nets {
        let Some(level) = design.net(net).constant else {
            continue;
        };
        let sinks: Vec<PortId> = design
            .connections(net)
            .iter()
            .copied()
            .filter(|&p| design.port(p).instance().is_some() && design.port(p).is_input())
            .collect();
        for port in sinks {
            if absorb(design, port, level)? {
                design.disconnect(port);
                done.absorbed += 1;
                continue;
            }
            let driven = match level_nets[usize::from(level)] {
                Some(driven) => driven,
                None => {
                    let (inst, driven) = add_driver(design, top, level)?;
                    done.drivers.push(inst);
                    level_nets[usize::from(level)] = Some(driven);
                    driven
                }
            };
            design.connect(port, driven);
        }
        if design.connections(net).is_empty() {
            tracing::trace!(net = %design.net(net).name, "constant net realized");
            design.remove_net(net);
        }
    }

    if done.absorbed > 0 || !done.drivers.is_empty() {
        tracing::info!(
            absorbed = done.absorbed,
            drivers = done.drivers.len(),
            "constants realized"
        );
    }
    Ok(done)
}

/// Tries to make `port` read `level` without a driver, rewriting the LUT
/// table when the port is a LUT input. Returns whether that worked; the
/// caller disconnects the port.
fn absorb(design: &mut Design, port: PortId, level: bool) -> Result<bool, PnrError> {
    let pin = design.port(port);
    let Some(inst) = pin.instance() else {
        return Ok(false);
    };
    if design.instance(inst).kind != CellKind::Logic {
        return Ok(false);
    }
    let k = match (pin.name.as_str(), level) {
        ("CEN", true) | ("SR", false) | ("CIN", false) => return Ok(true),
        ("CIN", true) => return Err(PnrError::CarryInTiedHigh(design.instance_label(inst))),
        (name, _) => match LUT_INPUTS.iter().position(|&i| i == name) {
            Some(k) => k,
            None => return Ok(false),
        },
    };
    // I1 and I2 also feed the carry logic.
    if (k == 1 || k == 2) && design.param_flag(inst, "CARRY_ENABLE") {
        return Ok(false);
    }
    let Some(init) = design
        .get_param(inst, "LUT_INIT")
        .filter(|c| c.as_bits().is_some_and(|bits| bits.len() == LUT_BITS))
        .and_then(Const::to_u64)
    else {
        return Ok(false);
    };
    design.set_param(inst, "LUT_INIT", Const::from_u64(fold(init, k, level), LUT_BITS));
    Ok(true)
}

/// Returns the table that ignores input `k` and behaves as if it read
/// `level`.
fn fold(init: u64, k: usize, level: bool) -> u64 {
    (0..LUT_BITS).fold(0, |table, idx| {
        let from = if level { idx | 1 << k } else { idx & !(1 << k) };
        table | ((init >> from) & 1) << idx
    })
}

fn add_driver(design: &mut Design, top: ModelId, level: bool) -> Result<(InstanceId, NetId), PnrError> {
    let lc = design
        .primitive(CellKind::Logic)
        .ok_or_else(|| PnrError::InvalidNetlist(NetlistError::NotAPrimitive(LOGIC_CELL.into())))?;
    let inst = design.add_instance(top, lc)?;
    let table = if level { 0xFFFF } else { 0 };
    design.set_param(inst, "LUT_INIT", Const::from_u64(table, LUT_BITS));
    let net = design.add_net(top, if level { "$true" } else { "$false" });
    let out = design
        .find_instance_port(inst, "O")
        .ok_or_else(|| PnrError::InvalidNetlist(NetlistError::NotAPrimitive(LOGIC_CELL.into())))?;
    design.connect(out, net);
    tracing::debug!(net = %design.net(net).name, "constant driver added");
    Ok((inst, net))
}

/// Puts constant drivers added after placement on the lowest free logic
/// sites. Drivers have no flip-flop, so any logic site will do.
pub fn place_drivers(
    design: &Design,
    top: ModelId,
    fabric: &Fabric,
    placement: &mut Placement,
    drivers: &[InstanceId],
) -> Result<(), PnrError> {
    let mut free = fabric
        .cells_of_kind(CellKind::Logic)
        .iter()
        .copied()
        .filter(|&s| placement.occupant(s).is_none())
        .collect::<Vec<_>>()
        .into_iter();
    for &inst in drivers {
        let site = free.next().ok_or_else(|| PnrError::Infeasible {
            kind: CellKind::Logic,
            demand: design
                .model(top)
                .instances()
                .iter()
                .filter(|&&i| design.instance(i).kind == CellKind::Logic)
                .count(),
            supply: fabric.cells_of_kind(CellKind::Logic).len(),
        })?;
        placement.place(inst, site);
        tracing::debug!(instance = %design.instance_label(inst), %site, "constant driver placed");
    }
    Ok(())
}
