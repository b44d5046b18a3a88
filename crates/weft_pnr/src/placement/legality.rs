//! Placement legality: I/O bank uniformity, shared logic tile controls,
//! and the final whole-placement check.

use crate::error::PnrError;
use crate::placement::carry::carry_chains;
use crate::placement::context::LOGIC_SLOTS;
use crate::state::Placement;
use std::collections::BTreeMap;
use weft_fabric::{CellKind, Fabric, SiteId, TileId};
use weft_netlist::{Const, Design, InstanceId, ModelId, NetId, DEFAULT_IO_STANDARD};

/// How a logic cell uses one of its tile's shared control wires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Control {
    /// Unconnected on a cell without a flip-flop; anything goes.
    Free,
    /// Unconnected on a flip-flop; the shared wire must stay undriven.
    Open,
    /// Driven by this net.
    Net(NetId),
}

impl Control {
    fn clashes(self, other: Control) -> bool {
        self != other && self != Control::Free && other != Control::Free
    }
}

/// What a logic cell needs from the state its tile shares: the clock,
/// clock enable, and set/reset wires, and the clock polarity bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct ControlSet {
    pub(crate) clk: Control,
    pub(crate) cen: Control,
    pub(crate) sr: Control,
    /// Negative-edge clocking, for cells with a flip-flop.
    pub(crate) neg_clk: Option<bool>,
}

impl ControlSet {
    pub(crate) const FREE: ControlSet = ControlSet {
        clk: Control::Free,
        cen: Control::Free,
        sr: Control::Free,
        neg_clk: None,
    };

    /// Reads the control set of `inst`. Only logic cells have one.
    pub(crate) fn of(design: &Design, inst: InstanceId) -> ControlSet {
        if design.instance(inst).kind != CellKind::Logic {
            return ControlSet::FREE;
        }
        let dff = design.param_flag(inst, "DFF_ENABLE");
        let pin = |name: &str| {
            match design
                .find_instance_port(inst, name)
                .and_then(|p| design.port(p).connection())
            {
                Some(net) => Control::Net(net),
                None if dff => Control::Open,
                None => Control::Free,
            }
        };
        ControlSet {
            clk: pin("CLK"),
            cen: pin("CEN"),
            sr: pin("SR"),
            neg_clk: dff.then(|| design.param_flag(inst, "NEG_CLK")),
        }
    }

    pub(crate) fn is_free(&self) -> bool {
        *self == ControlSet::FREE
    }

    /// Returns the first shared resource two cells disagree on.
    pub(crate) fn conflict(&self, other: &ControlSet) -> Option<&'static str> {
        if self.clk.clashes(other.clk) {
            Some("clock nets")
        } else if self.cen.clashes(other.cen) {
            Some("clock enable nets")
        } else if self.sr.clashes(other.sr) {
            Some("set/reset nets")
        } else {
            match (self.neg_clk, other.neg_clk) {
                (Some(a), Some(b)) if a != b => Some("clock polarity"),
                _ => None,
            }
        }
    }
}

/// Counts of I/O instances per standard in each bank.
///
/// Standards are small indices handed out by the caller.
#[derive(Debug, Clone, Default)]
pub(crate) struct BankTracker {
    counts: BTreeMap<u32, BTreeMap<usize, usize>>,
}

impl BankTracker {
    pub(crate) fn add(&mut self, bank: u32, std: usize) {
        *self.counts.entry(bank).or_default().entry(std).or_default() += 1;
    }

    pub(crate) fn remove(&mut self, bank: u32, std: usize) {
        if let Some(stds) = self.counts.get_mut(&bank) {
            if let Some(c) = stds.get_mut(&std) {
                *c -= 1;
                if *c == 0 {
                    stds.remove(&std);
                }
            }
        }
    }

    /// Returns a standard other than `std` present in `bank`, not counting
    /// one instance of standard `leaving` that is about to move out.
    pub(crate) fn conflict(&self, bank: u32, std: usize, leaving: Option<usize>) -> Option<usize> {
        let stds = self.counts.get(&bank)?;
        stds.iter().find_map(|(&k, &c)| {
            let c = c - usize::from(leaving == Some(k));
            (c > 0 && k != std).then_some(k)
        })
    }
}

/// Checks that `placement` is a legal, complete placement of `top`.
///
/// Every instance must sit on a site of its own kind with no site shared,
/// all I/O instances within a bank must use one I/O standard, the logic
/// cells of a tile must agree on its shared controls, and every carry chain
/// must occupy consecutive logic slots of a single column.
pub fn check_placement(
    design: &Design,
    top: ModelId,
    fabric: &Fabric,
    placement: &Placement,
) -> Result<(), PnrError> {
    let mut taken: BTreeMap<SiteId, String> = BTreeMap::new();
    let mut banks: BTreeMap<u32, String> = BTreeMap::new();
    let mut tiles: BTreeMap<TileId, Vec<(InstanceId, ControlSet)>> = BTreeMap::new();

    for &inst in design.model(top).instances() {
        let label = design.instance_label(inst);
        let site = placement
            .site(inst)
            .ok_or_else(|| PnrError::IllegalPlacement(format!("{label} is not placed")))?;
        if !fabric.contains_site(site) {
            return Err(PnrError::IllegalPlacement(format!(
                "{label} is placed on nonexistent {site}"
            )));
        }
        if let Some(first) = taken.insert(site, label.clone()) {
            return Err(PnrError::IllegalPlacement(format!(
                "{first} and {label} share {site}"
            )));
        }
        let kind = design.instance(inst).kind;
        let site_kind = fabric.cell_kind(site);
        if kind != site_kind {
            return Err(PnrError::IllegalPlacement(format!(
                "{label} is a {kind} cell on a {site_kind} site"
            )));
        }
        if let Some(bank) = fabric.site_bank(site) {
            let std = design
                .get_param(inst, "IO_STANDARD")
                .and_then(Const::as_str)
                .unwrap_or(DEFAULT_IO_STANDARD);
            match banks.get(&bank) {
                Some(first) if first != std => {
                    return Err(PnrError::BankConflict {
                        bank,
                        first: first.clone(),
                        second: std.to_string(),
                    })
                }
                Some(_) => {}
                None => {
                    banks.insert(bank, std.to_string());
                }
            }
        }
        if kind == CellKind::Logic {
            let tile = fabric.cell_location(site).tile;
            let controls = ControlSet::of(design, inst);
            let members = tiles.entry(tile).or_default();
            for &(other, theirs) in members.iter() {
                if let Some(signal) = theirs.conflict(&controls) {
                    return Err(PnrError::TileConflict {
                        tile,
                        signal,
                        first: design.instance_label(other),
                        second: label,
                    });
                }
            }
            members.push((inst, controls));
        }
    }

    for chain in carry_chains(design, top)? {
        let mut prev: Option<(u32, u32)> = None;
        for &inst in &chain {
            let Some(site) = placement.site(inst) else {
                continue;
            };
            let loc = fabric.cell_location(site);
            let x = fabric.tile_x(loc.tile);
            let pos = fabric.tile_y(loc.tile) * LOGIC_SLOTS + u32::from(loc.slot);
            if let Some((px, ppos)) = prev {
                if px != x || ppos + 1 != pos {
                    return Err(PnrError::IllegalPlacement(format!(
                        "carry chain breaks at {}",
                        design.instance_label(inst)
                    )));
                }
            }
            prev = Some((x, pos));
        }
    }

    Ok(())
}
