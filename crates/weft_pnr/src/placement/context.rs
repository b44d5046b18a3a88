//! The design and device, flattened into dense tables for the placer.

use crate::error::PnrError;
use crate::placement::carry::carry_chains;
use crate::placement::legality::ControlSet;
use crate::state::Placement;
use std::collections::BTreeMap;
use weft_fabric::{CellKind, Fabric, Location, SiteId, TileKind};
use weft_netlist::{Const, Design, InstanceId, ModelId, DEFAULT_IO_STANDARD};

/// Logic slots per tile; a column position is `y * LOGIC_SLOTS + slot`.
pub(crate) const LOGIC_SLOTS: u32 = 8;

/// A net as seen by the cost function.
#[derive(Debug, Clone)]
pub(crate) struct PlaceNet {
    pub(crate) weight: f64,
    /// Distinct member instances, by dense index.
    pub(crate) members: Vec<usize>,
}

/// Static facts about the instances and sites being placed.
///
/// Instances are addressed by dense index into `insts`, in id order.
#[derive(Debug)]
pub(crate) struct PlaceContext<'a> {
    pub(crate) fabric: &'a Fabric,
    pub(crate) insts: Vec<InstanceId>,
    pub(crate) kinds: Vec<CellKind>,
    pub(crate) locked: Vec<Option<SiteId>>,
    /// Index into `standards` for I/O instances.
    pub(crate) io_std: Vec<Option<usize>>,
    pub(crate) standards: Vec<String>,
    /// Shared tile state each logic instance needs.
    pub(crate) controls: Vec<ControlSet>,
    pub(crate) nets: Vec<PlaceNet>,
    pub(crate) inst_nets: Vec<Vec<usize>>,
    pub(crate) chains: Vec<Vec<usize>>,
    pub(crate) chain_of: Vec<Option<usize>>,
    /// `(x, y)` of every site, by `SiteId::index`.
    pub(crate) site_xy: Vec<(i32, i32)>,
}

impl<'a> PlaceContext<'a> {
    pub(crate) fn new(
        design: &Design,
        top: ModelId,
        fabric: &'a Fabric,
        locks: &Placement,
        timing_weight: f64,
    ) -> Result<Self, PnrError> {
        let insts: Vec<InstanceId> = {
            let mut v = design.model(top).instances().to_vec();
            v.sort_unstable();
            v
        };
        let index: BTreeMap<InstanceId, usize> =
            insts.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let kinds = insts.iter().map(|&i| design.instance(i).kind).collect();
        let locked = insts.iter().map(|&i| locks.site(i)).collect();

        let mut standards: Vec<String> = Vec::new();
        let io_std = insts
            .iter()
            .map(|&i| {
                if design.instance(i).kind != CellKind::Io {
                    return None;
                }
                let std = design
                    .get_param(i, "IO_STANDARD")
                    .and_then(Const::as_str)
                    .unwrap_or(DEFAULT_IO_STANDARD);
                Some(match standards.iter().position(|s| s == std) {
                    Some(k) => k,
                    None => {
                        standards.push(std.to_string());
                        standards.len() - 1
                    }
                })
            })
            .collect();

        let controls = insts.iter().map(|&i| ControlSet::of(design, i)).collect();

        let mut nets = Vec::new();
        let mut inst_nets = vec![Vec::new(); insts.len()];
        let mut net_ids: Vec<_> = design.model(top).nets().values().copied().collect();
        net_ids.sort_unstable();
        for net in net_ids {
            let mut members: Vec<usize> = design
                .connections(net)
                .iter()
                .filter_map(|&p| design.port(p).instance())
                .filter_map(|i| index.get(&i).copied())
                .collect();
            members.sort_unstable();
            members.dedup();
            if members.len() < 2 {
                continue;
            }
            let weight = if design.net(net).critical {
                timing_weight
            } else {
                1.0
            };
            for &m in &members {
                inst_nets[m].push(nets.len());
            }
            nets.push(PlaceNet { weight, members });
        }

        let mut chain_of = vec![None; insts.len()];
        let chains: Vec<Vec<usize>> = carry_chains(design, top)?
            .into_iter()
            .map(|chain| chain.into_iter().map(|i| index[&i]).collect())
            .collect();
        for (c, chain) in chains.iter().enumerate() {
            for &m in chain {
                chain_of[m] = Some(c);
            }
        }

        let site_xy = fabric
            .cells()
            .map(|(_, cell)| {
                let t = cell.location.tile;
                (fabric.tile_x(t) as i32, fabric.tile_y(t) as i32)
            })
            .collect();

        Ok(Self {
            fabric,
            insts,
            kinds,
            locked,
            io_std,
            standards,
            controls,
            nets,
            inst_nets,
            chains,
            chain_of,
            site_xy,
        })
    }

    /// Returns the grid coordinates of `site`.
    pub(crate) fn xy(&self, site: SiteId) -> (i32, i32) {
        self.site_xy[site.index()]
    }

    /// Returns whether instance `i` may be moved by placement.
    pub(crate) fn is_movable(&self, i: usize) -> bool {
        self.locked[i].is_none()
    }

    /// Returns the bank of `site` if it is an I/O site.
    pub(crate) fn bank(&self, site: SiteId) -> Option<u32> {
        self.fabric.site_bank(site)
    }

    /// Returns the logic site at column position `pos` of column `x`.
    pub(crate) fn column_site(&self, x: u32, pos: u32) -> Option<SiteId> {
        let y = pos / LOGIC_SLOTS;
        if x >= self.fabric.width() || y >= self.fabric.height() {
            return None;
        }
        let tile = self.fabric.tile(x, y);
        if self.fabric.tile_kind(tile) != TileKind::Logic {
            return None;
        }
        let site = self
            .fabric
            .loc_cell(Location::new(tile, (pos % LOGIC_SLOTS) as u8))?;
        (self.fabric.cell_kind(site) == CellKind::Logic).then_some(site)
    }

    /// Returns the column and column position of a logic site.
    pub(crate) fn column_pos(&self, site: SiteId) -> (u32, u32) {
        let loc = self.fabric.cell_location(site);
        let x = self.fabric.tile_x(loc.tile);
        let y = self.fabric.tile_y(loc.tile);
        (x, y * LOGIC_SLOTS + u32::from(loc.slot))
    }

    /// Returns the sites a run of `len` cells would occupy starting at
    /// column position `pos` of column `x`, if all of them exist.
    pub(crate) fn column_run(&self, x: u32, pos: u32, len: usize) -> Option<Vec<SiteId>> {
        (0..len as u32)
            .map(|k| self.column_site(x, pos + k))
            .collect()
    }

    /// Returns the logic sites of the tile holding `site`, in slot order.
    pub(crate) fn tile_sites(&self, site: SiteId) -> Vec<SiteId> {
        let tile = self.fabric.cell_location(site).tile;
        (0..LOGIC_SLOTS as u8)
            .filter_map(|slot| self.fabric.loc_cell(Location::new(tile, slot)))
            .filter(|&s| self.fabric.cell_kind(s) == CellKind::Logic)
            .collect()
    }

    /// Describes instance `i` for messages.
    pub(crate) fn label(&self, design: &Design, i: usize) -> String {
        design.instance_label(self.insts[i])
    }
}
