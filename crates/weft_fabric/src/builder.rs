//! Incremental construction of a [`Fabric`].
//!
//! Loaders (text chip databases, pre-compiled binaries, procedural
//! generators) feed tiles, wires, cells, and switches into a
//! [`FabricBuilder`]; [`FabricBuilder::finish`] validates the result and
//! freezes it.

use crate::fabric::{Cell, Fabric, WireInfo};
use crate::ids::{SiteId, SwitchId, TileId, WireId};
use crate::types::{CellKind, ConfigBit, ExtraBit, Location, Package, Switch, TileKind};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use weft_common::{Ident, Interner};

/// Errors detected while freezing a fabric description.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FabricError {
    /// Two switches connect the same input to the same output.
    #[error("more than one switch connects {input} to {out}")]
    DuplicateSwitch {
        /// The shared input wire.
        input: WireId,
        /// The shared output wire.
        out: WireId,
    },

    /// A switch pattern does not fit in the switch's owned bits.
    #[error("switch driving {out} selects {input} with pattern {pattern:#b}, wider than its {width} bits")]
    PatternTooWide {
        /// The switch's output wire.
        out: WireId,
        /// The input whose pattern is too wide.
        input: WireId,
        /// The offending pattern.
        pattern: u32,
        /// Number of bits owned by the switch.
        width: usize,
    },

    /// A switch pattern is all zeros, which is indistinguishable from "off".
    #[error("switch driving {out} selects {input} with an all-zero pattern")]
    ZeroPattern {
        /// The switch's output wire.
        out: WireId,
        /// The input with the zero pattern.
        input: WireId,
    },

    /// A wire has two different ids in the same tile.
    #[error("wire `{name}` declared twice in {tile}")]
    DuplicateWireName {
        /// The tile.
        tile: TileId,
        /// The repeated name.
        name: String,
    },

    /// A cell was placed into a slot that already holds one.
    #[error("slot {0} already holds a cell")]
    OccupiedSlot(Location),

    /// A cell was placed into a slot its tile does not have.
    #[error("slot {loc} does not exist in a {kind:?} tile")]
    NoSuchSlot {
        /// The requested location.
        loc: Location,
        /// The kind of the tile.
        kind: TileKind,
    },

    /// A global wire was declared after a non-global one.
    #[error("global wire `{0}` declared after local wires")]
    LateGlobalWire(String),

    /// No device of that name is known.
    #[error("unknown device `{0}`")]
    UnknownDevice(String),
}

/// Builder for a [`Fabric`].
///
/// Validation that needs the complete picture (duplicate switches, pattern
/// widths) is deferred to [`finish`](Self::finish); per-call problems are
/// recorded and reported there as well so that call sites stay linear.
#[derive(Debug)]
pub struct FabricBuilder {
    fabric: Fabric,
    errors: Vec<FabricError>,
}

impl FabricBuilder {
    /// Starts a fabric of `width × height` tiles, all [`TileKind::Empty`].
    pub fn new(device: impl Into<String>, width: u32, height: u32) -> Self {
        let n_tiles = (width * height) as usize;
        Self {
            fabric: Fabric {
                device: device.into(),
                width,
                height,
                tile_kinds: vec![TileKind::Empty; n_tiles],
                names: Interner::new(),
                wires: Vec::new(),
                tile_wires: vec![HashMap::new(); n_tiles],
                n_global_wires: 0,
                cells: Vec::new(),
                tile_slot_cells: vec![Vec::new(); n_tiles],
                kind_cells: BTreeMap::new(),
                switches: Vec::new(),
                in_switches: Vec::new(),
                out_switches: Vec::new(),
                pin_wires: HashMap::new(),
                nonrouting: BTreeMap::new(),
                cell_fields: BTreeMap::new(),
                extra_bits: BTreeMap::new(),
                packages: BTreeMap::new(),
            },
            errors: Vec::new(),
        }
    }

    /// Returns the tile id at `(x, y)`.
    pub fn tile(&self, x: u32, y: u32) -> TileId {
        self.fabric.tile(x, y)
    }

    /// Returns the kind assigned to `(x, y)` so far.
    pub fn tile_kind(&self, x: u32, y: u32) -> TileKind {
        self.fabric.tile_kind(self.tile(x, y))
    }

    /// Looks up a wire declared so far by its name in `tile`.
    pub fn find_wire(&self, tile: TileId, name: &str) -> Option<WireId> {
        self.fabric.find_wire(tile, name)
    }

    /// Sets the kind of the tile at `(x, y)`.
    pub fn set_tile_kind(&mut self, x: u32, y: u32, kind: TileKind) {
        let t = self.tile(x, y).as_raw() as usize;
        self.fabric.tile_kinds[t] = kind;
        self.fabric.tile_slot_cells[t] = vec![None; kind.slot_count() as usize];
    }

    /// Declares a global (clock network) wire homed in `tile`.
    ///
    /// All global wires must be declared before any local wire so that they
    /// occupy the lowest ids.
    pub fn add_global_wire(&mut self, tile: TileId, name: &str) -> WireId {
        if self.fabric.wires.len() as u32 != self.fabric.n_global_wires {
            self.errors.push(FabricError::LateGlobalWire(name.to_string()));
        }
        let wire = self.add_wire(tile, name);
        self.fabric.n_global_wires += 1;
        wire
    }

    /// Declares a new wire homed in `tile` under `name`.
    pub fn add_wire(&mut self, tile: TileId, name: &str) -> WireId {
        let id = WireId::from_raw(self.fabric.wires.len() as u32);
        let ident = self.fabric.names.get_or_intern(name);
        self.fabric.wires.push(WireInfo { tile, name: ident });
        self.fabric.in_switches.push(Vec::new());
        self.fabric.out_switches.push(Vec::new());
        self.name_wire(tile, ident, id);
        id
    }

    /// Gives an existing wire an additional name in another tile.
    ///
    /// Long wires span several tiles and are known by a different local name
    /// in each of them.
    pub fn alias_wire(&mut self, wire: WireId, tile: TileId, name: &str) {
        let ident = self.fabric.names.get_or_intern(name);
        self.name_wire(tile, ident, wire);
    }

    fn name_wire(&mut self, tile: TileId, ident: Ident, wire: WireId) {
        let names = &mut self.fabric.tile_wires[tile.as_raw() as usize];
        if let Some(&existing) = names.get(&ident) {
            if existing != wire {
                self.errors.push(FabricError::DuplicateWireName {
                    tile,
                    name: self.fabric.names.resolve(ident).to_string(),
                });
            }
            return;
        }
        names.insert(ident, wire);
    }

    /// Adds a cell of `kind` at slot `slot` of tile `(x, y)`.
    pub fn add_cell(&mut self, kind: CellKind, x: u32, y: u32, slot: u8) -> SiteId {
        let tile = self.tile(x, y);
        let loc = Location::new(tile, slot);
        let id = SiteId::from_raw(self.fabric.cells.len() as u32 + 1);
        let slots = &mut self.fabric.tile_slot_cells[tile.as_raw() as usize];
        match slots.get_mut(slot as usize) {
            None => self.errors.push(FabricError::NoSuchSlot {
                loc,
                kind: self.fabric.tile_kinds[tile.as_raw() as usize],
            }),
            Some(Some(_)) => self.errors.push(FabricError::OccupiedSlot(loc)),
            Some(entry @ None) => *entry = Some(id),
        }
        self.fabric.cells.push(Cell {
            kind,
            location: loc,
        });
        self.fabric.kind_cells.entry(kind).or_default().push(id);
        id
    }

    /// Adds a switch driving `out` from each `(input, pattern)` pair.
    pub fn add_switch(
        &mut self,
        bidir: bool,
        tile: TileId,
        out: WireId,
        inputs: &[(WireId, u32)],
        cbits: Vec<ConfigBit>,
    ) -> SwitchId {
        let id = SwitchId::from_raw(self.fabric.switches.len() as u32);
        for &(input, pattern) in inputs {
            if pattern == 0 {
                self.errors.push(FabricError::ZeroPattern { out, input });
            } else if cbits.len() < 32 && pattern >> cbits.len() != 0 {
                self.errors.push(FabricError::PatternTooWide {
                    out,
                    input,
                    pattern,
                    width: cbits.len(),
                });
            }
            self.fabric.in_switches[input.as_raw() as usize].push(id);
        }
        self.fabric.out_switches[out.as_raw() as usize].push(id);
        self.fabric.switches.push(Switch {
            bidir,
            tile,
            out,
            inputs: inputs.iter().copied().collect(),
            cbits,
        });
        id
    }

    /// Binds port `port` of the cell at `site` to `wire`.
    pub fn bind_pin(&mut self, site: SiteId, port: &str, wire: WireId) {
        let ident = self.fabric.names.get_or_intern(port);
        self.fabric.pin_wires.insert((site, ident), wire);
    }

    /// Declares a non-routing bit template `name` for every tile of `kind`.
    /// Bits are given as `(row, col)` and relocated per tile on lookup.
    pub fn add_nonrouting_bits(&mut self, kind: TileKind, name: &str, bits: Vec<(u32, u32)>) {
        let bits = bits
            .into_iter()
            .map(|(row, col)| ConfigBit::new(TileId::from_raw(0), row, col))
            .collect();
        self.fabric
            .nonrouting
            .entry(kind)
            .or_default()
            .insert(name.to_string(), bits);
    }

    /// Declares that option `field` of the cell at `site` is the single
    /// non-routing bit `bit_name` of `tile`.
    pub fn add_cell_field(&mut self, site: SiteId, field: &str, tile: TileId, bit_name: &str) {
        self.fabric
            .cell_fields
            .entry(site)
            .or_default()
            .insert(field.to_string(), (tile, bit_name.to_string()));
    }

    /// Declares a named extra bit.
    pub fn add_extra_bit(&mut self, name: &str, bit: ExtraBit) {
        self.fabric.extra_bits.insert(name.to_string(), bit);
    }

    /// Adds a package.
    pub fn add_package(&mut self, package: Package) {
        self.fabric.packages.insert(package.name.clone(), package);
    }

    /// Validates and freezes the fabric.
    ///
    /// Returns the first problem found, in the order the offending calls were
    /// made, followed by whole-database checks.
    pub fn finish(mut self) -> Result<Fabric, FabricError> {
        if let Some(err) = self.errors.drain(..).next() {
            return Err(err);
        }

        let mut pairs = BTreeSet::new();
        for sw in &self.fabric.switches {
            for &input in sw.inputs.keys() {
                if !pairs.insert((input, sw.out)) {
                    return Err(FabricError::DuplicateSwitch { input, out: sw.out });
                }
            }
        }

        for list in self
            .fabric
            .in_switches
            .iter_mut()
            .chain(self.fabric.out_switches.iter_mut())
        {
            list.sort_unstable();
            list.dedup();
        }

        tracing::debug!(
            device = %self.fabric.device,
            tiles = self.fabric.tile_kinds.len(),
            cells = self.fabric.cells.len(),
            wires = self.fabric.wires.len(),
            switches = self.fabric.switches.len(),
            "fabric finalized"
        );
        Ok(self.fabric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_tile() -> (FabricBuilder, TileId) {
        let mut b = FabricBuilder::new("t", 1, 1);
        b.set_tile_kind(0, 0, TileKind::Logic);
        let t = b.tile(0, 0);
        (b, t)
    }

    #[test]
    fn duplicate_switch_rejected() {
        let (mut b, t) = one_tile();
        let a = b.add_wire(t, "a");
        let o = b.add_wire(t, "o");
        let bit = ConfigBit::new(t, 0, 0);
        b.add_switch(false, t, o, &[(a, 1)], vec![bit]);
        b.add_switch(false, t, o, &[(a, 1)], vec![bit]);
        assert_eq!(
            b.finish().unwrap_err(),
            FabricError::DuplicateSwitch { input: a, out: o }
        );
    }

    #[test]
    fn pattern_wider_than_bits_rejected() {
        let (mut b, t) = one_tile();
        let a = b.add_wire(t, "a");
        let o = b.add_wire(t, "o");
        b.add_switch(false, t, o, &[(a, 0b100)], vec![ConfigBit::new(t, 0, 0)]);
        assert!(matches!(
            b.finish(),
            Err(FabricError::PatternTooWide { width: 1, .. })
        ));
    }

    #[test]
    fn zero_pattern_rejected() {
        let (mut b, t) = one_tile();
        let a = b.add_wire(t, "a");
        let o = b.add_wire(t, "o");
        b.add_switch(false, t, o, &[(a, 0)], vec![ConfigBit::new(t, 0, 0)]);
        assert_eq!(
            b.finish().unwrap_err(),
            FabricError::ZeroPattern { out: o, input: a }
        );
    }

    #[test]
    fn occupied_and_missing_slots_rejected() {
        let (mut b, _) = one_tile();
        b.add_cell(CellKind::Logic, 0, 0, 0);
        b.add_cell(CellKind::Logic, 0, 0, 0);
        assert!(matches!(b.finish(), Err(FabricError::OccupiedSlot(_))));

        let (mut b, _) = one_tile();
        b.add_cell(CellKind::Logic, 0, 0, 8);
        assert!(matches!(b.finish(), Err(FabricError::NoSuchSlot { .. })));
    }

    #[test]
    fn global_wires_must_come_first() {
        let (mut b, t) = one_tile();
        b.add_wire(t, "local");
        b.add_global_wire(t, "glb_netwk_0");
        assert_eq!(
            b.finish().unwrap_err(),
            FabricError::LateGlobalWire("glb_netwk_0".into())
        );
    }

    #[test]
    fn aliases_share_one_wire() {
        let mut b = FabricBuilder::new("t", 2, 1);
        b.set_tile_kind(0, 0, TileKind::Logic);
        b.set_tile_kind(1, 0, TileKind::Logic);
        let t0 = b.tile(0, 0);
        let t1 = b.tile(1, 0);
        let g = b.add_global_wire(t0, "glb_netwk_0");
        b.alias_wire(g, t1, "glb_netwk_0");
        let local = b.add_wire(t1, "local_g0");
        let f = b.finish().unwrap();

        assert_eq!(f.find_wire(t1, "glb_netwk_0"), Some(g));
        assert_eq!(f.wire_tile(g), t0);
        assert!(f.is_global_wire(g));
        assert!(!f.is_global_wire(local));
        assert_eq!(f.global_wire_count(), 1);
    }

    #[test]
    fn conflicting_alias_rejected() {
        let (mut b, t) = one_tile();
        let a = b.add_wire(t, "a");
        let _ = a;
        let other = b.add_wire(t, "b");
        b.alias_wire(other, t, "a");
        assert!(matches!(
            b.finish(),
            Err(FabricError::DuplicateWireName { .. })
        ));
    }
}
