//! The read-only fabric database.

use crate::ids::{SiteId, SwitchId, TileId, WireId};
use crate::types::{CellKind, ConfigBit, ExtraBit, Location, Package, Switch, TileKind};
use weft_common::{Ident, Interner};
use std::collections::{BTreeMap, HashMap};

/// A wire's home tile and its name there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireInfo {
    /// The tile the wire was first declared in.
    pub tile: TileId,
    /// The wire's name in that tile.
    pub name: Ident,
}

/// A placement site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// The primitive kind this site hosts.
    pub kind: CellKind,
    /// The tile and slot of this site.
    pub location: Location,
}

/// Static description of one device: tiles, sites, wires, switches, and the
/// configuration bit layout.
///
/// Built once through [`FabricBuilder`](crate::FabricBuilder) and read-only
/// afterwards. Every query either succeeds or panics on an out-of-range id;
/// lookups that may legitimately miss return `Option`.
#[derive(Debug)]
pub struct Fabric {
    pub(crate) device: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) tile_kinds: Vec<TileKind>,
    pub(crate) names: Interner,
    pub(crate) wires: Vec<WireInfo>,
    pub(crate) tile_wires: Vec<HashMap<Ident, WireId>>,
    pub(crate) n_global_wires: u32,
    pub(crate) cells: Vec<Cell>,
    pub(crate) tile_slot_cells: Vec<Vec<Option<SiteId>>>,
    pub(crate) kind_cells: BTreeMap<CellKind, Vec<SiteId>>,
    pub(crate) switches: Vec<Switch>,
    pub(crate) in_switches: Vec<Vec<SwitchId>>,
    pub(crate) out_switches: Vec<Vec<SwitchId>>,
    pub(crate) pin_wires: HashMap<(SiteId, Ident), WireId>,
    pub(crate) nonrouting: BTreeMap<TileKind, BTreeMap<String, Vec<ConfigBit>>>,
    pub(crate) cell_fields: BTreeMap<SiteId, BTreeMap<String, (TileId, String)>>,
    pub(crate) extra_bits: BTreeMap<String, ExtraBit>,
    pub(crate) packages: BTreeMap<String, Package>,
}

impl Fabric {
    /// Returns the device name.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Returns the grid width in tiles.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the grid height in tiles.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the number of tiles.
    pub fn tile_count(&self) -> usize {
        self.tile_kinds.len()
    }

    /// Returns the tile at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the grid.
    pub fn tile(&self, x: u32, y: u32) -> TileId {
        assert!(x < self.width && y < self.height, "tile ({x}, {y}) outside grid");
        TileId::from_raw(x + self.width * y)
    }

    /// Returns the x coordinate of a tile.
    pub fn tile_x(&self, tile: TileId) -> u32 {
        tile.as_raw() % self.width
    }

    /// Returns the y coordinate of a tile.
    pub fn tile_y(&self, tile: TileId) -> u32 {
        tile.as_raw() / self.width
    }

    /// Returns the kind of a tile.
    pub fn tile_kind(&self, tile: TileId) -> TileKind {
        self.tile_kinds[tile.as_raw() as usize]
    }

    /// Returns the I/O bank of a perimeter tile.
    ///
    /// The left edge is bank 3, the bottom edge bank 2, the right edge bank 1
    /// and the top edge bank 0. Corner tiles resolve in that priority order.
    ///
    /// # Panics
    ///
    /// Panics if the tile is not on the device perimeter.
    pub fn tile_bank(&self, tile: TileId) -> u32 {
        let x = self.tile_x(tile);
        let y = self.tile_y(tile);
        if x == 0 {
            3
        } else if y == 0 {
            2
        } else if x == self.width - 1 {
            1
        } else {
            assert_eq!(y, self.height - 1, "{tile} is not on the perimeter");
            0
        }
    }

    /// Returns the number of wires.
    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    /// Returns the number of global wires; these are ids `0..n`.
    pub fn global_wire_count(&self) -> u32 {
        self.n_global_wires
    }

    /// Returns whether `wire` is a global (clock network) wire.
    pub fn is_global_wire(&self, wire: WireId) -> bool {
        wire.as_raw() < self.n_global_wires
    }

    /// Returns the home tile of a wire.
    pub fn wire_tile(&self, wire: WireId) -> TileId {
        self.wires[wire.as_raw() as usize].tile
    }

    /// Returns the name of a wire in its home tile.
    pub fn wire_name(&self, wire: WireId) -> &str {
        self.names.resolve(self.wires[wire.as_raw() as usize].name)
    }

    /// Looks up a wire by its name in `tile`.
    pub fn find_wire(&self, tile: TileId, name: &str) -> Option<WireId> {
        let ident = self.names.get(name)?;
        self.tile_wires[tile.as_raw() as usize].get(&ident).copied()
    }

    /// Returns the number of cells (sites).
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Iterates over all sites in cell-number order.
    pub fn cells(&self) -> impl Iterator<Item = (SiteId, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, c)| (SiteId::from_raw(i as u32 + 1), c))
    }

    /// Returns whether `site` names a cell of this fabric.
    pub fn contains_site(&self, site: SiteId) -> bool {
        site.as_raw() >= 1 && site.as_raw() as usize <= self.cells.len()
    }

    /// Returns the cell at `site`.
    pub fn cell(&self, site: SiteId) -> &Cell {
        &self.cells[site.index()]
    }

    /// Returns the kind of the cell at `site`.
    pub fn cell_kind(&self, site: SiteId) -> CellKind {
        self.cell(site).kind
    }

    /// Returns the location of the cell at `site`.
    pub fn cell_location(&self, site: SiteId) -> Location {
        self.cell(site).location
    }

    /// Returns the site at `loc`, if the slot is populated.
    pub fn loc_cell(&self, loc: Location) -> Option<SiteId> {
        self.tile_slot_cells
            .get(loc.tile.as_raw() as usize)?
            .get(loc.slot as usize)
            .copied()
            .flatten()
    }

    /// Returns all sites of a given kind in cell-number order.
    pub fn cells_of_kind(&self, kind: CellKind) -> &[SiteId] {
        self.kind_cells.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Returns the I/O bank of an I/O site.
    pub fn site_bank(&self, site: SiteId) -> Option<u32> {
        let cell = self.cell(site);
        (cell.kind == CellKind::Io).then(|| self.tile_bank(cell.location.tile))
    }

    /// Returns the number of switches.
    pub fn switch_count(&self) -> usize {
        self.switches.len()
    }

    /// Returns a switch by id.
    pub fn switch(&self, id: SwitchId) -> &Switch {
        &self.switches[id.as_raw() as usize]
    }

    /// Returns the switches that can be driven from `wire`, in id order.
    pub fn switches_from(&self, wire: WireId) -> &[SwitchId] {
        &self.in_switches[wire.as_raw() as usize]
    }

    /// Returns the switches that drive `wire`, in id order.
    pub fn switches_into(&self, wire: WireId) -> &[SwitchId] {
        &self.out_switches[wire.as_raw() as usize]
    }

    /// Returns the unique switch connecting `input` to `out`.
    ///
    /// # Panics
    ///
    /// Panics unless exactly one switch connects the pair; anything else means
    /// the database is malformed.
    pub fn find_switch(&self, input: WireId, out: WireId) -> SwitchId {
        let from = self.switches_from(input);
        let mut matches = self
            .switches_into(out)
            .iter()
            .filter(|s| from.binary_search(s).is_ok());
        let found = matches
            .next()
            .unwrap_or_else(|| panic!("no switch connects {input} to {out}"));
        assert!(
            matches.next().is_none(),
            "more than one switch connects {input} to {out}"
        );
        *found
    }

    /// Returns the wire carrying port `port` of the cell at `site`.
    ///
    /// Ports without a binding (e.g. dedicated pad pins) are not routable.
    pub fn pin_wire(&self, site: SiteId, port: &str) -> Option<WireId> {
        let ident = self.names.get(port)?;
        self.pin_wires.get(&(site, ident)).copied()
    }

    /// Returns the non-routing bits called `name` in `tile`, relocated to it.
    pub fn nonrouting_bits(&self, tile: TileId, name: &str) -> Option<Vec<ConfigBit>> {
        let bits = self.nonrouting.get(&self.tile_kind(tile))?.get(name)?;
        Some(bits.iter().map(|b| b.with_tile(tile)).collect())
    }

    /// Returns the single bit of multi-field cell option `name` on `site`.
    ///
    /// # Panics
    ///
    /// Panics if the cell has no such field or the field does not resolve to
    /// exactly one bit.
    pub fn extra_cell_cbit(&self, site: SiteId, name: &str) -> ConfigBit {
        let (tile, bit_name) = self
            .cell_fields
            .get(&site)
            .and_then(|fields| fields.get(name))
            .unwrap_or_else(|| panic!("{site} has no field `{name}`"));
        let bits = self
            .nonrouting_bits(*tile, bit_name)
            .unwrap_or_else(|| panic!("{tile} has no bit `{bit_name}`"));
        assert_eq!(bits.len(), 1, "field `{name}` of {site} is not a single bit");
        bits[0]
    }

    /// Returns whether `site` has a multi-field option called `name`.
    pub fn has_cell_field(&self, site: SiteId, name: &str) -> bool {
        self.cell_fields
            .get(&site)
            .is_some_and(|fields| fields.contains_key(name))
    }

    /// Looks up an extra (non-positional) bit by name.
    pub fn extra_bit(&self, name: &str) -> Option<ExtraBit> {
        self.extra_bits.get(name).copied()
    }

    /// Looks up a package by name.
    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    /// Iterates over package names in sorted order.
    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::FabricBuilder;
    use crate::ids::{SiteId, TileId};
    use crate::types::{CellKind, ConfigBit, Location, TileKind};

    fn perimeter_fabric() -> crate::Fabric {
        let mut b = FabricBuilder::new("t", 4, 3);
        for y in 0..3 {
            for x in 0..4 {
                let edge = x == 0 || y == 0 || x == 3 || y == 2;
                b.set_tile_kind(x, y, if edge { TileKind::Io } else { TileKind::Logic });
            }
        }
        b.finish().unwrap()
    }

    #[test]
    fn tile_index_is_row_major() {
        let f = perimeter_fabric();
        let t = f.tile(2, 1);
        assert_eq!(t, TileId::from_raw(6));
        assert_eq!(f.tile_x(t), 2);
        assert_eq!(f.tile_y(t), 1);
    }

    #[test]
    fn banks_follow_edges() {
        let f = perimeter_fabric();
        assert_eq!(f.tile_bank(f.tile(0, 1)), 3);
        assert_eq!(f.tile_bank(f.tile(1, 0)), 2);
        assert_eq!(f.tile_bank(f.tile(3, 1)), 1);
        assert_eq!(f.tile_bank(f.tile(1, 2)), 0);
        // Corners take the first matching edge.
        assert_eq!(f.tile_bank(f.tile(0, 0)), 3);
        assert_eq!(f.tile_bank(f.tile(3, 0)), 2);
    }

    #[test]
    #[should_panic(expected = "not on the perimeter")]
    fn interior_tile_has_no_bank() {
        let f = perimeter_fabric();
        f.tile_bank(f.tile(1, 1));
    }

    #[test]
    #[should_panic(expected = "outside grid")]
    fn tile_outside_grid_panics() {
        perimeter_fabric().tile(4, 0);
    }

    #[test]
    fn cells_are_numbered_from_one() {
        let mut b = FabricBuilder::new("t", 2, 1);
        b.set_tile_kind(0, 0, TileKind::Logic);
        b.set_tile_kind(1, 0, TileKind::Io);
        let lc = b.add_cell(CellKind::Logic, 0, 0, 3);
        let io = b.add_cell(CellKind::Io, 1, 0, 0);
        let f = b.finish().unwrap();

        assert_eq!(lc, SiteId::from_raw(1));
        assert_eq!(io, SiteId::from_raw(2));
        assert_eq!(f.cell_count(), 2);
        assert_eq!(f.cell_kind(io), CellKind::Io);
        assert_eq!(f.loc_cell(Location::new(f.tile(0, 0), 3)), Some(lc));
        assert_eq!(f.loc_cell(Location::new(f.tile(0, 0), 4)), None);
        assert_eq!(f.cells_of_kind(CellKind::Logic), &[lc]);
        assert!(f.cells_of_kind(CellKind::Pll).is_empty());
        assert_eq!(f.site_bank(io), Some(3));
        assert_eq!(f.site_bank(lc), None);
    }

    #[test]
    fn find_switch_resolves_unique_pair() {
        let mut b = FabricBuilder::new("t", 1, 1);
        b.set_tile_kind(0, 0, TileKind::Logic);
        let t = b.tile(0, 0);
        let a = b.add_wire(t, "a");
        let c = b.add_wire(t, "c");
        let out = b.add_wire(t, "out");
        let sw = b.add_switch(
            false,
            t,
            out,
            &[(a, 1), (c, 2)],
            vec![ConfigBit::new(t, 0, 0), ConfigBit::new(t, 0, 1)],
        );
        let f = b.finish().unwrap();

        assert_eq!(f.find_switch(a, out), sw);
        assert_eq!(f.find_switch(c, out), sw);
        assert_eq!(f.switches_from(a), &[sw]);
        assert_eq!(f.switches_into(out), &[sw]);
    }

    #[test]
    #[should_panic(expected = "no switch connects")]
    fn find_switch_without_match_panics() {
        let mut b = FabricBuilder::new("t", 1, 1);
        b.set_tile_kind(0, 0, TileKind::Logic);
        let t = b.tile(0, 0);
        let a = b.add_wire(t, "a");
        let out = b.add_wire(t, "out");
        let f = b.finish().unwrap();
        f.find_switch(a, out);
    }

    #[test]
    fn nonrouting_bits_relocate_to_tile() {
        let mut b = FabricBuilder::new("t", 2, 1);
        b.set_tile_kind(0, 0, TileKind::Logic);
        b.set_tile_kind(1, 0, TileKind::Logic);
        b.add_nonrouting_bits(TileKind::Logic, "NegClk", vec![(0, 5)]);
        let f = b.finish().unwrap();

        let t1 = f.tile(1, 0);
        assert_eq!(f.nonrouting_bits(t1, "NegClk"), Some(vec![ConfigBit::new(t1, 0, 5)]));
        assert_eq!(f.nonrouting_bits(t1, "Missing"), None);
    }

    #[test]
    fn extra_cell_cbit_resolves_field() {
        let mut b = FabricBuilder::new("t", 2, 1);
        b.set_tile_kind(0, 0, TileKind::Io);
        b.set_tile_kind(1, 0, TileKind::Io);
        let pll = b.add_cell(CellKind::Pll, 0, 0, 3);
        b.add_nonrouting_bits(TileKind::Io, "PLL.DIVR_0", vec![(2, 7)]);
        let other = b.tile(1, 0);
        b.add_cell_field(pll, "DIVR_0", other, "PLL.DIVR_0");
        let f = b.finish().unwrap();

        assert!(f.has_cell_field(pll, "DIVR_0"));
        assert_eq!(f.extra_cell_cbit(pll, "DIVR_0"), ConfigBit::new(other, 2, 7));
    }

    #[test]
    fn pin_wires_and_names() {
        let mut b = FabricBuilder::new("t", 1, 1);
        b.set_tile_kind(0, 0, TileKind::Logic);
        let t = b.tile(0, 0);
        let lc = b.add_cell(CellKind::Logic, 0, 0, 0);
        let w = b.add_wire(t, "lutff_0/out");
        b.bind_pin(lc, "O", w);
        let f = b.finish().unwrap();

        assert_eq!(f.pin_wire(lc, "O"), Some(w));
        assert_eq!(f.pin_wire(lc, "I0"), None);
        assert_eq!(f.wire_name(w), "lutff_0/out");
        assert_eq!(f.find_wire(t, "lutff_0/out"), Some(w));
        assert_eq!(f.find_wire(t, "nope"), None);
    }
}
