//! Structural elements of a fixed fabric: tile and cell kinds, locations,
//! configuration bits, switches, and packages.

use crate::ids::{TileId, WireId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The function of a tile in the device grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// No programmable resources (device corners).
    Empty,
    /// Perimeter tile with I/O pads, global buffers, and hard blocks.
    Io,
    /// Eight logic cells (LUT4 + DFF + carry) sharing clock/enable/reset.
    Logic,
    /// Lower half of a block RAM; holds the initialization bits.
    RamData,
    /// Upper half of a block RAM; holds the RAM cell and its mode bits.
    RamControl,
}

impl TileKind {
    /// Returns the number of cell slots a tile of this kind provides.
    pub fn slot_count(self) -> u8 {
        match self {
            TileKind::Logic => 8,
            TileKind::Io => 4,
            TileKind::RamControl => 1,
            TileKind::Empty | TileKind::RamData => 0,
        }
    }
}

/// The primitive kind a site can host.
///
/// Instances carry the same tag, so legality is a plain equality test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// LUT4 + DFF + carry logic cell.
    Logic,
    /// I/O pad buffer.
    Io,
    /// Global clock buffer driving one global wire.
    GlobalBuffer,
    /// Block RAM.
    Ram,
    /// Warm-boot controller.
    WarmBoot,
    /// Phase-locked loop.
    Pll,
}

impl CellKind {
    /// All kinds, in declaration order.
    pub const ALL: [CellKind; 6] = [
        CellKind::Logic,
        CellKind::Io,
        CellKind::GlobalBuffer,
        CellKind::Ram,
        CellKind::WarmBoot,
        CellKind::Pll,
    ];
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CellKind::Logic => "logic",
            CellKind::Io => "io",
            CellKind::GlobalBuffer => "global buffer",
            CellKind::Ram => "ram",
            CellKind::WarmBoot => "warmboot",
            CellKind::Pll => "pll",
        };
        f.write_str(s)
    }
}

/// A `(tile, slot)` position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    /// The tile containing the slot.
    pub tile: TileId,
    /// Slot index within the tile.
    pub slot: u8,
}

impl Location {
    /// Creates a new location.
    pub fn new(tile: TileId, slot: u8) -> Self {
        Self { tile, slot }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tile, self.slot)
    }
}

/// One physical configuration memory cell.
///
/// Totally ordered by `(tile, row, col)`, which is also the order in which
/// configurations are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigBit {
    /// The tile whose configuration block holds the bit.
    pub tile: TileId,
    /// Row within the tile block.
    pub row: u32,
    /// Column within the tile block.
    pub col: u32,
}

impl ConfigBit {
    /// Creates a new configuration bit address.
    pub fn new(tile: TileId, row: u32, col: u32) -> Self {
        Self { tile, row, col }
    }

    /// Returns the same `(row, col)` relocated into another tile.
    pub fn with_tile(self, tile: TileId) -> Self {
        Self { tile, ..self }
    }
}

impl fmt::Display for ConfigBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}][{}]", self.tile, self.row, self.col)
    }
}

/// A device-global option that is not addressed by tile position, such as a
/// per-bank I/O voltage setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExtraBit {
    /// Bank (or other block) index.
    pub bank: u32,
    /// Horizontal coordinate within the extra-bit block.
    pub x: u32,
    /// Vertical coordinate within the extra-bit block.
    pub y: u32,
}

impl ExtraBit {
    /// Creates a new extra bit address.
    pub fn new(bank: u32, x: u32, y: u32) -> Self {
        Self { bank, x, y }
    }
}

/// A configurable switch: a multiplexer driving `out` from one of `inputs`.
///
/// Selecting input `w` programs the switch's owned bits with the pattern
/// `inputs[w]`: bit `j` of the pattern goes to `cbits[j]`. Bidirectional
/// fabric elements appear as one `Switch` per direction sharing the same
/// bits, with `bidir` set on both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Switch {
    /// Whether this is one direction of a bidirectional element.
    pub bidir: bool,
    /// The tile whose configuration block holds the owned bits.
    pub tile: TileId,
    /// The wire this switch drives.
    pub out: WireId,
    /// Candidate input wires and the bit pattern selecting each.
    pub inputs: BTreeMap<WireId, u32>,
    /// The configuration bits owned by this switch.
    pub cbits: Vec<ConfigBit>,
}

impl Switch {
    /// Returns the pattern that routes `input` to `out`, if `input` is a
    /// candidate.
    pub fn pattern(&self, input: WireId) -> Option<u32> {
        self.inputs.get(&input).copied()
    }

    /// Returns the `(bit, value)` pairs that select `input`.
    ///
    /// # Panics
    ///
    /// Panics if `input` is not a candidate input of this switch.
    pub fn settings(&self, input: WireId) -> impl Iterator<Item = (ConfigBit, bool)> + '_ {
        let pattern = self
            .pattern(input)
            .unwrap_or_else(|| panic!("{input} is not an input of switch driving {}", self.out));
        self.cbits
            .iter()
            .enumerate()
            .map(move |(j, &bit)| (bit, (pattern >> j) & 1 == 1))
    }
}

/// A package: the mapping between named pins and I/O cell locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Package name, e.g. `tq32`.
    pub name: String,
    /// Pin name to pad location.
    pub pin_loc: BTreeMap<String, Location>,
    /// Pad location to pin name.
    pub loc_pin: BTreeMap<Location, String>,
}

impl Package {
    /// Creates an empty package.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Bonds `pin` to the pad at `loc`.
    pub fn add_pin(&mut self, pin: impl Into<String>, loc: Location) {
        let pin = pin.into();
        self.loc_pin.insert(loc, pin.clone());
        self.pin_loc.insert(pin, loc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_counts() {
        assert_eq!(TileKind::Logic.slot_count(), 8);
        assert_eq!(TileKind::Io.slot_count(), 4);
        assert_eq!(TileKind::RamControl.slot_count(), 1);
        assert_eq!(TileKind::RamData.slot_count(), 0);
        assert_eq!(TileKind::Empty.slot_count(), 0);
    }

    #[test]
    fn config_bits_order_by_tile_then_row_then_col() {
        let t0 = TileId::from_raw(0);
        let t1 = TileId::from_raw(1);
        let mut bits = vec![
            ConfigBit::new(t1, 0, 0),
            ConfigBit::new(t0, 2, 0),
            ConfigBit::new(t0, 1, 9),
        ];
        bits.sort();
        assert_eq!(bits[0], ConfigBit::new(t0, 1, 9));
        assert_eq!(bits[2], ConfigBit::new(t1, 0, 0));
    }

    #[test]
    fn with_tile_relocates() {
        let bit = ConfigBit::new(TileId::from_raw(0), 3, 4);
        let moved = bit.with_tile(TileId::from_raw(7));
        assert_eq!(moved, ConfigBit::new(TileId::from_raw(7), 3, 4));
    }

    #[test]
    fn switch_settings_expand_pattern() {
        let t = TileId::from_raw(0);
        let a = WireId::from_raw(1);
        let b = WireId::from_raw(2);
        let sw = Switch {
            bidir: false,
            tile: t,
            out: WireId::from_raw(3),
            inputs: [(a, 0b01), (b, 0b10)].into_iter().collect(),
            cbits: vec![ConfigBit::new(t, 0, 0), ConfigBit::new(t, 0, 1)],
        };
        let settings: Vec<_> = sw.settings(b).map(|(_, v)| v).collect();
        assert_eq!(settings, vec![false, true]);
        assert_eq!(sw.pattern(WireId::from_raw(9)), None);
    }

    #[test]
    fn package_is_bidirectional() {
        let mut pkg = Package::new("tq32");
        let loc = Location::new(TileId::from_raw(3), 1);
        pkg.add_pin("P7", loc);
        assert_eq!(pkg.pin_loc["P7"], loc);
        assert_eq!(pkg.loc_pin[&loc], "P7");
    }

    #[test]
    fn cell_kind_display() {
        assert_eq!(CellKind::GlobalBuffer.to_string(), "global buffer");
    }
}
