//! Procedurally generated devices.
//!
//! The generated fabrics are laid out like a small iCE40: a perimeter of I/O
//! tiles with empty corners, an interior of logic tiles, and optionally one
//! column of block RAM. Every non-empty tile carries six tracks that connect
//! to the same track index in each neighbour, so any two tiles are reachable
//! through the mesh.
//!
//! Routing muxes select input `i` (1-based) with pattern `i` and own
//! `ceil(log2(n + 1))` bits. Non-routing bits come first in each tile, at the
//! same offsets for every tile of a kind; routing bits follow.

use crate::builder::{FabricBuilder, FabricError};
use crate::fabric::Fabric;
use crate::ids::{SiteId, TileId, WireId};
use crate::types::{CellKind, ConfigBit, ExtraBit, Location, Package, TileKind};

/// Number of global clock wires.
pub const GLOBAL_WIRES: u32 = 8;

/// Number of general-purpose tracks in every tile.
pub const TRACKS: u32 = 6;

const LOCAL_WIRES: u32 = 8;
const BITS_PER_ROW: u32 = 64;

/// I/O standards that need a per-bank extra bit. `SB_LVCMOS` is the default.
pub const IO_STANDARDS: [&str; 2] = ["SB_LVDS_INPUT", "SB_SSTL18_FULL"];

const PLL_FIELDS: [(&str, u32); 5] = [
    ("DIVR", 4),
    ("DIVF", 7),
    ("DIVQ", 3),
    ("FILTER_RANGE", 3),
    ("FEEDBACK_PATH", 3),
];

const RAM_INPUTS: [&str; 16] = [
    "WDATA_0", "WDATA_1", "WDATA_2", "WDATA_3", "RADDR_0", "RADDR_1", "RADDR_2", "RADDR_3",
    "WADDR_0", "WADDR_1", "WADDR_2", "WADDR_3", "WE", "RE", "WCLK", "RCLK",
];

/// Parameters of one generated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSpec {
    /// Device name.
    pub name: &'static str,
    /// Grid width in tiles.
    pub width: u32,
    /// Grid height in tiles.
    pub height: u32,
    /// Interior column holding block RAM, if any.
    pub ram_column: Option<u32>,
    /// Name of the single package, which bonds every I/O pad.
    pub package: &'static str,
}

/// Devices known to [`load_device`].
pub const DEVICES: [DeviceSpec; 3] = [
    DeviceSpec {
        name: "mini-4x4",
        width: 4,
        height: 4,
        ram_column: None,
        package: "tq16",
    },
    DeviceSpec {
        name: "mini-6x6",
        width: 6,
        height: 6,
        ram_column: Some(2),
        package: "tq32",
    },
    DeviceSpec {
        name: "mini-8x8",
        width: 8,
        height: 8,
        ram_column: Some(3),
        package: "tq48",
    },
];

/// Builds the device called `name`.
///
/// ```
/// let fabric = weft_fabric::load_device("mini-4x4").unwrap();
/// assert_eq!(fabric.width(), 4);
/// assert!(fabric.package("tq16").is_some());
/// ```
pub fn load_device(name: &str) -> Result<Fabric, FabricError> {
    let spec = DEVICES
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| FabricError::UnknownDevice(name.to_string()))?;
    mini_device(spec)
}

/// Returns the names of all known devices.
pub fn device_names() -> impl Iterator<Item = &'static str> {
    DEVICES.iter().map(|d| d.name)
}

/// Generates a fabric from `spec`.
///
/// The grid must be at least 4×4 so that every side has two I/O tiles for
/// the global buffers.
pub fn mini_device(spec: &DeviceSpec) -> Result<Fabric, FabricError> {
    assert!(
        spec.width >= 4 && spec.height >= 4,
        "device `{}` is smaller than 4x4",
        spec.name
    );
    let mut gen = Generator::new(spec);
    gen.lay_out_tiles();
    gen.declare_wires();
    gen.place_cells();
    gen.connect();
    gen.add_extra_bits();
    gen.b.finish()
}

/// Non-routing bit templates of a tile kind, as `(name, width)` in bit order.
fn templates(kind: TileKind) -> Vec<(String, u32)> {
    let mut t = Vec::new();
    match kind {
        TileKind::Logic => {
            for k in 0..8 {
                t.push((format!("LC_{k}"), 20));
            }
            t.push(("NegClk".to_string(), 1));
        }
        TileKind::Io => {
            for k in 0..2 {
                t.push((format!("IOB_{k}.PINTYPE"), 6));
                t.push((format!("IOB_{k}.PULLUP"), 1));
            }
            for (field, width) in PLL_FIELDS {
                for i in 0..width {
                    t.push((format!("PLL.{field}_{i}"), 1));
                }
            }
        }
        TileKind::RamControl => {
            t.push(("RamConfig.READ_MODE".to_string(), 2));
            t.push(("RamConfig.WRITE_MODE".to_string(), 2));
        }
        TileKind::RamData => {
            for i in 0..16 {
                t.push((format!("INIT_{i:X}"), 256));
            }
        }
        TileKind::Empty => {}
    }
    t
}

fn bit_at(n: u32) -> (u32, u32) {
    (n / BITS_PER_ROW, n % BITS_PER_ROW)
}

struct Generator<'a> {
    spec: &'a DeviceSpec,
    b: FabricBuilder,
    next_bit: Vec<u32>,
    globals: Vec<WireId>,
    gbuf_tiles: Vec<(u32, u32)>,
}

impl<'a> Generator<'a> {
    fn new(spec: &'a DeviceSpec) -> Self {
        let (w, h) = (spec.width, spec.height);
        let gbuf_tiles = vec![
            (w / 2 - 1, 0),
            (w / 2, 0),
            (w - 1, h / 2 - 1),
            (w - 1, h / 2),
            (w / 2, h - 1),
            (w / 2 - 1, h - 1),
            (0, h / 2),
            (0, h / 2 - 1),
        ];
        Self {
            spec,
            b: FabricBuilder::new(spec.name, w, h),
            next_bit: vec![0; (w * h) as usize],
            globals: Vec::new(),
            gbuf_tiles,
        }
    }

    fn tiles(&self) -> impl Iterator<Item = (u32, u32)> {
        let (w, h) = (self.spec.width, self.spec.height);
        (0..h).flat_map(move |y| (0..w).map(move |x| (x, y)))
    }

    fn kind_at(&self, x: u32, y: u32) -> TileKind {
        let (w, h) = (self.spec.width, self.spec.height);
        let edge_x = x == 0 || x == w - 1;
        let edge_y = y == 0 || y == h - 1;
        if edge_x && edge_y {
            TileKind::Empty
        } else if edge_x || edge_y {
            TileKind::Io
        } else if self.spec.ram_column == Some(x) {
            if (y - 1) % 2 == 1 {
                TileKind::RamControl
            } else if y + 1 < h - 1 {
                TileKind::RamData
            } else {
                TileKind::Logic
            }
        } else {
            TileKind::Logic
        }
    }

    fn pll_tile(&self) -> (u32, u32) {
        (self.spec.width / 2, 0)
    }

    fn warmboot_tile(&self) -> (u32, u32) {
        (self.spec.width / 2, self.spec.height - 1)
    }

    fn lay_out_tiles(&mut self) {
        let mut template_sizes = std::collections::BTreeMap::new();
        for kind in [
            TileKind::Logic,
            TileKind::Io,
            TileKind::RamData,
            TileKind::RamControl,
        ] {
            let mut n = 0;
            for (name, width) in templates(kind) {
                let bits = (n..n + width).map(bit_at).collect();
                self.b.add_nonrouting_bits(kind, &name, bits);
                n += width;
            }
            template_sizes.insert(kind, n);
        }

        let coords: Vec<_> = self.tiles().collect();
        for (x, y) in coords {
            let kind = self.kind_at(x, y);
            self.b.set_tile_kind(x, y, kind);
            let t = self.b.tile(x, y).as_raw() as usize;
            self.next_bit[t] = template_sizes.get(&kind).copied().unwrap_or(0);
        }
    }

    fn wire(&self, tile: TileId, name: &str) -> WireId {
        self.b
            .find_wire(tile, name)
            .unwrap_or_else(|| panic!("generated device lacks `{name}` in {tile}"))
    }

    fn declare_wires(&mut self) {
        let home = self.b.tile(0, 0);
        for i in 0..GLOBAL_WIRES {
            let g = self.b.add_global_wire(home, &format!("glb_netwk_{i}"));
            self.globals.push(g);
        }

        let coords: Vec<_> = self.tiles().collect();
        for (x, y) in coords {
            let kind = self.kind_at(x, y);
            if kind == TileKind::Empty {
                continue;
            }
            let t = self.b.tile(x, y);
            for (i, &g) in self.globals.iter().enumerate() {
                self.b.alias_wire(g, t, &format!("glb_netwk_{i}"));
            }
            for j in 0..TRACKS {
                self.b.add_wire(t, &format!("track_{j}"));
            }

            match kind {
                TileKind::Logic => {
                    for k in 0..8 {
                        for m in 0..4 {
                            self.b.add_wire(t, &format!("lutff_{k}/in_{m}"));
                        }
                        self.b.add_wire(t, &format!("lutff_{k}/out"));
                        self.b.add_wire(t, &format!("lutff_{k}/cout"));
                    }
                    // The carry input of slot 0 is the top carry output of the
                    // logic tile below, when there is one.
                    if self.kind_at(x, y - 1) == TileKind::Logic {
                        let below = self.b.tile(x, y - 1);
                        let cout = self.wire(below, "lutff_7/cout");
                        self.b.alias_wire(cout, t, "carry_in");
                    } else {
                        self.b.add_wire(t, "carry_in");
                    }
                    for name in ["lutff_global/clk", "lutff_global/cen", "lutff_global/s_r"] {
                        self.b.add_wire(t, name);
                    }
                    for i in 0..LOCAL_WIRES {
                        self.b.add_wire(t, &format!("local_g{i}"));
                    }
                }
                TileKind::Io => {
                    for k in 0..2 {
                        for pin in ["D_IN_0", "D_OUT_0", "OUT_ENB"] {
                            self.b.add_wire(t, &format!("io_{k}/{pin}"));
                        }
                    }
                    if self.gbuf_tiles.contains(&(x, y)) {
                        self.b.add_wire(t, "gbuf/in");
                    }
                    if (x, y) == self.pll_tile() {
                        self.b.add_wire(t, "pll/refclk");
                        self.b.add_wire(t, "pll/outcore");
                    }
                    if (x, y) == self.warmboot_tile() {
                        for pin in ["BOOT", "S0", "S1"] {
                            self.b.add_wire(t, &format!("wb/{pin}"));
                        }
                    }
                }
                TileKind::RamControl => {
                    for i in 0..LOCAL_WIRES {
                        self.b.add_wire(t, &format!("local_g{i}"));
                    }
                    for i in 0..4 {
                        self.b.add_wire(t, &format!("ram/RDATA_{i}"));
                    }
                    for pin in RAM_INPUTS {
                        self.b.add_wire(t, &format!("ram/{pin}"));
                    }
                }
                TileKind::RamData | TileKind::Empty => {}
            }
        }
    }

    fn place_cells(&mut self) {
        let mut package = Package::new(self.spec.package);
        let mut next_pin = 1;

        let coords: Vec<_> = self.tiles().collect();
        for (x, y) in coords {
            let t = self.b.tile(x, y);
            match self.kind_at(x, y) {
                TileKind::Logic => {
                    for k in 0..8u8 {
                        let site = self.b.add_cell(CellKind::Logic, x, y, k);
                        for m in 0..4 {
                            self.bind(site, &format!("I{m}"), t, &format!("lutff_{k}/in_{m}"));
                        }
                        self.bind(site, "O", t, &format!("lutff_{k}/out"));
                        self.bind(site, "COUT", t, &format!("lutff_{k}/cout"));
                        let cin = match k {
                            0 => "carry_in".to_string(),
                            _ => format!("lutff_{}/cout", k - 1),
                        };
                        self.bind(site, "CIN", t, &cin);
                        self.bind(site, "CLK", t, "lutff_global/clk");
                        self.bind(site, "CEN", t, "lutff_global/cen");
                        self.bind(site, "SR", t, "lutff_global/s_r");
                    }
                }
                TileKind::Io => {
                    for k in 0..2u8 {
                        let site = self.b.add_cell(CellKind::Io, x, y, k);
                        self.bind(site, "D_IN_0", t, &format!("io_{k}/D_IN_0"));
                        self.bind(site, "D_OUT_0", t, &format!("io_{k}/D_OUT_0"));
                        self.bind(site, "OUTPUT_ENABLE", t, &format!("io_{k}/OUT_ENB"));
                        package.add_pin(format!("P{next_pin}"), Location::new(t, k));
                        next_pin += 1;
                    }
                    if let Some(i) = self.gbuf_tiles.iter().position(|&c| c == (x, y)) {
                        let site = self.b.add_cell(CellKind::GlobalBuffer, x, y, 2);
                        self.b.bind_pin(site, "GLOBAL_BUFFER_OUTPUT", self.globals[i]);
                        self.bind(site, "USER_SIGNAL_TO_GLOBAL_BUFFER", t, "gbuf/in");
                    }
                    if (x, y) == self.pll_tile() {
                        let site = self.b.add_cell(CellKind::Pll, x, y, 3);
                        self.bind(site, "REFERENCECLK", t, "pll/refclk");
                        self.bind(site, "PLLOUTCORE", t, "pll/outcore");
                        // The PLL's option bits live in the neighbouring I/O tile.
                        let field_tile = self.b.tile(x - 1, y);
                        for (field, width) in PLL_FIELDS {
                            for i in 0..width {
                                let name = format!("{field}_{i}");
                                self.b
                                    .add_cell_field(site, &name, field_tile, &format!("PLL.{name}"));
                            }
                        }
                    }
                    if (x, y) == self.warmboot_tile() {
                        let site = self.b.add_cell(CellKind::WarmBoot, x, y, 3);
                        for pin in ["BOOT", "S0", "S1"] {
                            self.bind(site, pin, t, &format!("wb/{pin}"));
                        }
                    }
                }
                TileKind::RamControl => {
                    let site = self.b.add_cell(CellKind::Ram, x, y, 0);
                    for i in 0..4 {
                        let pin = format!("RDATA_{i}");
                        self.bind(site, &pin, t, &format!("ram/{pin}"));
                    }
                    for pin in RAM_INPUTS {
                        self.bind(site, pin, t, &format!("ram/{pin}"));
                    }
                }
                TileKind::RamData | TileKind::Empty => {}
            }
        }
        self.b.add_package(package);
    }

    fn bind(&mut self, site: SiteId, port: &str, tile: TileId, wire: &str) {
        let w = self.wire(tile, wire);
        self.b.bind_pin(site, port, w);
    }

    fn alloc_bits(&mut self, tile: TileId, n: u32) -> Vec<ConfigBit> {
        let next = &mut self.next_bit[tile.as_raw() as usize];
        let bits = (*next..*next + n)
            .map(|i| {
                let (row, col) = bit_at(i);
                ConfigBit::new(tile, row, col)
            })
            .collect();
        *next += n;
        bits
    }

    fn mux(&mut self, tile: TileId, out: WireId, inputs: &[WireId]) {
        let width = u32::BITS - (inputs.len() as u32).leading_zeros();
        let cbits = self.alloc_bits(tile, width);
        let pairs: Vec<_> = inputs
            .iter()
            .enumerate()
            .map(|(i, &w)| (w, i as u32 + 1))
            .collect();
        self.b.add_switch(false, tile, out, &pairs, cbits);
    }

    fn named(&self, tile: TileId, names: impl IntoIterator<Item = String>) -> Vec<WireId> {
        names.into_iter().map(|n| self.wire(tile, &n)).collect()
    }

    fn connect(&mut self) {
        let (w, h) = (self.spec.width as i64, self.spec.height as i64);
        let coords: Vec<_> = self.tiles().collect();
        for (x, y) in coords {
            let kind = self.kind_at(x, y);
            if kind == TileKind::Empty {
                continue;
            }
            let t = self.b.tile(x, y);
            let tracks = self.named(t, (0..TRACKS).map(|j| format!("track_{j}")));

            for j in 0..TRACKS {
                let mut inputs = Vec::new();
                for (dx, dy) in [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)] {
                    let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    if self.kind_at(nx as u32, ny as u32) == TileKind::Empty {
                        continue;
                    }
                    let n = self.b.tile(nx as u32, ny as u32);
                    inputs.push(self.wire(n, &format!("track_{j}")));
                }
                match kind {
                    TileKind::Logic => {
                        for k in 0..8 {
                            if k % TRACKS == j || (k + 1) % TRACKS == j {
                                inputs.push(self.wire(t, &format!("lutff_{k}/out")));
                            }
                        }
                    }
                    TileKind::Io => {
                        inputs.push(self.wire(t, &format!("io_{}/D_IN_0", j % 2)));
                        if let Some(out) = self.b.find_wire(t, "pll/outcore") {
                            inputs.push(out);
                        }
                    }
                    TileKind::RamControl => {
                        inputs.push(self.wire(t, &format!("ram/RDATA_{}", j % 4)));
                    }
                    TileKind::RamData | TileKind::Empty => {}
                }
                self.mux(t, tracks[j as usize], &inputs);
            }

            match kind {
                TileKind::Logic => {
                    let locals = self.named(t, (0..LOCAL_WIRES).map(|i| format!("local_g{i}")));
                    for (i, &local) in locals.iter().enumerate() {
                        let mut inputs = tracks.clone();
                        inputs.extend(&self.globals);
                        inputs.push(self.wire(t, &format!("lutff_{i}/out")));
                        self.mux(t, local, &inputs);
                    }
                    for k in 0..8 {
                        for m in 0..4 {
                            let pin = self.wire(t, &format!("lutff_{k}/in_{m}"));
                            self.mux(t, pin, &locals);
                        }
                    }
                    let mut control_inputs = self.globals.clone();
                    control_inputs.extend(&locals);
                    for name in ["lutff_global/clk", "lutff_global/cen", "lutff_global/s_r"] {
                        let pin = self.wire(t, name);
                        self.mux(t, pin, &control_inputs);
                    }
                }
                TileKind::Io => {
                    let mut sinks = Vec::new();
                    for k in 0..2 {
                        sinks.push(format!("io_{k}/D_OUT_0"));
                        sinks.push(format!("io_{k}/OUT_ENB"));
                    }
                    sinks.extend(
                        ["gbuf/in", "pll/refclk", "wb/BOOT", "wb/S0", "wb/S1"].map(String::from),
                    );
                    for name in sinks {
                        if let Some(pin) = self.b.find_wire(t, &name) {
                            self.mux(t, pin, &tracks);
                        }
                    }
                }
                TileKind::RamControl => {
                    let locals = self.named(t, (0..LOCAL_WIRES).map(|i| format!("local_g{i}")));
                    for &local in &locals {
                        let mut inputs = tracks.clone();
                        inputs.extend(&self.globals);
                        self.mux(t, local, &inputs);
                    }
                    for pin in RAM_INPUTS {
                        let wire = self.wire(t, &format!("ram/{pin}"));
                        let mut inputs = locals.clone();
                        if pin.ends_with("CLK") {
                            inputs.extend(&self.globals);
                        }
                        self.mux(t, wire, &inputs);
                    }
                }
                TileKind::RamData | TileKind::Empty => {}
            }
        }
    }

    fn add_extra_bits(&mut self) {
        for bank in 0..4 {
            for (i, std) in IO_STANDARDS.iter().enumerate() {
                self.b.add_extra_bit(
                    &format!("IO_STANDARD.{std}.bank{bank}"),
                    ExtraBit::new(bank, i as u32, 0),
                );
            }
        }
    }
}
