//! Turns a placement and its routing into configuration bits.

use crate::configuration::Configuration;
use crate::error::AssemblyError;
use std::collections::BTreeMap;
use weft_fabric::{CellKind, ConfigBit, Fabric, SiteId, TileId};
use weft_netlist::{Design, InstanceId, ModelId, DEFAULT_IO_STANDARD};
use weft_pnr::{Placement, RoutingSolution};

/// Logic cell options following the 16 truth-table bits, in bit order.
const LC_OPTIONS: [&str; 4] = ["CARRY_ENABLE", "DFF_ENABLE", "SET_NORESET", "ASYNC_SR"];

/// Numeric PLL fields and their widths.
const PLL_FIELDS: [(&str, usize); 4] = [("DIVR", 4), ("DIVF", 7), ("DIVQ", 3), ("FILTER_RANGE", 3)];

fn feedback_code(path: &str) -> Option<u64> {
    match path {
        "DELAY" => Some(0),
        "SIMPLE" => Some(1),
        "PHASE_AND_DELAY" => Some(2),
        "EXTERNAL" => Some(6),
        _ => None,
    }
}

/// Assembles the configuration of a placed and routed top model.
///
/// Every placed cell writes its whole option template from its parameters
/// (falling back to the library defaults), and every selected switch writes
/// the pattern of its chosen input. Nothing else is written. The result
/// depends only on the arguments, so assembling twice gives equal
/// configurations.
pub fn assemble(
    design: &Design,
    top: ModelId,
    fabric: &Fabric,
    placement: &Placement,
    routing: &RoutingSolution,
) -> Result<Configuration, AssemblyError> {
    let mut asm = Assembler {
        design,
        fabric,
        config: Configuration::new(),
        neg_clk: BTreeMap::new(),
    };

    for &inst in design.model(top).instances() {
        let site = placement
            .site(inst)
            .ok_or_else(|| AssemblyError::Unplaced(design.instance_label(inst)))?;
        match design.instance(inst).kind {
            CellKind::Logic => asm.logic(inst, site)?,
            CellKind::Io => asm.io(inst, site)?,
            CellKind::Ram => asm.ram(inst, site)?,
            CellKind::Pll => asm.pll(inst, site)?,
            CellKind::GlobalBuffer | CellKind::WarmBoot => {}
        }
    }
    asm.finish_tiles()?;

    let cell_bits = asm.config.len();
    for (_, route) in routing.iter() {
        for (&sw, &input) in route {
            for (bit, value) in fabric.switch(sw).settings(input) {
                asm.config.set_bit(bit, value);
            }
        }
    }

    let config = asm.config;
    tracing::info!(
        cell_bits,
        routing_bits = config.len() - cell_bits,
        ones = config.ones(),
        extra = config.extra_bits().count(),
        "configuration assembled"
    );
    Ok(config)
}

struct Assembler<'a> {
    design: &'a Design,
    fabric: &'a Fabric,
    config: Configuration,
    /// Clock polarity per logic tile and the flip-flop that set it, for
    /// tiles holding a flip-flop.
    neg_clk: BTreeMap<TileId, (bool, InstanceId)>,
}

impl Assembler<'_> {
    fn template(&self, tile: TileId, name: &str) -> Result<Vec<ConfigBit>, AssemblyError> {
        self.fabric
            .nonrouting_bits(tile, name)
            .ok_or_else(|| AssemblyError::MissingBits {
                tile,
                name: name.to_string(),
            })
    }

    /// Reads parameter `name` as a `width`-bit field, least significant bit
    /// first. Binary strings are accepted; set bits beyond `width` are not.
    fn field(&self, inst: InstanceId, name: &str, width: usize) -> Result<Vec<bool>, AssemblyError> {
        let Some(value) = self.design.get_param(inst, name) else {
            return Ok(vec![false; width]);
        };
        let bits = value
            .to_bits()
            .filter(|bits| bits.iter().skip(width).all(|&b| !b))
            .ok_or_else(|| AssemblyError::MalformedParam {
                instance: self.design.instance_label(inst),
                param: name.to_string(),
                width,
                value: value.to_string(),
            })?;
        Ok((0..width).map(|i| bits.get(i).copied().unwrap_or(false)).collect())
    }

    fn write(&mut self, tile: TileId, template: &str, value: &[bool]) -> Result<(), AssemblyError> {
        let bits = self.template(tile, template)?;
        self.config.set_bits(&bits, value);
        Ok(())
    }

    fn logic(&mut self, inst: InstanceId, site: SiteId) -> Result<(), AssemblyError> {
        let loc = self.fabric.cell_location(site);
        let mut value = self.field(inst, "LUT_INIT", 16)?;
        for name in LC_OPTIONS {
            value.extend(self.field(inst, name, 1)?);
        }
        let dff = value[17];
        self.write(loc.tile, &format!("LC_{}", loc.slot), &value)?;

        if dff {
            let neg = self.field(inst, "NEG_CLK", 1)?[0];
            match self.neg_clk.get(&loc.tile) {
                Some(&(set, first)) if set != neg => {
                    return Err(AssemblyError::MixedClockPolarity {
                        tile: loc.tile,
                        first: self.design.instance_label(first),
                        second: self.design.instance_label(inst),
                    })
                }
                Some(_) => {}
                None => {
                    self.neg_clk.insert(loc.tile, (neg, inst));
                }
            }
        }
        Ok(())
    }

    fn io(&mut self, inst: InstanceId, site: SiteId) -> Result<(), AssemblyError> {
        let loc = self.fabric.cell_location(site);
        let pin_type = self.field(inst, "PIN_TYPE", 6)?;
        self.write(loc.tile, &format!("IOB_{}.PINTYPE", loc.slot), &pin_type)?;
        let pullup = self.field(inst, "PULLUP", 1)?;
        self.write(loc.tile, &format!("IOB_{}.PULLUP", loc.slot), &pullup)?;

        let standard = match self.design.get_param(inst, "IO_STANDARD") {
            None => DEFAULT_IO_STANDARD,
            Some(c) => c.as_str().ok_or_else(|| AssemblyError::MalformedParam {
                instance: self.design.instance_label(inst),
                param: "IO_STANDARD".to_string(),
                width: 0,
                value: c.to_string(),
            })?,
        };
        if standard != DEFAULT_IO_STANDARD {
            let bank = self.fabric.tile_bank(loc.tile);
            let bit = self
                .fabric
                .extra_bit(&format!("IO_STANDARD.{standard}.bank{bank}"))
                .ok_or_else(|| AssemblyError::UnknownIoStandard {
                    instance: self.design.instance_label(inst),
                    standard: standard.to_string(),
                    bank,
                })?;
            self.config.set_extra(bit);
        }
        Ok(())
    }

    fn ram(&mut self, inst: InstanceId, site: SiteId) -> Result<(), AssemblyError> {
        let control = self.fabric.cell_location(site).tile;
        for name in ["READ_MODE", "WRITE_MODE"] {
            let value = self.field(inst, name, 2)?;
            self.write(control, &format!("RamConfig.{name}"), &value)?;
        }

        // Initial contents live in the data tile directly below.
        let (x, y) = (self.fabric.tile_x(control), self.fabric.tile_y(control));
        let data = y
            .checked_sub(1)
            .map(|below| self.fabric.tile(x, below))
            .ok_or_else(|| AssemblyError::MissingBits {
                tile: control,
                name: "INIT_0".to_string(),
            })?;
        for i in 0..16 {
            let name = format!("INIT_{i:X}");
            let value = self.field(inst, &name, 256)?;
            self.write(data, &name, &value)?;
        }
        Ok(())
    }

    fn pll(&mut self, inst: InstanceId, site: SiteId) -> Result<(), AssemblyError> {
        let mut fields: Vec<(&str, Vec<bool>)> = Vec::new();
        for (name, width) in PLL_FIELDS {
            fields.push((name, self.field(inst, name, width)?));
        }

        let path = self
            .design
            .get_param(inst, "FEEDBACK_PATH")
            .and_then(|c| c.as_str())
            .unwrap_or("SIMPLE");
        let code = feedback_code(path).ok_or_else(|| AssemblyError::UnknownFeedbackPath {
            instance: self.design.instance_label(inst),
            value: path.to_string(),
        })?;
        fields.push(("FEEDBACK_PATH", (0..3).map(|i| (code >> i) & 1 == 1).collect()));

        for (name, value) in fields {
            for (i, &bit_value) in value.iter().enumerate() {
                let field = format!("{name}_{i}");
                if !self.fabric.has_cell_field(site, &field) {
                    return Err(AssemblyError::MissingBits {
                        tile: self.fabric.cell_location(site).tile,
                        name: field,
                    });
                }
                let bit = self.fabric.extra_cell_cbit(site, &field);
                self.config.set_bit(bit, bit_value);
            }
        }
        Ok(())
    }

    /// Writes the tile-wide options that several cells contribute to.
    fn finish_tiles(&mut self) -> Result<(), AssemblyError> {
        let neg_clk = std::mem::take(&mut self.neg_clk);
        for (tile, (neg, _)) in neg_clk {
            self.write(tile, "NegClk", &[neg])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_fabric::load_device;
    use weft_netlist::{add_fabric_library, Const};
    use weft_pnr::{route, RouteOptions};

    struct Fixture {
        design: Design,
        top: ModelId,
        fabric: Fabric,
        placement: Placement,
    }

    impl Fixture {
        fn new(device: &str) -> Self {
            let mut design = Design::new();
            add_fabric_library(&mut design).unwrap();
            let top = design.add_model("top", None).unwrap();
            Self {
                design,
                top,
                fabric: load_device(device).unwrap(),
                placement: Placement::new(),
            }
        }

        /// Adds an instance of `kind` on the `n`th site of that kind.
        fn add(&mut self, kind: CellKind, n: usize) -> InstanceId {
            let m = self.design.primitive(kind).unwrap();
            let inst = self.design.add_instance(self.top, m).unwrap();
            self.placement.place(inst, self.fabric.cells_of_kind(kind)[n]);
            inst
        }

        fn site(&self, inst: InstanceId) -> SiteId {
            self.placement.site(inst).unwrap()
        }

        fn routing(&self) -> RoutingSolution {
            route(
                &self.design,
                self.top,
                &self.fabric,
                &self.placement,
                &RouteOptions::default(),
            )
            .unwrap()
        }

        fn assemble(&self) -> Result<Configuration, AssemblyError> {
            assemble(
                &self.design,
                self.top,
                &self.fabric,
                &self.placement,
                &self.routing(),
            )
        }

        fn read(&self, config: &Configuration, tile: TileId, name: &str) -> u64 {
            let bits = self.fabric.nonrouting_bits(tile, name).unwrap();
            bits.iter()
                .enumerate()
                .map(|(i, &b)| u64::from(config.get(b)) << i)
                .sum()
        }
    }

    #[test]
    fn two_luts_write_their_templates_and_switches() {
        let mut f = Fixture::new("mini-4x4");
        let a = f.add(CellKind::Logic, 0);
        let b = f.add(CellKind::Logic, 20);
        f.design.set_param(a, "LUT_INIT", Const::from_u64(0xbeef, 16));
        f.design
            .set_param(b, "LUT_INIT", Const::parse_binary("1000100010001000").unwrap());
        let net = f.design.add_net(f.top, "n");
        f.design.connect(f.design.find_instance_port(a, "O").unwrap(), net);
        f.design.connect(f.design.find_instance_port(b, "I2").unwrap(), net);

        let routing = f.routing();
        let config = assemble(&f.design, f.top, &f.fabric, &f.placement, &routing).unwrap();

        let la = f.fabric.cell_location(f.site(a));
        let lb = f.fabric.cell_location(f.site(b));
        assert_eq!(f.read(&config, la.tile, &format!("LC_{}", la.slot)), 0xbeef);
        assert_eq!(f.read(&config, lb.tile, &format!("LC_{}", lb.slot)), 0x8888);

        let switch_bits: usize = routing
            .route(net)
            .unwrap()
            .keys()
            .map(|&sw| f.fabric.switch(sw).cbits.len())
            .sum();
        assert!(switch_bits > 0);
        assert_eq!(config.len(), 2 * 20 + switch_bits);
        assert_eq!(config.extra_bits().count(), 0);
    }

    #[test]
    fn switch_bits_spell_the_chosen_pattern() {
        let mut f = Fixture::new("mini-4x4");
        let a = f.add(CellKind::Logic, 3);
        let b = f.add(CellKind::Logic, 30);
        let net = f.design.add_net(f.top, "n");
        f.design.connect(f.design.find_instance_port(a, "O").unwrap(), net);
        f.design.connect(f.design.find_instance_port(b, "I0").unwrap(), net);

        let routing = f.routing();
        let config = assemble(&f.design, f.top, &f.fabric, &f.placement, &routing).unwrap();
        for (&sw, &input) in routing.route(net).unwrap() {
            let s = f.fabric.switch(sw);
            let pattern = s.pattern(input).unwrap();
            let read: u32 = s
                .cbits
                .iter()
                .enumerate()
                .map(|(j, &bit)| u32::from(config.get(bit)) << j)
                .sum();
            assert_eq!(read, pattern);
        }
    }

    #[test]
    fn assembly_is_idempotent() {
        let mut f = Fixture::new("mini-6x6");
        let a = f.add(CellKind::Logic, 0);
        let b = f.add(CellKind::Logic, 9);
        let ram = f.add(CellKind::Ram, 1);
        f.design.set_param(ram, "INIT_3", Const::from_u64(u64::MAX, 256));
        let net = f.design.add_net(f.top, "n");
        f.design.connect(f.design.find_instance_port(ram, "RDATA_1").unwrap(), net);
        f.design.connect(f.design.find_instance_port(a, "I1").unwrap(), net);
        f.design.connect(f.design.find_instance_port(b, "I3").unwrap(), net);

        let first = f.assemble().unwrap();
        let second = f.assemble().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn flip_flops_set_tile_clock_polarity() {
        let mut f = Fixture::new("mini-4x4");
        let plain = f.add(CellKind::Logic, 0);
        let ff = f.add(CellKind::Logic, 1);
        f.design.set_param(ff, "DFF_ENABLE", Const::from_u64(1, 1));
        f.design.set_param(ff, "NEG_CLK", Const::from_u64(1, 1));
        let tile = f.fabric.cell_location(f.site(ff)).tile;
        assert_eq!(f.fabric.cell_location(f.site(plain)).tile, tile);

        let config = f.assemble().unwrap();
        assert_eq!(f.read(&config, tile, "NegClk"), 1);
        assert_eq!(f.read(&config, tile, "LC_1") >> 16, 0b0010);
    }

    #[test]
    fn flip_flops_on_both_edges_in_one_tile_are_rejected() {
        let mut f = Fixture::new("mini-4x4");
        let rise = f.add(CellKind::Logic, 2);
        let fall = f.add(CellKind::Logic, 3);
        for ff in [rise, fall] {
            f.design.set_param(ff, "DFF_ENABLE", Const::from_u64(1, 1));
        }
        f.design.set_param(fall, "NEG_CLK", Const::from_u64(1, 1));
        let tile = f.fabric.cell_location(f.site(rise)).tile;
        assert_eq!(f.fabric.cell_location(f.site(fall)).tile, tile);

        assert_eq!(
            f.assemble(),
            Err(AssemblyError::MixedClockPolarity {
                tile,
                first: f.design.instance_label(rise),
                second: f.design.instance_label(fall),
            })
        );

        f.design.set_param(rise, "NEG_CLK", Const::from_u64(1, 1));
        let config = f.assemble().unwrap();
        assert_eq!(f.read(&config, tile, "NegClk"), 1);
    }

    #[test]
    fn lut_only_tiles_leave_clock_polarity_unwritten() {
        let mut f = Fixture::new("mini-4x4");
        let lut = f.add(CellKind::Logic, 0);
        f.design.set_param(lut, "NEG_CLK", Const::from_u64(1, 1));
        let tile = f.fabric.cell_location(f.site(lut)).tile;
        let config = f.assemble().unwrap();
        let neg = f.fabric.nonrouting_bits(tile, "NegClk").unwrap()[0];
        assert!(!config.is_written(neg));
    }

    #[test]
    fn io_options_and_bank_standard() {
        let mut f = Fixture::new("mini-4x4");
        let io = f.add(CellKind::Io, 2);
        f.design.set_param(io, "PIN_TYPE", Const::parse_binary("101001").unwrap());
        f.design.set_param(io, "PULLUP", Const::from_u64(1, 1));
        f.design.set_param(io, "IO_STANDARD", Const::string("SB_LVDS_INPUT"));

        let config = f.assemble().unwrap();
        let loc = f.fabric.cell_location(f.site(io));
        assert_eq!(f.read(&config, loc.tile, &format!("IOB_{}.PINTYPE", loc.slot)), 0b101001);
        assert_eq!(f.read(&config, loc.tile, &format!("IOB_{}.PULLUP", loc.slot)), 1);
        let bank = f.fabric.tile_bank(loc.tile);
        let expected = f
            .fabric
            .extra_bit(&format!("IO_STANDARD.SB_LVDS_INPUT.bank{bank}"))
            .unwrap();
        assert_eq!(config.extra_bits().collect::<Vec<_>>(), vec![expected]);
    }

    #[test]
    fn unknown_io_standard_is_rejected() {
        let mut f = Fixture::new("mini-4x4");
        let io = f.add(CellKind::Io, 0);
        f.design.set_param(io, "IO_STANDARD", Const::string("SB_HSTL"));
        assert!(matches!(
            f.assemble(),
            Err(AssemblyError::UnknownIoStandard { standard, .. }) if standard == "SB_HSTL"
        ));
    }

    #[test]
    fn ram_init_goes_to_the_data_tile_below() {
        let mut f = Fixture::new("mini-6x6");
        let ram = f.add(CellKind::Ram, 0);
        f.design.set_param(ram, "READ_MODE", Const::from_u64(2, 2));
        f.design.set_param(ram, "INIT_A", Const::from_u64(0x5a, 256));

        let config = f.assemble().unwrap();
        let control = f.fabric.cell_location(f.site(ram)).tile;
        let data = f
            .fabric
            .tile(f.fabric.tile_x(control), f.fabric.tile_y(control) - 1);
        assert_eq!(f.read(&config, control, "RamConfig.READ_MODE"), 2);
        assert_eq!(f.read(&config, control, "RamConfig.WRITE_MODE"), 0);
        let init_a = f.fabric.nonrouting_bits(data, "INIT_A").unwrap();
        let low: u64 = init_a[..8]
            .iter()
            .enumerate()
            .map(|(i, &b)| u64::from(config.get(b)) << i)
            .sum();
        assert_eq!(low, 0x5a);
        assert_eq!(config.len(), 4 + 16 * 256);
    }

    #[test]
    fn pll_fields_and_feedback_path() {
        let mut f = Fixture::new("mini-4x4");
        let pll = f.add(CellKind::Pll, 0);
        f.design.set_param(pll, "DIVF", Const::from_u64(0b1010101, 7));
        f.design.set_param(pll, "FEEDBACK_PATH", Const::string("EXTERNAL"));

        let config = f.assemble().unwrap();
        let site = f.site(pll);
        let read = |name: &str, width: usize| -> u64 {
            (0..width)
                .map(|i| u64::from(config.get(f.fabric.extra_cell_cbit(site, &format!("{name}_{i}")))) << i)
                .sum()
        };
        assert_eq!(read("DIVF", 7), 0b1010101);
        assert_eq!(read("DIVR", 4), 0);
        assert_eq!(read("FEEDBACK_PATH", 3), 6);
        assert_eq!(config.len(), 4 + 7 + 3 + 3 + 3);
    }

    #[test]
    fn malformed_parameters_are_errors() {
        let mut f = Fixture::new("mini-4x4");
        let lut = f.add(CellKind::Logic, 0);
        f.design.set_param(lut, "LUT_INIT", Const::string("0x12"));
        assert!(matches!(
            f.assemble(),
            Err(AssemblyError::MalformedParam { param, width: 16, .. }) if param == "LUT_INIT"
        ));

        f.design.set_param(lut, "LUT_INIT", Const::from_u64(1 << 20, 21));
        assert!(matches!(f.assemble(), Err(AssemblyError::MalformedParam { .. })));

        f.design.set_param(lut, "LUT_INIT", Const::string("0110"));
        assert!(f.assemble().is_ok());

        let pll = f.add(CellKind::Pll, 0);
        f.design.set_param(pll, "FEEDBACK_PATH", Const::string("LOOPBACK"));
        assert!(matches!(
            f.assemble(),
            Err(AssemblyError::UnknownFeedbackPath { value, .. }) if value == "LOOPBACK"
        ));
    }

    #[test]
    fn buffers_and_warmboot_write_nothing() {
        let mut f = Fixture::new("mini-4x4");
        f.add(CellKind::GlobalBuffer, 0);
        f.add(CellKind::WarmBoot, 0);
        assert!(f.assemble().unwrap().is_empty());
    }

    #[test]
    fn unplaced_instance_is_an_error() {
        let mut f = Fixture::new("mini-4x4");
        let lc = f.design.primitive(CellKind::Logic).unwrap();
        f.design.add_instance(f.top, lc).unwrap();
        assert!(matches!(f.assemble(), Err(AssemblyError::Unplaced(_))));
    }
}
