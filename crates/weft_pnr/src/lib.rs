//! Place and route for the weft fixed-fabric FPGA flow.
//!
//! This crate takes a packed [`Design`] and a [`Fabric`], assigns every
//! instance to a physical site (placement), then selects the switches that
//! connect each net's driver to its sinks (routing).
//!
//! # Pipeline
//!
//! 1. **Check**: optionally prune dangling nets, then verify every net has
//!    one driver and at least one input
//! 2. **Constrain**: lock pad instances to package pins
//! 3. **Promote**: optionally move busy control nets onto global buffers
//! 4. **Realize constants**: fold tied LUT inputs into their tables and
//!    drive the remaining constant sinks from constant LUTs
//! 5. **Place**: initial legal layout + simulated annealing, or read
//!    explicit locations in route-only mode
//! 6. **Route**: PathFinder negotiated congestion
//!
//! # Usage
//!
//! ```ignore
//! use weft_pnr::{place_and_route, PnrOptions};
//!
//! let out = place_and_route(&mut design, &fabric, &PnrOptions::default(), &sink)?;
//! assert_eq!(out.placement.len(), design.instance_count());
//! ```

#![warn(missing_docs)]

pub mod constants;
pub mod constraints;
pub mod error;
pub mod placement;
pub mod promote;
pub mod routing;
pub mod state;

pub use constants::{place_drivers, realize_constants, RealizedConstants};
pub use constraints::{apply_pin_constraints, placement_from_locations, LOCATION_ATTR};
pub use error::PnrError;
pub use placement::{check_placement, place, PlaceOptions};
pub use promote::promote_globals;
pub use routing::{route, RouteOptions};
pub use state::{NetRoute, Placement, RoutingSolution};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use weft_diagnostics::DiagnosticSink;
use weft_fabric::Fabric;
use weft_netlist::Design;

/// Everything that steers one place-and-route run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnrOptions {
    /// Package whose pin names `pins` refers to.
    pub package: String,
    /// Top-level port name to package pin name.
    pub pins: BTreeMap<String, String>,
    /// Downgrade constraints on missing ports to warnings.
    pub warn_no_port: bool,
    /// Remove dangling nets before checking.
    pub prune: bool,
    /// Skip placement and take sites from `loc` attributes.
    pub route_only: bool,
    /// Promote busy control nets to global buffers.
    pub promote_globals: bool,
    /// Control pin count that makes a net worth a global buffer.
    pub global_threshold: usize,
    /// Annealing parameters.
    pub place: PlaceOptions,
    /// Negotiation parameters.
    pub route: RouteOptions,
}

impl Default for PnrOptions {
    fn default() -> Self {
        Self {
            package: String::new(),
            pins: BTreeMap::new(),
            warn_no_port: false,
            prune: true,
            route_only: false,
            promote_globals: true,
            global_threshold: 4,
            place: PlaceOptions::default(),
            route: RouteOptions::default(),
        }
    }
}

/// A placed and routed design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnrOutput {
    /// Site of every instance of the top model.
    pub placement: Placement,
    /// Switches used by every routed net.
    pub routing: RoutingSolution,
}

/// Runs the complete place-and-route pipeline on the top model of `design`.
///
/// The design is only modified by pruning, global promotion, and constant
/// realization, all before placement. Every fatal error is also emitted into `sink` as a diagnostic.
pub fn place_and_route(
    design: &mut Design,
    fabric: &Fabric,
    options: &PnrOptions,
    sink: &DiagnosticSink,
) -> Result<PnrOutput, PnrError> {
    run(design, fabric, options, sink).inspect_err(|err| sink.emit(err.to_diagnostic()))
}

fn run(
    design: &mut Design,
    fabric: &Fabric,
    options: &PnrOptions,
    sink: &DiagnosticSink,
) -> Result<PnrOutput, PnrError> {
    if options.place.seed == 0 {
        return Err(PnrError::InvalidSeed);
    }
    if options.route.max_passes == 0 {
        return Err(PnrError::InvalidPassCount);
    }
    let top = design.top().ok_or(PnrError::MissingTop)?;

    if options.prune {
        design.prune(top);
    }
    let problems = design.check(top);
    if let Some(first) = problems.first().cloned() {
        // The first one is returned and emitted by the caller.
        for extra in &problems[1..] {
            sink.emit(PnrError::InvalidNetlist(extra.clone()).to_diagnostic());
        }
        return Err(PnrError::InvalidNetlist(first));
    }

    let placement = if options.route_only {
        if !options.pins.is_empty() {
            tracing::warn!("pin constraints are ignored in route-only mode");
        }
        let mut placement = placement_from_locations(design, top, fabric)?;
        let realized = realize_constants(design, top)?;
        place_drivers(design, top, fabric, &mut placement, &realized.drivers)?;
        check_placement(design, top, fabric, &placement)?;
        placement
    } else {
        let locks = apply_pin_constraints(
            design,
            top,
            fabric,
            &options.package,
            &options.pins,
            options.warn_no_port,
            sink,
        )?;
        if options.promote_globals {
            promote_globals(design, top, fabric, options.global_threshold);
        }
        realize_constants(design, top)?;
        place(design, top, fabric, &locks, &options.place)?
    };

    let routing = route(design, top, fabric, &placement, &options.route)?;
    Ok(PnrOutput { placement, routing })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use weft_fabric::{load_device, CellKind, ConfigBit, FabricBuilder, TileKind, WireId};
    use weft_netlist::{add_fabric_library, Const, Direction, InstanceId, ModelId};

    fn new_design() -> (Design, ModelId) {
        let mut d = Design::new();
        add_fabric_library(&mut d).unwrap();
        let top = d.add_model("top", None).unwrap();
        d.set_top(top);
        (d, top)
    }

    fn lut(d: &mut Design, top: ModelId) -> InstanceId {
        let lc = d.primitive(CellKind::Logic).unwrap();
        d.add_instance(top, lc).unwrap()
    }

    fn join(d: &mut Design, top: ModelId, name: &str, from: (InstanceId, &str), to: &[(InstanceId, &str)]) {
        let net = d.add_net(top, name);
        d.connect(d.find_instance_port(from.0, from.1).unwrap(), net);
        for &(inst, port) in to {
            d.connect(d.find_instance_port(inst, port).unwrap(), net);
        }
    }

    fn options(package: &str) -> PnrOptions {
        PnrOptions {
            package: package.into(),
            ..PnrOptions::default()
        }
    }

    /// Asserts that no two routed nets drive the same wire.
    fn assert_conflict_free(fabric: &Fabric, routing: &RoutingSolution) {
        let mut driven: BTreeSet<WireId> = BTreeSet::new();
        for (_, route) in routing.iter() {
            for &sw in route.keys() {
                assert!(driven.insert(fabric.switch(sw).out), "wire driven twice");
            }
        }
    }

    /// One logic tile with two sites whose `O` and `I0` pins are joined by a
    /// single switch.
    #[test]
    fn two_luts_on_a_tiny_fabric() {
        let mut b = FabricBuilder::new("pair", 1, 1);
        b.set_tile_kind(0, 0, TileKind::Logic);
        let t = b.tile(0, 0);
        let s0 = b.add_cell(CellKind::Logic, 0, 0, 0);
        let s1 = b.add_cell(CellKind::Logic, 0, 0, 1);
        let wires: Vec<WireId> = ["o0", "i0", "o1", "i1"].iter().map(|n| b.add_wire(t, n)).collect();
        b.bind_pin(s0, "O", wires[0]);
        b.bind_pin(s0, "I0", wires[1]);
        b.bind_pin(s1, "O", wires[2]);
        b.bind_pin(s1, "I0", wires[3]);
        b.add_switch(false, t, wires[3], &[(wires[0], 1)], vec![ConfigBit::new(t, 0, 0)]);
        b.add_switch(false, t, wires[1], &[(wires[2], 1)], vec![ConfigBit::new(t, 0, 1)]);
        let fabric = b.finish().unwrap();

        let (mut d, top) = new_design();
        let a = lut(&mut d, top);
        let z = lut(&mut d, top);
        join(&mut d, top, "n", (a, "O"), &[(z, "I0")]);

        let sink = DiagnosticSink::new();
        let out = place_and_route(&mut d, &fabric, &options(""), &sink).unwrap();
        let (sa, sz) = (out.placement.site(a).unwrap(), out.placement.site(z).unwrap());
        assert_ne!(sa, sz);
        let net = d.find_net(top, "n").unwrap();
        assert_eq!(out.routing.route(net).unwrap().len(), 1);
        assert!(!sink.has_errors());
    }

    #[test]
    fn one_instance_too_many_fails_before_routing() {
        let fabric = load_device("mini-4x4").unwrap();
        let (mut d, top) = new_design();
        let supply = fabric.cells_of_kind(CellKind::Logic).len();
        let cells: Vec<_> = (0..=supply).map(|_| lut(&mut d, top)).collect();
        for (k, w) in cells.windows(2).enumerate() {
            join(&mut d, top, &format!("n{k}"), (w[0], "O"), &[(w[1], "I0")]);
        }

        let sink = DiagnosticSink::new();
        let err = place_and_route(&mut d, &fabric, &options("tq16"), &sink).unwrap_err();
        assert_eq!(
            err,
            PnrError::Infeasible {
                kind: CellKind::Logic,
                demand: supply + 1,
                supply,
            }
        );
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.first_error().unwrap().code.to_string(), "P101");
    }

    #[test]
    fn route_only_uses_given_sites() {
        let fabric = load_device("mini-4x4").unwrap();
        let (mut d, top) = new_design();
        let logic = fabric.cells_of_kind(CellKind::Logic).to_vec();
        let cells: Vec<_> = (0..4).map(|_| lut(&mut d, top)).collect();
        join(&mut d, top, "x", (cells[0], "O"), &[(cells[1], "I0"), (cells[2], "I1")]);
        join(&mut d, top, "y", (cells[1], "O"), &[(cells[3], "I2")]);
        join(&mut d, top, "z", (cells[2], "O"), &[(cells[3], "I3"), (cells[0], "I0")]);
        let chosen = [logic[0], logic[9], logic[17], logic[30]];
        for (&c, s) in cells.iter().zip(chosen) {
            d.set_attr(c, LOCATION_ATTR, s.as_raw().to_string());
        }

        let opts = PnrOptions {
            route_only: true,
            ..options("tq16")
        };
        let sink = DiagnosticSink::new();
        let out = place_and_route(&mut d, &fabric, &opts, &sink).unwrap();
        for (&c, s) in cells.iter().zip(chosen) {
            assert_eq!(out.placement.site(c), Some(s));
        }
        assert_eq!(out.routing.net_count(), 3);
        assert_conflict_free(&fabric, &out.routing);
    }

    /// `a` drives `z`, whose `I1` and `SR` are tied high.
    fn tied_pair(d: &mut Design, top: ModelId) -> (InstanceId, InstanceId) {
        let a = lut(d, top);
        let z = lut(d, top);
        d.set_param(z, "LUT_INIT", Const::from_u64(0x8888, 16));
        d.set_param(z, "DFF_ENABLE", Const::from_u64(1, 1));
        join(d, top, "n", (a, "O"), &[(z, "I0")]);
        let vcc = d.add_net(top, "vcc");
        d.set_constant(vcc, true);
        for pin in ["I1", "SR"] {
            d.connect(d.find_instance_port(z, pin).unwrap(), vcc);
        }
        (a, z)
    }

    #[test]
    fn tied_pins_are_realized_before_placement() {
        let fabric = load_device("mini-4x4").unwrap();
        let (mut d, top) = new_design();
        let (_, z) = tied_pair(&mut d, top);

        let sink = DiagnosticSink::new();
        let out = place_and_route(&mut d, &fabric, &options(""), &sink).unwrap();
        assert_eq!(d.find_net(top, "vcc"), None);
        assert_eq!(d.get_param(z, "LUT_INIT").and_then(Const::to_u64), Some(0xAAAA));
        let driven = d.find_net(top, "$true").unwrap();
        assert!(out.routing.route(driven).is_some());
        assert_eq!(out.placement.len(), 3);
        assert_conflict_free(&fabric, &out.routing);
    }

    #[test]
    fn route_only_seats_constant_drivers() {
        let fabric = load_device("mini-4x4").unwrap();
        let logic = fabric.cells_of_kind(CellKind::Logic).to_vec();
        let (mut d, top) = new_design();
        let (a, z) = tied_pair(&mut d, top);
        d.set_attr(a, LOCATION_ATTR, logic[3].as_raw().to_string());
        d.set_attr(z, LOCATION_ATTR, logic[9].as_raw().to_string());

        let opts = PnrOptions {
            route_only: true,
            ..options("")
        };
        let sink = DiagnosticSink::new();
        let out = place_and_route(&mut d, &fabric, &opts, &sink).unwrap();
        let driver = d.port(d.driver(d.find_net(top, "$true").unwrap()).unwrap());
        assert_eq!(out.placement.site(driver.instance().unwrap()), Some(logic[0]));
        assert_eq!(out.routing.net_count(), 2);
    }

    #[test]
    fn route_only_without_locations_fails() {
        let fabric = load_device("mini-4x4").unwrap();
        let (mut d, top) = new_design();
        let a = lut(&mut d, top);
        let z = lut(&mut d, top);
        join(&mut d, top, "n", (a, "O"), &[(z, "I0")]);
        let opts = PnrOptions {
            route_only: true,
            ..options("tq16")
        };
        let err = place_and_route(&mut d, &fabric, &opts, &DiagnosticSink::new()).unwrap_err();
        assert!(matches!(err, PnrError::MissingLocation(_)));
    }

    #[test]
    fn invalid_netlist_reports_every_problem() {
        let fabric = load_device("mini-4x4").unwrap();
        let (mut d, top) = new_design();
        let a = lut(&mut d, top);
        let z = lut(&mut d, top);
        join(&mut d, top, "both", (a, "O"), &[(z, "O"), (z, "I0")]);
        let opts = PnrOptions {
            prune: false,
            ..options("tq16")
        };
        let sink = DiagnosticSink::new();
        let err = place_and_route(&mut d, &fabric, &opts, &sink).unwrap_err();
        assert!(matches!(err, PnrError::InvalidNetlist(_)));
        assert!(sink.error_count() >= 1);
    }

    #[test]
    fn pads_counter_and_clock_route_on_a_mini_device() {
        let fabric = load_device("mini-6x6").unwrap();
        let (mut d, top) = new_design();
        let io = d.primitive(CellKind::Io).unwrap();

        let clk_pad = d.add_instance(top, io).unwrap();
        let clk_port = d.add_model_port(top, "clk", Direction::In);
        let clk_pin = d.add_net(top, "clk_pin");
        d.connect(clk_port, clk_pin);
        d.connect(d.find_instance_port(clk_pad, "PACKAGE_PIN").unwrap(), clk_pin);

        let led_pad = d.add_instance(top, io).unwrap();
        let led_port = d.add_model_port(top, "led", Direction::Out);
        let led_pin = d.add_net(top, "led_pin");
        d.connect(led_port, led_pin);
        d.connect(d.find_instance_port(led_pad, "PACKAGE_PIN").unwrap(), led_pin);

        let bits: Vec<_> = (0..4).map(|_| lut(&mut d, top)).collect();
        for w in bits.windows(2) {
            let net = d.add_temp_net(top);
            d.connect(d.find_instance_port(w[0], "COUT").unwrap(), net);
            d.connect(d.find_instance_port(w[1], "CIN").unwrap(), net);
        }
        let clk_targets: Vec<_> = bits.iter().map(|&b| (b, "CLK")).collect();
        join(&mut d, top, "clk", (clk_pad, "D_IN_0"), &clk_targets);
        join(&mut d, top, "q", (bits[3], "O"), &[(led_pad, "D_OUT_0"), (bits[0], "I0")]);

        let opts = PnrOptions {
            pins: [("clk".to_string(), "P3".to_string()), ("led".to_string(), "P7".to_string())]
                .into_iter()
                .collect(),
            promote_globals: true,
            ..options("tq32")
        };
        let sink = DiagnosticSink::new();
        let out = place_and_route(&mut d, &fabric, &opts, &sink).unwrap();

        assert!(d.find_net(top, "clk$glb").is_some());
        let pkg = fabric.package("tq32").unwrap();
        assert_eq!(out.placement.site(clk_pad), fabric.loc_cell(pkg.pin_loc["P3"]));
        assert_eq!(out.placement.site(led_pad), fabric.loc_cell(pkg.pin_loc["P7"]));
        check_placement(&d, top, &fabric, &out.placement).unwrap();
        assert_conflict_free(&fabric, &out.routing);

        // Carry links share a wire and need no switches.
        for inst in &bits[1..] {
            let cin = d.find_instance_port(*inst, "CIN").unwrap();
            let net = d.port(cin).connection().unwrap();
            assert_eq!(out.routing.route(net).map(|r| r.len()), Some(0));
        }
    }

    #[test]
    fn same_inputs_same_output() {
        let fabric = load_device("mini-6x6").unwrap();
        let build = || {
            let (mut d, top) = new_design();
            let cells: Vec<_> = (0..10).map(|_| lut(&mut d, top)).collect();
            for (k, w) in cells.windows(2).enumerate() {
                join(&mut d, top, &format!("n{k}"), (w[0], "O"), &[(w[1], "I0"), (w[0], "I1")]);
            }
            d
        };
        let mut d1 = build();
        let mut d2 = build();
        let sink = DiagnosticSink::new();
        let a = place_and_route(&mut d1, &fabric, &options("tq32"), &sink).unwrap();
        let b = place_and_route(&mut d2, &fabric, &options("tq32"), &sink).unwrap();
        assert_eq!(a, b);
    }
}
