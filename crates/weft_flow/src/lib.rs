//! The weft pipeline, from a packed netlist to configuration bits.
//!
//! [`run`] builds the device named in the run configuration, then runs the
//! phases in order, each completing before the next starts:
//!
//! 1. Validate the netlist (prune, check)
//! 2. Lock constrained pads to package pins, or read `loc` attributes in
//!    route-only mode
//! 3. Promote busy control nets to global buffers, when enabled
//! 4. Place
//! 5. Route
//! 6. Assemble the configuration
//!
//! Every fatal error is emitted into the [`DiagnosticSink`] as a coded
//! diagnostic and also returned. Identical inputs give an identical
//! [`FlowOutput::fingerprint`].
//!
//! ```ignore
//! let config = weft_config::load_config(Path::new("."))?;
//! let out = weft_flow::run(&mut design, &config, &sink)?;
//! println!("{}", out.fingerprint);
//! ```

#![warn(missing_docs)]

pub mod error;

pub use error::FlowError;

use serde::{Deserialize, Serialize};
use std::path::Path;
use weft_bitstream::Configuration;
use weft_common::ContentHash;
use weft_config::RunConfig;
use weft_diagnostics::{DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use weft_fabric::Fabric;
use weft_netlist::Design;
use weft_pnr::{Placement, PlaceOptions, PnrOptions, RouteOptions, RoutingSolution};

/// Everything a successful run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowOutput {
    /// Site of every instance.
    pub placement: Placement,
    /// Switches of every routed net.
    pub routing: RoutingSolution,
    /// The assembled configuration bits.
    pub configuration: Configuration,
    /// Fingerprint of `configuration`.
    pub fingerprint: ContentHash,
}

/// Translates a run configuration into place-and-route options.
///
/// An empty package name selects the device's first package.
pub fn pnr_options(config: &RunConfig, fabric: &Fabric) -> PnrOptions {
    let package = if config.run.package.is_empty() {
        fabric.package_names().next().unwrap_or_default().to_string()
    } else {
        config.run.package.clone()
    };
    let p = &config.placement;
    let r = &config.routing;
    PnrOptions {
        package,
        pins: config.pins.clone(),
        warn_no_port: config.run.warn_no_port,
        prune: config.run.prune,
        route_only: config.run.route_only,
        promote_globals: config.run.promote_globals,
        global_threshold: r.global_promotion_threshold,
        place: PlaceOptions {
            seed: config.run.seed,
            cooling_rate: p.cooling_rate,
            min_temperature: p.min_temperature,
            epoch_multiplier: p.epoch_multiplier,
            move_budget: p.move_budget_per_instance,
            initial_temp_factor: p.initial_temp_factor,
            timing_weight: p.timing_weight,
        },
        route: RouteOptions {
            max_passes: config.run.max_passes,
            base_cost: r.base_cost,
            present_initial: r.present_initial,
            present_growth: r.present_growth,
            history_factor: r.history_factor,
        },
    }
}

/// Runs the whole pipeline on the device named by `config.run.device`.
pub fn run(
    design: &mut Design,
    config: &RunConfig,
    sink: &DiagnosticSink,
) -> Result<FlowOutput, FlowError> {
    let fabric = weft_fabric::load_device(&config.run.device)
        .map_err(FlowError::from)
        .inspect_err(|err| sink.emit(err.to_diagnostic()))?;
    run_on(design, &fabric, config, sink)
}

/// Loads `<dir>/weft.toml` and runs the pipeline with it.
pub fn run_in_dir(
    dir: &Path,
    design: &mut Design,
    sink: &DiagnosticSink,
) -> Result<FlowOutput, FlowError> {
    let config = weft_config::load_config(dir)
        .map_err(FlowError::from)
        .inspect_err(|err| sink.emit(err.to_diagnostic()))?;
    run(design, &config, sink)
}

/// Runs the whole pipeline on an already built fabric.
pub fn run_on(
    design: &mut Design,
    fabric: &Fabric,
    config: &RunConfig,
    sink: &DiagnosticSink,
) -> Result<FlowOutput, FlowError> {
    tracing::info!(
        device = fabric.device(),
        seed = config.run.seed,
        instances = design.instance_count(),
        "flow started"
    );
    let options = pnr_options(config, fabric);

    // Place and route reports its own failures.
    let pnr = weft_pnr::place_and_route(design, fabric, &options, sink)?;

    let top = design.top().ok_or(weft_pnr::PnrError::MissingTop)?;
    let configuration = weft_bitstream::assemble(design, top, fabric, &pnr.placement, &pnr.routing)
        .map_err(FlowError::from)
        .inspect_err(|err| sink.emit(err.to_diagnostic()))?;
    let fingerprint = configuration.fingerprint();

    tracing::info!(
        placed = pnr.placement.len(),
        nets = pnr.routing.net_count(),
        switches = pnr.routing.switch_count(),
        passes = pnr.routing.passes(),
        bits = configuration.len(),
        %fingerprint,
        "flow finished"
    );
    Ok(FlowOutput {
        placement: pnr.placement,
        routing: pnr.routing,
        configuration,
        fingerprint,
    })
}

/// Renders every diagnostic collected so far, in emission order.
pub fn report(sink: &DiagnosticSink, color: bool) -> String {
    let renderer = TerminalRenderer::new(color);
    sink.diagnostics().iter().map(|d| renderer.render(d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_fabric::{load_device, CellKind, SiteId};
    use weft_netlist::{add_fabric_library, Const, Direction, InstanceId, ModelId};
    use weft_pnr::{PnrError, LOCATION_ATTR};

    fn new_design() -> (Design, ModelId) {
        let mut d = Design::new();
        add_fabric_library(&mut d).unwrap();
        let top = d.add_model("top", None).unwrap();
        d.set_top(top);
        (d, top)
    }

    fn add(d: &mut Design, top: ModelId, kind: CellKind) -> InstanceId {
        let m = d.primitive(kind).unwrap();
        d.add_instance(top, m).unwrap()
    }

    fn join(d: &mut Design, top: ModelId, name: &str, from: (InstanceId, &str), to: &[(InstanceId, &str)]) {
        let net = d.add_net(top, name);
        d.connect(d.find_instance_port(from.0, from.1).unwrap(), net);
        for &(inst, port) in to {
            d.connect(d.find_instance_port(inst, port).unwrap(), net);
        }
    }

    fn config(device: &str) -> RunConfig {
        let mut c = RunConfig::default();
        c.run.device = device.to_string();
        c
    }

    /// A pad-driven 8-bit counter with a registered output pad.
    fn counter() -> (Design, ModelId) {
        let (mut d, top) = new_design();
        let clk_pad = add(&mut d, top, CellKind::Io);
        let clk_port = d.add_model_port(top, "clk", Direction::In);
        let pin = d.add_net(top, "clk_pin");
        d.connect(clk_port, pin);
        d.connect(d.find_instance_port(clk_pad, "PACKAGE_PIN").unwrap(), pin);

        let out_pad = add(&mut d, top, CellKind::Io);
        let out_port = d.add_model_port(top, "msb", Direction::Out);
        let pin = d.add_net(top, "msb_pin");
        d.connect(out_port, pin);
        d.connect(d.find_instance_port(out_pad, "PACKAGE_PIN").unwrap(), pin);
        d.set_param(out_pad, "PIN_TYPE", Const::parse_binary("011000").unwrap());

        let bits: Vec<_> = (0..8).map(|_| add(&mut d, top, CellKind::Logic)).collect();
        for &b in &bits {
            d.set_param(b, "LUT_INIT", Const::parse_binary("0110100110010110").unwrap());
            d.set_param(b, "CARRY_ENABLE", Const::from_u64(1, 1));
            d.set_param(b, "DFF_ENABLE", Const::from_u64(1, 1));
        }
        for w in bits.windows(2) {
            let carry = d.add_temp_net(top);
            d.connect(d.find_instance_port(w[0], "COUT").unwrap(), carry);
            d.connect(d.find_instance_port(w[1], "CIN").unwrap(), carry);
        }
        for (k, &b) in bits.iter().enumerate() {
            join(&mut d, top, &format!("q{k}"), (b, "O"), &[(b, "I1")]);
        }
        let msb = d.find_net(top, "q7").unwrap();
        d.connect(d.find_instance_port(out_pad, "D_OUT_0").unwrap(), msb);
        let targets: Vec<_> = bits.iter().map(|&b| (b, "CLK")).collect();
        join(&mut d, top, "clk", (clk_pad, "D_IN_0"), &targets);
        (d, top)
    }

    #[test]
    fn two_luts_end_to_end() {
        let (mut d, top) = new_design();
        let a = add(&mut d, top, CellKind::Logic);
        let b = add(&mut d, top, CellKind::Logic);
        d.set_param(a, "LUT_INIT", Const::from_u64(0x00ff, 16));
        d.set_param(b, "LUT_INIT", Const::from_u64(0xaaaa, 16));
        join(&mut d, top, "n", (a, "O"), &[(b, "I0")]);

        let sink = DiagnosticSink::new();
        let out = run(&mut d, &config("mini-4x4"), &sink).unwrap();
        let fabric = load_device("mini-4x4").unwrap();
        for inst in [a, b] {
            let site = out.placement.site(inst).unwrap();
            assert_eq!(fabric.cell_kind(site), CellKind::Logic);
        }

        let net = d.find_net(top, "n").unwrap();
        let switch_bits: usize = out
            .routing
            .route(net)
            .unwrap()
            .keys()
            .map(|&sw| fabric.switch(sw).cbits.len())
            .sum();
        assert_eq!(out.configuration.len(), 2 * 20 + switch_bits);
        assert_eq!(out.fingerprint, out.configuration.fingerprint());
        assert!(!sink.has_errors());
    }

    #[test]
    fn counter_runs_and_is_reproducible() {
        let mut c = config("mini-6x6");
        c.run.seed = 11;
        c.pins.insert("clk".into(), "P4".into());
        c.pins.insert("msb".into(), "P9".into());

        let sink = DiagnosticSink::new();
        let (mut d1, top) = counter();
        let first = run(&mut d1, &c, &sink).unwrap();
        let (mut d2, _) = counter();
        let second = run(&mut d2, &c, &sink).unwrap();
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first, second);

        let fabric = load_device("mini-6x6").unwrap();
        weft_pnr::check_placement(&d1, top, &fabric, &first.placement).unwrap();
        assert!(d1.find_net(top, "clk$glb").is_some());
        assert!(!sink.has_errors());
    }

    #[test]
    fn different_seeds_still_give_legal_results() {
        for seed in [1, 2, 3] {
            let mut c = config("mini-6x6");
            c.run.seed = seed;
            let (mut d, top) = counter();
            let out = run(&mut d, &c, &DiagnosticSink::new()).unwrap();
            let fabric = load_device("mini-6x6").unwrap();
            weft_pnr::check_placement(&d, top, &fabric, &out.placement).unwrap();
        }
    }

    #[test]
    fn too_many_cells_stop_before_routing() {
        let (mut d, top) = new_design();
        for _ in 0..3 {
            add(&mut d, top, CellKind::Ram);
        }
        let sink = DiagnosticSink::new();
        let err = run(&mut d, &config("mini-6x6"), &sink).unwrap_err();
        assert!(matches!(
            err,
            FlowError::Pnr(PnrError::Infeasible {
                kind: CellKind::Ram,
                demand: 3,
                supply: 2
            })
        ));
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn route_only_keeps_given_sites() {
        let fabric = load_device("mini-4x4").unwrap();
        let (mut d, top) = new_design();
        let cells: Vec<_> = (0..3).map(|_| add(&mut d, top, CellKind::Logic)).collect();
        join(&mut d, top, "x", (cells[0], "O"), &[(cells[1], "I0"), (cells[2], "I0")]);
        join(&mut d, top, "y", (cells[1], "O"), &[(cells[2], "I1")]);
        let logic = fabric.cells_of_kind(CellKind::Logic);
        let chosen: Vec<SiteId> = vec![logic[5], logic[12], logic[27]];
        for (&c, s) in cells.iter().zip(&chosen) {
            d.set_attr(c, LOCATION_ATTR, s.as_raw().to_string());
        }

        let mut c = config("mini-4x4");
        c.run.route_only = true;
        let out = run_on(&mut d, &fabric, &c, &DiagnosticSink::new()).unwrap();
        for (&inst, &site) in cells.iter().zip(&chosen) {
            assert_eq!(out.placement.site(inst), Some(site));
        }
        assert_eq!(out.routing.net_count(), 2);
    }

    #[test]
    fn unknown_device_is_reported() {
        let (mut d, _) = new_design();
        let sink = DiagnosticSink::new();
        let err = run(&mut d, &config("hx8k"), &sink).unwrap_err();
        assert!(matches!(err, FlowError::Fabric(_)));
        assert_eq!(sink.first_error().unwrap().code.to_string(), "I131");
        let text = report(&sink, false);
        assert!(text.starts_with("error[I131]: "));
        assert!(text.contains("= help: known devices: "));
    }

    #[test]
    fn malformed_parameter_is_reported() {
        let (mut d, top) = new_design();
        let a = add(&mut d, top, CellKind::Logic);
        let b = add(&mut d, top, CellKind::Logic);
        d.set_param(a, "LUT_INIT", Const::string("x01"));
        join(&mut d, top, "n", (a, "O"), &[(b, "I0")]);
        let sink = DiagnosticSink::new();
        let err = run(&mut d, &config("mini-4x4"), &sink).unwrap_err();
        assert!(matches!(err, FlowError::Assembly(_)));
        assert_eq!(sink.first_error().unwrap().code.to_string(), "A102");
    }

    #[test]
    fn runs_from_a_config_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("weft.toml"),
            "[run]\ndevice = \"mini-4x4\"\nseed = 3\n\n[placement]\nmove_budget_per_instance = 200\n",
        )
        .unwrap();
        let (mut d, top) = new_design();
        let a = add(&mut d, top, CellKind::Logic);
        let b = add(&mut d, top, CellKind::Logic);
        join(&mut d, top, "n", (a, "O"), &[(b, "I3")]);
        let out = run_in_dir(dir.path(), &mut d, &DiagnosticSink::new()).unwrap();
        assert_eq!(out.placement.len(), 2);

        std::fs::write(dir.path().join("weft.toml"), "[run]\nseed = 0\n").unwrap();
        let sink = DiagnosticSink::new();
        let err = run_in_dir(dir.path(), &mut d, &sink).unwrap_err();
        assert!(matches!(err, FlowError::Config(_)));
        assert_eq!(sink.first_error().unwrap().code.to_string(), "I130");
    }

    #[test]
    fn config_maps_onto_options() {
        let fabric = load_device("mini-8x8").unwrap();
        let mut c = config("mini-8x8");
        c.placement.move_budget_per_instance = 77;
        c.routing.global_promotion_threshold = 9;
        let o = pnr_options(&c, &fabric);
        assert_eq!(o.package, "tq48");
        assert_eq!(o.place.move_budget, 77);
        assert_eq!(o.global_threshold, 9);
        assert_eq!(o.route.max_passes, 200);
        assert!(o.promote_globals);
    }

    #[test]
    fn output_serializes() {
        let (mut d, top) = new_design();
        let a = add(&mut d, top, CellKind::Logic);
        let b = add(&mut d, top, CellKind::Logic);
        join(&mut d, top, "n", (a, "O"), &[(b, "I0")]);
        let out = run(&mut d, &config("mini-4x4"), &DiagnosticSink::new()).unwrap();
        let json = serde_json::to_string(&out).unwrap();
        let back: FlowOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, out);
    }
}
