//! Pre-placement constraints: package pin assignments and route-only
//! locations.

use crate::error::PnrError;
use crate::state::Placement;
use std::collections::BTreeMap;
use weft_diagnostics::{Diagnostic, DiagnosticSink};
use weft_fabric::{CellKind, Fabric, SiteId};
use weft_netlist::{Design, InstanceId, ModelId};

/// Instance attribute holding a cell number in route-only mode.
pub const LOCATION_ATTR: &str = "loc";

/// Locks the pad instances behind top-level ports to package pins.
///
/// `pins` maps port names to pin names. A port missing from `top` is an
/// error, or only a warning (and the constraint is skipped) when
/// `warn_no_port` is set. Each constrained port must be tied straight to the
/// pad pin of an I/O or PLL instance, which is locked at the pin's site.
/// With no constraints the package is not looked up at all.
pub fn apply_pin_constraints(
    design: &Design,
    top: ModelId,
    fabric: &Fabric,
    package: &str,
    pins: &BTreeMap<String, String>,
    warn_no_port: bool,
    sink: &DiagnosticSink,
) -> Result<Placement, PnrError> {
    if pins.is_empty() {
        return Ok(Placement::new());
    }
    let pkg = fabric
        .package(package)
        .ok_or_else(|| PnrError::UnknownPackage(package.to_string()))?;

    let mut pin_owner: BTreeMap<&str, &str> = BTreeMap::new();
    let mut locks = Placement::new();

    for (port_name, pin) in pins {
        let Some(port) = design.find_model_port(top, port_name) else {
            if !warn_no_port {
                return Err(PnrError::UnknownPort(port_name.clone()));
            }
            let err = PnrError::UnknownPort(port_name.clone());
            tracing::warn!(port = %port_name, "constraint ignored");
            sink.emit(
                Diagnostic::warning(err.code(), format!("{err}, constraint ignored"))
                    .with_subject(format!("port `{port_name}`")),
            );
            continue;
        };

        let loc = pkg
            .pin_loc
            .get(pin)
            .copied()
            .ok_or_else(|| PnrError::UnknownPin {
                pin: pin.clone(),
                package: package.to_string(),
            })?;
        if let Some(first) = pin_owner.insert(pin, port_name) {
            return Err(PnrError::DuplicatePin {
                pin: pin.clone(),
                first: first.to_string(),
                second: port_name.clone(),
            });
        }
        let site = fabric.loc_cell(loc).ok_or_else(|| PnrError::UnknownPin {
            pin: pin.clone(),
            package: package.to_string(),
        })?;

        let inst = design
            .connection_other_port(port)
            .map(|p| design.port(p))
            .filter(|p| p.name == "PACKAGE_PIN" || p.name == "PACKAGEPIN")
            .and_then(|p| p.instance())
            .ok_or_else(|| PnrError::PortNotOnPad(port_name.clone()))?;

        lock(design, fabric, &mut locks, inst, site)?;
        tracing::debug!(port = %port_name, %pin, %site, "pin locked");
    }
    Ok(locks)
}

/// Reads every instance's location from its `loc` attribute.
///
/// Used when placement is skipped: each instance must name a cell number of
/// the device holding a site of its own kind, and no two instances may name
/// the same cell.
pub fn placement_from_locations(
    design: &Design,
    top: ModelId,
    fabric: &Fabric,
) -> Result<Placement, PnrError> {
    let mut placement = Placement::new();
    for &inst in design.model(top).instances() {
        let value = design
            .instance(inst)
            .attr(LOCATION_ATTR)
            .ok_or_else(|| PnrError::MissingLocation(design.instance_label(inst)))?;
        let site = value
            .trim()
            .parse::<u32>()
            .ok()
            .map(SiteId::from_raw)
            .filter(|&s| fabric.contains_site(s))
            .ok_or_else(|| PnrError::MalformedLocation {
                instance: design.instance_label(inst),
                value: value.to_string(),
            })?;
        lock(design, fabric, &mut placement, inst, site)?;
    }
    Ok(placement)
}

fn lock(
    design: &Design,
    fabric: &Fabric,
    placement: &mut Placement,
    inst: InstanceId,
    site: SiteId,
) -> Result<(), PnrError> {
    let kind: CellKind = design.instance(inst).kind;
    let site_kind = fabric.cell_kind(site);
    if kind != site_kind {
        return Err(PnrError::IllegalLock {
            instance: design.instance_label(inst),
            kind,
            site,
            site_kind,
        });
    }
    if let Some(first) = placement.occupant(site) {
        if first != inst {
            return Err(PnrError::DuplicateLock {
                site,
                first: design.instance_label(first),
                second: design.instance_label(inst),
            });
        }
    }
    placement.lock(inst, site);
    Ok(())
}
