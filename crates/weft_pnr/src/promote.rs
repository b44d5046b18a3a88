//! Global buffer promotion.
//!
//! High-fanout clock, reset, and enable nets route poorly over local tracks.
//! Promotion inserts a global buffer in front of such a net and moves its
//! control pins onto the buffered copy, which then rides a global wire.

use std::collections::BTreeMap;
use weft_fabric::{CellKind, Fabric};
use weft_netlist::{Design, ModelId, NetId, PortId};

/// Logic cell pins that can be fed from a global wire.
const CONTROL_PINS: [&str; 3] = ["CLK", "SR", "CEN"];

/// Promotes the busiest control nets of `top` to global buffers.
///
/// A net qualifies when at least `threshold` logic-cell control pins hang
/// off it and it is not constant, not a pad boundary net, and not already
/// driven by a global buffer. Candidates go in order of descending pin count
/// (ties by net id) until the device's free global buffers run out. Returns
/// the number of nets promoted.
pub fn promote_globals(design: &mut Design, top: ModelId, fabric: &Fabric, threshold: usize) -> usize {
    let Some(gb_model) = design.primitive(CellKind::GlobalBuffer) else {
        return 0;
    };
    let in_use = design
        .model(top)
        .instances()
        .iter()
        .filter(|&&i| design.instance(i).kind == CellKind::GlobalBuffer)
        .count();
    let mut free = fabric
        .cells_of_kind(CellKind::GlobalBuffer)
        .len()
        .saturating_sub(in_use);

    let boundary = design.boundary_nets(top);
    let mut candidates: BTreeMap<NetId, Vec<PortId>> = BTreeMap::new();
    for &net in design.model(top).nets().values() {
        if design.net(net).is_constant() || boundary.contains(&net) {
            continue;
        }
        let driven_by_gb = design
            .driver(net)
            .and_then(|p| design.port(p).instance())
            .is_some_and(|i| design.instance(i).kind == CellKind::GlobalBuffer);
        if driven_by_gb {
            continue;
        }
        let pins: Vec<PortId> = design
            .connections(net)
            .iter()
            .copied()
            .filter(|&p| {
                let port = design.port(p);
                CONTROL_PINS.contains(&port.name.as_str())
                    && port
                        .instance()
                        .is_some_and(|i| design.instance(i).kind == CellKind::Logic)
            })
            .collect();
        if pins.len() >= threshold {
            candidates.insert(net, pins);
        }
    }

    let mut order: Vec<(NetId, Vec<PortId>)> = candidates.into_iter().collect();
    order.sort_by_key(|(net, pins)| (std::cmp::Reverse(pins.len()), *net));

    let mut promoted = 0;
    for (net, pins) in order {
        if free == 0 {
            tracing::debug!(net = %design.net(net).name, "no global buffer left");
            break;
        }
        let Ok(gb) = design.add_instance(top, gb_model) else {
            break;
        };
        let name = format!("{}$glb", design.net(net).name);
        let global = design.add_net(top, &name);
        if let Some(input) = design.find_instance_port(gb, "USER_SIGNAL_TO_GLOBAL_BUFFER") {
            design.connect(input, net);
        }
        if let Some(output) = design.find_instance_port(gb, "GLOBAL_BUFFER_OUTPUT") {
            design.connect(output, global);
        }
        for &p in &pins {
            design.disconnect(p);
            design.connect(p, global);
        }
        tracing::info!(net = %design.net(net).name, fanout = pins.len(), "promoted to global");
        free -= 1;
        promoted += 1;
    }
    promoted
}
