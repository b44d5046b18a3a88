//! Routing: connect every placed net through the fabric's switch graph.
//!
//! Routing uses PathFinder negotiated congestion. Each pass rips up every
//! net and reroutes it with cheapest-path search, pricing wires by present
//! occupancy and accumulated history. Routing succeeds when a pass ends with
//! no wire claimed by two nets.

pub mod congestion;
pub mod pathfinder;
pub(crate) mod search;

pub use congestion::CongestionMap;
pub use pathfinder::route;

use crate::error::PnrError;
use crate::state::Placement;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use weft_fabric::{Fabric, WireId};
use weft_netlist::{Design, ModelId, NetId};

/// Tunables of the negotiation loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteOptions {
    /// Passes to run before giving up.
    pub max_passes: usize,
    /// Cost of entering any wire.
    pub base_cost: f64,
    /// Present congestion factor of the first pass.
    pub present_initial: f64,
    /// Increase of the present congestion factor per pass.
    pub present_growth: f64,
    /// History penalty added per unit of overflow per pass.
    pub history_factor: f64,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            max_passes: 200,
            base_cost: 1.0,
            present_initial: 0.5,
            present_growth: 0.5,
            history_factor: 1.0,
        }
    }
}

impl RouteOptions {
    /// Returns the present congestion factor for 0-based `pass`.
    pub fn present_factor(&self, pass: usize) -> f64 {
        self.present_initial + self.present_growth * pass as f64
    }
}

/// A net reduced to the wires routing has to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RouteNet {
    pub(crate) net: NetId,
    pub(crate) driver: WireId,
    /// Distinct sink wires in ascending id order.
    pub(crate) sinks: Vec<WireId>,
}

/// Collects the nets of `top` that need routing, in routing order.
///
/// Pad boundary nets, constant nets that feed no cell, and nets without a
/// driver wire or any sink wire are skipped. A constant net that still
/// feeds a cell has no wire to start from and is an error. Ports with no
/// wire binding do not take part. Nets driven from a global wire come
/// first, then the rest by ascending id.
pub(crate) fn routable_nets(
    design: &Design,
    top: ModelId,
    fabric: &Fabric,
    placement: &Placement,
) -> Result<Vec<RouteNet>, PnrError> {
    let boundary = design.boundary_nets(top);
    let mut nets = Vec::new();

    let mut ids: Vec<NetId> = design.model(top).nets().values().copied().collect();
    ids.sort_unstable();
    for net in ids {
        if boundary.contains(&net) {
            continue;
        }
        if design.net(net).is_constant() {
            let feeds_cell = design.connections(net).iter().any(|&p| {
                let port = design.port(p);
                port.instance().is_some() && port.is_input()
            });
            if feeds_cell {
                return Err(PnrError::UnrealizedConstant(design.net(net).name.clone()));
            }
            continue;
        }
        let mut driver = None;
        let mut sinks = BTreeSet::new();
        for &p in design.connections(net) {
            let port = design.port(p);
            let Some(inst) = port.instance() else {
                continue;
            };
            let site = placement.site(inst).ok_or_else(|| {
                PnrError::IllegalPlacement(format!("{} is not placed", design.instance_label(inst)))
            })?;
            let Some(wire) = fabric.pin_wire(site, &port.name) else {
                continue;
            };
            if port.is_output() {
                driver = Some(wire);
            } else if port.is_input() {
                sinks.insert(wire);
            }
        }
        match driver {
            Some(driver) if !sinks.is_empty() => nets.push(RouteNet {
                net,
                driver,
                sinks: sinks.into_iter().collect(),
            }),
            _ => tracing::trace!(net = %design.net(net).name, "nothing to route"),
        }
    }

    nets.sort_by_key(|n| (!fabric.is_global_wire(n.driver), n.net));
    Ok(nets)
}
