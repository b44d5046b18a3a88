//! The PathFinder negotiation loop.

use crate::error::PnrError;
use crate::routing::congestion::CongestionMap;
use crate::routing::search::{cheapest_path, EdgeCost};
use crate::routing::{routable_nets, RouteNet, RouteOptions};
use crate::state::{NetRoute, Placement, RoutingSolution};
use std::collections::{BTreeMap, BTreeSet};
use weft_fabric::{Fabric, WireId};
use weft_netlist::{Design, ModelId};

/// Routes every net of `top` under `placement`.
///
/// Each pass rips up all nets and reroutes them in order, global-driven nets
/// first. Between passes, every overused wire's history grows by its
/// overflow. Returns once a pass ends without overuse; fails with
/// [`PnrError::Unroutable`] after `max_passes`, or with
/// [`PnrError::NoPath`] as soon as a sink is structurally unreachable.
pub fn route(
    design: &Design,
    top: ModelId,
    fabric: &Fabric,
    placement: &Placement,
    options: &RouteOptions,
) -> Result<RoutingSolution, PnrError> {
    if options.max_passes == 0 {
        return Err(PnrError::InvalidPassCount);
    }

    let nets = routable_nets(design, top, fabric, placement)?;
    tracing::debug!(nets = nets.len(), "routing");

    let mut congestion = CongestionMap::new(fabric.wire_count(), options.history_factor);
    let mut trees: Vec<BTreeSet<WireId>> = Vec::new();

    for pass in 0..options.max_passes {
        congestion.rip_up_all();
        let cost = EdgeCost {
            base: options.base_cost,
            present_factor: options.present_factor(pass),
        };

        let mut routes = BTreeMap::new();
        trees.clear();
        for net in &nets {
            let (route, tree) = route_net(design, fabric, &congestion, net, cost)?;
            for &w in &tree {
                congestion.claim(w);
            }
            routes.insert(net.net, route);
            trees.push(tree);
        }

        if !congestion.has_congestion() {
            let solution = RoutingSolution::new(routes, pass + 1);
            tracing::info!(
                passes = pass + 1,
                nets = solution.net_count(),
                switches = solution.switch_count(),
                "routing converged"
            );
            return Ok(solution);
        }

        tracing::debug!(pass, overused = congestion.overused().count(), "congested");
        congestion.update_history();
    }

    let overused: BTreeSet<WireId> = congestion.overused().collect();
    let culprit = nets
        .iter()
        .zip(&trees)
        .filter(|(_, tree)| !tree.is_disjoint(&overused))
        .map(|(net, _)| net.net)
        .min()
        .ok_or_else(|| PnrError::IllegalPlacement("overused wire with no claimant".into()))?;
    tracing::warn!(passes = options.max_passes, overused = overused.len(), "routing failed");
    Err(PnrError::Unroutable {
        net: design.net(culprit).name.clone(),
        passes: options.max_passes,
        overused: overused.len(),
    })
}

/// Grows a route tree from the driver to each sink in turn.
fn route_net(
    design: &Design,
    fabric: &Fabric,
    congestion: &CongestionMap,
    net: &RouteNet,
    cost: EdgeCost,
) -> Result<(NetRoute, BTreeSet<WireId>), PnrError> {
    let mut tree = BTreeSet::from([net.driver]);
    let mut route = NetRoute::new();

    for &sink in &net.sinks {
        let hops = cheapest_path(fabric, congestion, &tree, sink, cost).ok_or_else(|| {
            PnrError::NoPath {
                net: design.net(net.net).name.clone(),
                from: fabric.wire_name(net.driver).to_string(),
                to: fabric.wire_name(sink).to_string(),
            }
        })?;
        for hop in hops {
            route.insert(hop.switch, hop.input);
            tree.insert(hop.out);
        }
    }
    Ok((route, tree))
}
