//! Cheapest-path search from a partial route tree to one sink wire.

use crate::routing::congestion::CongestionMap;
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use weft_fabric::{Fabric, SwitchId, WireId};

/// One switch on a path: the switch, the wire it selects, and the wire it
/// drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Hop {
    pub(crate) switch: SwitchId,
    pub(crate) input: WireId,
    pub(crate) out: WireId,
}

/// A frontier entry of the priority queue.
#[derive(Debug, Clone, Copy)]
struct SearchState {
    wire: WireId,
    cost: f64,
}

impl PartialEq for SearchState {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchState {}

impl Ord for SearchState {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap; ties go to the lower wire id.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.wire.cmp(&self.wire))
    }
}

impl PartialOrd for SearchState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Per-pass cost parameters for entering a wire.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EdgeCost {
    pub(crate) base: f64,
    pub(crate) present_factor: f64,
}

/// Finds the cheapest path from any wire of `tree` to `target`.
///
/// Every tree wire starts at cost zero. Entering a wire through a switch
/// costs `base + present_factor × occupancy + history`. Returns the hops in
/// order from the tree to `target`, an empty path if `target` is already in
/// the tree, or `None` if `target` cannot be reached at all.
pub(crate) fn cheapest_path(
    fabric: &Fabric,
    congestion: &CongestionMap,
    tree: &BTreeSet<WireId>,
    target: WireId,
    cost: EdgeCost,
) -> Option<Vec<Hop>> {
    if tree.contains(&target) {
        return Some(Vec::new());
    }

    let mut open = BinaryHeap::new();
    let mut best: HashMap<WireId, f64> = HashMap::new();
    let mut came_from: HashMap<WireId, Hop> = HashMap::new();

    for &wire in tree {
        best.insert(wire, 0.0);
        open.push(SearchState { wire, cost: 0.0 });
    }

    while let Some(current) = open.pop() {
        if current.wire == target {
            return Some(reconstruct(&came_from, tree, target));
        }
        if current.cost > best.get(&current.wire).copied().unwrap_or(f64::INFINITY) {
            continue; // stale
        }

        for &sw in fabric.switches_from(current.wire) {
            let next = fabric.switch(sw).out;
            let tentative =
                current.cost + congestion.wire_cost(next, cost.base, cost.present_factor);
            if tentative < best.get(&next).copied().unwrap_or(f64::INFINITY) {
                best.insert(next, tentative);
                came_from.insert(
                    next,
                    Hop {
                        switch: sw,
                        input: current.wire,
                        out: next,
                    },
                );
                open.push(SearchState {
                    wire: next,
                    cost: tentative,
                });
            }
        }
    }

    None
}

fn reconstruct(
    came_from: &HashMap<WireId, Hop>,
    tree: &BTreeSet<WireId>,
    target: WireId,
) -> Vec<Hop> {
    let mut hops = Vec::new();
    let mut wire = target;
    while !tree.contains(&wire) {
        let hop = came_from[&wire];
        hops.push(hop);
        wire = hop.input;
    }
    hops.reverse();
    hops
}
