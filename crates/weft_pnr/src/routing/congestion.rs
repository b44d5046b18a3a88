//! Wire occupancy and history costs for negotiated congestion routing.
//!
//! Every wire has capacity one. Present occupancy counts the nets claiming a
//! wire in the current pass; history accumulates a penalty for every pass a
//! wire ends overused, so repeatedly contested wires grow expensive until one
//! of the contenders finds another way.

use weft_fabric::WireId;

/// Per-wire occupancy and history state across PathFinder passes.
#[derive(Debug, Clone)]
pub struct CongestionMap {
    occupancy: Vec<u32>,
    history: Vec<f64>,
    history_factor: f64,
}

impl CongestionMap {
    /// Creates a map for `wire_count` wires, all free and without history.
    pub fn new(wire_count: usize, history_factor: f64) -> Self {
        Self {
            occupancy: vec![0; wire_count],
            history: vec![0.0; wire_count],
            history_factor,
        }
    }

    /// Records that one more net claims `wire`.
    pub fn claim(&mut self, wire: WireId) {
        self.occupancy[wire.as_raw() as usize] += 1;
    }

    /// Returns the number of nets claiming `wire`.
    pub fn occupancy(&self, wire: WireId) -> u32 {
        self.occupancy[wire.as_raw() as usize]
    }

    /// Returns the accumulated history penalty of `wire`.
    pub fn history(&self, wire: WireId) -> f64 {
        self.history[wire.as_raw() as usize]
    }

    /// Returns whether any wire is claimed by more than one net.
    pub fn has_congestion(&self) -> bool {
        self.occupancy.iter().any(|&o| o > 1)
    }

    /// Returns the overused wires in id order.
    pub fn overused(&self) -> impl Iterator<Item = WireId> + '_ {
        self.occupancy
            .iter()
            .enumerate()
            .filter(|&(_, &o)| o > 1)
            .map(|(i, _)| WireId::from_raw(i as u32))
    }

    /// Returns the cost of entering `wire` during a pass whose present
    /// congestion factor is `present_factor`.
    ///
    /// Occupancy here is what other nets have claimed so far this pass.
    pub fn wire_cost(&self, wire: WireId, base_cost: f64, present_factor: f64) -> f64 {
        let i = wire.as_raw() as usize;
        base_cost + present_factor * f64::from(self.occupancy[i]) + self.history[i]
    }

    /// Adds `history_factor × overflow` to every overused wire.
    pub fn update_history(&mut self) {
        for (occ, hist) in self.occupancy.iter().zip(self.history.iter_mut()) {
            if *occ > 1 {
                *hist += self.history_factor * f64::from(occ - 1);
            }
        }
    }

    /// Clears present occupancy for the next pass. History is kept.
    pub fn rip_up_all(&mut self) {
        self.occupancy.fill(0);
    }
}
