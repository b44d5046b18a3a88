//! Simulated annealing placement refinement.
//!
//! Starting from a legal initial layout, repeatedly proposes a move and
//! accepts or rejects it with the Metropolis criterion. A move relocates a
//! free instance to a random site of its kind (swapping with a free
//! occupant), or shifts a whole carry chain into another free column run.
//! Moves that would break I/O bank uniformity, or put logic cells with
//! different clock, enable, reset, or clock polarity into one tile, are
//! never proposed, so the layout stays legal throughout. Cost is tracked incrementally per net.

use crate::placement::context::PlaceContext;
use crate::placement::cost::{chain_cost, net_cost, total_cost};
use crate::placement::layout::Layout;
use crate::placement::PlaceOptions;
use rand::Rng;
use weft_fabric::SiteId;

/// Calibration moves used to measure the initial cost spread, at least.
const MIN_CALIBRATION_MOVES: usize = 16;

/// Proposal attempts allowed per requested calibration move.
const CALIBRATION_ATTEMPTS: usize = 4;

/// What can be moved: a free instance outside any chain, or a whole chain.
#[derive(Debug, Clone, Copy)]
enum Unit {
    Single(usize),
    Chain(usize),
}

/// Counters from one annealing run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct AnnealStats {
    pub(crate) initial_cost: f64,
    pub(crate) final_cost: f64,
    pub(crate) temperature: f64,
    pub(crate) epochs: usize,
    pub(crate) moves: usize,
    pub(crate) accepted: usize,
}

struct Annealer<'c, 'f, R> {
    ctx: &'c PlaceContext<'f>,
    layout: Layout,
    rng: R,
    units: Vec<Unit>,
    net_costs: Vec<f64>,
    chain_costs: Vec<f64>,
    cost: f64,
    // Scratch space for the nets and chains one move touches.
    stamp: u32,
    net_stamp: Vec<u32>,
    chain_stamp: Vec<u32>,
    touched_nets: Vec<usize>,
    touched_chains: Vec<usize>,
}

/// Refines `layout` in place and returns what happened.
pub(crate) fn anneal(
    ctx: &PlaceContext<'_>,
    layout: &mut Layout,
    options: &PlaceOptions,
    rng: &mut impl Rng,
) -> AnnealStats {
    let mut units = Vec::new();
    let mut movable = 0;
    for i in 0..ctx.insts.len() {
        if ctx.chain_of[i].is_none() && ctx.is_movable(i) {
            units.push(Unit::Single(i));
            movable += 1;
        }
    }
    for (c, chain) in ctx.chains.iter().enumerate() {
        if chain.iter().all(|&m| ctx.is_movable(m)) {
            units.push(Unit::Chain(c));
            movable += chain.len();
        }
    }

    let net_costs: Vec<f64> = (0..ctx.nets.len()).map(|n| net_cost(ctx, layout, n)).collect();
    let chain_costs: Vec<f64> = (0..ctx.chains.len())
        .map(|c| chain_cost(ctx, layout, c))
        .collect();
    let cost = net_costs.iter().sum::<f64>() + chain_costs.iter().sum::<f64>();
    let mut stats = AnnealStats {
        initial_cost: cost,
        final_cost: cost,
        ..AnnealStats::default()
    };
    if units.is_empty() {
        return stats;
    }

    let mut a = Annealer {
        ctx,
        layout: layout.clone(),
        rng,
        units,
        net_costs,
        chain_costs,
        cost,
        stamp: 0,
        net_stamp: vec![0; ctx.nets.len()],
        chain_stamp: vec![0; ctx.chains.len()],
        touched_nets: Vec::new(),
        touched_chains: Vec::new(),
    };

    let sigma = a.calibrate(MIN_CALIBRATION_MOVES.max(movable));
    let mut temperature = options.initial_temp_factor * sigma;
    stats.temperature = temperature;
    let epoch = options.epoch_multiplier * movable;
    let budget = options.move_budget * movable;
    tracing::debug!(movable, sigma, temperature, budget, "annealing");

    while temperature >= options.min_temperature && stats.moves < budget {
        let mut accepted = 0;
        let mut tried = 0;
        while tried < epoch && stats.moves < budget {
            tried += 1;
            stats.moves += 1;
            if a.step(temperature) {
                accepted += 1;
            }
        }
        stats.accepted += accepted;
        stats.epochs += 1;
        tracing::trace!(
            epoch = stats.epochs,
            temperature,
            cost = a.cost,
            accepted,
            "epoch done"
        );
        temperature *= options.cooling_rate;
    }

    *layout = a.layout;
    stats.final_cost = total_cost(ctx, layout);
    stats.temperature = temperature;
    stats
}

impl<R: Rng> Annealer<'_, '_, R> {
    /// Applies `n` random moves unconditionally and returns the standard
    /// deviation of the cost seen along the way.
    fn calibrate(&mut self, n: usize) -> f64 {
        let mut samples = Vec::with_capacity(n);
        for _ in 0..n * CALIBRATION_ATTEMPTS {
            if samples.len() == n {
                break;
            }
            if let Some(moves) = self.propose() {
                let delta = self.apply(&moves);
                self.commit(delta);
                samples.push(self.cost);
            }
        }
        if samples.len() < 2 {
            return 0.0;
        }
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let var = samples.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        var.sqrt()
    }

    /// Proposes, evaluates, and accepts or undoes one move. Returns whether
    /// a move was accepted.
    fn step(&mut self, temperature: f64) -> bool {
        let Some(moves) = self.propose() else {
            return false;
        };
        let undo: Vec<(usize, SiteId)> = moves
            .iter()
            .map(|&(i, _)| (i, self.layout.site(i)))
            .collect();
        let delta = self.apply(&moves);
        if delta <= 0.0 || self.rng.gen::<f64>() < (-delta / temperature).exp() {
            self.commit(delta);
            true
        } else {
            self.layout.apply(self.ctx, &undo);
            false
        }
    }

    /// Picks a random unit and a destination for it. Returns `None` when the
    /// pick leads nowhere (same site, locked occupant, bank or tile control
    /// conflict, or no room for a chain).
    fn propose(&mut self) -> Option<Vec<(usize, SiteId)>> {
        let ctx = self.ctx;
        let moves = match self.units[self.rng.gen_range(0..self.units.len())] {
            Unit::Single(i) => {
                let sites = ctx.fabric.cells_of_kind(ctx.kinds[i]);
                let target = sites[self.rng.gen_range(0..sites.len())];
                let from = self.layout.site(i);
                if target == from {
                    return None;
                }
                match self.layout.occupant(target) {
                    None => self.bank_allows(i, from, target, None).then(|| vec![(i, target)]),
                    Some(j) if ctx.is_movable(j) && ctx.chain_of[j].is_none() => self
                        .bank_allows(i, from, target, Some(j))
                        .then(|| vec![(i, target), (j, from)]),
                    Some(_) => None,
                }
            }
            Unit::Chain(c) => {
                let chain = &ctx.chains[c];
                let logic = ctx.fabric.cells_of_kind(ctx.kinds[chain[0]]);
                let anchor = logic[self.rng.gen_range(0..logic.len())];
                let (x, pos) = ctx.column_pos(anchor);
                let run = ctx.column_run(x, pos, chain.len())?;
                if run[0] == self.layout.site(chain[0]) {
                    return None;
                }
                let fits = run.iter().all(|&s| match self.layout.occupant(s) {
                    None => true,
                    Some(j) => ctx.chain_of[j] == Some(c),
                });
                fits.then(|| chain.iter().copied().zip(run).collect())
            }
        };
        moves.filter(|m| self.layout.control_conflict(ctx, m).is_none())
    }

    /// Returns whether moving I/O instance `i` from `from` to `to`, with
    /// `partner` going the other way, keeps both banks uniform.
    fn bank_allows(&self, i: usize, from: SiteId, to: SiteId, partner: Option<usize>) -> bool {
        let ctx = self.ctx;
        let (Some(std), Some(to_bank), Some(from_bank)) =
            (ctx.io_std[i], ctx.bank(to), ctx.bank(from))
        else {
            return true;
        };
        if to_bank == from_bank {
            return true;
        }
        let partner_std = partner.and_then(|j| ctx.io_std[j]);
        let banks = &self.layout.banks;
        if banks.conflict(to_bank, std, partner_std).is_some() {
            return false;
        }
        match partner_std {
            Some(p) => banks.conflict(from_bank, p, Some(std)).is_none(),
            None => true,
        }
    }

    /// Moves instances and returns the change in cost. Recomputed costs are
    /// left in the scratch lists until [`commit`](Self::commit).
    fn apply(&mut self, moves: &[(usize, SiteId)]) -> f64 {
        let ctx = self.ctx;
        self.stamp += 1;
        self.touched_nets.clear();
        self.touched_chains.clear();
        for &(i, _) in moves {
            for &n in &ctx.inst_nets[i] {
                if self.net_stamp[n] != self.stamp {
                    self.net_stamp[n] = self.stamp;
                    self.touched_nets.push(n);
                }
            }
            if let Some(c) = ctx.chain_of[i] {
                if self.chain_stamp[c] != self.stamp {
                    self.chain_stamp[c] = self.stamp;
                    self.touched_chains.push(c);
                }
            }
        }

        self.layout.apply(ctx, moves);

        let mut delta = 0.0;
        for &n in &self.touched_nets {
            delta += net_cost(ctx, &self.layout, n) - self.net_costs[n];
        }
        for &c in &self.touched_chains {
            delta += chain_cost(ctx, &self.layout, c) - self.chain_costs[c];
        }
        delta
    }

    /// Makes the last applied move permanent.
    fn commit(&mut self, delta: f64) {
        for &n in &self.touched_nets {
            self.net_costs[n] = net_cost(self.ctx, &self.layout, n);
        }
        for &c in &self.touched_chains {
            self.chain_costs[c] = chain_cost(self.ctx, &self.layout, c);
        }
        self.cost += delta;
    }
}
