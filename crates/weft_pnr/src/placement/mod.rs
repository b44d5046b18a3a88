//! Placement engine.
//!
//! Assigns every instance of the top model to a site of its own kind. An
//! initial legal layout is refined by simulated annealing to reduce
//! half-perimeter wire length, with timing-critical nets weighted up and
//! carry chains kept in consecutive logic slots of one column. Logic cells
//! share a tile only when they agree on its clock, clock enable, set/reset,
//! and clock polarity. The random
//! source is seeded, so a seed reproduces its placement exactly.

mod anneal;
mod carry;
mod context;
mod cost;
mod initial;
mod layout;
mod legality;

pub use legality::check_placement;

use crate::error::PnrError;
use crate::state::Placement;
use context::PlaceContext;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use weft_fabric::Fabric;
use weft_netlist::{Design, ModelId};

/// Annealing schedule and cost weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaceOptions {
    /// Seed of the random source. Must be positive.
    pub seed: u64,
    /// Temperature multiplier applied after each epoch.
    pub cooling_rate: f64,
    /// Annealing stops once the temperature drops below this.
    pub min_temperature: f64,
    /// Moves per epoch, per movable instance.
    pub epoch_multiplier: usize,
    /// Total move budget, per movable instance.
    pub move_budget: usize,
    /// Initial temperature as a multiple of the calibrated cost spread.
    pub initial_temp_factor: f64,
    /// Cost multiplier for nets marked critical.
    pub timing_weight: f64,
}

impl Default for PlaceOptions {
    fn default() -> Self {
        Self {
            seed: 1,
            cooling_rate: 0.95,
            min_temperature: 0.01,
            epoch_multiplier: 10,
            move_budget: 2000,
            initial_temp_factor: 20.0,
            timing_weight: 4.0,
        }
    }
}

/// Places every instance of `top`.
///
/// Instances already in `locks` keep their sites. Fails before moving
/// anything if the seed is zero or the device lacks sites of some kind.
/// The result always passes [`check_placement`].
pub fn place(
    design: &Design,
    top: ModelId,
    fabric: &Fabric,
    locks: &Placement,
    options: &PlaceOptions,
) -> Result<Placement, PnrError> {
    if options.seed == 0 {
        return Err(PnrError::InvalidSeed);
    }

    let ctx = PlaceContext::new(design, top, fabric, locks, options.timing_weight)?;
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut layout = initial::initial_layout(&ctx, design, &mut rng)?;
    let stats = anneal::anneal(&ctx, &mut layout, options, &mut rng);

    let placement = layout.to_placement(&ctx);
    check_placement(design, top, fabric, &placement)?;
    tracing::info!(
        instances = placement.len(),
        chains = ctx.chains.len(),
        initial_cost = stats.initial_cost,
        final_cost = stats.final_cost,
        moves = stats.moves,
        accepted = stats.accepted,
        epochs = stats.epochs,
        "placement done"
    );
    Ok(placement)
}
