//! Configuration types deserialized from `weft.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The whole run configuration parsed from `weft.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Device, package, seed, and pipeline switches.
    #[serde(default)]
    pub run: RunSection,
    /// Annealing schedule and cost weights.
    #[serde(default)]
    pub placement: PlacementSection,
    /// Negotiated-congestion tuning and global promotion.
    #[serde(default)]
    pub routing: RoutingSection,
    /// Top-level port name to package pin name.
    #[serde(default)]
    pub pins: BTreeMap<String, String>,
}

/// The `[run]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    /// Device name, e.g. `mini-6x6`.
    pub device: String,
    /// Package name. Empty means the device's only package.
    pub package: String,
    /// Seed of the placement random source. Must be non-zero.
    pub seed: u64,
    /// Routing negotiation pass limit. Must be at least 1.
    pub max_passes: usize,
    /// Skip placement and read sites from `loc` attributes.
    pub route_only: bool,
    /// Move busy control nets onto global buffers before placement.
    pub promote_globals: bool,
    /// Remove dangling nets before checking the netlist.
    pub prune: bool,
    /// Only warn about pin constraints on ports that do not exist.
    pub warn_no_port: bool,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            device: "mini-6x6".to_string(),
            package: String::new(),
            seed: 1,
            max_passes: 200,
            route_only: false,
            promote_globals: true,
            prune: true,
            warn_no_port: false,
        }
    }
}

/// The `[placement]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlacementSection {
    /// Temperature multiplier per epoch, in (0, 1).
    pub cooling_rate: f64,
    /// Temperature floor that ends annealing.
    pub min_temperature: f64,
    /// Moves per epoch, per movable instance.
    pub epoch_multiplier: usize,
    /// Total move budget, per movable instance.
    pub move_budget_per_instance: usize,
    /// Initial temperature as a multiple of the calibrated cost spread.
    pub initial_temp_factor: f64,
    /// Cost multiplier for timing-critical nets.
    pub timing_weight: f64,
}

impl Default for PlacementSection {
    fn default() -> Self {
        Self {
            cooling_rate: 0.95,
            min_temperature: 0.01,
            epoch_multiplier: 10,
            move_budget_per_instance: 2000,
            initial_temp_factor: 20.0,
            timing_weight: 4.0,
        }
    }
}

/// The `[routing]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoutingSection {
    /// Cost of entering any wire.
    pub base_cost: f64,
    /// Present-congestion factor of the first pass.
    pub present_initial: f64,
    /// Growth of the present-congestion factor per pass.
    pub present_growth: f64,
    /// History added per unit of overuse after each failed pass.
    pub history_factor: f64,
    /// Control pin count that makes a net worth a global buffer.
    pub global_promotion_threshold: usize,
}

impl Default for RoutingSection {
    fn default() -> Self {
        Self {
            base_cost: 1.0,
            present_initial: 0.5,
            present_growth: 0.5,
            history_factor: 1.0,
            global_promotion_threshold: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = RunConfig::default();
        assert_eq!(c.run.device, "mini-6x6");
        assert_eq!(c.run.seed, 1);
        assert_eq!(c.run.max_passes, 200);
        assert!(c.run.prune);
        assert_eq!(c.placement.cooling_rate, 0.95);
        assert_eq!(c.placement.move_budget_per_instance, 2000);
        assert_eq!(c.routing.global_promotion_threshold, 4);
        assert!(c.pins.is_empty());
    }

    #[test]
    fn partial_tables_fill_in_defaults() {
        let c: RunConfig = toml::from_str("[placement]\ntiming_weight = 8.0\n").unwrap();
        assert_eq!(c.placement.timing_weight, 8.0);
        assert_eq!(c.placement.epoch_multiplier, 10);
        assert_eq!(c.run, RunSection::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<RunConfig>("[run]\nsead = 3\n").is_err());
        assert!(toml::from_str::<RunConfig>("[timing]\n").is_err());
    }
}
