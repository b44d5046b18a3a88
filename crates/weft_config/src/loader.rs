//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::RunConfig;
use std::path::Path;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE: &str = "weft.toml";

/// Loads and validates `<dir>/weft.toml`.
pub fn load_config(dir: &Path) -> Result<RunConfig, ConfigError> {
    let content = std::fs::read_to_string(dir.join(CONFIG_FILE))?;
    load_config_from_str(&content)
}

/// Parses and validates a `weft.toml` held in a string.
pub fn load_config_from_str(content: &str) -> Result<RunConfig, ConfigError> {
    let config: RunConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(msg.into())
}

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be positive, got {value}")))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must not be negative, got {value}")))
    }
}

fn at_least_one(name: &str, value: usize) -> Result<(), ConfigError> {
    if value >= 1 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be at least 1")))
    }
}

/// Checks value ranges the pipeline relies on.
fn validate_config(config: &RunConfig) -> Result<(), ConfigError> {
    let run = &config.run;
    if run.device.trim().is_empty() {
        return Err(ConfigError::MissingField("run.device".to_string()));
    }
    if run.seed == 0 {
        return Err(invalid("run.seed must be non-zero"));
    }
    at_least_one("run.max_passes", run.max_passes)?;

    let p = &config.placement;
    if !(p.cooling_rate > 0.0 && p.cooling_rate < 1.0) {
        return Err(invalid(format!(
            "placement.cooling_rate must lie strictly between 0 and 1, got {}",
            p.cooling_rate
        )));
    }
    positive("placement.min_temperature", p.min_temperature)?;
    positive("placement.initial_temp_factor", p.initial_temp_factor)?;
    positive("placement.timing_weight", p.timing_weight)?;
    at_least_one("placement.epoch_multiplier", p.epoch_multiplier)?;
    at_least_one("placement.move_budget_per_instance", p.move_budget_per_instance)?;

    let r = &config.routing;
    positive("routing.base_cost", r.base_cost)?;
    non_negative("routing.present_initial", r.present_initial)?;
    non_negative("routing.present_growth", r.present_growth)?;
    non_negative("routing.history_factor", r.history_factor)?;
    at_least_one("routing.global_promotion_threshold", r.global_promotion_threshold)?;

    for (port, pin) in &config.pins {
        if pin.trim().is_empty() {
            return Err(ConfigError::MissingField(format!("pins.{port}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, RunConfig::default());
        assert!(config.run.promote_globals);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[run]
device = "mini-8x8"
package = "tq48"
seed = 7
max_passes = 50
route_only = false
promote_globals = false
prune = true
warn_no_port = true

[placement]
cooling_rate = 0.9
min_temperature = 0.05
epoch_multiplier = 4
move_budget_per_instance = 300
initial_temp_factor = 10.0
timing_weight = 2.0

[routing]
base_cost = 1.0
present_initial = 0.25
present_growth = 1.0
history_factor = 0.5
global_promotion_threshold = 8

[pins]
led = "P5"
clk = "P1"
"#;
        let c = load_config_from_str(toml).unwrap();
        assert_eq!(c.run.device, "mini-8x8");
        assert_eq!(c.run.package, "tq48");
        assert_eq!(c.run.seed, 7);
        assert!(!c.run.promote_globals);
        assert_eq!(c.placement.move_budget_per_instance, 300);
        assert_eq!(c.routing.present_growth, 1.0);
        assert_eq!(c.routing.global_promotion_threshold, 8);
        assert_eq!(c.pins["led"], "P5");
        assert_eq!(c.pins.len(), 2);
    }

    #[test]
    fn zero_seed_rejected() {
        let err = load_config_from_str("[run]\nseed = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(msg) if msg.contains("seed")));
    }

    #[test]
    fn zero_passes_rejected() {
        let err = load_config_from_str("[run]\nmax_passes = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn cooling_rate_must_be_a_fraction() {
        for rate in ["0.0", "1.0", "1.5", "-0.2"] {
            let toml = format!("[placement]\ncooling_rate = {rate}\n");
            assert!(
                matches!(load_config_from_str(&toml), Err(ConfigError::ValidationError(_))),
                "cooling rate {rate} accepted"
            );
        }
    }

    #[test]
    fn non_positive_factors_rejected() {
        for (table, key) in [
            ("placement", "initial_temp_factor"),
            ("placement", "timing_weight"),
            ("placement", "min_temperature"),
            ("routing", "base_cost"),
        ] {
            let toml = format!("[{table}]\n{key} = 0.0\n");
            assert!(load_config_from_str(&toml).is_err(), "{table}.{key} = 0 accepted");
        }
        assert!(load_config_from_str("[routing]\nhistory_factor = -1.0\n").is_err());
        assert!(load_config_from_str("[routing]\nhistory_factor = 0.0\n").is_ok());
    }

    #[test]
    fn empty_device_or_pin_is_missing() {
        assert!(matches!(
            load_config_from_str("[run]\ndevice = \"\"\n"),
            Err(ConfigError::MissingField(f)) if f == "run.device"
        ));
        assert!(matches!(
            load_config_from_str("[pins]\nled = \" \"\n"),
            Err(ConfigError::MissingField(f)) if f == "pins.led"
        ));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = std::env::temp_dir().join("weft-config-missing-dir");
        assert!(matches!(load_config(&dir), Err(ConfigError::IoError(_))));
    }
}
