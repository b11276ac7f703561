//! Configuration loading and validation.
//!
//! Load is a two-step pipeline: parse the YAML into the typed schema, then
//! validate cross-field constraints that serde cannot express. A config that
//! loads is safe to hand to the coordinator unchecked.

use std::path::Path;
use std::sync::Arc;

use crate::config::schema::Config;
use crate::error::ConfigError;

/// Loads and validates a configuration file.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, is not valid YAML,
/// or fails validation.
pub fn load(path: &Path) -> Result<Arc<Config>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config: Config = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate(&config)?;
    Ok(Arc::new(config))
}

/// Validates cross-field constraints on an already-parsed configuration.
///
/// # Errors
///
/// Returns the first violated constraint as [`ConfigError::Invalid`].
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.roster.capacity == 0 {
        return invalid("roster.capacity", "must be at least 1");
    }
    if config.spawn.buff_min_pct > config.spawn.buff_max_pct {
        return invalid("spawn.buff_min_pct", "must not exceed spawn.buff_max_pct");
    }
    if !(0.0..0.5).contains(&config.combat.variance) {
        return invalid("combat.variance", "must be in [0, 0.5)");
    }
    for (field, chance) in [
        ("combat.crit_chance", config.combat.crit_chance),
        ("freeze.clash_chance", config.freeze.clash_chance),
        ("hazard.threshold", config.hazard.threshold),
        ("hazard.damage_penalty", config.hazard.damage_penalty),
    ] {
        if !(0.0..=1.0).contains(&chance) {
            return invalid(field, "must be a probability in [0, 1]");
        }
    }
    if config.combat.crit_multiplier < 1.0 {
        return invalid("combat.crit_multiplier", "must be at least 1.0");
    }
    if config.hazard.cooldown_penalty < 1.0 {
        return invalid("hazard.cooldown_penalty", "must be at least 1.0");
    }
    if config.phases.health_multiplier < 1.0 || config.phases.damage_multiplier < 1.0 {
        return invalid("phases", "multipliers must be at least 1.0");
    }
    if config.monitor.poll_interval.is_zero() {
        return invalid("monitor.poll_interval", "must be non-zero");
    }
    if config.monitor.idle_timeout < config.monitor.poll_interval {
        return invalid(
            "monitor.idle_timeout",
            "must be at least monitor.poll_interval",
        );
    }

    for (i, boss) in config.bosses.iter().enumerate() {
        if boss.name.trim().is_empty() {
            return invalid(&format!("bosses[{i}].name"), "must not be empty");
        }
        if boss.max_health == 0 {
            return invalid(&format!("bosses[{i}].max_health"), "must be at least 1");
        }
        if !(1..=3).contains(&boss.phase_count) {
            return invalid(&format!("bosses[{i}].phase_count"), "must be 1, 2, or 3");
        }
    }

    Ok(())
}

fn invalid(field: &str, message: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid {
        field: field.to_string(),
        message: message.to_string(),
    })
}
