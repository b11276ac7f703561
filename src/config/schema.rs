//! Typed configuration schema.
//!
//! Every numeric the encounter treats as deployment tuning lives here:
//! spawn cadence, roster capacity, combat odds, hazard thresholds, freeze
//! behavior, phase amplification, monitor timing, and the boss template
//! pool. Durations are humantime strings in YAML (`"25s"`, `"4m"`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Serde adapter for humantime duration strings.
pub mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Deserializes a humantime string (`"90s"`, `"4m"`) into a [`Duration`].
    ///
    /// # Errors
    ///
    /// Returns a deserialization error when the string is not a valid
    /// humantime duration.
    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(de)?;
        humantime::parse_duration(&raw).map_err(D::Error::custom)
    }

    /// Serializes a [`Duration`] as a humantime string.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn serialize<S: Serializer>(d: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_str(&humantime::format_duration(*d))
    }
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration for the encounter coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Spawn scheduling.
    #[serde(default)]
    pub spawn: SpawnConfig,

    /// Roster and lockout tuning.
    #[serde(default)]
    pub roster: RosterConfig,

    /// Attack resolution tuning.
    #[serde(default)]
    pub combat: CombatConfig,

    /// Hazard ("domain") tuning.
    #[serde(default)]
    pub hazard: HazardConfig,

    /// Counter-hazard freeze tuning.
    #[serde(default)]
    pub freeze: FreezeConfig,

    /// Phase transition tuning.
    #[serde(default)]
    pub phases: PhaseConfig,

    /// Idle-despawn monitor tuning.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Boss template pool; one is picked uniformly at random per spawn.
    #[serde(default)]
    pub bosses: Vec<BossTemplate>,
}

// ============================================================================
// Sections
// ============================================================================

/// Spawn coordinator tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpawnConfig {
    /// Interval between scheduler ticks.
    #[serde(with = "duration_str", default = "defaults::tick_interval")]
    pub tick_interval: Duration,

    /// How long a spawn-lock acquisition stays held before expiring.
    #[serde(with = "duration_str", default = "defaults::lock_ttl")]
    pub lock_ttl: Duration,

    /// Lower bound of the random damage buff rolled per spawn, in percent.
    #[serde(default = "defaults::buff_min_pct")]
    pub buff_min_pct: u8,

    /// Upper bound of the random damage buff rolled per spawn, in percent.
    #[serde(default = "defaults::buff_max_pct")]
    pub buff_max_pct: u8,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            tick_interval: defaults::tick_interval(),
            lock_ttl: defaults::lock_ttl(),
            buff_min_pct: defaults::buff_min_pct(),
            buff_max_pct: defaults::buff_max_pct(),
        }
    }
}

/// Roster capacity and incapacitation lockout tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RosterConfig {
    /// Maximum number of concurrently engaged attackers.
    #[serde(default = "defaults::capacity")]
    pub capacity: usize,

    /// How long a defeated participant is locked out of acting.
    #[serde(with = "duration_str", default = "defaults::lockout")]
    pub lockout: Duration,

    /// Health restored when the lockout ends (not a full heal).
    #[serde(default = "defaults::recovery_health")]
    pub recovery_health: u32,

    /// Defeats required before the next hit is a guaranteed critical.
    #[serde(default = "defaults::streak_threshold")]
    pub streak_threshold: u32,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::capacity(),
            lockout: defaults::lockout(),
            recovery_health: defaults::recovery_health(),
            streak_threshold: defaults::streak_threshold(),
        }
    }
}

/// Attack resolution tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombatConfig {
    /// Symmetric damage variance as a fraction (0.04 = ±4%).
    #[serde(default = "defaults::variance")]
    pub variance: f64,

    /// Independent critical-hit probability per attack.
    #[serde(default = "defaults::crit_chance")]
    pub crit_chance: f64,

    /// Damage multiplier applied on a critical hit.
    #[serde(default = "defaults::crit_multiplier")]
    pub crit_multiplier: f64,

    /// Narrative delay between an attack landing and the boss countering.
    #[serde(with = "duration_str", default = "defaults::retaliation_delay")]
    pub retaliation_delay: Duration,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            variance: defaults::variance(),
            crit_chance: defaults::crit_chance(),
            crit_multiplier: defaults::crit_multiplier(),
            retaliation_delay: defaults::retaliation_delay(),
        }
    }
}

/// Hazard ("domain") tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HazardConfig {
    /// Boss health fraction below which the hazard triggers (0.10 = 10%).
    #[serde(default = "defaults::hazard_threshold")]
    pub threshold: f64,

    /// Fraction by which participant damage output is reduced while the
    /// hazard is active (0.25 = 25% weaker).
    #[serde(default = "defaults::damage_penalty")]
    pub damage_penalty: f64,

    /// Multiplier applied to cooldowns while the hazard is active.
    #[serde(default = "defaults::cooldown_penalty")]
    pub cooldown_penalty: f64,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::hazard_threshold(),
            damage_penalty: defaults::damage_penalty(),
            cooldown_penalty: defaults::cooldown_penalty(),
        }
    }
}

/// Counter-hazard freeze tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FreezeConfig {
    /// How long the freeze lasts if no clash ends it early.
    #[serde(with = "duration_str", default = "defaults::freeze_duration")]
    pub duration: Duration,

    /// Interval between clash checks while frozen.
    #[serde(with = "duration_str", default = "defaults::clash_interval")]
    pub clash_interval: Duration,

    /// Probability per check that the freeze shatters early.
    #[serde(default = "defaults::clash_chance")]
    pub clash_chance: f64,

    /// Energy charged to the participant triggering the freeze.
    #[serde(default = "defaults::freeze_cost")]
    pub energy_cost: u32,
}

impl Default for FreezeConfig {
    fn default() -> Self {
        Self {
            duration: defaults::freeze_duration(),
            clash_interval: defaults::clash_interval(),
            clash_chance: defaults::clash_chance(),
            energy_cost: defaults::freeze_cost(),
        }
    }
}

/// Phase transition tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseConfig {
    /// Health pool multiplier applied on each transition.
    #[serde(default = "defaults::health_multiplier")]
    pub health_multiplier: f64,

    /// Base damage multiplier applied on each transition.
    #[serde(default = "defaults::damage_multiplier")]
    pub damage_multiplier: f64,

    /// Narrative pause before the boss resurrects into the next phase.
    #[serde(with = "duration_str", default = "defaults::transition_delay")]
    pub transition_delay: Duration,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            health_multiplier: defaults::health_multiplier(),
            damage_multiplier: defaults::damage_multiplier(),
            transition_delay: defaults::transition_delay(),
        }
    }
}

/// Idle-despawn monitor tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    /// Sleep between monitor polls.
    #[serde(with = "duration_str", default = "defaults::poll_interval")]
    pub poll_interval: Duration,

    /// Despawn after this long without a participant action.
    #[serde(with = "duration_str", default = "defaults::idle_timeout")]
    pub idle_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: defaults::poll_interval(),
            idle_timeout: defaults::idle_timeout(),
        }
    }
}

// ============================================================================
// Boss templates
// ============================================================================

/// A spawnable boss definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BossTemplate {
    /// Display name.
    pub name: String,

    /// Health pool at phase 1.
    pub max_health: u32,

    /// Base retaliation damage at phase 1.
    pub base_damage: u32,

    /// Number of phases (1 to 3); the boss resurrects on reaching zero
    /// health in every phase but the last.
    #[serde(default = "defaults::phase_count")]
    pub phase_count: u8,

    /// Named abilities used in retaliation announcements.
    #[serde(default)]
    pub moves: Vec<String>,

    /// Hazard charges and per-hit damage.
    #[serde(default)]
    pub hazard: HazardTemplate,
}

/// Hazard parameters carried by a boss template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HazardTemplate {
    /// One-shot charges available over the whole encounter.
    #[serde(default = "defaults::hazard_uses")]
    pub uses: u8,

    /// Fixed damage dealt to every engaged participant on activation.
    #[serde(default = "defaults::hazard_damage")]
    pub damage: u32,
}

impl Default for HazardTemplate {
    fn default() -> Self {
        Self {
            uses: defaults::hazard_uses(),
            damage: defaults::hazard_damage(),
        }
    }
}

// ============================================================================
// Defaults
// ============================================================================

mod defaults {
    use std::time::Duration;

    pub fn tick_interval() -> Duration {
        Duration::from_secs(600)
    }
    pub fn lock_ttl() -> Duration {
        Duration::from_secs(30)
    }
    pub const fn buff_min_pct() -> u8 {
        7
    }
    pub const fn buff_max_pct() -> u8 {
        16
    }
    pub const fn capacity() -> usize {
        23
    }
    pub fn lockout() -> Duration {
        Duration::from_secs(10)
    }
    pub const fn recovery_health() -> u32 {
        50
    }
    pub const fn streak_threshold() -> u32 {
        3
    }
    pub const fn variance() -> f64 {
        0.04
    }
    pub const fn crit_chance() -> f64 {
        0.01
    }
    pub const fn crit_multiplier() -> f64 {
        2.5
    }
    pub fn retaliation_delay() -> Duration {
        Duration::from_secs(2)
    }
    pub const fn hazard_threshold() -> f64 {
        0.10
    }
    pub const fn damage_penalty() -> f64 {
        0.25
    }
    pub const fn cooldown_penalty() -> f64 {
        1.5
    }
    pub fn freeze_duration() -> Duration {
        Duration::from_secs(120)
    }
    pub fn clash_interval() -> Duration {
        Duration::from_secs(10)
    }
    pub const fn clash_chance() -> f64 {
        0.15
    }
    pub const fn freeze_cost() -> u32 {
        100
    }
    pub const fn health_multiplier() -> f64 {
        2.5
    }
    pub const fn damage_multiplier() -> f64 {
        1.3
    }
    pub fn transition_delay() -> Duration {
        Duration::from_secs(3)
    }
    pub fn poll_interval() -> Duration {
        Duration::from_secs(25)
    }
    pub fn idle_timeout() -> Duration {
        Duration::from_secs(240)
    }
    pub const fn phase_count() -> u8 {
        2
    }
    pub const fn hazard_uses() -> u8 {
        1
    }
    pub const fn hazard_damage() -> u32 {
        120
    }
}
