//! Metrics collection for `raidwarden`.
//!
//! Typed convenience functions over the `metrics` facade. No exporter is
//! installed here; the embedding process chooses one. Without a global
//! recorder every call is a silent no-op, so these are safe to call from
//! anywhere, tests included.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Despawn reason labels recorded by [`record_despawn`].
///
/// The reason string comes from call sites, not user input, but is
/// validated anyway so a typo cannot mint a new label series.
const KNOWN_REASONS: [&str; 2] = ["victory", "idle"];

/// Registers metric descriptions with the global recorder.
pub fn describe_metrics() {
    describe_counter!("raidwarden_spawns_total", "Encounters spawned");
    describe_counter!(
        "raidwarden_despawns_total",
        "Encounters ended, labeled by reason"
    );
    describe_counter!("raidwarden_attacks_total", "Accepted ability uses");
    describe_counter!("raidwarden_criticals_total", "Critical hits landed");
    describe_histogram!("raidwarden_attack_damage", "Damage dealt per accepted attack");
    describe_counter!(
        "raidwarden_incapacitations_total",
        "Participants knocked out of the fight"
    );
    describe_counter!("raidwarden_phase_transitions_total", "Boss phase transitions");
    describe_counter!("raidwarden_hazards_total", "Hazard unleashes");
    describe_counter!("raidwarden_freezes_total", "Counter-hazard freezes triggered");
    describe_counter!("raidwarden_clashes_total", "Freezes shattered early by a clash");
    describe_gauge!("raidwarden_roster_size", "Currently engaged attackers");
}

/// Records a successful spawn.
pub fn record_spawn() {
    counter!("raidwarden_spawns_total").increment(1);
}

/// Records an encounter ending, by reason.
pub fn record_despawn(reason: &str) {
    let label = if KNOWN_REASONS.contains(&reason) {
        reason
    } else {
        "__unknown__"
    };
    counter!("raidwarden_despawns_total", "reason" => label.to_owned()).increment(1);
}

/// Records an accepted attack.
#[allow(clippy::cast_precision_loss)]
pub fn record_attack(damage: u32, critical: bool) {
    counter!("raidwarden_attacks_total").increment(1);
    if critical {
        counter!("raidwarden_criticals_total").increment(1);
    }
    histogram!("raidwarden_attack_damage").record(f64::from(damage));
}

/// Records a participant incapacitation.
pub fn record_incapacitation() {
    counter!("raidwarden_incapacitations_total").increment(1);
}

/// Records a boss phase transition.
pub fn record_phase_transition() {
    counter!("raidwarden_phase_transitions_total").increment(1);
}

/// Records a hazard unleash.
pub fn record_hazard() {
    counter!("raidwarden_hazards_total").increment(1);
}

/// Records a counter-hazard freeze.
pub fn record_freeze() {
    counter!("raidwarden_freezes_total").increment(1);
}

/// Records a freeze shattered early by a clash.
pub fn record_clash() {
    counter!("raidwarden_clashes_total").increment(1);
}

/// Sets the engaged-attacker gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_roster_size(count: usize) {
    gauge!("raidwarden_roster_size").set(count as f64);
}
