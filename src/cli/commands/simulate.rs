//! The `simulate` command: one scripted encounter from spawn to end.
//!
//! Seeds a handful of in-memory attackers, forces an immediate spawn, and
//! cycles them through their kits until the boss falls or the round
//! budget runs out. Useful for eyeballing config tuning without a real
//! deployment.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cli::args::SimulateArgs;
use crate::config::schema::{BossTemplate, HazardTemplate};
use crate::error::{CombatError, WardenError};
use crate::external::memory::{MemoryProfiles, StaticMoves};
use crate::external::{AbilityCategory, Announcer, ParticipantId};
use crate::service::WardenService;

use super::run::load_or_default;

/// Announcer printing broadcasts straight to stdout.
#[derive(Debug, Default)]
struct StdoutAnnouncer;

#[async_trait::async_trait]
impl Announcer for StdoutAnnouncer {
    async fn post(&self, text: &str) {
        println!("» {text}");
    }

    async fn revoke_voice(&self, id: ParticipantId, duration: Duration) {
        println!("» [{id} silenced for {}s]", duration.as_secs());
    }

    async fn restore_voice(&self, id: ParticipantId) {
        println!("» [{id} may act again]");
    }
}

const CATEGORIES: [AbilityCategory; 3] = [
    AbilityCategory::Weapon,
    AbilityCategory::Technique,
    AbilityCategory::Style,
];

/// Drive one simulated encounter.
///
/// # Errors
///
/// Returns a config error when the configuration file is unreadable or
/// invalid.
pub async fn run(args: &SimulateArgs) -> Result<(), WardenError> {
    let mut config = (*load_or_default(args.config.as_deref())?).clone();
    // Tight pacing so the simulation finishes in seconds.
    config.combat.retaliation_delay = Duration::from_millis(50);
    config.phases.transition_delay = Duration::from_millis(100);
    config.roster.lockout = Duration::from_secs(2);
    if config.bosses.is_empty() {
        config.bosses.push(BossTemplate {
            name: "Hollow Sovereign".to_string(),
            max_health: 1500,
            base_damage: 40,
            phase_count: 2,
            moves: vec!["Rending Howl".to_string(), "Gravebind".to_string()],
            hazard: HazardTemplate::default(),
        });
    }

    let profiles = Arc::new(MemoryProfiles::new());
    let attackers: Vec<ParticipantId> =
        (1..=u64::from(args.attackers)).map(ParticipantId).collect();
    for &id in &attackers {
        profiles.insert(id, MemoryProfiles::standard_profile(25));
    }

    let service = WardenService::new(
        Arc::new(config),
        profiles,
        Arc::new(StaticMoves::standard_kit()),
        Arc::new(StdoutAnnouncer),
        CancellationToken::new(),
    );

    service.try_spawn().await;
    if !service.is_encounter_live() {
        tracing::warn!("nothing spawned; check the boss template pool");
        return Ok(());
    }

    for round in 0..args.rounds {
        for (slot, &id) in attackers.iter().enumerate() {
            if !service.is_encounter_live() {
                println!("encounter resolved after {round} full round(s)");
                return Ok(());
            }
            let pick = round as usize + slot;
            let category = CATEGORIES[pick % CATEGORIES.len()];
            let move_number = u8::try_from(pick % 3).unwrap_or(0) + 1;
            match service.resolve_attack(id, category, move_number).await {
                Ok(outcome) => {
                    tracing::debug!(participant = %id, damage = outcome.damage, "hit landed");
                }
                Err(
                    err @ (CombatError::External(_) | CombatError::NoActiveEncounter),
                ) => {
                    tracing::debug!(participant = %id, error = %err, "attack dropped");
                }
                Err(err) => println!("  {id}: {err}"),
            }
        }
        tokio::time::sleep(Duration::from_millis(150)).await;
    }

    if let Some(status) = service.status() {
        println!("round budget exhausted; the boss endures:\n{status}");
    } else {
        println!("encounter resolved within the round budget");
    }
    Ok(())
}
